use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use clap::Parser;
use imerge::{find_inputs, log_error, log_info, plan_batches, run_batches};
use imerge::{ChecksumPolicy, LoadOptions, LogLevel, Logger, MergeOptions};

#[derive(Parser, Debug)]
#[clap(name = "imerge", about = "Merge groups of same-height PNG images side by side")]
struct Cli {
    #[arg(required = true, help = "Folder containing the input PNG files")]
    input_dir: PathBuf,

    #[arg(required = true, help = "Folder the merged files are written to")]
    output_dir: PathBuf,

    #[arg(short = 'n', long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..), help = "Number of images per merged file")]
    group_size: u32,

    #[arg(long, default_value_t = 100001, help = "Number of the first output file")]
    start_index: u32,

    #[arg(long, conflicts_with = "skip_checksums", help = "Reject inputs with bad CRC or Adler-32 checksums")]
    strict: bool,

    #[arg(long, help = "Do not verify input checksums")]
    skip_checksums: bool,

    #[arg(short, long, value_parser = clap::value_parser!(u32).range(0..=9), help = "Compression level (0-9)")]
    level: Option<u32>,

    #[arg(long, help = "Stop at the first batch that fails")]
    fail_fast: bool,

    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn merge_options(&self) -> MergeOptions {
        let checksum_policy = if self.strict {
            ChecksumPolicy::Reject
        } else if self.skip_checksums {
            ChecksumPolicy::Skip
        } else {
            ChecksumPolicy::Warn
        };

        let mut options = MergeOptions {
            load: LoadOptions::with_checksum_policy(checksum_policy),
            ..MergeOptions::default()
        };

        if let Some(level) = self.level {
            options.compression_level = level;
        }

        options
    }
}

fn run(cli: &Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let files = find_inputs(&cli.input_dir)?;
    fs::create_dir_all(&cli.output_dir)?;

    let batches = plan_batches(files, cli.group_size as usize, &cli.output_dir, cli.start_index)?;
    if batches.is_empty() {
        log_info!("Nothing to merge in {}", cli.input_dir.display());
        return Ok(true);
    }

    let start = Instant::now();
    let report = run_batches(&batches, &cli.merge_options(), cli.fail_fast);

    log_info!(
        "Merged {} of {} batches in {:.2?} ({} failed, {} skipped)",
        report.merged.len(),
        batches.len(),
        start.elapsed(),
        report.failures.len(),
        report.skipped
    );

    for failure in &report.failures {
        log_error!("{}: {}", failure.output.display(), failure.error);
    }

    Ok(report.is_success())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.verbose {
        Logger::set_level(LogLevel::Debug);
    } else if cli.quiet {
        Logger::set_level(LogLevel::Error);
    }

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log_error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
