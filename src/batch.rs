use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use glob::{glob, Pattern};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use crate::merge::{merge_files, MergeOptions, MergeSummary};
use crate::utils::error::{ImergeError, ImergeResult};
use crate::{log_error, log_info, log_warn};

/// One merge group: input files in left-to-right order and their destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
}

#[derive(Debug)]
pub struct BatchFailure {
    pub output: PathBuf,
    pub error: ImergeError,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub merged: Vec<(PathBuf, MergeSummary)>,
    pub failures: Vec<BatchFailure>,
    /// Batches never started because an earlier one failed in fail-fast mode.
    pub skipped: usize,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.skipped == 0
    }
}

/// Lists `*.png` files directly inside `input_dir`, sorted by path.
pub fn find_inputs(input_dir: &Path) -> ImergeResult<Vec<PathBuf>> {
    if !input_dir.is_dir() {
        return Err(ImergeError::PreconditionFailed(format!(
            "Input folder does not exist: {}",
            input_dir.display()
        )));
    }

    let pattern = format!("{}/*.png", Pattern::escape(&input_dir.to_string_lossy()));
    let entries = glob(&pattern)
        .map_err(|e| ImergeError::PreconditionFailed(format!("Invalid input pattern {}: {}", pattern, e)))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| ImergeError::IoError(e.into_error()))?;
        if path.is_file() {
            files.push(path);
        }
    }

    files.sort();

    Ok(files)
}

/// Splits `files` into consecutive groups of `group_size`. Group `i` writes to
/// `<output_dir>/<start_index + i>.png`; leftover files that do not fill a
/// group are not merged.
pub fn plan_batches(
    files: Vec<PathBuf>,
    group_size: usize,
    output_dir: &Path,
    start_index: u32,
) -> ImergeResult<Vec<Batch>> {
    if group_size == 0 {
        return Err(ImergeError::PreconditionFailed("Group size must be at least 1".into()));
    }

    let leftover = files.len() % group_size;
    if leftover != 0 {
        log_warn!(
            "{} file(s) left over after grouping {} files by {}, they will not be merged",
            leftover,
            files.len(),
            group_size
        );
    }

    let mut batches = Vec::with_capacity(files.len() / group_size);
    for (i, group) in files.chunks_exact(group_size).enumerate() {
        let index = u32::try_from(i)
            .ok()
            .and_then(|i| start_index.checked_add(i))
            .ok_or_else(|| ImergeError::PreconditionFailed("Output index overflow".into()))?;

        batches.push(Batch {
            inputs: group.to_vec(),
            output: output_dir.join(format!("{}.png", index)),
        });
    }

    Ok(batches)
}

fn describe(batch: &Batch) -> String {
    let inputs = batch
        .inputs
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" + ");

    format!("{} -> {}", inputs, batch.output.display())
}

fn run_batch(batch: &Batch, options: &MergeOptions) -> ImergeResult<MergeSummary> {
    log_info!("Merging: {}", describe(batch));
    merge_files(&batch.inputs, &batch.output, options)
}

/// Runs every batch. Each batch is independent; a failure only affects its own
/// output unless `fail_fast` is set.
///
/// With `fail_fast` the batches run one at a time in input order, and every
/// batch after the first failure is skipped. Otherwise they run concurrently
/// when the `parallel` feature is enabled.
pub fn run_batches(batches: &[Batch], options: &MergeOptions, fail_fast: bool) -> BatchReport {
    let stop = AtomicBool::new(false);

    let run = |batch: &Batch| -> Option<(PathBuf, ImergeResult<MergeSummary>)> {
        if stop.load(Ordering::Relaxed) {
            return None;
        }

        let result = run_batch(batch, options);
        if let Err(e) = &result {
            log_error!("Failed to merge {}: {}", describe(batch), e);
            if fail_fast {
                stop.store(true, Ordering::Relaxed);
            }
        }

        Some((batch.output.clone(), result))
    };

    #[cfg(feature = "parallel")]
    let outcomes: Vec<_> = if fail_fast {
        batches.iter().map_while(run).collect()
    } else {
        batches.par_iter().filter_map(run).collect()
    };
    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<_> = batches.iter().map_while(run).collect();

    let mut report = BatchReport {
        skipped: batches.len() - outcomes.len(),
        ..BatchReport::default()
    };

    for (output, result) in outcomes {
        match result {
            Ok(summary) => report.merged.push((output, summary)),
            Err(error) => report.failures.push(BatchFailure { output, error }),
        }
    }

    report
}
