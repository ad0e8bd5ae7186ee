use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use flate2::Compression;
use crate::pixel::PixelRow;
use crate::png::image::{Image, LoadOptions};
use crate::png::{encode_rows, EncodeSummary};
use crate::utils::error::{ImergeError, ImergeResult};
use crate::{log_debug, log_info, log_warn};

pub type MergeSummary = EncodeSummary;

#[derive(Debug, Clone, Copy)]
pub struct MergeOptions {
    pub load: LoadOptions,
    /// zlib compression level, 0-9.
    pub compression_level: u32,
}

impl Default for MergeOptions {
    fn default() -> Self {
        MergeOptions {
            load: LoadOptions::default(),
            compression_level: Compression::default().level(),
        }
    }
}

impl MergeOptions {
    fn compression(&self) -> Compression {
        Compression::new(self.compression_level.min(9))
    }
}

/// Width of the merged image, after checking that the images can be merged.
fn merged_width(images: &[Image]) -> ImergeResult<u32> {
    let first = images
        .first()
        .ok_or_else(|| ImergeError::PreconditionFailed("No images to merge".into()))?;

    if let Some((index, image)) = images
        .iter()
        .enumerate()
        .find(|(_, image)| image.height() != first.height())
    {
        return Err(ImergeError::PreconditionFailed(format!(
            "Image {} has height {}, expected {}",
            index,
            image.height(),
            first.height()
        )));
    }

    images.iter().try_fold(0u32, |total, image| {
        total.checked_add(image.width()).ok_or_else(|| {
            ImergeError::PreconditionFailed("Merged width does not fit in u32".into())
        })
    })
}

/// Concatenates each row index across `images`, left to right in input order.
pub fn merge_rows(images: &[Image]) -> ImergeResult<Vec<PixelRow>> {
    let width = merged_width(images)?;
    let height = images[0].height();

    let mut rows = Vec::with_capacity(height as usize);
    for y in 0..height {
        let mut row = PixelRow::with_capacity(width as usize);
        for image in images {
            row.append(&image.get_row(y)?);
        }
        rows.push(row);
    }

    Ok(rows)
}

/// Merges `images` side by side and writes the result to `writer`.
///
/// The first image's header is the template for the output. Every row is
/// extracted before the first byte is written, so a failing precondition
/// leaves `writer` untouched.
pub fn merge<W: Write>(images: &[Image], writer: &mut W) -> ImergeResult<MergeSummary> {
    merge_with(images, writer, &MergeOptions::default())
}

pub fn merge_with<W: Write>(images: &[Image], writer: &mut W, options: &MergeOptions) -> ImergeResult<MergeSummary> {
    let rows = merge_rows(images)?;
    let template = images[0].header();

    encode_rows(template, &rows, writer, options.compression())
}

/// Loads every stream in order, then merges them into `writer`.
pub fn merge_streams<R: Read, W: Write>(
    inputs: Vec<R>,
    writer: &mut W,
    options: &MergeOptions,
) -> ImergeResult<MergeSummary> {
    let images = inputs
        .into_iter()
        .map(|input| Image::load_with(input, options.load))
        .collect::<ImergeResult<Vec<_>>>()?;

    merge_with(&images, writer, options)
}

fn partial_path(output: &Path) -> ImergeResult<PathBuf> {
    let name = output.file_name().ok_or_else(|| {
        ImergeError::PreconditionFailed(format!("Output path {} has no file name", output.display()))
    })?;

    let mut partial = OsString::from(name);
    partial.push(".partial");

    Ok(output.with_file_name(partial))
}

fn write_partial(images: &[Image], partial: &Path, options: &MergeOptions) -> ImergeResult<MergeSummary> {
    let mut writer = BufWriter::new(File::create(partial)?);
    let summary = merge_with(images, &mut writer, options)?;

    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;

    Ok(summary)
}

/// Merges image files into `output`.
///
/// The result is written next to `output` under a `.partial` name and only
/// renamed into place once the whole file, IEND included, is on disk.
pub fn merge_files<P: AsRef<Path>>(inputs: &[P], output: &Path, options: &MergeOptions) -> ImergeResult<MergeSummary> {
    let mut images = Vec::with_capacity(inputs.len());
    for input in inputs {
        let input = input.as_ref();
        log_debug!("Loading {}", input.display());

        let image = Image::load_with(BufReader::new(File::open(input)?), options.load)?;
        images.push(image);
    }

    let partial = partial_path(output)?;
    let result = write_partial(&images, &partial, options).and_then(|summary| {
        fs::rename(&partial, output)?;
        Ok(summary)
    });

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            if partial.exists() {
                if let Err(remove_err) = fs::remove_file(&partial) {
                    log_warn!("Could not remove {}: {}", partial.display(), remove_err);
                }
            }
            return Err(e);
        }
    };

    log_info!(
        "Merged {} images into {} ({}x{}, {} IDAT chunks)",
        images.len(),
        output.display(),
        summary.width,
        summary.height,
        summary.data_chunks
    );

    Ok(summary)
}
