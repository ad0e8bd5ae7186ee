pub mod chunk;
pub mod header;
pub mod image;
pub mod zlib;

use std::io::Write;
use flate2::Compression;
use crate::log_debug;
use crate::pixel::PixelRow;
use crate::png::chunk::{write_chunk, write_signature, IDAT, IEND, IHDR};
use crate::png::header::{FilterType, ImageHeader};
use crate::utils::error::{ImergeError, ImergeResult};

/// Largest IDAT payload written.
pub const IDAT_CHUNK_SIZE: usize = 8192;

/// Shape of an encoded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeSummary {
    pub width: u32,
    pub height: u32,
    pub data_chunks: usize,
    pub compressed_len: usize,
}

/// Serializes rows as unfiltered scanlines: a zero filter byte, then packed RGB.
pub fn build_scanlines(rows: &[PixelRow]) -> Vec<u8> {
    let width = rows.first().map(|row| row.width()).unwrap_or(0);
    let mut raw = Vec::with_capacity(rows.len() * (1 + width * 3));

    for row in rows {
        raw.push(FilterType::None as u8);
        row.write_rgb(&mut raw);
    }

    raw
}

/// Writes `rows` as a complete PNG file.
///
/// `template` supplies every header field except width and height, which come
/// from the rows. The compressed stream is split into IDAT chunks of at most
/// [`IDAT_CHUNK_SIZE`] bytes. Nothing is written if the rows are inconsistent.
pub fn encode_rows<W: Write>(
    template: &ImageHeader,
    rows: &[PixelRow],
    writer: &mut W,
    level: Compression,
) -> ImergeResult<EncodeSummary> {
    let first = rows
        .first()
        .ok_or_else(|| ImergeError::PreconditionFailed("Cannot encode an image without rows".into()))?;

    let width = first.width();
    if width == 0 {
        return Err(ImergeError::PreconditionFailed("Cannot encode rows of zero width".into()));
    }

    if let Some((index, row)) = rows.iter().enumerate().find(|(_, row)| row.width() != width) {
        return Err(ImergeError::PreconditionFailed(format!(
            "Row {} has width {}, expected {}",
            index,
            row.width(),
            width
        )));
    }

    let width = u32::try_from(width)
        .map_err(|_| ImergeError::PreconditionFailed(format!("Row width {} does not fit in u32", width)))?;
    let height = u32::try_from(rows.len())
        .map_err(|_| ImergeError::PreconditionFailed(format!("Row count {} does not fit in u32", rows.len())))?;

    let mut header = template.with_width(width);
    header.height = height;
    header.validate_supported()?;

    let compressed = zlib::deflate(&build_scanlines(rows), level)?;

    write_signature(writer)?;
    write_chunk(writer, IHDR, &header.to_bytes())?;

    let mut data_chunks = 0;
    for piece in compressed.chunks(IDAT_CHUNK_SIZE) {
        write_chunk(writer, IDAT, piece)?;
        data_chunks += 1;
    }

    write_chunk(writer, IEND, &[])?;
    writer.flush()?;

    log_debug!(
        "Encoded {}x{} image: {} compressed bytes in {} IDAT chunks",
        width,
        height,
        compressed.len(),
        data_chunks
    );

    Ok(EncodeSummary {
        width,
        height,
        data_chunks,
        compressed_len: compressed.len(),
    })
}
