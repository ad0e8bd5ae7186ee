use std::io::Read;
use crate::png::chunk::{read_all, Chunk};
use crate::png::header::{FilterType, ImageHeader};
use crate::png::zlib;
use crate::pixel::PixelRow;
use crate::utils::error::{ImergeError, ImergeResult};
use crate::utils::traits::SafeAccess;
use crate::log_warn;

/// What to do when a stored checksum does not match the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecksumPolicy {
    Skip,
    #[default]
    Warn,
    Reject,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    pub checksum_policy: ChecksumPolicy,
}

impl LoadOptions {
    pub fn with_checksum_policy(checksum_policy: ChecksumPolicy) -> Self {
        LoadOptions { checksum_policy }
    }
}

/// A decoded image: its header and the inflated scanline buffer.
#[derive(Debug)]
pub struct Image {
    header: ImageHeader,
    pixel_size: usize,
    row_size: usize,
    scanlines: Vec<u8>,
}

fn check(policy: ChecksumPolicy, ok: bool, message: impl FnOnce() -> String) -> ImergeResult<()> {
    if ok {
        return Ok(());
    }

    match policy {
        ChecksumPolicy::Skip => Ok(()),
        ChecksumPolicy::Warn => {
            log_warn!(message());
            Ok(())
        }
        ChecksumPolicy::Reject => Err(ImergeError::DecodeError(message())),
    }
}

impl Image {
    /// Loads an image with the default options.
    pub fn load<R: Read>(reader: R) -> ImergeResult<Image> {
        Image::load_with(reader, LoadOptions::default())
    }

    pub fn load_with<R: Read>(reader: R, options: LoadOptions) -> ImergeResult<Image> {
        let policy = options.checksum_policy;
        let raw_chunks = read_all(reader)?;

        let mut header = None;
        let mut compressed = Vec::new();
        let mut ended = false;

        for (index, raw) in raw_chunks.into_iter().enumerate() {
            if ended {
                log_warn!("Ignoring chunk {} after IEND", raw.chunk_type);
                continue;
            }

            if policy != ChecksumPolicy::Skip {
                let (stored, computed) = (raw.crc, raw.computed_crc());
                check(policy, stored == computed, || {
                    format!(
                        "CRC mismatch for chunk {}: expected 0x{:08x}, calculated 0x{:08x}",
                        raw.chunk_type, stored, computed
                    )
                })?;
            }

            match (index, Chunk::parse(raw)?) {
                (0, Chunk::Header(h)) => header = Some(h),
                (0, other) => {
                    return Err(ImergeError::InvalidFormat(format!(
                        "First chunk must be IHDR, found {}",
                        other.chunk_type()
                    )));
                }
                (_, Chunk::Header(_)) => {
                    return Err(ImergeError::InvalidFormat("Duplicate IHDR chunk".into()));
                }
                (_, Chunk::Data(data)) => compressed.extend_from_slice(&data),
                (_, Chunk::End) => ended = true,
                (_, Chunk::Other(raw)) => {
                    if raw.chunk_type.is_critical() {
                        log_warn!("Ignoring critical chunk {} ({} bytes)", raw.chunk_type, raw.length());
                    } else {
                        log_warn!("Dropping ancillary chunk {} ({} bytes)", raw.chunk_type, raw.length());
                    }
                }
            }
        }

        let header = header.ok_or_else(|| ImergeError::InvalidFormat("Missing IHDR chunk".into()))?;
        header.validate_supported()?;

        if compressed.is_empty() {
            return Err(ImergeError::DecodeError("No IDAT data found".into()));
        }

        let inflated = zlib::inflate(&compressed)?;
        if policy != ChecksumPolicy::Skip {
            check(policy, inflated.adler_matches(), || {
                format!("Adler-32 mismatch: stored 0x{:08x}", inflated.stored_adler)
            })?;
        }

        Image::from_scanlines(header, inflated.data)
    }

    /// Wraps an already inflated scanline buffer.
    pub fn from_scanlines(header: ImageHeader, scanlines: Vec<u8>) -> ImergeResult<Image> {
        header.validate_supported()?;
        let pixel_size = header.pixel_size()?;
        let row_size = header.row_size()?;

        let expected = row_size
            .checked_mul(header.height as usize)
            .ok_or_else(|| ImergeError::UnsupportedFormat(format!(
                "Image dimensions {}x{} are too large",
                header.width, header.height
            )))?;

        if scanlines.len() != expected {
            return Err(ImergeError::DecodeError(format!(
                "Scanline buffer is {} bytes, expected {} ({} rows of {} bytes)",
                scanlines.len(),
                expected,
                header.height,
                row_size
            )));
        }

        Ok(Image {
            header,
            pixel_size,
            row_size,
            scanlines,
        })
    }

    pub fn header(&self) -> &ImageHeader {
        &self.header
    }

    pub fn width(&self) -> u32 {
        self.header.width
    }

    pub fn height(&self) -> u32 {
        self.header.height
    }

    pub fn pixel_size(&self) -> usize {
        self.pixel_size
    }

    pub fn scanlines(&self) -> &[u8] {
        &self.scanlines
    }

    /// Extracts row `index` as RGB pixels.
    ///
    /// Only rows stored with filter type None can be extracted; any other
    /// filter byte is reported as unsupported rather than decoded.
    pub fn get_row(&self, index: u32) -> ImergeResult<PixelRow> {
        if index >= self.header.height {
            return Err(ImergeError::PreconditionFailed(format!(
                "Row {} out of range (height {})",
                index, self.header.height
            )));
        }

        let offset = index as usize * self.row_size;
        let scanline = self.scanlines.get_range_safe(offset..offset + self.row_size)?;

        let filter = *scanline.get_safe(0)?;
        if filter != FilterType::None as u8 {
            let name = match FilterType::from_u8(filter) {
                Some(filter_type) => format!("{:?}", filter_type),
                None => "invalid".to_string(),
            };

            return Err(ImergeError::UnsupportedFormat(format!(
                "Row {} uses filter type {} ({}), only unfiltered rows are supported",
                index, filter, name
            )));
        }

        Ok(PixelRow::from_rgb_bytes(&scanline[1..]))
    }
}
