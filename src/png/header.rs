use crate::utils::error::{ImergeError, ImergeResult};

pub const IHDR_LENGTH: usize = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorType {
    Grayscale = 0,
    RGB = 2,
    Indexed = 3,
    GrayscaleAlpha = 4,
    RGBA = 6,
}

impl ColorType {
    pub fn from_u8(value: u8) -> Option<ColorType> {
        match value {
            0 => Some(ColorType::Grayscale),
            2 => Some(ColorType::RGB),
            3 => Some(ColorType::Indexed),
            4 => Some(ColorType::GrayscaleAlpha),
            6 => Some(ColorType::RGBA),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    None = 0,
    Sub = 1,
    Up = 2,
    Average = 3,
    Paeth = 4,
}

impl FilterType {
    pub fn from_u8(value: u8) -> Option<FilterType> {
        match value {
            0 => Some(FilterType::None),
            1 => Some(FilterType::Sub),
            2 => Some(FilterType::Up),
            3 => Some(FilterType::Average),
            4 => Some(FilterType::Paeth),
            _ => None,
        }
    }
}

/// Decoded IHDR fields, kept as the raw bytes found in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub color_type: u8,
    pub compression_method: u8,
    pub filter_method: u8,
    pub interlace_method: u8,
}

impl ImageHeader {
    /// Header for an 8-bit truecolor, non-interlaced image.
    pub fn rgb8(width: u32, height: u32) -> Self {
        ImageHeader {
            width,
            height,
            bit_depth: 8,
            color_type: ColorType::RGB as u8,
            compression_method: 0,
            filter_method: 0,
            interlace_method: 0,
        }
    }

    pub fn parse(data: &[u8]) -> ImergeResult<ImageHeader> {
        if data.len() != IHDR_LENGTH {
            return Err(ImergeError::InvalidFormat(format!(
                "IHDR chunk must be {} bytes, found {}",
                IHDR_LENGTH,
                data.len()
            )));
        }

        let header = ImageHeader {
            width: u32::from_be_bytes([data[0], data[1], data[2], data[3]]),
            height: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
            bit_depth: data[8],
            color_type: data[9],
            compression_method: data[10],
            filter_method: data[11],
            interlace_method: data[12],
        };

        if header.width == 0 || header.height == 0 {
            return Err(ImergeError::InvalidFormat(format!(
                "Invalid image dimensions: {}x{}",
                header.width, header.height
            )));
        }

        Ok(header)
    }

    pub fn to_bytes(&self) -> [u8; IHDR_LENGTH] {
        let mut data = [0u8; IHDR_LENGTH];
        data[0..4].copy_from_slice(&self.width.to_be_bytes());
        data[4..8].copy_from_slice(&self.height.to_be_bytes());
        data[8] = self.bit_depth;
        data[9] = self.color_type;
        data[10] = self.compression_method;
        data[11] = self.filter_method;
        data[12] = self.interlace_method;
        data
    }

    /// Copy of this header with a different width.
    pub fn with_width(&self, width: u32) -> ImageHeader {
        ImageHeader { width, ..*self }
    }

    /// Bytes per pixel. Only 8-bit truecolor is supported.
    pub fn pixel_size(&self) -> ImergeResult<usize> {
        match (ColorType::from_u8(self.color_type), self.bit_depth) {
            (Some(ColorType::RGB), 8) => Ok(3),
            (color_type, bit_depth) => Err(ImergeError::UnsupportedFormat(format!(
                "Only 8-bit RGB is supported, found color type {} ({:?}) with bit depth {}",
                self.color_type, color_type, bit_depth
            ))),
        }
    }

    /// Size of one scanline in the inflated buffer, filter byte included.
    pub fn row_size(&self) -> ImergeResult<usize> {
        let pixel_size = self.pixel_size()?;

        (self.width as usize)
            .checked_mul(pixel_size)
            .and_then(|n| n.checked_add(1))
            .ok_or_else(|| ImergeError::UnsupportedFormat(format!("Image width {} is too large", self.width)))
    }

    /// Fails unless the header describes the subset this crate can read.
    pub fn validate_supported(&self) -> ImergeResult<()> {
        if self.compression_method != 0 {
            return Err(ImergeError::UnsupportedFormat(format!(
                "Unknown compression method: {}",
                self.compression_method
            )));
        }

        if self.filter_method != 0 {
            return Err(ImergeError::UnsupportedFormat(format!(
                "Unknown filter method: {}",
                self.filter_method
            )));
        }

        if self.interlace_method != 0 {
            return Err(ImergeError::UnsupportedFormat(format!(
                "Interlaced images are not supported (interlace method {})",
                self.interlace_method
            )));
        }

        self.pixel_size()?;

        Ok(())
    }
}
