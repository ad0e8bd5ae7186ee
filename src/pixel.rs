#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }
}

/// One row of RGB pixels, always an owned copy of the decoded data.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PixelRow {
    pixels: Vec<Rgb>,
}

impl PixelRow {
    pub fn new() -> Self {
        PixelRow { pixels: Vec::new() }
    }

    pub fn with_capacity(width: usize) -> Self {
        PixelRow {
            pixels: Vec::with_capacity(width),
        }
    }

    /// Builds a row from packed RGB bytes. Trailing bytes that do not form a
    /// full pixel are ignored.
    pub fn from_rgb_bytes(bytes: &[u8]) -> Self {
        PixelRow {
            pixels: bytes
                .chunks_exact(3)
                .map(|p| Rgb::new(p[0], p[1], p[2]))
                .collect(),
        }
    }

    pub fn width(&self) -> usize {
        self.pixels.len()
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    pub fn push(&mut self, pixel: Rgb) {
        self.pixels.push(pixel);
    }

    /// Appends the pixels of `other` to the right of this row.
    pub fn append(&mut self, other: &PixelRow) {
        self.pixels.extend_from_slice(&other.pixels);
    }

    /// Concatenates rows left to right.
    pub fn concat<'a, I>(rows: I) -> PixelRow
    where
        I: IntoIterator<Item = &'a PixelRow>,
    {
        let mut merged = PixelRow::new();
        for row in rows {
            merged.append(row);
        }
        merged
    }

    /// Writes the row as packed RGB bytes.
    pub fn write_rgb(&self, out: &mut Vec<u8>) {
        out.reserve(self.pixels.len() * 3);
        for p in &self.pixels {
            out.extend_from_slice(&[p.r, p.g, p.b]);
        }
    }
}

impl FromIterator<Rgb> for PixelRow {
    fn from_iter<I: IntoIterator<Item = Rgb>>(iter: I) -> Self {
        PixelRow {
            pixels: iter.into_iter().collect(),
        }
    }
}
