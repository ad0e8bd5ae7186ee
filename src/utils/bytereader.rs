use std::io::{ErrorKind, Read};

/// Big-endian byte reader over any `Read` source.
#[derive(Debug)]
pub struct ByteReader<R: Read> {
    reader: R,
    position: u64,
}

impl<R: Read> ByteReader<R> {
    pub fn new(reader: R) -> Self {
        ByteReader { reader, position: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Reads a single big-endian 32-bit value.
    ///
    /// # Returns
    /// - The 32-bit value read
    /// - `std::io::Error` if an I/O error occurs
    pub fn read_u32(&mut self) -> Result<u32, std::io::Error> {
        let mut bytes = [0u8; 4];
        self.read_exact(&mut bytes)?;
        Ok(u32::from_be_bytes(bytes))
    }

    /// Reads a big-endian 32-bit value, or returns `None` if the stream ended
    /// exactly at this position.
    ///
    /// A stream that ends partway through the value is reported as
    /// `ErrorKind::UnexpectedEof`.
    pub fn try_read_u32(&mut self) -> Result<Option<u32>, std::io::Error> {
        let mut bytes = [0u8; 4];
        let mut filled = 0;

        while filled < bytes.len() {
            match self.reader.read(&mut bytes[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        self.position += filled as u64;

        match filled {
            0 => Ok(None),
            4 => Ok(Some(u32::from_be_bytes(bytes))),
            _ => Err(std::io::Error::new(
                ErrorKind::UnexpectedEof,
                format!("stream ended after {} of 4 bytes", filled),
            )),
        }
    }

    /// Reads exactly `buf.len()` bytes.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), std::io::Error> {
        self.reader.read_exact(buf)?;
        self.position += buf.len() as u64;
        Ok(())
    }

    /// Reads specified number of bytes and returns them as a vector.
    ///
    /// # Parameters
    /// - `n`: The number of bytes to read
    ///
    /// # Returns
    /// - A vector of exactly `n` bytes
    /// - `std::io::Error` if an I/O error occurs
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, std::io::Error> {
        // Grows with the data actually present instead of trusting `n` up front
        let mut bytes = Vec::new();
        (&mut self.reader).take(n as u64).read_to_end(&mut bytes)?;
        self.position += bytes.len() as u64;

        if bytes.len() != n {
            return Err(std::io::Error::new(
                ErrorKind::UnexpectedEof,
                format!("expected {} bytes, found {}", n, bytes.len()),
            ));
        }

        Ok(bytes)
    }
}
