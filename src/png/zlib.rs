use std::io::{Read, Write};
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use crate::log_debug;
use crate::utils::checksum::adler32;
use crate::utils::error::{ImergeError, ImergeResult};

/// Stream header written in front of every deflate stream we produce.
/// CMF 0x78 (deflate, 32K window), FLG 0x5E (no dictionary, check bits valid).
pub const ZLIB_HEADER: [u8; 2] = [0x78, 0x5e];

const ZLIB_HEADER_LEN: usize = 2;
const ADLER_TRAILER_LEN: usize = 4;

/// Result of inflating a zlib-framed stream.
#[derive(Debug)]
pub struct Inflated {
    pub data: Vec<u8>,
    /// Adler-32 stored in the stream trailer.
    pub stored_adler: u32,
}

impl Inflated {
    pub fn adler_matches(&self) -> bool {
        adler32(&self.data) == self.stored_adler
    }
}

/// Strips the 2-byte stream header and 4-byte Adler-32 trailer from `stream`
/// and inflates what is left.
pub fn inflate(stream: &[u8]) -> ImergeResult<Inflated> {
    if stream.len() < ZLIB_HEADER_LEN + ADLER_TRAILER_LEN {
        return Err(ImergeError::DecodeError(format!(
            "Compressed stream too short: {} bytes",
            stream.len()
        )));
    }

    let body_end = stream.len() - ADLER_TRAILER_LEN;
    let body = &stream[ZLIB_HEADER_LEN..body_end];

    let mut trailer = [0u8; ADLER_TRAILER_LEN];
    trailer.copy_from_slice(&stream[body_end..]);
    let stored_adler = u32::from_be_bytes(trailer);

    let mut decoder = DeflateDecoder::new(body);
    let mut data = Vec::new();
    decoder
        .read_to_end(&mut data)
        .map_err(|e| ImergeError::DecodeError(format!("Invalid deflate stream: {}", e)))?;

    log_debug!("Inflated {} bytes into {} bytes", stream.len(), data.len());

    Ok(Inflated { data, stored_adler })
}

/// Deflates `raw` and frames it with [`ZLIB_HEADER`] and a big-endian
/// Adler-32 of `raw`.
pub fn deflate(raw: &[u8], level: Compression) -> ImergeResult<Vec<u8>> {
    let mut stream = Vec::with_capacity(raw.len() / 2 + ZLIB_HEADER_LEN + ADLER_TRAILER_LEN);
    stream.extend_from_slice(&ZLIB_HEADER);

    let mut encoder = DeflateEncoder::new(stream, level);
    encoder.write_all(raw)?;
    let mut stream = encoder.finish()?;

    stream.extend_from_slice(&adler32(raw).to_be_bytes());

    log_debug!("Deflated {} bytes into {} bytes", raw.len(), stream.len());

    Ok(stream)
}
