use std::fmt::{self, Display, Formatter};
use std::io::{ErrorKind, Read, Write};
use crate::log_debug;
use crate::png::header::ImageHeader;
use crate::utils::bytereader::ByteReader;
use crate::utils::checksum::crc32_parts;
use crate::utils::error::{ImergeError, ImergeResult};

pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkType(pub [u8; 4]);

// -- Critical chunks --

/// Image header
pub const IHDR: ChunkType = ChunkType(*b"IHDR");
/// Image data
pub const IDAT: ChunkType = ChunkType(*b"IDAT");
/// Image trailer
pub const IEND: ChunkType = ChunkType(*b"IEND");

impl ChunkType {
    pub fn bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Critical chunks have bit 5 of the first byte cleared (uppercase letter).
    pub fn is_critical(&self) -> bool {
        self.0[0] & 32 == 0
    }
}

impl Display for ChunkType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// One chunk exactly as framed in the file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawChunk {
    pub chunk_type: ChunkType,
    pub data: Vec<u8>,
    /// CRC as stored in the file, not recomputed.
    pub crc: u32,
}

impl RawChunk {
    pub fn new(chunk_type: ChunkType, data: Vec<u8>) -> Self {
        let crc = chunk_crc(chunk_type, &data);
        RawChunk { chunk_type, data, crc }
    }

    pub fn length(&self) -> usize {
        self.data.len()
    }

    pub fn computed_crc(&self) -> u32 {
        chunk_crc(self.chunk_type, &self.data)
    }

    pub fn crc_matches(&self) -> bool {
        self.computed_crc() == self.crc
    }
}

/// A chunk interpreted by its type tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    Header(ImageHeader),
    Data(Vec<u8>),
    End,
    Other(RawChunk),
}

impl Chunk {
    pub fn parse(raw: RawChunk) -> ImergeResult<Chunk> {
        let chunk = match raw.chunk_type {
            IHDR => Chunk::Header(ImageHeader::parse(&raw.data)?),
            IDAT => Chunk::Data(raw.data),
            IEND => Chunk::End,
            _ => Chunk::Other(raw),
        };

        Ok(chunk)
    }

    pub fn chunk_type(&self) -> ChunkType {
        match self {
            Chunk::Header(_) => IHDR,
            Chunk::Data(_) => IDAT,
            Chunk::End => IEND,
            Chunk::Other(raw) => raw.chunk_type,
        }
    }
}

/// CRC of a chunk: covers the type tag and the payload, never the length field.
pub fn chunk_crc(chunk_type: ChunkType, payload: &[u8]) -> u32 {
    crc32_parts(&[&chunk_type.bytes()[..], payload])
}

fn truncated(err: std::io::Error, what: &str, offset: u64) -> ImergeError {
    if err.kind() == ErrorKind::UnexpectedEof {
        ImergeError::DecodeError(format!("Truncated chunk {} at offset {}", what, offset))
    } else {
        ImergeError::IoError(err)
    }
}

pub fn read_signature<R: Read>(reader: &mut ByteReader<R>) -> ImergeResult<()> {
    let mut signature = [0u8; 8];

    match reader.read_exact(&mut signature) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
            return Err(ImergeError::InvalidFormat("File is too short to be a PNG file".into()));
        }
        Err(e) => return Err(e.into()),
    }

    if signature != PNG_SIGNATURE {
        return Err(ImergeError::InvalidFormat("File is not a PNG file".into()));
    }

    Ok(())
}

/// Reads the next chunk, or `None` once the stream is exhausted on a chunk boundary.
pub fn read_chunk<R: Read>(reader: &mut ByteReader<R>) -> ImergeResult<Option<RawChunk>> {
    let offset = reader.position();

    let length = match reader.try_read_u32() {
        Ok(Some(length)) => length,
        Ok(None) => return Ok(None),
        Err(e) => return Err(truncated(e, "length", offset)),
    };

    let mut type_bytes = [0u8; 4];
    reader
        .read_exact(&mut type_bytes)
        .map_err(|e| truncated(e, "type", offset))?;
    let chunk_type = ChunkType(type_bytes);

    let data = reader
        .read_bytes(length as usize)
        .map_err(|e| truncated(e, "payload", offset))?;

    let crc = reader.read_u32().map_err(|e| truncated(e, "CRC", offset))?;

    log_debug!("Read chunk {} ({} bytes) at offset {}", chunk_type, length, offset);

    Ok(Some(RawChunk { chunk_type, data, crc }))
}

/// Verifies the file signature, then reads every chunk until the stream ends.
/// Chunk CRCs are returned as stored; checking them is up to the caller.
pub fn read_all<R: Read>(reader: R) -> ImergeResult<Vec<RawChunk>> {
    let mut reader = ByteReader::new(reader);
    read_signature(&mut reader)?;

    let mut chunks = Vec::new();
    while let Some(chunk) = read_chunk(&mut reader)? {
        chunks.push(chunk);
    }

    Ok(chunks)
}

pub fn write_signature<W: Write>(writer: &mut W) -> ImergeResult<()> {
    writer.write_all(&PNG_SIGNATURE)?;
    Ok(())
}

/// Writes one chunk: big-endian length, type, payload, then the CRC of type and payload.
pub fn write_chunk<W: Write>(writer: &mut W, chunk_type: ChunkType, payload: &[u8]) -> ImergeResult<()> {
    let length = u32::try_from(payload.len()).map_err(|_| {
        ImergeError::PreconditionFailed(format!(
            "Chunk {} payload of {} bytes does not fit a 32-bit length",
            chunk_type,
            payload.len()
        ))
    })?;

    writer.write_all(&length.to_be_bytes())?;
    writer.write_all(chunk_type.bytes())?;
    writer.write_all(payload)?;
    writer.write_all(&chunk_crc(chunk_type, payload).to_be_bytes())?;

    Ok(())
}
