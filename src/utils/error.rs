use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::io;

#[derive(Debug)]
pub enum ImergeError {
    IoError(io::Error),
    InvalidFormat(String),
    UnsupportedFormat(String),
    DecodeError(String),
    PreconditionFailed(String),
}

/// Failure class of an [`ImergeError`], without the attached context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    InvalidFormat,
    UnsupportedFormat,
    Decode,
    Precondition,
}

impl ImergeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImergeError::IoError(_) => ErrorKind::Io,
            ImergeError::InvalidFormat(_) => ErrorKind::InvalidFormat,
            ImergeError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            ImergeError::DecodeError(_) => ErrorKind::Decode,
            ImergeError::PreconditionFailed(_) => ErrorKind::Precondition,
        }
    }
}

impl Error for ImergeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ImergeError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl Display for ImergeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ImergeError::IoError(err) => write!(f, "I/O error: {}", err),
            ImergeError::InvalidFormat(msg) => write!(f, "Invalid file format: {}", msg),
            ImergeError::UnsupportedFormat(msg) => write!(f, "Unsupported image format: {}", msg),
            ImergeError::DecodeError(msg) => write!(f, "Decode error: {}", msg),
            ImergeError::PreconditionFailed(msg) => write!(f, "Precondition failed: {}", msg),
        }
    }
}

impl From<io::Error> for ImergeError {
    fn from(error: io::Error) -> Self {
        ImergeError::IoError(error)
    }
}

// Result type alias for imerge operations
pub type ImergeResult<T> = Result<T, ImergeError>;
