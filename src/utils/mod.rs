pub mod bytereader;
pub mod checksum;
pub mod error;
pub mod logger;
pub(crate) mod traits;
