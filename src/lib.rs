pub mod utils;
pub mod batch;
pub mod merge;
pub mod pixel;
pub mod png;

pub use batch::{find_inputs, plan_batches, run_batches, Batch, BatchReport};
pub use merge::{merge, merge_files, merge_rows, merge_streams, merge_with, MergeOptions, MergeSummary};
pub use pixel::{PixelRow, Rgb};
pub use png::header::ImageHeader;
pub use png::image::{ChecksumPolicy, Image, LoadOptions};
pub use png::{encode_rows, EncodeSummary, IDAT_CHUNK_SIZE};
pub use utils::checksum::{adler32, crc32};
pub use utils::error::{ErrorKind, ImergeError, ImergeResult};
pub use utils::logger::{LogLevel, Logger};
