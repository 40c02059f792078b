mod column;
mod column_chunk;
mod compression;
mod dyn_iter;
mod file;
mod page;
mod row_group;
mod statistics;
mod writer;

pub use column::ColumnBatch;
pub use compression::{compress, Compressor};
pub use dyn_iter::{DynIter, DynStreamingIterator};
pub use file::FileWriter;
pub use row_group::write_row_group;
pub use writer::{DictionaryMode, ParquetWriter, WriterOptions};

use crate::page::CompressedPage;

/// The iterator of column chunks of a row group: one streaming iterator of
/// compressed pages per column, in the schema's leaf order.
pub type RowGroupIter<'a, E> =
    DynIter<'a, std::result::Result<DynStreamingIterator<'a, CompressedPage, E>, E>>;

/// The file version to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Version {
    V1,
    V2,
}

impl From<Version> for i32 {
    fn from(version: Version) -> Self {
        match version {
            Version::V1 => 1,
            Version::V2 => 2,
        }
    }
}

/// Options of the low-level [`FileWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Whether to attach statistics to data pages and column chunks.
    pub write_statistics: bool,
    /// The page and file version to use.
    pub version: Version,
    /// Whether to stamp every page header with the CRC32 of its body.
    pub write_page_crc: bool,
}
