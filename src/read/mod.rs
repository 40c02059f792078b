mod batch;
mod column;
mod compression;
mod file;
pub mod levels;
mod metadata;
mod page;

use std::io::Read;
use std::sync::Arc;

pub use batch::{Batch, BatchColumn, BatchReader, BatchReaderOptions};
pub use column::{ColumnReader, Dictionary};
pub use compression::{decompress, BasicDecompressor, Decompressor};
pub use file::{FileReader, PredicateOp, ReadOptions};
pub use metadata::{deserialize_metadata, read_metadata};
pub use page::{PageMetaData, PageReader};

use crate::error::Result;
use crate::metadata::{ColumnChunkMetaData, FileMetaData, RowGroupMetaData};

/// Byte storage shared between a file source (e.g. a memory map) and the
/// readers borrowing from it.
pub type SharedBytes = Arc<dyn AsRef<[u8]> + Send + Sync>;

/// The bytes of one column chunk, either owned or borrowed from a shared
/// source. Borrowed chunks enable zero-copy page views.
#[derive(Clone)]
pub enum ChunkData {
    Owned(Vec<u8>),
    Shared {
        data: SharedBytes,
        offset: usize,
        length: usize,
    },
}

impl std::fmt::Debug for ChunkData {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ChunkData::Owned(data) => f.debug_tuple("Owned").field(&data.len()).finish(),
            ChunkData::Shared { offset, length, .. } => f
                .debug_struct("Shared")
                .field("offset", offset)
                .field("length", length)
                .finish(),
        }
    }
}

impl ChunkData {
    pub fn as_slice(&self) -> &[u8] {
        match self {
            ChunkData::Owned(data) => data,
            ChunkData::Shared {
                data,
                offset,
                length,
            } => &data.as_ref().as_ref()[*offset..*offset + *length],
        }
    }

    /// Whether these bytes are backed by a shared source, enabling borrows
    /// that outlive this chunk.
    pub fn is_shared(&self) -> bool {
        matches!(self, ChunkData::Shared { .. })
    }

    pub(crate) fn share(&self, range_start: usize, range_len: usize) -> Option<(SharedBytes, usize, usize)> {
        match self {
            ChunkData::Owned(_) => None,
            ChunkData::Shared { data, offset, .. } => {
                Some((data.clone(), offset + range_start, range_len))
            }
        }
    }
}

/// Returns a new [`PageReader`] over the pages of `column_chunk`.
pub fn get_page_iterator(
    column_chunk: &ColumnChunkMetaData,
    chunk: ChunkData,
    scratch: Vec<u8>,
    max_page_size: usize,
    verify_crc: bool,
) -> PageReader<std::io::Cursor<ChunkCursor>> {
    PageReader::new(
        std::io::Cursor::new(ChunkCursor { chunk }),
        column_chunk,
        scratch,
        max_page_size,
        verify_crc,
    )
}

/// An owner of chunk bytes that can back a [`std::io::Cursor`].
pub struct ChunkCursor {
    chunk: ChunkData,
}

impl AsRef<[u8]> for ChunkCursor {
    fn as_ref(&self) -> &[u8] {
        self.chunk.as_slice()
    }
}

/// Filters row group metadata to only those row groups,
/// for which the predicate function returns true
pub fn filter_row_groups(
    metadata: &FileMetaData,
    predicate: &dyn Fn(&RowGroupMetaData, usize) -> bool,
) -> FileMetaData {
    let mut filtered_row_groups = Vec::<RowGroupMetaData>::new();
    for (i, row_group_metadata) in metadata.row_groups.iter().enumerate() {
        if predicate(row_group_metadata, i) {
            filtered_row_groups.push(row_group_metadata.clone());
        }
    }
    let mut metadata = metadata.clone();
    metadata.row_groups = filtered_row_groups;
    metadata.num_rows = metadata.row_groups.iter().map(|x| x.num_rows()).sum();
    metadata
}

pub(crate) fn read_chunk<R: std::io::Read + std::io::Seek>(
    reader: &mut R,
    column_chunk: &ColumnChunkMetaData,
) -> Result<ChunkData> {
    let (start, length) = column_chunk.byte_range();
    reader.seek(std::io::SeekFrom::Start(start))?;
    let mut data = Vec::new();
    data.try_reserve(length as usize)
        .map_err(|_| crate::error::Error::WouldOverAllocate)?;
    reader.by_ref().take(length).read_to_end(&mut data)?;
    if data.len() != length as usize {
        return Err(crate::error::Error::Transport(
            "The file ends before the declared end of the column chunk".to_string(),
        ));
    }
    Ok(ChunkData::Owned(data))
}
