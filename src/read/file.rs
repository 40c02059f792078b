use std::io::{Read, Seek};
use std::path::Path;
use std::sync::Arc;

use super::{read_chunk, read_metadata, ChunkData, ColumnReader, SharedBytes};
use crate::error::{Error, Result};
use crate::metadata::{FileMetaData, RowGroupMetaData, SchemaDescriptor, SortOrder};
use crate::schema::types::PhysicalType;
use crate::statistics::{BinaryStatistics, FixedLenStatistics, PrimitiveStatistics, Statistics};
use crate::types::NativeType;
use crate::DEFAULT_MAX_HEADER_BYTES;

/// Options of a [`FileReader`].
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Map the file into memory instead of streaming it, enabling zero-copy
    /// page views where eligible.
    pub use_memory_map: bool,
    /// Validate the CRC stored in page headers against the page bodies.
    pub verify_page_crc: bool,
    /// How many trailing bytes to pre-read when locating the footer.
    pub read_buffer_bytes: Option<u64>,
    /// Fan-out degree of the batch reader's page prefetch.
    pub worker_count: usize,
    /// Upper bound, in bytes, for a single page (header plus body).
    pub max_page_size: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            use_memory_map: false,
            verify_page_crc: false,
            read_buffer_bytes: None,
            worker_count: 1,
            max_page_size: DEFAULT_MAX_HEADER_BYTES,
        }
    }
}

/// The comparison operators of [`FileReader::filter_row_groups`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

pub(crate) trait ReadSeek: Read + Seek + Send {}
impl<T: Read + Seek + Send> ReadSeek for T {}

enum Source {
    Stream(Box<dyn ReadSeek>),
    Bytes(SharedBytes),
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Source::Stream(_) => f.write_str("Stream"),
            Source::Bytes(_) => f.write_str("Bytes"),
        }
    }
}

/// Reads a parquet file from a path, a caller-owned handle or an in-memory
/// buffer. The footer is parsed eagerly; column chunks are read on demand.
#[derive(Debug)]
pub struct FileReader {
    source: Source,
    metadata: FileMetaData,
    options: ReadOptions,
}

impl FileReader {
    /// Opens a file at `path`. With `use_memory_map` the file bytes are
    /// mapped and column readers borrow from the map.
    pub fn try_from_path<P: AsRef<Path>>(path: P, options: ReadOptions) -> Result<Self> {
        let mut file = std::fs::File::open(path)?;
        #[cfg(feature = "mmap")]
        if options.use_memory_map {
            let map = mmap(&file)?;
            return Self::from_shared_bytes(Arc::new(map), options);
        }
        let metadata = read_metadata(&mut file, options.read_buffer_bytes)?;
        Ok(Self {
            source: Source::Stream(Box::new(file)),
            metadata,
            options,
        })
    }

    /// Opens a file behind a caller-owned seekable handle.
    pub fn try_new<R: Read + Seek + Send + 'static>(
        mut reader: R,
        options: ReadOptions,
    ) -> Result<Self> {
        let metadata = read_metadata(&mut reader, options.read_buffer_bytes)?;
        Ok(Self {
            source: Source::Stream(Box::new(reader)),
            metadata,
            options,
        })
    }

    /// Opens a file held in memory.
    pub fn try_from_bytes(data: Vec<u8>, options: ReadOptions) -> Result<Self> {
        Self::from_shared_bytes(Arc::new(data), options)
    }

    fn from_shared_bytes(data: SharedBytes, options: ReadOptions) -> Result<Self> {
        let metadata = {
            let slice: &[u8] = data.as_ref().as_ref();
            read_metadata(&mut std::io::Cursor::new(slice), options.read_buffer_bytes)?
        };
        Ok(Self {
            source: Source::Bytes(data),
            metadata,
            options,
        })
    }

    /// The file's parsed metadata.
    pub fn metadata(&self) -> &FileMetaData {
        &self.metadata
    }

    /// The options this reader was opened with.
    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    /// The file's schema.
    pub fn schema(&self) -> &SchemaDescriptor {
        &self.metadata.schema_descr
    }

    /// Total number of rows in the file.
    pub fn row_count(&self) -> usize {
        self.metadata.num_rows
    }

    /// Number of (leaf) columns in the file.
    pub fn column_count(&self) -> usize {
        self.metadata.schema_descr.columns().len()
    }

    /// Number of row groups in the file.
    pub fn row_group_count(&self) -> usize {
        self.metadata.row_groups.len()
    }

    /// The metadata of row group `i`.
    pub fn row_group_meta(&self, i: usize) -> Result<&RowGroupMetaData> {
        self.metadata
            .row_groups
            .get(i)
            .ok_or_else(|| Error::NotFound(format!("row group {}", i)))
    }

    /// The statistics of the chunk of column `column` in row group
    /// `row_group`, when present.
    pub fn column_statistics(
        &self,
        row_group: usize,
        column: usize,
    ) -> Result<Option<Arc<dyn Statistics>>> {
        let row_group = self.row_group_meta(row_group)?;
        let chunk = row_group
            .columns()
            .get(column)
            .ok_or_else(|| Error::NotFound(format!("column {}", column)))?;
        chunk.statistics().transpose()
    }

    /// Returns a [`ColumnReader`] over the chunk of column `column` in row
    /// group `row_group`.
    pub fn open_column(&mut self, row_group: usize, column: usize) -> Result<ColumnReader> {
        let chunk_meta = self
            .metadata
            .row_groups
            .get(row_group)
            .ok_or_else(|| Error::NotFound(format!("row group {}", row_group)))?
            .columns()
            .get(column)
            .ok_or_else(|| Error::NotFound(format!("column {}", column)))?
            .clone();

        let (start, length) = chunk_meta.byte_range();
        let chunk = match &mut self.source {
            Source::Stream(reader) => read_chunk(reader, &chunk_meta)?,
            Source::Bytes(data) => {
                let total = data.as_ref().as_ref().len();
                let (start, length) = (start as usize, length as usize);
                if start + length > total {
                    return Err(Error::oos(
                        "The column chunk metadata points past the end of the file",
                    ));
                }
                ChunkData::Shared {
                    data: data.clone(),
                    offset: start,
                    length,
                }
            }
        };

        Ok(ColumnReader::new(
            chunk,
            &chunk_meta,
            self.options.verify_page_crc,
            self.options.max_page_size,
        ))
    }

    /// Returns the ordered indices of the row groups whose chunk statistics
    /// admit a value matching `op value` for column `column`.
    ///
    /// This is conservative: row groups without statistics are always
    /// returned, and an excluded row group is guaranteed to hold no match.
    pub fn filter_row_groups<T: NativeType + PartialOrd>(
        &self,
        column: usize,
        op: PredicateOp,
        value: T,
    ) -> Result<Vec<usize>> {
        let descriptor = self
            .metadata
            .schema_descr
            .columns()
            .get(column)
            .ok_or_else(|| Error::NotFound(format!("column {}", column)))?;
        if descriptor.descriptor.primitive_type.physical_type != T::TYPE {
            return Err(Error::InvalidParameter(format!(
                "cannot filter a {:?} column with {:?} values",
                descriptor.descriptor.primitive_type.physical_type,
                T::TYPE
            )));
        }

        let mut selected = vec![];
        for (i, _) in self.metadata.row_groups.iter().enumerate() {
            let stats = self.column_statistics(i, column)?;
            let could_match = match stats {
                None => true,
                Some(stats) => {
                    let stats = stats
                        .as_any()
                        .downcast_ref::<PrimitiveStatistics<T>>()
                        .ok_or_else(|| {
                            Error::oos("the chunk statistics do not match the column type")
                        })?;
                    match (stats.min_value, stats.max_value) {
                        (Some(min), Some(max)) => range_could_match(&min, &max, op, &value),
                        _ => true,
                    }
                }
            };
            if could_match {
                selected.push(i);
            }
        }
        Ok(selected)
    }

    /// [`Self::filter_row_groups`] for BYTE_ARRAY and FIXED_LEN_BYTE_ARRAY
    /// columns, comparing unsigned byte-lexicographically.
    pub fn filter_row_groups_binary(
        &self,
        column: usize,
        op: PredicateOp,
        value: &[u8],
    ) -> Result<Vec<usize>> {
        let descriptor = self
            .metadata
            .schema_descr
            .columns()
            .get(column)
            .ok_or_else(|| Error::NotFound(format!("column {}", column)))?;
        let physical_type = descriptor.descriptor.primitive_type.physical_type;

        let mut selected = vec![];
        for (i, _) in self.metadata.row_groups.iter().enumerate() {
            let stats = self.column_statistics(i, column)?;
            let could_match = match stats {
                None => true,
                Some(stats) => {
                    let min_max = match physical_type {
                        PhysicalType::ByteArray => {
                            let stats = stats
                                .as_any()
                                .downcast_ref::<BinaryStatistics>()
                                .ok_or_else(|| {
                                    Error::oos(
                                        "the chunk statistics do not match the column type",
                                    )
                                })?;
                            (stats.min_value.clone(), stats.max_value.clone())
                        }
                        PhysicalType::FixedLenByteArray(_) => {
                            let stats = stats
                                .as_any()
                                .downcast_ref::<FixedLenStatistics>()
                                .ok_or_else(|| {
                                    Error::oos(
                                        "the chunk statistics do not match the column type",
                                    )
                                })?;
                            (stats.min_value.clone(), stats.max_value.clone())
                        }
                        _ => {
                            return Err(Error::InvalidParameter(
                                "binary predicates require a binary column".to_string(),
                            ))
                        }
                    };
                    match min_max {
                        (Some(min), Some(max)) => {
                            range_could_match(&min.as_slice(), &max.as_slice(), op, &value)
                        }
                        _ => true,
                    }
                }
            };
            if could_match {
                selected.push(i);
            }
        }
        Ok(selected)
    }

    /// The sort order under which this column's statistics are comparable.
    pub fn column_sort_order(&self, column: usize) -> Result<SortOrder> {
        let descriptor = self
            .metadata
            .schema_descr
            .columns()
            .get(column)
            .ok_or_else(|| Error::NotFound(format!("column {}", column)))?;
        let primitive_type = &descriptor.descriptor.primitive_type;
        Ok(crate::metadata::get_sort_order(
            &primitive_type.logical_type,
            &primitive_type.converted_type,
            &primitive_type.physical_type,
        ))
    }
}

// whether any value in `[min, max]` can satisfy `x op value`
fn range_could_match<T: PartialOrd>(min: &T, max: &T, op: PredicateOp, value: &T) -> bool {
    match op {
        PredicateOp::Eq => min <= value && value <= max,
        PredicateOp::Ne => !(min == value && max == value),
        PredicateOp::Lt => min < value,
        PredicateOp::Le => min <= value,
        PredicateOp::Gt => max > value,
        PredicateOp::Ge => max >= value,
    }
}

#[cfg(feature = "mmap")]
#[allow(unsafe_code)]
fn mmap(file: &std::fs::File) -> Result<memmap2::Mmap> {
    // Safety: the map is read-only and this crate never writes through it.
    // As with any memory map, the caller must not truncate the file while
    // the reader (or a zero-copy batch borrowed from it) is alive.
    unsafe { memmap2::Mmap::map(file).map_err(|e| Error::Transport(e.to_string())) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_checks() {
        use PredicateOp::*;
        // row group with min = 10, max = 20
        assert!(range_could_match(&10, &20, Eq, &15));
        assert!(!range_could_match(&10, &20, Eq, &25));
        assert!(range_could_match(&10, &20, Ne, &15));
        assert!(!range_could_match(&10, &10, Ne, &10));
        assert!(range_could_match(&10, &20, Lt, &11));
        assert!(!range_could_match(&10, &20, Lt, &10));
        assert!(range_could_match(&10, &20, Le, &10));
        assert!(range_could_match(&10, &20, Gt, &19));
        assert!(!range_could_match(&10, &20, Gt, &20));
        assert!(range_could_match(&10, &20, Ge, &20));
        assert!(!range_could_match(&10, &20, Ge, &21));
    }
}
