use crate::encoding::ceil8;
use crate::error::{Error, Result};
use crate::schema::types::PhysicalType;
use crate::types::NativeType;

use super::{ColumnReader, FileReader, SharedBytes};

/// Options of a [`BatchReader`].
///
/// The projection may be given by column indices or by column names; when
/// both are supplied, the indices win.
#[derive(Debug, Clone)]
pub struct BatchReaderOptions {
    /// Maximum number of rows per batch.
    pub batch_size: usize,
    pub column_indices: Option<Vec<usize>>,
    pub column_names: Option<Vec<String>>,
    /// Fan-out degree of the page prefetch; `0` inherits the file reader's
    /// `worker_count`, `1` disables parallelism.
    pub worker_count: usize,
}

impl Default for BatchReaderOptions {
    fn default() -> Self {
        Self {
            batch_size: 64 * 1024,
            column_indices: None,
            column_names: None,
            worker_count: 0,
        }
    }
}

/// The values of one column of a [`Batch`]: an owned buffer in the canonical
/// layout, or a borrow of the file's mapped bytes.
enum BatchValues {
    Owned(Vec<u8>),
    Shared {
        data: SharedBytes,
        offset: usize,
        length: usize,
    },
}

/// One column of a [`Batch`].
pub struct BatchColumn {
    name: String,
    physical_type: PhysicalType,
    values: BatchValues,
    // bit i set <=> value i is not null
    null_bitmap: Vec<u8>,
    num_values: usize,
    null_count: usize,
}

impl BatchColumn {
    /// The column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn physical_type(&self) -> PhysicalType {
        self.physical_type
    }

    /// The values in their canonical layout: little-endian fixed stride for
    /// fixed-size types, one byte per boolean, `u32` length-prefixed bytes
    /// for BYTE_ARRAY. Only non-null values are present.
    pub fn values(&self) -> &[u8] {
        match &self.values {
            BatchValues::Owned(data) => data,
            BatchValues::Shared {
                data,
                offset,
                length,
            } => &data.as_ref().as_ref()[*offset..*offset + *length],
        }
    }

    /// The null bitmap: bit `i` is set iff value `i` is present.
    pub fn null_bitmap(&self) -> &[u8] {
        &self.null_bitmap
    }

    /// The number of slots (rows) in this column, including nulls.
    pub fn num_values(&self) -> usize {
        self.num_values
    }

    pub fn null_count(&self) -> usize {
        self.null_count
    }

    /// Whether the values borrow the file's bytes instead of owning a copy.
    pub fn is_zero_copy(&self) -> bool {
        matches!(self.values, BatchValues::Shared { .. })
    }

    /// Whether value `i` is not null.
    pub fn is_valid(&self, i: usize) -> bool {
        self.null_bitmap[i / 8] & (1 << (i % 8)) != 0
    }

    /// Decodes the non-null values into a typed vector.
    pub fn native_values<T: NativeType>(&self) -> Result<Vec<T>> {
        if T::TYPE != self.physical_type {
            return Err(Error::InvalidParameter(format!(
                "cannot read a {:?} column as {:?}",
                self.physical_type,
                T::TYPE
            )));
        }
        Ok(self
            .values()
            .chunks_exact(std::mem::size_of::<T>())
            .map(crate::types::decode::<T>)
            .collect())
    }

    /// Decodes the non-null byte-array values.
    pub fn binary_values(&self) -> Result<Vec<&[u8]>> {
        if self.physical_type != PhysicalType::ByteArray {
            return Err(Error::InvalidParameter(format!(
                "cannot read a {:?} column as byte arrays",
                self.physical_type
            )));
        }
        let mut values = vec![];
        let mut remaining = self.values();
        while !remaining.is_empty() {
            let length = u32::from_le_bytes(remaining[..4].try_into().unwrap()) as usize;
            values.push(&remaining[4..4 + length]);
            remaining = &remaining[4 + length..];
        }
        Ok(values)
    }
}

/// A horizontal slice of up to `batch_size` rows across the projected
/// columns. Row `i` of every column belongs to the same record.
pub struct Batch {
    columns: Vec<BatchColumn>,
    num_rows: usize,
}

impl Batch {
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn columns(&self) -> &[BatchColumn] {
        &self.columns
    }

    pub fn column(&self, i: usize) -> &BatchColumn {
        &self.columns[i]
    }
}

/// Iterates the row groups of a file in order, yielding [`Batch`]es of at
/// most `batch_size` rows.
///
/// When more than one worker is configured, the per-column page loads
/// (including decompression and decoding) run on a bounded fork-join that is
/// joined before the copy-out phase; tasks share no mutable state.
pub struct BatchReader {
    reader: FileReader,
    projection: Vec<usize>,
    batch_size: usize,
    workers: usize,
    current_group: usize,
    group_entered: bool,
    rows_remaining: usize,
    columns: Vec<ColumnReader>,
}

impl BatchReader {
    /// Creates a new [`BatchReader`], resolving the projection.
    pub fn try_new(reader: FileReader, options: BatchReaderOptions) -> Result<Self> {
        if options.batch_size == 0 {
            return Err(Error::InvalidParameter(
                "the batch size must be positive".to_string(),
            ));
        }
        let num_columns = reader.column_count();
        // indices win over names when both are supplied
        let projection: Vec<usize> = if let Some(indices) = options.column_indices.clone() {
            indices
        } else if let Some(names) = &options.column_names {
            names
                .iter()
                .map(|name| {
                    reader
                        .schema()
                        .columns()
                        .iter()
                        .position(|c| c.name() == name)
                        .ok_or_else(|| Error::NotFound(format!("column \"{}\"", name)))
                })
                .collect::<Result<Vec<_>>>()?
        } else {
            (0..num_columns).collect()
        };

        for &column in &projection {
            let descriptor = reader
                .schema()
                .columns()
                .get(column)
                .ok_or_else(|| Error::NotFound(format!("column {}", column)))?;
            if descriptor.descriptor.max_rep_level > 0 {
                return Err(Error::InvalidParameter(
                    "the batch reader does not assemble repeated fields".to_string(),
                ));
            }
        }

        let workers = match options.worker_count {
            0 => reader.options().worker_count.max(1),
            n => n,
        };

        Ok(Self {
            reader,
            projection,
            batch_size: options.batch_size,
            workers,
            current_group: 0,
            group_entered: false,
            rows_remaining: 0,
            columns: vec![],
        })
    }

    /// Returns the file reader, consuming this iterator. Any zero-copy
    /// batches must be released first.
    pub fn into_inner(self) -> FileReader {
        self.reader
    }

    /// Returns the next batch, or `None` when all row groups are exhausted.
    /// An empty row group yields one empty batch.
    pub fn next_batch(&mut self) -> Result<Option<Batch>> {
        // enter the next row group when the current one is drained
        while !self.group_entered {
            if self.current_group == self.reader.row_group_count() {
                return Ok(None);
            }
            let group = self.current_group;
            self.rows_remaining = self.reader.row_group_meta(group)?.num_rows();
            self.columns = self
                .projection
                .iter()
                .map(|&column| self.reader.open_column(group, column))
                .collect::<Result<Vec<_>>>()?;
            self.group_entered = true;
        }

        let rows = std::cmp::min(self.batch_size, self.rows_remaining);

        let outputs = self.load_columns(rows)?;

        // copy-out: assemble the batch columns and their null bitmaps
        let mut columns = Vec::with_capacity(outputs.len());
        for (reader_index, output) in outputs.into_iter().enumerate() {
            let column_index = self.projection[reader_index];
            let descriptor = &self.reader.schema().columns()[column_index].descriptor;
            let max_def = descriptor.max_def_level;

            let (null_bitmap, null_count) = build_null_bitmap(rows, &output.def_levels, max_def);
            let values = match output.borrow {
                Some((data, offset, length)) => BatchValues::Shared {
                    data,
                    offset,
                    length,
                },
                None => BatchValues::Owned(output.values),
            };
            columns.push(BatchColumn {
                name: descriptor.primitive_type.field_info.name.clone(),
                physical_type: descriptor.primitive_type.physical_type,
                values,
                null_bitmap,
                num_values: rows,
                null_count,
            });
        }

        self.rows_remaining -= rows;
        if self.rows_remaining == 0 {
            self.current_group += 1;
            self.group_entered = false;
            self.columns.clear();
        }

        Ok(Some(Batch {
            columns,
            num_rows: rows,
        }))
    }

    // the prefetch phase: every projected column advances through its pages
    // (decompressing and decoding) independently
    fn load_columns(&mut self, rows: usize) -> Result<Vec<ColumnOutput>> {
        if self.workers <= 1 || self.columns.len() <= 1 {
            return self
                .columns
                .iter_mut()
                .map(|reader| load_one(reader, rows))
                .collect();
        }

        let workers = std::cmp::min(self.workers, self.columns.len());
        let per_worker = self.columns.len().div_ceil(workers);

        let mut outputs: Vec<Result<Vec<ColumnOutput>>> = vec![];
        std::thread::scope(|scope| {
            let handles = self
                .columns
                .chunks_mut(per_worker)
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk
                            .iter_mut()
                            .map(|reader| load_one(reader, rows))
                            .collect::<Result<Vec<_>>>()
                    })
                })
                .collect::<Vec<_>>();
            for handle in handles {
                outputs.push(handle.join().expect("a prefetch task panicked"));
            }
        });

        let mut flattened = Vec::with_capacity(self.columns.len());
        for output in outputs {
            flattened.extend(output?);
        }
        Ok(flattened)
    }
}

impl Iterator for BatchReader {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_batch().transpose()
    }
}

struct ColumnOutput {
    values: Vec<u8>,
    def_levels: Vec<u32>,
    borrow: Option<(SharedBytes, usize, usize)>,
}

fn load_one(reader: &mut ColumnReader, rows: usize) -> Result<ColumnOutput> {
    let mut values = vec![];
    let mut def_levels = vec![];
    let borrow = reader.read_rows_raw(rows, &mut values, &mut def_levels)?;
    Ok(ColumnOutput {
        values,
        def_levels,
        borrow,
    })
}

// bit i set <=> def_levels[i] == max_def; an empty level stream means no
// nulls
fn build_null_bitmap(rows: usize, def_levels: &[u32], max_def: i16) -> (Vec<u8>, usize) {
    let mut bitmap = vec![0u8; ceil8(rows)];
    if def_levels.is_empty() || max_def == 0 {
        for (i, byte) in bitmap.iter_mut().enumerate() {
            let bits = std::cmp::min(8, rows - i * 8);
            *byte = if bits == 8 { 0xFF } else { (1u8 << bits) - 1 };
        }
        return (bitmap, 0);
    }
    let mut null_count = 0;
    for (i, level) in def_levels.iter().enumerate() {
        if *level as i16 == max_def {
            bitmap[i / 8] |= 1 << (i % 8);
        } else {
            null_count += 1;
        }
    }
    (bitmap, null_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitmap_of_required_column() {
        let (bitmap, null_count) = build_null_bitmap(10, &[], 0);
        assert_eq!(bitmap, vec![0xFF, 0b0000_0011]);
        assert_eq!(null_count, 0);
    }

    #[test]
    fn bitmap_counts_set_bits() {
        let def_levels = vec![1, 1, 0, 1, 1];
        let (bitmap, null_count) = build_null_bitmap(5, &def_levels, 1);
        assert_eq!(bitmap, vec![0b0001_1011]);
        assert_eq!(null_count, 1);
        // exactly num_values - null_count bits are set
        let set_bits: u32 = bitmap.iter().map(|x| x.count_ones()).sum();
        assert_eq!(set_bits as usize, 5 - null_count);
    }
}
