use std::io::Write;

use crate::compression::CompressionOptions;
use crate::error::{Error, Result};
use crate::metadata::{KeyValue, SchemaDescriptor};

use super::column::{ColumnWriter, PageOptions};
use super::{
    ColumnBatch, Compressor, DynIter, DynStreamingIterator, FileWriter, Version, WriteOptions,
};

const DEFAULT_ROW_GROUP_BYTES: usize = 128 * 1024 * 1024;
const DEFAULT_PAGE_BYTES: usize = 1024 * 1024;
const DEFAULT_DICTIONARY_PAGE_BYTES: usize = 1024 * 1024;

/// Whether the writer attempts dictionary encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictionaryMode {
    /// Dictionary encoding is disabled; every page is PLAIN.
    Plain,
    /// Values accumulate into a dictionary candidate; chunks whose candidate
    /// stays within budget are dictionary-encoded.
    PlainDictionary,
}

/// Options of a [`ParquetWriter`].
#[derive(Debug, Clone)]
pub struct WriterOptions {
    /// The compression to apply to every page.
    pub compression: CompressionOptions,
    /// Soft threshold: once a row group buffers this many uncompressed
    /// bytes, it is flushed on the next batch boundary.
    pub row_group_bytes: usize,
    /// Soft threshold for cutting data pages.
    pub page_bytes: usize,
    /// Whether to attach statistics to pages and chunks.
    pub write_statistics: bool,
    /// Whether to stamp every page with the CRC32 of its compressed body.
    pub write_page_crc: bool,
    /// Whether to attempt dictionary encoding.
    pub dictionary_mode: DictionaryMode,
    /// Ceiling above which a dictionary candidate falls back to PLAIN.
    pub dictionary_page_bytes: usize,
    /// The writer identity recorded in the footer.
    pub creator: Option<String>,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            compression: CompressionOptions::Uncompressed,
            row_group_bytes: DEFAULT_ROW_GROUP_BYTES,
            page_bytes: DEFAULT_PAGE_BYTES,
            write_statistics: true,
            write_page_crc: true,
            dictionary_mode: DictionaryMode::PlainDictionary,
            dictionary_page_bytes: DEFAULT_DICTIONARY_PAGE_BYTES,
            creator: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Closed,
    Aborted,
}

/// Writes a parquet file column batch by column batch.
///
/// Batches accumulate into an open row group; when the accumulated
/// uncompressed size crosses `row_group_bytes` the group is flushed before
/// the next batch is accepted. All columns of the open row group must hold
/// the same number of rows at flush and close.
pub struct ParquetWriter<W: Write> {
    writer: FileWriter<W>,
    columns: Vec<ColumnWriter>,
    options: WriterOptions,
    state: State,
}

impl<W: Write> ParquetWriter<W> {
    /// Creates a new [`ParquetWriter`] writing to `sink`.
    pub fn try_new(sink: W, schema: SchemaDescriptor, options: WriterOptions) -> Result<Self> {
        let columns = schema
            .columns()
            .iter()
            .map(|descriptor| {
                ColumnWriter::new(
                    descriptor.clone(),
                    options.dictionary_mode == DictionaryMode::PlainDictionary,
                    options.dictionary_page_bytes,
                )
            })
            .collect();

        let created_by = options
            .creator
            .clone()
            .unwrap_or_else(|| format!("parquet-rw version {}", env!("CARGO_PKG_VERSION")));

        let file_options = WriteOptions {
            write_statistics: options.write_statistics,
            version: Version::V1,
            write_page_crc: options.write_page_crc,
        };

        Ok(Self {
            writer: FileWriter::new(sink, schema, file_options, Some(created_by)),
            columns,
            options,
            state: State::Open,
        })
    }

    /// The schema of the file being written.
    pub fn schema(&self) -> &SchemaDescriptor {
        self.writer.schema()
    }

    fn check_open(&self) -> Result<()> {
        match self.state {
            State::Open => Ok(()),
            State::Closed => Err(Error::InvalidState(
                "the writer has been closed".to_string(),
            )),
            State::Aborted => Err(Error::InvalidState(
                "the writer has been aborted".to_string(),
            )),
        }
    }

    fn buffered_bytes(&self) -> usize {
        self.columns.iter().map(|x| x.buffered_bytes()).sum()
    }

    fn rows_aligned(&self) -> bool {
        let mut rows = self.columns.iter().map(|x| x.rows());
        match rows.next() {
            None => true,
            Some(first) => rows.all(|x| x == first),
        }
    }

    /// Buffers a batch of values for column `column`.
    ///
    /// A batch that overflowed the row-group threshold completes into the
    /// current row group; the flush happens here, before the next batch is
    /// accepted.
    pub fn write_batch(
        &mut self,
        column: usize,
        values: ColumnBatch,
        def_levels: Option<&[u32]>,
        rep_levels: Option<&[u32]>,
    ) -> Result<()> {
        self.check_open()?;
        if self.buffered_bytes() > self.options.row_group_bytes && self.rows_aligned() {
            self.flush_row_group()?;
        }
        let writer = self
            .columns
            .get_mut(column)
            .ok_or_else(|| Error::NotFound(format!("column {}", column)))?;
        writer.write(values, def_levels, rep_levels)
    }

    /// Flushes the buffered row group, if it holds any rows.
    ///
    /// A flush is transactional: when it fails, the writer transitions to an
    /// aborted state and every subsequent operation errors.
    pub fn flush_row_group(&mut self) -> Result<()> {
        self.check_open()?;
        let result = self.flush_row_group_impl();
        if result.is_err() {
            self.state = State::Aborted;
        }
        result
    }

    fn flush_row_group_impl(&mut self) -> Result<()> {
        if !self.rows_aligned() {
            return Err(Error::InvalidState(
                "all columns of a row group must hold the same number of rows".to_string(),
            ));
        }
        if self.columns.iter().all(|x| x.rows() == 0) {
            return Ok(());
        }

        let page_options = PageOptions {
            data_page_bytes: self.options.page_bytes,
            write_statistics: self.options.write_statistics,
        };
        let compression = self.options.compression;

        let columns = self
            .columns
            .iter_mut()
            .map(|column| {
                let pages = column.flush_pages(&page_options)?;
                Ok(DynStreamingIterator::new(Compressor::new(
                    pages.into_iter().map(Ok),
                    compression,
                    vec![],
                )))
            })
            .collect::<Result<Vec<_>>>()?;

        self.writer
            .write(DynIter::new(columns.into_iter().map(Ok::<_, Error>)))
    }

    /// Flushes the open row group and writes the footer. Returns the total
    /// size of the file.
    pub fn close(&mut self) -> Result<u64> {
        self.check_open()?;
        let result = self.close_impl();
        self.state = if result.is_ok() {
            State::Closed
        } else {
            State::Aborted
        };
        result
    }

    fn close_impl(&mut self) -> Result<u64> {
        self.flush_row_group_impl()?;
        self.writer.end(None)
    }

    /// Like [`Self::close`], attaching custom key-value metadata to the
    /// footer.
    pub fn close_with_metadata(&mut self, key_value_metadata: Vec<KeyValue>) -> Result<u64> {
        self.check_open()?;
        let result = self
            .flush_row_group_impl()
            .and_then(|_| self.writer.end(Some(key_value_metadata)));
        self.state = if result.is_ok() {
            State::Closed
        } else {
            State::Aborted
        };
        result
    }

    /// Releases the buffers without writing a footer. The resulting file is
    /// truncated and carries no trailing magic.
    pub fn abort(self) -> W {
        self.writer.into_inner()
    }

    /// Returns the underlying sink. The file is only valid after a
    /// successful [`Self::close`].
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}
