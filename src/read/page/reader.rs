use std::io::Read;

use parquet_format_safe::thrift::protocol::TCompactInputProtocol;

use crate::compression::Compression;
use crate::error::{Error, Result};
use crate::metadata::{ColumnChunkMetaData, Descriptor};

use crate::page::{
    CompressedDataPage, CompressedDictPage, CompressedPage, DataPageHeader, PageType,
    ParquetPageHeader,
};

/// This meta is a small part of [`ColumnChunkMetaData`].
#[derive(Debug, Clone, PartialEq)]
pub struct PageMetaData {
    /// The start offset of this column chunk in file.
    pub column_start: u64,
    /// The number of values in this column chunk.
    pub num_values: i64,
    /// Compression type
    pub compression: Compression,
    /// The descriptor of this parquet column
    pub descriptor: Descriptor,
}

impl PageMetaData {
    /// Returns a new [`PageMetaData`].
    pub fn new(
        column_start: u64,
        num_values: i64,
        compression: Compression,
        descriptor: Descriptor,
    ) -> Self {
        Self {
            column_start,
            num_values,
            compression,
            descriptor,
        }
    }
}

impl From<&ColumnChunkMetaData> for PageMetaData {
    fn from(column: &ColumnChunkMetaData) -> Self {
        Self {
            column_start: column.byte_range().0,
            num_values: column.num_values(),
            compression: column.compression(),
            descriptor: column.descriptor().descriptor.clone(),
        }
    }
}

/// A fallible [`Iterator`] of [`CompressedPage`]. This iterator reads pages back
/// to back until all pages have been consumed.
///
/// The pages are yielded in the order they appear in the chunk: an optional
/// dictionary page first, then every data page. Index pages are skipped.
pub struct PageReader<R: Read> {
    // The source
    reader: R,

    compression: Compression,

    // The number of values we have seen so far.
    seen_num_values: i64,

    // The number of total values in this column chunk.
    total_num_values: i64,

    descriptor: Descriptor,

    // The maximum number of bytes a page header is allowed to declare
    max_page_size: usize,

    // Whether the CRC stored in page headers is validated against the body
    verify_crc: bool,

    // The currently allocated buffer, re-used across pages
    pub(crate) scratch: Vec<u8>,
}

impl<R: Read> PageReader<R> {
    /// Returns a new [`PageReader`].
    ///
    /// It assumes that the reader has been `seeked` to the beginning of `column`.
    /// The parameter `max_page_size` is the maximum allowed page size
    pub fn new(
        reader: R,
        column: &ColumnChunkMetaData,
        scratch: Vec<u8>,
        max_page_size: usize,
        verify_crc: bool,
    ) -> Self {
        Self::new_with_page_meta(reader, column.into(), scratch, max_page_size, verify_crc)
    }

    /// Create a a new [`PageReader`] with [`PageMetaData`].
    ///
    /// It assumes that the reader has been `seeked` to the beginning of `column`.
    pub fn new_with_page_meta(
        reader: R,
        reader_meta: PageMetaData,
        scratch: Vec<u8>,
        max_page_size: usize,
        verify_crc: bool,
    ) -> Self {
        Self {
            reader,
            total_num_values: reader_meta.num_values,
            compression: reader_meta.compression,
            seen_num_values: 0,
            descriptor: reader_meta.descriptor,
            max_page_size,
            verify_crc,
            scratch,
        }
    }

    /// Returns the reader and this Readers' interval buffer
    pub fn into_inner(self) -> (R, Vec<u8>) {
        (self.reader, self.scratch)
    }

    /// Swaps the internal buffer with an external one, to re-use allocations
    pub fn swap_buffer(&mut self, scratch: &mut Vec<u8>) {
        std::mem::swap(&mut self.scratch, scratch)
    }
}

impl<R: Read> Iterator for PageReader<R> {
    type Item = Result<CompressedPage>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buffer = std::mem::take(&mut self.scratch);
        let maybe_maybe_page = next_page(self, &mut buffer).transpose();
        if maybe_maybe_page.is_none() {
            // no page => we take back the buffer
            self.scratch = std::mem::take(&mut buffer);
        }
        maybe_maybe_page
    }
}

/// Reads Page header from Thrift.
pub(crate) fn read_page_header<R: Read>(
    reader: &mut R,
    max_size: usize,
) -> Result<ParquetPageHeader> {
    let mut prot = TCompactInputProtocol::new(reader, max_size);
    let page_header = ParquetPageHeader::read_from_in_protocol(&mut prot)?;
    Ok(page_header)
}

/// This function is lightweight and executes a minimal amount of work so that it is IO bounded.
// Any un-necessary CPU-intensive tasks SHOULD be executed on individual pages.
fn next_page<R: Read>(
    reader: &mut PageReader<R>,
    buffer: &mut Vec<u8>,
) -> Result<Option<CompressedPage>> {
    while reader.seen_num_values < reader.total_num_values {
        if let Some(page) = build_page(reader, buffer)? {
            return Ok(Some(page));
        }
        // index pages are not decodable values; keep scanning
    }
    Ok(None)
}

pub(super) fn build_page<R: Read>(
    reader: &mut PageReader<R>,
    buffer: &mut Vec<u8>,
) -> Result<Option<CompressedPage>> {
    let page_header = read_page_header(&mut reader.reader, reader.max_page_size)?;

    reader.seen_num_values += get_page_header(&page_header)?
        .map(|x| x.num_values() as i64)
        .unwrap_or_default();

    let read_size: usize = page_header
        .compressed_page_size
        .try_into()
        .map_err(|_| Error::oos("The compressed page size cannot be negative"))?;

    if read_size > reader.max_page_size {
        return Err(Error::WouldOverAllocate);
    }

    buffer.clear();
    buffer
        .try_reserve(read_size)
        .map_err(|_| Error::WouldOverAllocate)?;
    let bytes_read = reader
        .reader
        .by_ref()
        .take(read_size as u64)
        .read_to_end(buffer)?;

    if bytes_read != read_size {
        return Err(Error::oos(
            "The page body ends before the declared compressed size",
        ));
    }

    if reader.verify_crc {
        if let Some(expected) = page_header.crc {
            let expected = expected as u32;
            let got = crc32fast::hash(buffer);
            if expected != got {
                return Err(Error::ChecksumMismatch { expected, got });
            }
        }
    }

    finish_page(
        page_header,
        buffer,
        reader.compression,
        &reader.descriptor,
    )
}

pub(super) fn finish_page(
    page_header: ParquetPageHeader,
    data: &mut Vec<u8>,
    compression: Compression,
    descriptor: &Descriptor,
) -> Result<Option<CompressedPage>> {
    let type_ = page_header.type_.try_into()?;
    let uncompressed_page_size: usize = page_header
        .uncompressed_page_size
        .try_into()
        .map_err(|_| Error::oos("The uncompressed page size cannot be negative"))?;
    match type_ {
        PageType::DictionaryPage => {
            let dict_header = page_header
                .dictionary_page_header
                .as_ref()
                .ok_or_else(|| {
                    Error::oos("The page header type is a dictionary page but the dictionary header is empty")
                })?;
            let num_values: usize = dict_header
                .num_values
                .try_into()
                .map_err(|_| Error::oos("The number of values cannot be negative"))?;
            let is_sorted = dict_header.is_sorted.unwrap_or(false);

            // move the buffer to `dict_page`
            let page = CompressedDictPage::new(
                std::mem::take(data),
                compression,
                uncompressed_page_size,
                num_values,
                is_sorted,
            );

            Ok(Some(CompressedPage::Dict(page)))
        }
        PageType::DataPage => {
            let header = page_header
                .data_page_header
                .ok_or_else(|| {
                    Error::oos("The page header type is a v1 data page but the v1 header is empty")
                })?;

            Ok(Some(CompressedPage::Data(CompressedDataPage::new(
                DataPageHeader::V1(header),
                std::mem::take(data),
                compression,
                uncompressed_page_size,
                descriptor.clone(),
            ))))
        }
        PageType::DataPageV2 => {
            let header = page_header
                .data_page_header_v2
                .ok_or_else(|| {
                    Error::oos("The page header type is a v2 data page but the v2 header is empty")
                })?;

            Ok(Some(CompressedPage::Data(CompressedDataPage::new(
                DataPageHeader::V2(header),
                std::mem::take(data),
                compression,
                uncompressed_page_size,
                descriptor.clone(),
            ))))
        }
        PageType::IndexPage => {
            // nothing decodable in the stream; the caller advances past it
            data.clear();
            Ok(None)
        }
    }
}

pub(crate) fn get_page_header(header: &ParquetPageHeader) -> Result<Option<DataPageHeader>> {
    let type_ = header.type_.try_into()?;
    Ok(match type_ {
        PageType::DataPage => {
            let header = header
                .data_page_header
                .clone()
                .ok_or_else(|| Error::oos("The v1 data page header is empty"))?;
            Some(DataPageHeader::V1(header))
        }
        PageType::DataPageV2 => {
            let header = header
                .data_page_header_v2
                .clone()
                .ok_or_else(|| Error::oos("The v2 data page header is empty"))?;
            Some(DataPageHeader::V2(header))
        }
        _ => None,
    })
}
