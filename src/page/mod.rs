//! Data structures for the smallest decodable units of a parquet file: the
//! pages.
use std::sync::Arc;

pub use parquet_format_safe::{
    DataPageHeader as DataPageHeaderV1, DataPageHeaderV2, PageHeader as ParquetPageHeader,
};

pub use crate::parquet_bridge::{DataPageHeaderExt, PageType};

use crate::compression::Compression;
use crate::encoding::{get_length, Encoding};
use crate::error::{Error, Result};
use crate::metadata::Descriptor;
use crate::statistics::{deserialize_statistics, Statistics};

/// A page in its compressed form, as read from or written to the file.
#[derive(Debug)]
pub enum CompressedPage {
    Data(CompressedDataPage),
    Dict(CompressedDictPage),
}

impl CompressedPage {
    pub(crate) fn buffer(&self) -> &[u8] {
        match self {
            CompressedPage::Data(page) => &page.buffer,
            CompressedPage::Dict(page) => &page.buffer,
        }
    }

    pub(crate) fn compression(&self) -> Compression {
        match self {
            CompressedPage::Data(page) => page.compression(),
            CompressedPage::Dict(page) => page.compression(),
        }
    }

    pub(crate) fn num_values(&self) -> usize {
        match self {
            CompressedPage::Data(page) => page.num_values(),
            CompressedPage::Dict(_) => 0,
        }
    }
}

/// A [`CompressedDataPage`] is compressed, encoded representation of a Parquet data page.
/// It holds actual data and thus cloning it is expensive.
#[derive(Debug)]
pub struct CompressedDataPage {
    pub(crate) header: DataPageHeader,
    pub(crate) buffer: Vec<u8>,
    pub(crate) compression: Compression,
    pub(crate) uncompressed_page_size: usize,
    pub(crate) descriptor: Descriptor,
}

impl CompressedDataPage {
    /// Returns a new [`CompressedDataPage`].
    pub fn new(
        header: DataPageHeader,
        buffer: Vec<u8>,
        compression: Compression,
        uncompressed_page_size: usize,
        descriptor: Descriptor,
    ) -> Self {
        Self {
            header,
            buffer,
            compression,
            uncompressed_page_size,
            descriptor,
        }
    }

    pub fn header(&self) -> &DataPageHeader {
        &self.header
    }

    pub fn uncompressed_size(&self) -> usize {
        self.uncompressed_page_size
    }

    pub fn compressed_size(&self) -> usize {
        self.buffer.len()
    }

    /// The compression of the data in this page.
    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn num_values(&self) -> usize {
        self.header.num_values()
    }

    /// Decodes the raw statistics into a statistics
    pub fn statistics(&self) -> Option<Result<Arc<dyn Statistics>>> {
        match &self.header {
            DataPageHeader::V1(d) => d
                .statistics
                .as_ref()
                .map(|x| deserialize_statistics(x, self.descriptor.primitive_type.clone())),
            DataPageHeader::V2(d) => d
                .statistics
                .as_ref()
                .map(|x| deserialize_statistics(x, self.descriptor.primitive_type.clone())),
        }
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }
}

/// The header of a data page, either version 1 or 2.
#[derive(Debug, Clone)]
pub enum DataPageHeader {
    V1(DataPageHeaderV1),
    V2(DataPageHeaderV2),
}

impl DataPageHeader {
    pub fn num_values(&self) -> usize {
        match &self {
            DataPageHeader::V1(d) => d.num_values as usize,
            DataPageHeader::V2(d) => d.num_values as usize,
        }
    }
}

/// A [`DataPage`] is an uncompressed, encoded representation of a Parquet data page. It holds actual data
/// and thus cloning it is expensive.
#[derive(Debug, Clone)]
pub struct DataPage {
    pub(super) header: DataPageHeader,
    pub(super) buffer: Vec<u8>,
    pub descriptor: Descriptor,
}

impl DataPage {
    pub fn new(header: DataPageHeader, buffer: Vec<u8>, descriptor: Descriptor) -> Self {
        Self {
            header,
            buffer,
            descriptor,
        }
    }

    pub fn header(&self) -> &DataPageHeader {
        &self.header
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Returns a mutable reference to the internal buffer.
    /// Useful to recover the buffer after the page has been decoded.
    pub fn buffer_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buffer
    }

    pub fn num_values(&self) -> usize {
        self.header.num_values()
    }

    pub fn encoding(&self) -> Encoding {
        match &self.header {
            DataPageHeader::V1(d) => d.encoding(),
            DataPageHeader::V2(d) => d.encoding(),
        }
    }

    pub fn definition_level_encoding(&self) -> Encoding {
        match &self.header {
            DataPageHeader::V1(d) => d.definition_level_encoding(),
            DataPageHeader::V2(d) => d.definition_level_encoding(),
        }
    }

    pub fn repetition_level_encoding(&self) -> Encoding {
        match &self.header {
            DataPageHeader::V1(d) => d.repetition_level_encoding(),
            DataPageHeader::V2(d) => d.repetition_level_encoding(),
        }
    }

    /// Decodes the raw statistics into a statistics
    pub fn statistics(&self) -> Option<Result<Arc<dyn Statistics>>> {
        match &self.header {
            DataPageHeader::V1(d) => d
                .statistics
                .as_ref()
                .map(|x| deserialize_statistics(x, self.descriptor.primitive_type.clone())),
            DataPageHeader::V2(d) => d
                .statistics
                .as_ref()
                .map(|x| deserialize_statistics(x, self.descriptor.primitive_type.clone())),
        }
    }
}

/// Splits the page buffer into `(repetition levels, definition levels, values)`.
///
/// For V1 pages the levels are framed by `u32` little-endian length prefixes;
/// for V2 pages the byte counts come from the header.
pub fn split_buffer(page: &DataPage) -> Result<(&[u8], &[u8], &[u8])> {
    split_buffer_ref(
        page.buffer(),
        page.header(),
        page.descriptor.max_rep_level,
        page.descriptor.max_def_level,
    )
}

pub(crate) fn split_buffer_ref<'a>(
    buffer: &'a [u8],
    header: &DataPageHeader,
    max_rep_level: i16,
    max_def_level: i16,
) -> Result<(&'a [u8], &'a [u8], &'a [u8])> {
    // V1 level streams carry a u32 little-endian length prefix; V2 streams
    // are bare and sized by the header
    let (rep_levels_byte_length, def_levels_byte_length, prefix) = match header {
        DataPageHeader::V1(_) => {
            let mut remaining = buffer;
            let rep = if max_rep_level > 0 {
                let length = get_length(remaining)? as usize;
                if remaining.len() < 4 + length {
                    return Err(Error::oos(
                        "The repetition levels extend past the page body",
                    ));
                }
                remaining = &remaining[4 + length..];
                4 + length
            } else {
                0
            };
            let def = if max_def_level > 0 {
                let length = get_length(remaining)? as usize;
                if remaining.len() < 4 + length {
                    return Err(Error::oos(
                        "The definition levels extend past the page body",
                    ));
                }
                4 + length
            } else {
                0
            };
            (rep, def, 4)
        }
        DataPageHeader::V2(header) => {
            let rep: usize = header.repetition_levels_byte_length.try_into().map_err(|_| {
                Error::oos("The repetition levels byte length cannot be negative")
            })?;
            let def: usize = header.definition_levels_byte_length.try_into().map_err(|_| {
                Error::oos("The definition levels byte length cannot be negative")
            })?;
            if rep + def > buffer.len() {
                return Err(Error::oos("The levels extend past the page body"));
            }
            (rep, def, 0)
        }
    };

    let (rep, remaining) = buffer.split_at(rep_levels_byte_length);
    let (def, values) = remaining.split_at(def_levels_byte_length);

    let rep = if rep.is_empty() { rep } else { &rep[prefix..] };
    let def = if def.is_empty() { def } else { &def[prefix..] };

    Ok((rep, def, values))
}

/// An uncompressed, encoded dictionary page.
#[derive(Debug, Clone)]
pub struct DictPage {
    pub buffer: Vec<u8>,
    pub num_values: usize,
    pub is_sorted: bool,
}

impl DictPage {
    pub fn new(buffer: Vec<u8>, num_values: usize, is_sorted: bool) -> Self {
        Self {
            buffer,
            num_values,
            is_sorted,
        }
    }
}

/// A compressed, encoded dictionary page.
#[derive(Debug)]
pub struct CompressedDictPage {
    pub(crate) buffer: Vec<u8>,
    compression: Compression,
    pub(crate) num_values: usize,
    pub(crate) uncompressed_page_size: usize,
    pub is_sorted: bool,
}

impl CompressedDictPage {
    pub fn new(
        buffer: Vec<u8>,
        compression: Compression,
        uncompressed_page_size: usize,
        num_values: usize,
        is_sorted: bool,
    ) -> Self {
        Self {
            buffer,
            compression,
            uncompressed_page_size,
            num_values,
            is_sorted,
        }
    }

    /// The compression of the data in this page.
    pub fn compression(&self) -> Compression {
        self.compression
    }
}

/// A page in its uncompressed form: either a data page or a dictionary page.
#[derive(Debug)]
pub enum Page {
    Data(DataPage),
    Dict(DictPage),
}

impl Page {
    pub(crate) fn buffer_mut(&mut self) -> &mut Vec<u8> {
        match self {
            Self::Data(page) => &mut page.buffer,
            Self::Dict(page) => &mut page.buffer,
        }
    }
}

// read: CompressedPage -> Page
// write: Page -> CompressedPage
