use crate::compression;
use crate::error::{Error, Result};
use crate::page::{
    CompressedDataPage, CompressedPage, DataPage, DataPageHeader, DictPage, Page,
};
use crate::FallibleStreamingIterator;

fn decompress_data(page: CompressedDataPage, buffer: &mut Vec<u8>) -> Result<DataPage> {
    let CompressedDataPage {
        header,
        buffer: compressed,
        compression,
        uncompressed_page_size,
        descriptor,
    } = page;

    if compression != compression::Compression::Uncompressed {
        match &header {
            DataPageHeader::V1(_) => {
                buffer.clear();
                buffer.resize(uncompressed_page_size, 0);
                compression::decompress(compression, &compressed, buffer)?;
            }
            DataPageHeader::V2(header_v2) => {
                // When processing a v2 page, the levels are not compressed; only
                // the values are, and only when `is_compressed` is set.
                let offset: usize = (header_v2.definition_levels_byte_length
                    + header_v2.repetition_levels_byte_length)
                    .try_into()
                    .map_err(|_| {
                        Error::oos("The levels byte length of a v2 page cannot be negative")
                    })?;
                if offset > compressed.len() || offset > uncompressed_page_size {
                    return Err(Error::oos("The levels extend past the page body"));
                }
                let can_decompress = header_v2.is_compressed.unwrap_or(true);

                if can_decompress {
                    buffer.clear();
                    buffer.resize(uncompressed_page_size, 0);
                    buffer[..offset].copy_from_slice(&compressed[..offset]);
                    compression::decompress(
                        compression,
                        &compressed[offset..],
                        &mut buffer[offset..],
                    )?;
                } else {
                    if compressed.len() != uncompressed_page_size {
                        return Err(Error::oos(
                            "An uncompressed page must declare equal compressed and uncompressed sizes",
                        ));
                    }
                    buffer.clear();
                    buffer.extend_from_slice(&compressed);
                }
            }
        }
        Ok(DataPage::new(header, std::mem::take(buffer), descriptor))
    } else {
        if compressed.len() != uncompressed_page_size {
            return Err(Error::oos(
                "An uncompressed page must declare equal compressed and uncompressed sizes",
            ));
        }
        Ok(DataPage::new(header, compressed, descriptor))
    }
}

fn decompress_dict(
    page: crate::page::CompressedDictPage,
    buffer: &mut Vec<u8>,
) -> Result<DictPage> {
    let compression = page.compression();
    let uncompressed_page_size = page.uncompressed_page_size;
    if compression != compression::Compression::Uncompressed {
        buffer.clear();
        buffer.resize(uncompressed_page_size, 0);
        compression::decompress(compression, &page.buffer, buffer)?;
        Ok(DictPage::new(
            std::mem::take(buffer),
            page.num_values,
            page.is_sorted,
        ))
    } else {
        if page.buffer.len() != uncompressed_page_size {
            return Err(Error::oos(
                "An uncompressed page must declare equal compressed and uncompressed sizes",
            ));
        }
        Ok(DictPage::new(page.buffer, page.num_values, page.is_sorted))
    }
}

/// Decompresses the page, re-using `buffer` for the uncompressed body.
pub fn decompress(compressed_page: CompressedPage, buffer: &mut Vec<u8>) -> Result<Page> {
    match compressed_page {
        CompressedPage::Data(page) => decompress_data(page, buffer).map(Page::Data),
        CompressedPage::Dict(page) => decompress_dict(page, buffer).map(Page::Dict),
    }
}

impl streaming_decompression::Compressed for CompressedPage {
    #[inline]
    fn is_compressed(&self) -> bool {
        self.compression() != compression::Compression::Uncompressed
    }
}

impl streaming_decompression::Decompressed for Page {
    #[inline]
    fn buffer_mut(&mut self) -> &mut Vec<u8> {
        self.buffer_mut()
    }
}

/// Decompressor that re-uses the page buffer of its iterator of
/// [`CompressedPage`].
pub type Decompressor<I> = streaming_decompression::Decompressor<
    CompressedPage,
    Page,
    fn(CompressedPage, &mut Vec<u8>) -> Result<Page>,
    Error,
    I,
>;

/// A [`FallibleStreamingIterator`] that decompresses [`CompressedPage`] into [`Page`].
/// # Implementation
/// This decompressor uses an internal [`Vec<u8>`] to perform decompressions which
/// is re-used across pages, so that a single allocation is required.
/// If the pages are not compressed, the internal buffer is not used.
pub struct BasicDecompressor<I: Iterator<Item = Result<CompressedPage>>> {
    iter: Decompressor<I>,
}

impl<I: Iterator<Item = Result<CompressedPage>>> BasicDecompressor<I> {
    /// Returns a new [`BasicDecompressor`].
    pub fn new(iter: I, buffer: Vec<u8>) -> Self {
        Self {
            iter: Decompressor::new(iter, buffer, decompress),
        }
    }

    /// Returns its internal buffer, consuming itself.
    pub fn into_inner(self) -> Vec<u8> {
        self.iter.into_inner()
    }
}

impl<I: Iterator<Item = Result<CompressedPage>>> FallibleStreamingIterator
    for BasicDecompressor<I>
{
    type Item = Page;
    type Error = Error;

    fn advance(&mut self) -> Result<()> {
        self.iter.advance()
    }

    fn get(&self) -> Option<&Page> {
        self.iter.get()
    }
}
