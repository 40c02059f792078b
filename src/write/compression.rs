use crate::compression::CompressionOptions;
use crate::error::{Error, Result};
use crate::page::{
    CompressedDataPage, CompressedDictPage, CompressedPage, DataPage, DataPageHeader, DictPage,
    Page,
};
use crate::FallibleStreamingIterator;

fn compress_data(
    page: DataPage,
    mut compressed_buffer: Vec<u8>,
    compression: CompressionOptions,
) -> Result<CompressedDataPage> {
    let DataPage {
        header,
        buffer,
        descriptor,
    } = page;
    let uncompressed_page_size = buffer.len();
    if compression != CompressionOptions::Uncompressed {
        match &header {
            DataPageHeader::V1(_) => {
                crate::compression::compress(compression, &buffer, &mut compressed_buffer)?;
            }
            DataPageHeader::V2(header) => {
                // the levels of a v2 page are stored uncompressed
                let offset: usize = (header.repetition_levels_byte_length
                    + header.definition_levels_byte_length)
                    .try_into()
                    .map_err(|_| {
                        Error::oos("The levels byte length of a v2 page cannot be negative")
                    })?;
                if offset > buffer.len() {
                    return Err(Error::oos("The levels extend past the page body"));
                }
                compressed_buffer.extend_from_slice(&buffer[..offset]);
                crate::compression::compress(
                    compression,
                    &buffer[offset..],
                    &mut compressed_buffer,
                )?;
            }
        };
    } else {
        compressed_buffer = buffer;
    }

    Ok(CompressedDataPage::new(
        header,
        compressed_buffer,
        compression.into(),
        uncompressed_page_size,
        descriptor,
    ))
}

fn compress_dict(
    page: DictPage,
    mut compressed_buffer: Vec<u8>,
    compression: CompressionOptions,
) -> Result<CompressedDictPage> {
    let DictPage {
        buffer,
        num_values,
        is_sorted,
    } = page;
    let uncompressed_page_size = buffer.len();
    if compression != CompressionOptions::Uncompressed {
        crate::compression::compress(compression, &buffer, &mut compressed_buffer)?;
    } else {
        compressed_buffer = buffer;
    }
    Ok(CompressedDictPage::new(
        compressed_buffer,
        compression.into(),
        uncompressed_page_size,
        num_values,
        is_sorted,
    ))
}

/// Compresses an [uncompressed page](Page) into a [`CompressedPage`],
/// re-using `compressed_buffer` for the compressed body.
pub fn compress(
    compression: CompressionOptions,
    page: Page,
    compressed_buffer: Vec<u8>,
) -> Result<CompressedPage> {
    match page {
        Page::Data(page) => {
            compress_data(page, compressed_buffer, compression).map(CompressedPage::Data)
        }
        Page::Dict(page) => {
            compress_dict(page, compressed_buffer, compression).map(CompressedPage::Dict)
        }
    }
}

/// A [`FallibleStreamingIterator`] that consumes [`Page`] and yields
/// [`CompressedPage`], re-using its internal buffer across pages.
pub struct Compressor<I: Iterator<Item = Result<Page>>> {
    iter: I,
    compression: CompressionOptions,
    buffer: Vec<u8>,
    current: Option<CompressedPage>,
}

impl<I: Iterator<Item = Result<Page>>> Compressor<I> {
    /// Creates a new [`Compressor`]
    pub fn new(iter: I, compression: CompressionOptions, buffer: Vec<u8>) -> Self {
        Self {
            iter,
            compression,
            buffer,
            current: None,
        }
    }

    /// Deconstructs itself into its iterator and scratch buffer.
    pub fn into_inner(mut self) -> (I, Vec<u8>) {
        let mut buffer = if let Some(page) = self.current.as_mut() {
            std::mem::take(page_buffer(page))
        } else {
            std::mem::take(&mut self.buffer)
        };
        buffer.clear();
        (self.iter, buffer)
    }
}

fn page_buffer(page: &mut CompressedPage) -> &mut Vec<u8> {
    match page {
        CompressedPage::Data(page) => &mut page.buffer,
        CompressedPage::Dict(page) => &mut page.buffer,
    }
}

impl<I: Iterator<Item = Result<Page>>> FallibleStreamingIterator for Compressor<I> {
    type Item = CompressedPage;
    type Error = Error;

    fn advance(&mut self) -> std::result::Result<(), Self::Error> {
        // recover the buffer of the previous page so that a single
        // allocation serves the whole column chunk
        if let Some(page) = self.current.as_mut() {
            self.buffer = std::mem::take(page_buffer(page));
            self.buffer.clear();
        }
        self.current = None;

        if let Some(page) = self.iter.next() {
            let page = page?;
            let compressed_page =
                compress(self.compression, page, std::mem::take(&mut self.buffer))?;
            self.current = Some(compressed_page);
        }
        Ok(())
    }

    fn get(&self) -> Option<&Self::Item> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::{Compression, CompressionOptions};

    #[test]
    fn dict_page_round_trips() -> Result<()> {
        let page = DictPage::new((0..255u8).collect(), 10, false);
        let compressed = compress(CompressionOptions::Snappy, Page::Dict(page), vec![])?;
        if let CompressedPage::Dict(page) = compressed {
            assert_eq!(page.compression(), Compression::Snappy);
            assert_eq!(page.uncompressed_page_size, 255);
        } else {
            panic!("expected a dictionary page")
        }
        Ok(())
    }
}
