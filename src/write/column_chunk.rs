use std::collections::HashSet;
use std::io::Write;

use parquet_format_safe::thrift::protocol::TCompactOutputProtocol;
use parquet_format_safe::{ColumnChunk, ColumnMetaData, PageType as ParquetPageType};

use crate::compression::Compression;
use crate::error::{Error, Result};
use crate::metadata::ColumnDescriptor;
use crate::page::CompressedPage;
use crate::statistics::serialize_statistics;
use crate::FallibleStreamingIterator;

use super::page::{write_page, PageWriteSpec};
use super::statistics::reduce;
use super::{DynStreamingIterator, WriteOptions};

pub fn write_column_chunk<'a, W, E>(
    writer: &mut W,
    mut offset: u64,
    descriptor: &ColumnDescriptor,
    options: &WriteOptions,
    mut compressed_pages: DynStreamingIterator<'a, CompressedPage, E>,
) -> Result<(ColumnChunk, u64)>
where
    W: Write,
    Error: From<E>,
    E: std::error::Error,
{
    let initial = offset;

    // write every page, recording the codec they were compressed with
    let mut compression: Option<Compression> = None;
    let mut specs = vec![];
    while let Some(compressed_page) = compressed_pages.next()? {
        match compression {
            None => compression = Some(compressed_page.compression()),
            Some(compression) => {
                if compression != compressed_page.compression() {
                    return Err(Error::InvalidParameter(
                        "every page of a column chunk must use the same compression".to_string(),
                    ));
                }
            }
        }
        let spec = write_page(writer, offset, compressed_page, options.write_page_crc)?;
        offset += spec.bytes_written;
        specs.push(spec);
    }
    let mut bytes_written = offset - initial;

    let column_chunk = build_column_chunk(
        &specs,
        descriptor,
        compression.unwrap_or(Compression::Uncompressed),
        options,
    )?;

    // write the chunk metadata inline, after its pages
    let mut protocol = TCompactOutputProtocol::new(writer);
    bytes_written += column_chunk.write_to_out_protocol(&mut protocol)? as u64;

    Ok((column_chunk, bytes_written))
}

fn build_column_chunk(
    specs: &[PageWriteSpec],
    descriptor: &ColumnDescriptor,
    compression: Compression,
    options: &WriteOptions,
) -> Result<ColumnChunk> {
    // SPEC: the total compressed size is the total compressed size of each page + the header size
    let total_compressed_size = specs
        .iter()
        .map(|x| x.header_size as i64 + x.header.compressed_page_size as i64)
        .sum();
    let total_uncompressed_size = specs
        .iter()
        .map(|x| x.header_size as i64 + x.header.uncompressed_page_size as i64)
        .sum();

    // the chunk starts at its first page, dictionary or data
    let start_offset = specs.first().map(|spec| spec.offset).unwrap_or(0) as i64;
    let dictionary_page_offset = specs
        .iter()
        .find(|spec| spec.header.type_ == ParquetPageType::DICTIONARY_PAGE)
        .map(|spec| spec.offset as i64);
    let data_page_offset = specs
        .iter()
        .find(|spec| {
            spec.header.type_ == ParquetPageType::DATA_PAGE
                || spec.header.type_ == ParquetPageType::DATA_PAGE_V2
        })
        .map(|spec| spec.offset as i64)
        .unwrap_or(start_offset);

    let num_values = specs
        .iter()
        .map(|spec| {
            spec.header
                .data_page_header
                .as_ref()
                .map(|header| header.num_values as i64)
                .or_else(|| {
                    spec.header
                        .data_page_header_v2
                        .as_ref()
                        .map(|header| header.num_values as i64)
                })
                // only data pages contribute
                .unwrap_or(0)
        })
        .sum();

    let mut encodings = specs
        .iter()
        .flat_map(|spec| {
            if let Some(header) = &spec.header.data_page_header {
                vec![
                    header.encoding,
                    header.repetition_level_encoding,
                    header.definition_level_encoding,
                ]
            } else if let Some(header) = &spec.header.data_page_header_v2 {
                vec![header.encoding, parquet_format_safe::Encoding::RLE]
            } else if let Some(header) = &spec.header.dictionary_page_header {
                vec![header.encoding]
            } else {
                vec![]
            }
        })
        .collect::<HashSet<_>>() // unique
        .into_iter()
        .collect::<Vec<_>>();
    encodings.sort_by_key(|x| x.0);

    let statistics = if options.write_statistics {
        let statistics = specs.iter().map(|x| &x.statistics).collect::<Vec<_>>();
        let statistics = reduce(&statistics)?;
        statistics.map(|x| serialize_statistics(x.as_ref()))
    } else {
        None
    };

    let (type_, _) = descriptor.descriptor.primitive_type.physical_type.into();

    let metadata = ColumnMetaData {
        type_,
        encodings,
        path_in_schema: descriptor.path_in_schema.to_vec(),
        codec: compression.into(),
        num_values,
        total_uncompressed_size,
        total_compressed_size,
        key_value_metadata: None,
        data_page_offset,
        index_page_offset: None,
        dictionary_page_offset,
        statistics,
        encoding_stats: None,
        bloom_filter_offset: None,
    };

    Ok(ColumnChunk {
        file_path: None, // same file for now.
        file_offset: start_offset + total_compressed_size,
        meta_data: Some(metadata),
        offset_index_offset: None,
        offset_index_length: None,
        column_index_offset: None,
        column_index_length: None,
        crypto_metadata: None,
        encrypted_column_metadata: None,
    })
}
