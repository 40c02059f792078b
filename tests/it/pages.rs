//! Writing pages directly through the low-level surface, to cover encodings
//! the buffering writer does not emit on its own.

use parquet_rw::compression::CompressionOptions;
use parquet_rw::encoding::{byte_stream_split, delta_bitpacked, delta_length_byte_array, Encoding};
use parquet_rw::error::{Error, Result};
use parquet_rw::metadata::SchemaDescriptor;
use parquet_rw::page::{DataPage, DataPageHeader, DataPageHeaderV1, Page};
use parquet_rw::read::{FileReader, ReadOptions};
use parquet_rw::write::{
    Compressor, DynIter, DynStreamingIterator, FileWriter, Version, WriteOptions,
};

fn write_single_page_file(
    schema: SchemaDescriptor,
    encoding: Encoding,
    num_values: usize,
    values: Vec<u8>,
    compression: CompressionOptions,
) -> Result<Vec<u8>> {
    let header = DataPageHeaderV1 {
        num_values: num_values as i32,
        encoding: encoding.into(),
        definition_level_encoding: Encoding::Rle.into(),
        repetition_level_encoding: Encoding::Rle.into(),
        statistics: None,
    };
    let page = Page::Data(DataPage::new(
        DataPageHeader::V1(header),
        values,
        schema.columns()[0].descriptor.clone(),
    ));

    let options = WriteOptions {
        write_statistics: false,
        version: Version::V1,
        write_page_crc: true,
    };
    let mut writer = FileWriter::new(vec![], schema, options, None);

    let pages = DynStreamingIterator::new(Compressor::new(
        std::iter::once(Ok(page)),
        compression,
        vec![],
    ));
    writer.write(DynIter::new(std::iter::once(Ok::<_, Error>(pages))))?;
    writer.end(None)?;
    Ok(writer.into_inner())
}

#[test]
fn delta_binary_packed_i64() -> Result<()> {
    let values = (0..2000i64).map(|x| x * x - 1000).collect::<Vec<_>>();
    let mut buffer = vec![];
    delta_bitpacked::encode(values.iter().copied(), &mut buffer);

    let schema = SchemaDescriptor::try_from_message("message schema { REQUIRED INT64 v; }")?;
    let data = write_single_page_file(
        schema,
        Encoding::DeltaBinaryPacked,
        values.len(),
        buffer,
        CompressionOptions::Uncompressed,
    )?;

    let mut reader = FileReader::try_from_bytes(data, ReadOptions::default())?;
    let mut result = vec![];
    reader
        .open_column(0, 0)?
        .read_batch::<i64>(&mut result, usize::MAX, None, None)?;
    assert_eq!(result, values);
    Ok(())
}

#[test]
fn delta_binary_packed_i32_compressed() -> Result<()> {
    let values = (0..500i32).map(|x| x * 3 - 700).collect::<Vec<_>>();
    let mut buffer = vec![];
    delta_bitpacked::encode(values.iter().map(|x| *x as i64), &mut buffer);

    let schema = SchemaDescriptor::try_from_message("message schema { REQUIRED INT32 v; }")?;
    let data = write_single_page_file(
        schema,
        Encoding::DeltaBinaryPacked,
        values.len(),
        buffer,
        CompressionOptions::Snappy,
    )?;

    let mut reader = FileReader::try_from_bytes(data, ReadOptions::default())?;
    let mut result = vec![];
    reader
        .open_column(0, 0)?
        .read_batch::<i32>(&mut result, usize::MAX, None, None)?;
    assert_eq!(result, values);
    Ok(())
}

#[test]
fn delta_length_byte_array() -> Result<()> {
    let owned = (0..300)
        .map(|x| format!("value-{}", x % 40).into_bytes())
        .collect::<Vec<_>>();
    let values = owned.iter().map(|x| x.as_slice()).collect::<Vec<_>>();
    let mut buffer = vec![];
    delta_length_byte_array::encode(values.iter().copied(), &mut buffer);

    let schema = SchemaDescriptor::try_from_message("message schema { REQUIRED BYTE_ARRAY v; }")?;
    let data = write_single_page_file(
        schema,
        Encoding::DeltaLengthByteArray,
        values.len(),
        buffer,
        CompressionOptions::Uncompressed,
    )?;

    let mut reader = FileReader::try_from_bytes(data, ReadOptions::default())?;
    let mut result = vec![];
    reader
        .open_column(0, 0)?
        .read_binary_batch(&mut result, usize::MAX, None)?;
    assert_eq!(result, owned);
    Ok(())
}

#[test]
fn byte_stream_split_double() -> Result<()> {
    let values = (0..1024).map(|x| x as f64 * 0.7 - 100.0).collect::<Vec<_>>();
    let mut buffer = vec![];
    byte_stream_split::encode(&values, &mut buffer);

    let schema = SchemaDescriptor::try_from_message("message schema { REQUIRED DOUBLE v; }")?;
    let data = write_single_page_file(
        schema,
        Encoding::ByteStreamSplit,
        values.len(),
        buffer,
        CompressionOptions::Zstd(None),
    )?;

    let options = ReadOptions {
        verify_page_crc: true,
        ..Default::default()
    };
    let mut reader = FileReader::try_from_bytes(data, options)?;
    let mut result = vec![];
    reader
        .open_column(0, 0)?
        .read_batch::<f64>(&mut result, usize::MAX, None, None)?;
    assert_eq!(result, values);
    Ok(())
}

#[test]
fn unsupported_encoding_surfaces_as_error() -> Result<()> {
    let schema = SchemaDescriptor::try_from_message("message schema { REQUIRED INT64 v; }")?;
    // BYTE_STREAM_SPLIT does not apply to INT64 in this implementation
    let data = write_single_page_file(
        schema,
        Encoding::ByteStreamSplit,
        2,
        vec![0u8; 16],
        CompressionOptions::Uncompressed,
    )?;

    let mut reader = FileReader::try_from_bytes(data, ReadOptions::default())?;
    let mut result = vec![];
    let outcome = reader
        .open_column(0, 0)?
        .read_batch::<i64>(&mut result, usize::MAX, None, None);
    assert!(matches!(outcome, Err(Error::InvalidEncoding(_))));
    Ok(())
}
