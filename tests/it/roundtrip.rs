use parquet_rw::compression::{CompressionOptions, GzipLevel, ZstdLevel};
use parquet_rw::error::Result;
use parquet_rw::metadata::{KeyValue, SchemaDescriptor};
use parquet_rw::read::{FileReader, ReadOptions};
use parquet_rw::statistics::PrimitiveStatistics;
use parquet_rw::write::{ColumnBatch, DictionaryMode, ParquetWriter, WriterOptions};

use super::write_i64_file;

#[test]
fn single_column_i64_uncompressed_plain() -> Result<()> {
    // S1: write 0..1000, read it all back
    let values = (0..1000i64).collect::<Vec<_>>();
    let options = WriterOptions {
        dictionary_mode: DictionaryMode::Plain,
        ..Default::default()
    };
    let data = write_i64_file(&values, options)?;

    // magic at both ends, and at least the raw values plus the footer
    assert!(data.len() >= 8008);
    assert_eq!(&data[..4], b"PAR1");
    assert_eq!(&data[data.len() - 4..], b"PAR1");

    let mut reader = FileReader::try_from_bytes(data, ReadOptions::default())?;
    assert_eq!(reader.row_count(), 1000);
    assert_eq!(reader.column_count(), 1);
    assert_eq!(reader.row_group_count(), 1);

    let mut column = reader.open_column(0, 0)?;
    assert!(column.has_next());
    assert_eq!(column.remaining(), 1000);

    let mut result = vec![];
    let read = column.read_batch::<i64>(&mut result, usize::MAX, None, None)?;
    assert_eq!(read, 1000);
    assert_eq!(result, values);
    assert!(!column.has_next());
    Ok(())
}

#[test]
fn all_compressions_round_trip() -> Result<()> {
    let values = (0..10_000i64).map(|x| x % 100).collect::<Vec<_>>();
    let compressions = vec![
        CompressionOptions::Uncompressed,
        CompressionOptions::Snappy,
        CompressionOptions::Gzip(Some(GzipLevel::new(6))),
        CompressionOptions::Lz4Raw,
        CompressionOptions::Zstd(Some(ZstdLevel::new(3))),
    ];
    for compression in compressions {
        let options = WriterOptions {
            compression,
            dictionary_mode: DictionaryMode::Plain,
            ..Default::default()
        };
        let data = write_i64_file(&values, options)?;
        let mut reader = FileReader::try_from_bytes(data, ReadOptions::default())?;
        let mut result = vec![];
        reader
            .open_column(0, 0)?
            .read_batch::<i64>(&mut result, usize::MAX, None, None)?;
        assert_eq!(result, values, "compression {:?}", compression);
    }
    Ok(())
}

#[test]
fn multiple_pages_and_row_groups() -> Result<()> {
    let schema = SchemaDescriptor::try_from_message("message schema { REQUIRED INT64 id; }")?;
    let options = WriterOptions {
        // tiny pages so that every chunk holds many of them
        page_bytes: 256,
        dictionary_mode: DictionaryMode::Plain,
        ..Default::default()
    };
    let mut writer = ParquetWriter::try_new(vec![], schema, options)?;

    let values = (0..5000i64).collect::<Vec<_>>();
    for chunk in values.chunks(1000) {
        writer.write_batch(0, ColumnBatch::Int64(chunk), None, None)?;
        writer.flush_row_group()?;
    }
    writer.close()?;
    let data = writer.into_inner();

    let mut reader = FileReader::try_from_bytes(data, ReadOptions::default())?;
    assert_eq!(reader.row_group_count(), 5);
    assert_eq!(reader.row_count(), 5000);

    // drain in odd-sized batches so that reads straddle page boundaries
    let mut result = vec![];
    for group in 0..reader.row_group_count() {
        let mut column = reader.open_column(group, 0)?;
        loop {
            let read = column.read_batch::<i64>(&mut result, 333, None, None)?;
            if read == 0 {
                break;
            }
        }
    }
    assert_eq!(result, values);
    Ok(())
}

#[test]
fn skip_values() -> Result<()> {
    let values = (0..1000i64).collect::<Vec<_>>();
    let data = write_i64_file(&values, WriterOptions::default())?;

    let mut reader = FileReader::try_from_bytes(data, ReadOptions::default())?;
    let mut column = reader.open_column(0, 0)?;
    assert_eq!(column.skip(600)?, 600);
    assert_eq!(column.remaining(), 400);

    let mut result = vec![];
    column.read_batch::<i64>(&mut result, usize::MAX, None, None)?;
    assert_eq!(result, (600..1000).collect::<Vec<_>>());

    // skipping past the end returns what was left
    assert_eq!(column.skip(10)?, 0);
    Ok(())
}

#[test]
fn nullable_byte_array() -> Result<()> {
    // S3: ["Alice", "Bob", null, "David", "Eve"]
    let schema =
        SchemaDescriptor::try_from_message("message schema { OPTIONAL BYTE_ARRAY name (UTF8); }")?;
    let mut writer = ParquetWriter::try_new(vec![], schema, WriterOptions::default())?;
    let names: Vec<&[u8]> = vec![b"Alice", b"Bob", b"David", b"Eve"];
    writer.write_batch(
        0,
        ColumnBatch::ByteArray(&names),
        Some(&[1, 1, 0, 1, 1]),
        None,
    )?;
    writer.close()?;
    let data = writer.into_inner();

    let mut reader = FileReader::try_from_bytes(data, ReadOptions::default())?;
    let mut column = reader.open_column(0, 0)?;
    let mut values = vec![];
    let mut def_levels = vec![];
    let read = column.read_binary_batch(&mut values, usize::MAX, Some(&mut def_levels))?;
    assert_eq!(read, 5);
    assert_eq!(def_levels, vec![1, 1, 0, 1, 1]);
    assert_eq!(values, names.iter().map(|x| x.to_vec()).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn zero_length_strings_round_trip() -> Result<()> {
    let schema =
        SchemaDescriptor::try_from_message("message schema { REQUIRED BYTE_ARRAY v; }")?;
    let mut writer = ParquetWriter::try_new(vec![], schema, WriterOptions::default())?;
    let values: Vec<&[u8]> = vec![b"", b"a", b"", b"", b"bb"];
    writer.write_batch(0, ColumnBatch::ByteArray(&values), None, None)?;
    writer.close()?;
    let data = writer.into_inner();

    let mut reader = FileReader::try_from_bytes(data, ReadOptions::default())?;
    let mut result = vec![];
    reader
        .open_column(0, 0)?
        .read_binary_batch(&mut result, usize::MAX, None)?;
    assert_eq!(result, values.iter().map(|x| x.to_vec()).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn int96_round_trips_bit_exact() -> Result<()> {
    let schema = SchemaDescriptor::try_from_message("message schema { REQUIRED INT96 ts; }")?;
    let mut writer = ParquetWriter::try_new(vec![], schema, WriterOptions::default())?;
    let values: Vec<[u32; 3]> = vec![
        [0, 0, 0],
        [u32::MAX, u32::MAX, u32::MAX],
        [0xDEAD_BEEF, 0x0123_4567, 0x89AB_CDEF],
    ];
    writer.write_batch(0, ColumnBatch::Int96(&values), None, None)?;
    writer.close()?;
    let data = writer.into_inner();

    let mut reader = FileReader::try_from_bytes(data, ReadOptions::default())?;
    let mut result = vec![];
    reader
        .open_column(0, 0)?
        .read_batch::<[u32; 3]>(&mut result, usize::MAX, None, None)?;
    assert_eq!(result, values);
    Ok(())
}

#[test]
fn booleans_round_trip() -> Result<()> {
    let schema = SchemaDescriptor::try_from_message("message schema { REQUIRED BOOLEAN b; }")?;
    let mut writer = ParquetWriter::try_new(vec![], schema, WriterOptions::default())?;
    let values = (0..100).map(|x| x % 3 == 0).collect::<Vec<_>>();
    writer.write_batch(0, ColumnBatch::Boolean(&values), None, None)?;
    writer.close()?;
    let data = writer.into_inner();

    let mut reader = FileReader::try_from_bytes(data, ReadOptions::default())?;
    let mut result = vec![];
    reader
        .open_column(0, 0)?
        .read_boolean_batch(&mut result, usize::MAX, None)?;
    assert_eq!(result, values);
    Ok(())
}

#[test]
fn fixed_len_byte_array_round_trips() -> Result<()> {
    let schema = SchemaDescriptor::try_from_message(
        "message schema { REQUIRED FIXED_LEN_BYTE_ARRAY (4) v; }",
    )?;
    let mut writer = ParquetWriter::try_new(vec![], schema, WriterOptions::default())?;
    let values: Vec<u8> = (0..40).collect();
    writer.write_batch(0, ColumnBatch::FixedLenByteArray(&values), None, None)?;
    writer.close()?;
    let data = writer.into_inner();

    let mut reader = FileReader::try_from_bytes(data, ReadOptions::default())?;
    let mut result = vec![];
    let read = reader
        .open_column(0, 0)?
        .read_fixed_batch(&mut result, usize::MAX, None)?;
    assert_eq!(read, 10);
    assert_eq!(result, values);
    Ok(())
}

#[test]
fn dictionary_with_repeats() -> Result<()> {
    // S4: 10_000 INT32 values drawn from {0..99}
    let schema = SchemaDescriptor::try_from_message("message schema { REQUIRED INT32 v; }")?;
    let mut writer = ParquetWriter::try_new(vec![], schema, WriterOptions::default())?;
    let values = (0..10_000).map(|x| (x * 7) % 100).collect::<Vec<i32>>();
    writer.write_batch(0, ColumnBatch::Int32(&values), None, None)?;
    writer.close()?;
    let data = writer.into_inner();

    let mut reader = FileReader::try_from_bytes(data, ReadOptions::default())?;

    // the file contains a dictionary page
    let chunk = &reader.row_group_meta(0)?.columns()[0];
    assert!(chunk.dictionary_page_offset().is_some());

    let statistics = reader.column_statistics(0, 0)?.unwrap();
    let statistics = statistics
        .as_any()
        .downcast_ref::<PrimitiveStatistics<i32>>()
        .unwrap();
    assert_eq!(statistics.min_value, Some(0));
    assert_eq!(statistics.max_value, Some(99));

    let mut result = vec![];
    reader
        .open_column(0, 0)?
        .read_batch::<i32>(&mut result, usize::MAX, None, None)?;
    assert_eq!(result, values);
    Ok(())
}

#[test]
fn dictionary_of_strings_round_trips() -> Result<()> {
    let schema =
        SchemaDescriptor::try_from_message("message schema { REQUIRED BYTE_ARRAY v (UTF8); }")?;
    let mut writer = ParquetWriter::try_new(vec![], schema, WriterOptions::default())?;
    let pool: Vec<&[u8]> = vec![b"red", b"green", b"blue", b""];
    let values = (0..5000).map(|x| pool[x % pool.len()]).collect::<Vec<_>>();
    writer.write_batch(0, ColumnBatch::ByteArray(&values), None, None)?;
    writer.close()?;
    let data = writer.into_inner();

    let mut reader = FileReader::try_from_bytes(data, ReadOptions::default())?;
    assert!(reader.row_group_meta(0)?.columns()[0]
        .dictionary_page_offset()
        .is_some());

    let mut result = vec![];
    reader
        .open_column(0, 0)?
        .read_binary_batch(&mut result, usize::MAX, None)?;
    assert_eq!(result, values.iter().map(|x| x.to_vec()).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn key_value_metadata_round_trips() -> Result<()> {
    let schema = SchemaDescriptor::try_from_message("message schema { REQUIRED INT64 id; }")?;
    let mut writer = ParquetWriter::try_new(vec![], schema, WriterOptions::default())?;
    writer.write_batch(0, ColumnBatch::Int64(&[1, 2, 3]), None, None)?;
    writer.close_with_metadata(vec![KeyValue {
        key: "origin".to_string(),
        value: Some("unit-test".to_string()),
    }])?;
    let data = writer.into_inner();

    let reader = FileReader::try_from_bytes(data, ReadOptions::default())?;
    let key_values = reader.metadata().key_value_metadata().as_ref().unwrap();
    assert_eq!(key_values[0].key, "origin");
    assert_eq!(key_values[0].value.as_deref(), Some("unit-test"));
    Ok(())
}

#[test]
fn statistics_can_be_disabled() -> Result<()> {
    let options = WriterOptions {
        write_statistics: false,
        ..Default::default()
    };
    let data = write_i64_file(&[1, 2, 3], options)?;
    let reader = FileReader::try_from_bytes(data, ReadOptions::default())?;
    assert!(reader.column_statistics(0, 0)?.is_none());
    Ok(())
}

#[test]
fn randomized_nullable_round_trip() -> Result<()> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(42);
    let def_levels = (0..10_000)
        .map(|_| rng.gen_bool(0.8) as u32)
        .collect::<Vec<_>>();
    let values = def_levels
        .iter()
        .filter(|x| **x == 1)
        .map(|_| rng.gen::<i64>())
        .collect::<Vec<_>>();

    let schema = SchemaDescriptor::try_from_message("message schema { OPTIONAL INT64 v; }")?;
    let options = WriterOptions {
        compression: CompressionOptions::Snappy,
        page_bytes: 4096,
        ..Default::default()
    };
    let mut writer = ParquetWriter::try_new(vec![], schema, options)?;
    writer.write_batch(0, ColumnBatch::Int64(&values), Some(&def_levels), None)?;
    writer.close()?;
    let data = writer.into_inner();

    let mut reader = FileReader::try_from_bytes(data, ReadOptions::default())?;
    let mut read_values = vec![];
    let mut read_defs = vec![];
    let read = reader.open_column(0, 0)?.read_batch::<i64>(
        &mut read_values,
        usize::MAX,
        Some(&mut read_defs),
        None,
    )?;
    assert_eq!(read, def_levels.len());
    assert_eq!(read_defs, def_levels);
    assert_eq!(read_values, values);
    Ok(())
}

#[test]
fn doubles_round_trip() -> Result<()> {
    let schema = SchemaDescriptor::try_from_message("message schema { REQUIRED DOUBLE v; }")?;
    let mut writer = ParquetWriter::try_new(vec![], schema, WriterOptions::default())?;
    let values = (0..1000).map(|x| x as f64 * 1.5 + 0.25).collect::<Vec<_>>();
    writer.write_batch(0, ColumnBatch::Double(&values), None, None)?;
    writer.close()?;
    let data = writer.into_inner();

    let mut reader = FileReader::try_from_bytes(data, ReadOptions::default())?;
    let mut result = vec![];
    reader
        .open_column(0, 0)?
        .read_batch::<f64>(&mut result, usize::MAX, None, None)?;
    assert_eq!(result, values);
    Ok(())
}
