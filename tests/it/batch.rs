use parquet_rw::compression::{CompressionOptions, ZstdLevel};
use parquet_rw::error::Result;
use parquet_rw::metadata::SchemaDescriptor;
use parquet_rw::read::{BatchReader, BatchReaderOptions, FileReader, ReadOptions};
use parquet_rw::write::{ColumnBatch, DictionaryMode, ParquetWriter, WriterOptions};

#[test]
fn two_columns_zstd_in_batches() -> Result<()> {
    // S2: 100_000 rows over (INT64, DOUBLE), read with batch_size = 65_536
    let schema = SchemaDescriptor::try_from_message(
        "message schema { REQUIRED INT64 id; REQUIRED DOUBLE val; }",
    )?;
    let options = WriterOptions {
        compression: CompressionOptions::Zstd(Some(ZstdLevel::new(1))),
        dictionary_mode: DictionaryMode::Plain,
        ..Default::default()
    };
    let mut writer = ParquetWriter::try_new(vec![], schema, options)?;

    let ids = (0..100_000i64).collect::<Vec<_>>();
    let vals = (0..100_000)
        .map(|i| i as f64 * 1.5 + 0.123456789)
        .collect::<Vec<_>>();
    writer.write_batch(0, ColumnBatch::Int64(&ids), None, None)?;
    writer.write_batch(1, ColumnBatch::Double(&vals), None, None)?;
    writer.close()?;
    let data = writer.into_inner();

    let reader = FileReader::try_from_bytes(data, ReadOptions::default())?;
    let batch_reader = BatchReader::try_new(
        reader,
        BatchReaderOptions {
            batch_size: 65_536,
            ..Default::default()
        },
    )?;

    let batches = batch_reader.collect::<Result<Vec<_>>>()?;
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].num_rows(), 65_536);
    assert_eq!(batches[1].num_rows(), 34_464);

    let mut read_ids = vec![];
    let mut read_vals = vec![];
    for batch in &batches {
        read_ids.extend(batch.column(0).native_values::<i64>()?);
        read_vals.extend(batch.column(1).native_values::<f64>()?);
    }
    assert_eq!(read_ids, ids);
    assert_eq!(read_vals, vals);
    Ok(())
}

#[test]
fn null_bitmap_of_optional_column() -> Result<()> {
    // S3 through the batch reader: bits 0, 1, 3, 4 set; bit 2 clear
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

    let reader = FileReader::try_from_bytes(data, ReadOptions::default())?;
    let mut batch_reader = BatchReader::try_new(reader, BatchReaderOptions::default())?;
    let batch = batch_reader.next_batch()?.unwrap();
    assert_eq!(batch.num_rows(), 5);

    let column = batch.column(0);
    assert_eq!(column.null_bitmap(), &[0b0001_1011]);
    assert_eq!(column.null_count(), 1);
    assert!(column.is_valid(0));
    assert!(!column.is_valid(2));

    // exactly num_values - null_count bits are set
    let set_bits: u32 = column.null_bitmap().iter().map(|x| x.count_ones()).sum();
    assert_eq!(set_bits as usize, column.num_values() - column.null_count());

    assert_eq!(column.binary_values()?, names);
    assert!(batch_reader.next_batch()?.is_none());
    Ok(())
}

#[test]
fn projection_by_indices_wins_over_names() -> Result<()> {
    let schema = SchemaDescriptor::try_from_message(
        "message schema { REQUIRED INT64 a; REQUIRED INT64 b; }",
    )?;
    let mut writer = ParquetWriter::try_new(vec![], schema, WriterOptions::default())?;
    writer.write_batch(0, ColumnBatch::Int64(&[1, 2]), None, None)?;
    writer.write_batch(1, ColumnBatch::Int64(&[10, 20]), None, None)?;
    writer.close()?;
    let data = writer.into_inner();

    let reader = FileReader::try_from_bytes(data, ReadOptions::default())?;
    let mut batch_reader = BatchReader::try_new(
        reader,
        BatchReaderOptions {
            column_indices: Some(vec![1]),
            column_names: Some(vec!["a".to_string()]),
            ..Default::default()
        },
    )?;
    let batch = batch_reader.next_batch()?.unwrap();
    assert_eq!(batch.columns().len(), 1);
    assert_eq!(batch.column(0).name(), "b");
    assert_eq!(batch.column(0).native_values::<i64>()?, vec![10, 20]);
    Ok(())
}

#[test]
fn projection_by_names() -> Result<()> {
    let schema = SchemaDescriptor::try_from_message(
        "message schema { REQUIRED INT64 a; REQUIRED DOUBLE b; }",
    )?;
    let mut writer = ParquetWriter::try_new(vec![], schema, WriterOptions::default())?;
    writer.write_batch(0, ColumnBatch::Int64(&[1, 2]), None, None)?;
    writer.write_batch(1, ColumnBatch::Double(&[0.5, 1.5]), None, None)?;
    writer.close()?;
    let data = writer.into_inner();

    let reader = FileReader::try_from_bytes(data, ReadOptions::default())?;
    let mut batch_reader = BatchReader::try_new(
        reader,
        BatchReaderOptions {
            column_names: Some(vec!["b".to_string()]),
            ..Default::default()
        },
    )?;
    let batch = batch_reader.next_batch()?.unwrap();
    assert_eq!(batch.columns().len(), 1);
    assert_eq!(batch.column(0).native_values::<f64>()?, vec![0.5, 1.5]);

    let reader = batch_reader.into_inner();
    drop(reader);
    Ok(())
}

#[test]
fn zero_copy_from_in_memory_file() -> Result<()> {
    // an uncompressed PLAIN REQUIRED column read whole-page from shared
    // bytes is borrowed, not copied
    let values = (0..1000i64).collect::<Vec<_>>();
    let options = WriterOptions {
        dictionary_mode: DictionaryMode::Plain,
        write_page_crc: false,
        ..Default::default()
    };
    let data = super::write_i64_file(&values, options)?;

    let reader = FileReader::try_from_bytes(data, ReadOptions::default())?;
    let mut batch_reader = BatchReader::try_new(reader, BatchReaderOptions::default())?;
    let batch = batch_reader.next_batch()?.unwrap();
    assert!(batch.column(0).is_zero_copy());
    assert_eq!(batch.column(0).native_values::<i64>()?, values);
    Ok(())
}

#[test]
fn compressed_pages_are_owned() -> Result<()> {
    let values = (0..1000i64).collect::<Vec<_>>();
    let options = WriterOptions {
        compression: CompressionOptions::Snappy,
        dictionary_mode: DictionaryMode::Plain,
        ..Default::default()
    };
    let data = super::write_i64_file(&values, options)?;

    let reader = FileReader::try_from_bytes(data, ReadOptions::default())?;
    let mut batch_reader = BatchReader::try_new(reader, BatchReaderOptions::default())?;
    let batch = batch_reader.next_batch()?.unwrap();
    assert!(!batch.column(0).is_zero_copy());
    assert_eq!(batch.column(0).native_values::<i64>()?, values);
    Ok(())
}

#[test]
fn parallel_prefetch_matches_serial() -> Result<()> {
    let schema = SchemaDescriptor::try_from_message(
        "message schema { REQUIRED INT64 a; REQUIRED DOUBLE b; REQUIRED INT32 c; }",
    )?;
    let options = WriterOptions {
        compression: CompressionOptions::Snappy,
        dictionary_mode: DictionaryMode::Plain,
        ..Default::default()
    };
    let mut writer = ParquetWriter::try_new(vec![], schema, options)?;
    let a = (0..20_000i64).collect::<Vec<_>>();
    let b = (0..20_000).map(|x| x as f64 / 3.0).collect::<Vec<_>>();
    let c = (0..20_000i32).map(|x| x % 7).collect::<Vec<_>>();
    writer.write_batch(0, ColumnBatch::Int64(&a), None, None)?;
    writer.write_batch(1, ColumnBatch::Double(&b), None, None)?;
    writer.write_batch(2, ColumnBatch::Int32(&c), None, None)?;
    writer.close()?;
    let data = writer.into_inner();

    for workers in [1usize, 3] {
        let reader = FileReader::try_from_bytes(data.clone(), ReadOptions::default())?;
        let mut batch_reader = BatchReader::try_new(
            reader,
            BatchReaderOptions {
                batch_size: 4096,
                worker_count: workers,
                ..Default::default()
            },
        )?;
        let mut read_a = vec![];
        let mut read_b = vec![];
        let mut read_c = vec![];
        while let Some(batch) = batch_reader.next_batch()? {
            read_a.extend(batch.column(0).native_values::<i64>()?);
            read_b.extend(batch.column(1).native_values::<f64>()?);
            read_c.extend(batch.column(2).native_values::<i32>()?);
        }
        assert_eq!(read_a, a, "workers = {}", workers);
        assert_eq!(read_b, b, "workers = {}", workers);
        assert_eq!(read_c, c, "workers = {}", workers);
    }
    Ok(())
}

#[test]
fn unknown_projection_name_errors() -> Result<()> {
    let data = super::write_i64_file(&[1, 2, 3], WriterOptions::default())?;
    let reader = FileReader::try_from_bytes(data, ReadOptions::default())?;
    let result = BatchReader::try_new(
        reader,
        BatchReaderOptions {
            column_names: Some(vec!["missing".to_string()]),
            ..Default::default()
        },
    );
    assert!(result.is_err());
    Ok(())
}
