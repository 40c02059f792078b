use parquet_rw::error::Result;
use parquet_rw::metadata::SchemaDescriptor;
use parquet_rw::read::{FileReader, PredicateOp, ReadOptions};
use parquet_rw::write::{ColumnBatch, DictionaryMode, ParquetWriter, WriterOptions};

fn ten_group_file(write_statistics: bool) -> Result<Vec<u8>> {
    // 10 row groups of 100_000 INT32 rows; group g spans
    // [g * 100_000, g * 100_000 + 99_999]
    let schema = SchemaDescriptor::try_from_message("message schema { REQUIRED INT32 v; }")?;
    let options = WriterOptions {
        write_statistics,
        dictionary_mode: DictionaryMode::Plain,
        ..Default::default()
    };
    let mut writer = ParquetWriter::try_new(vec![], schema, options)?;
    for group in 0..10i32 {
        let values = (group * 100_000..(group + 1) * 100_000).collect::<Vec<_>>();
        writer.write_batch(0, ColumnBatch::Int32(&values), None, None)?;
        writer.flush_row_group()?;
    }
    writer.close()?;
    Ok(writer.into_inner())
}

#[test]
fn greater_than_selects_upper_groups() -> Result<()> {
    // S5
    let data = ten_group_file(true)?;
    let reader = FileReader::try_from_bytes(data, ReadOptions::default())?;
    assert_eq!(reader.row_group_count(), 10);

    let selected = reader.filter_row_groups(0, PredicateOp::Gt, 350_000i32)?;
    assert_eq!(selected, vec![3, 4, 5, 6, 7, 8, 9]);
    Ok(())
}

#[test]
fn operators_are_conservative() -> Result<()> {
    let data = ten_group_file(true)?;
    let reader = FileReader::try_from_bytes(data, ReadOptions::default())?;

    assert_eq!(
        reader.filter_row_groups(0, PredicateOp::Eq, 250_000i32)?,
        vec![2]
    );
    assert_eq!(
        reader.filter_row_groups(0, PredicateOp::Lt, 100_000i32)?,
        vec![0]
    );
    assert_eq!(
        reader.filter_row_groups(0, PredicateOp::Le, 100_000i32)?,
        vec![0, 1]
    );
    assert_eq!(
        reader.filter_row_groups(0, PredicateOp::Ge, 899_999i32)?,
        vec![8, 9]
    );
    // NE only prunes single-valued ranges, so everything stays
    assert_eq!(
        reader.filter_row_groups(0, PredicateOp::Ne, 0i32)?,
        (0..10).collect::<Vec<_>>()
    );
    // no group can hold a value beyond the global maximum
    assert!(reader
        .filter_row_groups(0, PredicateOp::Gt, 999_999i32)?
        .is_empty());
    Ok(())
}

#[test]
fn absent_statistics_keep_all_groups() -> Result<()> {
    let data = ten_group_file(false)?;
    let reader = FileReader::try_from_bytes(data, ReadOptions::default())?;
    let selected = reader.filter_row_groups(0, PredicateOp::Gt, 350_000i32)?;
    assert_eq!(selected, (0..10).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn type_mismatch_is_rejected() -> Result<()> {
    let data = ten_group_file(true)?;
    let reader = FileReader::try_from_bytes(data, ReadOptions::default())?;
    assert!(reader
        .filter_row_groups(0, PredicateOp::Gt, 350_000i64)
        .is_err());
    Ok(())
}

#[test]
fn binary_pushdown() -> Result<()> {
    let schema =
        SchemaDescriptor::try_from_message("message schema { REQUIRED BYTE_ARRAY v (UTF8); }")?;
    let mut writer = ParquetWriter::try_new(vec![], schema, WriterOptions::default())?;
    for group in [["aaa", "bbb"], ["mmm", "nnn"], ["yyy", "zzz"]] {
        let values = group.iter().map(|x| x.as_bytes()).collect::<Vec<_>>();
        writer.write_batch(0, ColumnBatch::ByteArray(&values), None, None)?;
        writer.flush_row_group()?;
    }
    writer.close()?;
    let data = writer.into_inner();

    let reader = FileReader::try_from_bytes(data, ReadOptions::default())?;
    let selected = reader.filter_row_groups_binary(0, PredicateOp::Ge, b"nnn")?;
    assert_eq!(selected, vec![1, 2]);
    let selected = reader.filter_row_groups_binary(0, PredicateOp::Eq, b"abc")?;
    assert_eq!(selected, vec![0]);
    Ok(())
}
