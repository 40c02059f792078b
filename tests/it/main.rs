use parquet_rw::error::Result;
use parquet_rw::metadata::SchemaDescriptor;
use parquet_rw::write::{ColumnBatch, ParquetWriter, WriterOptions};

mod batch;
mod integrity;
mod pages;
mod pushdown;
mod roundtrip;

/// Writes a single-column INT64 file with the given options.
pub fn write_i64_file(values: &[i64], options: WriterOptions) -> Result<Vec<u8>> {
    let schema = SchemaDescriptor::try_from_message("message schema { REQUIRED INT64 id; }")?;
    let mut writer = ParquetWriter::try_new(vec![], schema, options)?;
    writer.write_batch(0, ColumnBatch::Int64(values), None, None)?;
    writer.close()?;
    Ok(writer.into_inner())
}
