use std::io::Write;

use parquet_format_safe::{ColumnChunk, RowGroup};

use crate::error::{Error, Result};
use crate::metadata::ColumnDescriptor;

use super::column_chunk::write_column_chunk;
use super::{DynIter, DynStreamingIterator, WriteOptions};
use crate::page::CompressedPage;

/// Number of rows of a set of column chunks: every flat column must hold the
/// same number of values.
fn compute_num_rows(
    columns: &[ColumnChunk],
    descriptors: &[ColumnDescriptor],
) -> Result<i64> {
    let flat_values = columns
        .iter()
        .zip(descriptors)
        .filter(|(_, descriptor)| descriptor.descriptor.max_rep_level == 0)
        .map(|(column, _)| column.meta_data.as_ref().unwrap().num_values)
        .collect::<Vec<_>>();

    match flat_values.first() {
        None => Ok(columns
            .first()
            .map(|column| column.meta_data.as_ref().unwrap().num_values)
            .unwrap_or(0)),
        Some(first) => {
            if flat_values.iter().any(|x| x != first) {
                return Err(Error::InvalidState(format!(
                    "Every column chunk in a row group MUST have the same number of rows; found {:?}",
                    flat_values
                )));
            }
            Ok(*first)
        }
    }
}

pub fn write_row_group<'a, W, E>(
    writer: &mut W,
    mut offset: u64,
    descriptors: &[ColumnDescriptor],
    options: &WriteOptions,
    columns: DynIter<'a, std::result::Result<DynStreamingIterator<'a, CompressedPage, E>, E>>,
) -> Result<(RowGroup, u64)>
where
    W: Write,
    Error: From<E>,
    E: std::error::Error,
{
    let column_iter = descriptors.iter().zip(columns);

    let initial = offset;
    let columns = column_iter
        .map(|(descriptor, page_iter)| {
            let (column, size) = write_column_chunk(
                writer,
                offset,
                descriptor,
                options,
                page_iter.map_err(Error::from)?,
            )?;
            offset += size;
            Ok(column)
        })
        .collect::<Result<Vec<_>>>()?;
    let bytes_written = offset - initial;

    let num_rows = compute_num_rows(&columns, descriptors)?;

    let file_offset = columns
        .first()
        .map(|column| {
            column
                .meta_data
                .as_ref()
                .unwrap()
                .dictionary_page_offset
                .unwrap_or_else(|| column.meta_data.as_ref().unwrap().data_page_offset)
        })
        .filter(|_| num_rows > 0);

    let total_byte_size = columns
        .iter()
        .map(|c| c.meta_data.as_ref().unwrap().total_uncompressed_size)
        .sum();
    let total_compressed_size = columns
        .iter()
        .map(|c| c.meta_data.as_ref().unwrap().total_compressed_size)
        .sum();

    Ok((
        RowGroup {
            columns,
            total_byte_size,
            num_rows,
            sorting_columns: None,
            file_offset,
            total_compressed_size: Some(total_compressed_size),
            ordinal: None,
        },
        bytes_written,
    ))
}
