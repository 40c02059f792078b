use parquet_rw::error::{Error, Result};
use parquet_rw::read::{FileReader, ReadOptions};
use parquet_rw::write::{DictionaryMode, WriterOptions};

use super::write_i64_file;

fn file_with_known_pattern() -> Result<(Vec<u8>, usize)> {
    // a value whose little-endian bytes are easy to locate in the file
    let needle: i64 = 0x0123_4567_89AB_CDEF;
    let mut values = (0..100i64).collect::<Vec<_>>();
    values[50] = needle;
    let options = WriterOptions {
        dictionary_mode: DictionaryMode::Plain,
        write_page_crc: true,
        // keep the needle bytes out of the statistics, so that the only
        // occurrence in the file is the page body itself
        write_statistics: false,
        ..Default::default()
    };
    let data = write_i64_file(&values, options)?;

    let pattern = needle.to_le_bytes();
    let position = data
        .windows(8)
        .position(|window| window == pattern)
        .expect("the value must appear verbatim in an uncompressed PLAIN page");
    Ok((data, position))
}

#[test]
fn corrupted_page_fails_crc_verification() -> Result<()> {
    // S6: flip one byte inside a data-page body
    let (mut data, position) = file_with_known_pattern()?;
    data[position] ^= 0xFF;

    let options = ReadOptions {
        verify_page_crc: true,
        ..Default::default()
    };
    let mut reader = FileReader::try_from_bytes(data, options)?;
    let mut column = reader.open_column(0, 0)?;
    let mut values = vec![];
    let result = column.read_batch::<i64>(&mut values, usize::MAX, None, None);
    assert!(matches!(result, Err(Error::ChecksumMismatch { .. })));
    Ok(())
}

#[test]
fn corrupted_page_passes_without_verification() -> Result<()> {
    let (mut data, position) = file_with_known_pattern()?;
    data[position] ^= 0xFF;

    // without verification the read proceeds; the values are simply wrong
    let mut reader = FileReader::try_from_bytes(data, ReadOptions::default())?;
    let mut column = reader.open_column(0, 0)?;
    let mut values = vec![];
    let read = column.read_batch::<i64>(&mut values, usize::MAX, None, None)?;
    assert_eq!(read, 100);
    assert_ne!(values[50], 0x0123_4567_89AB_CDEF);
    Ok(())
}

#[test]
fn intact_page_passes_crc_verification() -> Result<()> {
    let (data, _) = file_with_known_pattern()?;
    let options = ReadOptions {
        verify_page_crc: true,
        ..Default::default()
    };
    let mut reader = FileReader::try_from_bytes(data, options)?;
    let mut values = vec![];
    reader
        .open_column(0, 0)?
        .read_batch::<i64>(&mut values, usize::MAX, None, None)?;
    assert_eq!(values.len(), 100);
    Ok(())
}

#[test]
fn corrupt_trailing_magic_is_rejected() -> Result<()> {
    let mut data = write_i64_file(&[1, 2, 3], WriterOptions::default())?;
    let position = data.len() - 1;
    data[position] = b'X';
    assert!(FileReader::try_from_bytes(data, ReadOptions::default()).is_err());
    Ok(())
}

#[test]
fn oversized_footer_length_is_rejected() -> Result<()> {
    let mut data = write_i64_file(&[1, 2, 3], WriterOptions::default())?;
    // the u32 before the trailing magic declares the footer length
    let position = data.len() - 8;
    data[position..position + 4].copy_from_slice(&u32::MAX.to_le_bytes());
    assert!(FileReader::try_from_bytes(data, ReadOptions::default()).is_err());
    Ok(())
}

#[test]
fn truncated_file_is_rejected() {
    assert!(FileReader::try_from_bytes(b"PAR1".to_vec(), ReadOptions::default()).is_err());
    assert!(FileReader::try_from_bytes(vec![], ReadOptions::default()).is_err());
}
