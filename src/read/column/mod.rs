mod dictionary;

pub use dictionary::Dictionary;

use std::io::Cursor;

use crate::compression::Compression;
use crate::encoding::hybrid_rle::HybridRleDecoder;
use crate::encoding::{byte_stream_split, delta_bitpacked, delta_length_byte_array, Encoding};
use crate::error::{Error, Result};
use crate::metadata::{ColumnChunkMetaData, Descriptor};
use crate::page::{split_buffer_ref, DataPageHeader, DictPage, PageType};
use crate::read::levels::get_bit_width;
use crate::read::page::{get_page_header, read_page_header};
use crate::read::{ChunkData, SharedBytes};
use crate::schema::types::PhysicalType;
use crate::types::NativeType;

/// The values of one decoded data page, in their canonical in-memory layout:
/// little-endian at a fixed stride for fixed-size types, one byte per value
/// for booleans and `u32` length-prefixed bytes for BYTE_ARRAY.
#[derive(Debug, Default)]
struct PageState {
    // canonical decoded values; grows monotonically and never shrinks
    // across pages
    values: Vec<u8>,
    // when set, the page values are a borrow of the chunk bytes instead of
    // a copy into `values`: (offset into chunk, length)
    borrowed: Option<(usize, usize)>,
    def_levels: Vec<u32>,
    rep_levels: Vec<u32>,
    num_levels: usize,
    levels_consumed: usize,
    values_bytes_consumed: usize,
}

/// Reads the values of one column chunk, page by page, decompressing and
/// decoding them into reusable buffers.
///
/// The reader materializes the chunk's byte range once (owned bytes from a
/// stream, or a borrowed range of a memory map) and then advances through
/// its pages on demand. A dictionary page, if present, is decoded on the
/// first value request and retained for the lifetime of the reader.
pub struct ColumnReader {
    chunk: ChunkData,
    // byte offset into the chunk of the next page header
    pos: usize,
    descriptor: Descriptor,
    compression: Compression,
    total_levels: usize,
    consumed_levels: usize,
    decoded_levels: usize,
    dictionary: Option<Dictionary>,
    verify_crc: bool,
    max_page_size: usize,
    scratch: Vec<u8>,
    indices: Vec<u32>,
    page: PageState,
}

impl ColumnReader {
    /// Returns a new [`ColumnReader`] over the chunk bytes described by
    /// `column`.
    pub fn new(
        chunk: ChunkData,
        column: &ColumnChunkMetaData,
        verify_crc: bool,
        max_page_size: usize,
    ) -> Self {
        Self {
            chunk,
            pos: 0,
            descriptor: column.descriptor().descriptor.clone(),
            compression: column.compression(),
            total_levels: column.num_values() as usize,
            consumed_levels: 0,
            decoded_levels: 0,
            dictionary: None,
            verify_crc,
            max_page_size,
            scratch: vec![],
            indices: vec![],
            page: PageState::default(),
        }
    }

    /// The physical type of this column.
    pub fn physical_type(&self) -> PhysicalType {
        self.descriptor.primitive_type.physical_type
    }

    /// The descriptor of this column.
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// The number of values (including nulls) not yet returned.
    pub fn remaining(&self) -> usize {
        self.total_levels - self.consumed_levels
    }

    /// Whether a call to `read_batch` can still return values.
    pub fn has_next(&self) -> bool {
        self.remaining() > 0
    }

    /// The dictionary of this chunk, if loaded.
    pub fn dictionary(&self) -> Option<&Dictionary> {
        self.dictionary.as_ref()
    }

    fn page_remaining(&self) -> usize {
        self.page.num_levels - self.page.levels_consumed
    }

    /// Makes sure the current page has undrained values, advancing through
    /// the chunk as needed. Returns `false` at the end of the chunk.
    fn ensure_page(&mut self) -> Result<bool> {
        while self.page_remaining() == 0 {
            if self.consumed_levels == self.total_levels {
                return Ok(false);
            }
            if !self.advance_page()? {
                return Err(Error::oos(format!(
                    "the column chunk declares {} values but its pages hold {}",
                    self.total_levels, self.decoded_levels
                )));
            }
        }
        Ok(true)
    }

    /// Decodes the next data page, loading the dictionary and skipping empty
    /// and index pages on the way. Returns `false` when the chunk has no
    /// further pages.
    fn advance_page(&mut self) -> Result<bool> {
        loop {
            let chunk_len = self.chunk.as_slice().len();
            if self.pos >= chunk_len {
                return Ok(false);
            }

            let (header, header_size) = {
                let slice = &self.chunk.as_slice()[self.pos..];
                let mut cursor = Cursor::new(slice);
                let header = read_page_header(&mut cursor, self.max_page_size)?;
                (header, cursor.position() as usize)
            };

            let compressed_size: usize = header
                .compressed_page_size
                .try_into()
                .map_err(|_| Error::oos("The compressed page size cannot be negative"))?;
            let uncompressed_size: usize = header
                .uncompressed_page_size
                .try_into()
                .map_err(|_| Error::oos("The uncompressed page size cannot be negative"))?;

            let body_start = self.pos + header_size;
            let body_end = body_start + compressed_size;
            if body_end > chunk_len {
                return Err(Error::oos(
                    "The page body extends past the end of the column chunk",
                ));
            }
            self.pos = body_end;

            if self.verify_crc {
                if let Some(expected) = header.crc {
                    let expected = expected as u32;
                    let got =
                        crc32fast::hash(&self.chunk.as_slice()[body_start..body_end]);
                    if expected != got {
                        return Err(Error::ChecksumMismatch { expected, got });
                    }
                }
            }

            let type_: PageType = header.type_.try_into()?;
            match type_ {
                PageType::DictionaryPage => {
                    self.load_dictionary(&header, body_start, compressed_size, uncompressed_size)?;
                }
                PageType::IndexPage => {}
                PageType::DataPage | PageType::DataPageV2 => {
                    let data_header = get_page_header(&header)?
                        .ok_or_else(|| Error::oos("The data page header is empty"))?;
                    if data_header.num_values() == 0 {
                        // nothing to decode in this page
                        continue;
                    }
                    self.decode_data_page(
                        data_header,
                        body_start,
                        compressed_size,
                        uncompressed_size,
                    )?;
                    return Ok(true);
                }
            }
        }
    }

    fn load_dictionary(
        &mut self,
        header: &crate::page::ParquetPageHeader,
        body_start: usize,
        compressed_size: usize,
        uncompressed_size: usize,
    ) -> Result<()> {
        if self.dictionary.is_some() {
            return Err(Error::oos(
                "A column chunk can have at most one dictionary page",
            ));
        }
        let dict_header = header
            .dictionary_page_header
            .as_ref()
            .ok_or_else(|| Error::oos("The dictionary page header is empty"))?;
        let num_values: usize = dict_header
            .num_values
            .try_into()
            .map_err(|_| Error::oos("The number of values cannot be negative"))?;
        let is_sorted = dict_header.is_sorted.unwrap_or(false);

        let body = &self.chunk.as_slice()[body_start..body_start + compressed_size];
        let page = if self.compression != Compression::Uncompressed {
            let mut buffer = vec![0; uncompressed_size];
            crate::compression::decompress(self.compression, body, &mut buffer)?;
            DictPage::new(buffer, num_values, is_sorted)
        } else {
            if body.len() != uncompressed_size {
                return Err(Error::oos(
                    "An uncompressed page must declare equal compressed and uncompressed sizes",
                ));
            }
            DictPage::new(body.to_vec(), num_values, is_sorted)
        };

        self.dictionary = Some(Dictionary::try_new(
            &page,
            self.descriptor.primitive_type.physical_type,
        )?);
        Ok(())
    }

    fn decode_data_page(
        &mut self,
        data_header: DataPageHeader,
        body_start: usize,
        compressed_size: usize,
        uncompressed_size: usize,
    ) -> Result<()> {
        let max_rep = self.descriptor.max_rep_level;
        let max_def = self.descriptor.max_def_level;
        let num_levels = data_header.num_values();
        let physical_type = self.descriptor.primitive_type.physical_type;

        // materialize the uncompressed body: borrow the chunk directly for
        // uncompressed pages, decompress into the reusable scratch otherwise
        let body_is_chunk = self.compression == Compression::Uncompressed;
        if !body_is_chunk {
            let compressed =
                &self.chunk.as_slice()[body_start..body_start + compressed_size];
            self.scratch.clear();
            self.scratch.resize(uncompressed_size, 0);
            match &data_header {
                DataPageHeader::V1(_) => {
                    crate::compression::decompress(
                        self.compression,
                        compressed,
                        &mut self.scratch,
                    )?;
                }
                DataPageHeader::V2(header_v2) => {
                    // levels of a v2 page are never compressed
                    let offset: usize = (header_v2.repetition_levels_byte_length
                        + header_v2.definition_levels_byte_length)
                        .try_into()
                        .map_err(|_| {
                            Error::oos("The levels byte length of a v2 page cannot be negative")
                        })?;
                    if offset > compressed.len() || offset > uncompressed_size {
                        return Err(Error::oos("The levels extend past the page body"));
                    }
                    self.scratch[..offset].copy_from_slice(&compressed[..offset]);
                    if header_v2.is_compressed.unwrap_or(true) {
                        crate::compression::decompress(
                            self.compression,
                            &compressed[offset..],
                            &mut self.scratch[offset..],
                        )?;
                    } else {
                        if compressed.len() != uncompressed_size {
                            return Err(Error::oos(
                                "An uncompressed page must declare equal compressed and uncompressed sizes",
                            ));
                        }
                        self.scratch[offset..].copy_from_slice(&compressed[offset..]);
                    }
                }
            }
        } else if compressed_size != uncompressed_size {
            return Err(Error::oos(
                "An uncompressed page must declare equal compressed and uncompressed sizes",
            ));
        }

        let body: &[u8] = if body_is_chunk {
            &self.chunk.as_slice()[body_start..body_start + compressed_size]
        } else {
            &self.scratch
        };

        let (rep_slice, def_slice, values_slice) =
            split_buffer_ref(body, &data_header, max_rep, max_def)?;

        // repetition levels
        self.page.rep_levels.clear();
        if max_rep > 0 {
            let decoder =
                HybridRleDecoder::try_new(rep_slice, get_bit_width(max_rep), num_levels)?;
            for value in decoder {
                self.page.rep_levels.push(value?);
            }
        }

        // definition levels; values below the maximum mean the value is
        // absent at some ancestor
        self.page.def_levels.clear();
        let num_non_null = if max_def > 0 {
            let decoder =
                HybridRleDecoder::try_new(def_slice, get_bit_width(max_def), num_levels)?;
            let mut non_null = 0;
            for value in decoder {
                let value = value?;
                if value as i16 == max_def {
                    non_null += 1;
                }
                self.page.def_levels.push(value);
            }
            non_null
        } else {
            num_levels
        };

        // values
        let encoding = match &data_header {
            DataPageHeader::V1(header) => header.encoding.try_into()?,
            DataPageHeader::V2(header) => header.encoding.try_into()?,
        };

        self.page.values.clear();
        self.page.borrowed = None;

        let zero_copy_eligible = body_is_chunk
            && encoding == Encoding::Plain
            && physical_type.size().is_some()
            && physical_type != PhysicalType::Boolean
            && max_def == 0
            && max_rep == 0
            && self.chunk.is_shared();

        if zero_copy_eligible {
            let size = physical_type.size().unwrap();
            if values_slice.len() < num_non_null * size {
                return Err(Error::InvalidEncoding(format!(
                    "PLAIN page holds {} bytes but {} values of {} bytes were declared",
                    values_slice.len(),
                    num_non_null,
                    size
                )));
            }
            let values_offset = body_start + (body.len() - values_slice.len());
            self.page.borrowed = Some((values_offset, num_non_null * size));
        } else {
            decode_values(
                values_slice,
                encoding,
                physical_type,
                num_non_null,
                self.dictionary.as_ref(),
                &mut self.indices,
                &mut self.page.values,
            )?;
        }

        self.page.num_levels = num_levels;
        self.page.levels_consumed = 0;
        self.page.values_bytes_consumed = 0;
        self.decoded_levels += num_levels;
        Ok(())
    }

    /// The canonical bytes of the current page's values.
    fn page_values(&self) -> &[u8] {
        match self.page.borrowed {
            Some((offset, length)) => &self.chunk.as_slice()[offset..offset + length],
            None => &self.page.values,
        }
    }

    // consumes `take` slots of the current page, appending levels to the
    // requested outputs; returns the byte range of the consumed values
    fn consume_slots(
        &mut self,
        take: usize,
        mut def_levels: Option<&mut Vec<u32>>,
        mut rep_levels: Option<&mut Vec<u32>>,
    ) -> Result<(usize, usize)> {
        let start_slot = self.page.levels_consumed;
        let max_def = self.descriptor.max_def_level;

        if let Some(def_levels) = def_levels.as_mut() {
            if max_def > 0 {
                def_levels
                    .extend_from_slice(&self.page.def_levels[start_slot..start_slot + take]);
            }
        }
        if let Some(rep_levels) = rep_levels.as_mut() {
            if self.descriptor.max_rep_level > 0 {
                rep_levels
                    .extend_from_slice(&self.page.rep_levels[start_slot..start_slot + take]);
            }
        }

        let non_null = if max_def > 0 {
            self.page.def_levels[start_slot..start_slot + take]
                .iter()
                .filter(|x| **x as i16 == max_def)
                .count()
        } else {
            take
        };

        let start_byte = self.page.values_bytes_consumed;
        let physical_type = self.descriptor.primitive_type.physical_type;
        let byte_len = value_bytes_len(
            &self.page_values()[start_byte..],
            non_null,
            physical_type,
        )?;

        self.page.levels_consumed += take;
        self.page.values_bytes_consumed += byte_len;
        self.consumed_levels += take;
        Ok((start_byte, byte_len))
    }

    /// Reads up to `max` values (including nulls) into the output buffers.
    ///
    /// `values` receives only the non-null values; when the column is
    /// nullable, `def_levels` tells which slots are present (a slot is
    /// non-null iff its definition level equals the maximum). Returns the
    /// number of slots consumed; `0` means the chunk is exhausted.
    pub fn read_batch<T: NativeType>(
        &mut self,
        values: &mut Vec<T>,
        max: usize,
        mut def_levels: Option<&mut Vec<u32>>,
        mut rep_levels: Option<&mut Vec<u32>>,
    ) -> Result<usize> {
        if T::TYPE != self.physical_type() {
            return Err(Error::InvalidParameter(format!(
                "cannot read a {:?} column into {:?} values",
                self.physical_type(),
                T::TYPE
            )));
        }
        let mut read = 0;
        while read < max {
            if !self.ensure_page()? {
                break;
            }
            let take = std::cmp::min(max - read, self.page_remaining());
            let (start, len) = self.consume_slots(
                take,
                def_levels.as_mut().map(|x| &mut **x),
                rep_levels.as_mut().map(|x| &mut **x),
            )?;
            let src = &self.page_values()[start..start + len];
            values.extend(
                src.chunks_exact(std::mem::size_of::<T>())
                    .map(crate::types::decode::<T>),
            );
            read += take;
        }
        Ok(read)
    }

    /// Reads up to `max` boolean values. See [`Self::read_batch`].
    pub fn read_boolean_batch(
        &mut self,
        values: &mut Vec<bool>,
        max: usize,
        mut def_levels: Option<&mut Vec<u32>>,
    ) -> Result<usize> {
        if self.physical_type() != PhysicalType::Boolean {
            return Err(Error::InvalidParameter(
                "cannot read a non-boolean column into booleans".to_string(),
            ));
        }
        let mut read = 0;
        while read < max {
            if !self.ensure_page()? {
                break;
            }
            let take = std::cmp::min(max - read, self.page_remaining());
            let (start, len) =
                self.consume_slots(take, def_levels.as_mut().map(|x| &mut **x), None)?;
            let src = &self.page_values()[start..start + len];
            values.extend(src.iter().map(|x| *x != 0));
            read += take;
        }
        Ok(read)
    }

    /// Reads up to `max` byte-array values. See [`Self::read_batch`].
    pub fn read_binary_batch(
        &mut self,
        values: &mut Vec<Vec<u8>>,
        max: usize,
        mut def_levels: Option<&mut Vec<u32>>,
    ) -> Result<usize> {
        if self.physical_type() != PhysicalType::ByteArray {
            return Err(Error::InvalidParameter(
                "cannot read a non-BYTE_ARRAY column into byte arrays".to_string(),
            ));
        }
        let mut read = 0;
        while read < max {
            if !self.ensure_page()? {
                break;
            }
            let take = std::cmp::min(max - read, self.page_remaining());
            let (start, len) =
                self.consume_slots(take, def_levels.as_mut().map(|x| &mut **x), None)?;
            let mut src = &self.page_values()[start..start + len];
            while !src.is_empty() {
                let length = u32::from_le_bytes(src[..4].try_into().unwrap()) as usize;
                values.push(src[4..4 + length].to_vec());
                src = &src[4 + length..];
            }
            read += take;
        }
        Ok(read)
    }

    /// Reads up to `max` fixed-length values, appending their concatenated
    /// bytes. See [`Self::read_batch`].
    pub fn read_fixed_batch(
        &mut self,
        values: &mut Vec<u8>,
        max: usize,
        mut def_levels: Option<&mut Vec<u32>>,
    ) -> Result<usize> {
        if !matches!(self.physical_type(), PhysicalType::FixedLenByteArray(_)) {
            return Err(Error::InvalidParameter(
                "cannot read a non-FIXED_LEN_BYTE_ARRAY column into fixed bytes".to_string(),
            ));
        }
        let mut read = 0;
        while read < max {
            if !self.ensure_page()? {
                break;
            }
            let take = std::cmp::min(max - read, self.page_remaining());
            let (start, len) =
                self.consume_slots(take, def_levels.as_mut().map(|x| &mut **x), None)?;
            let page_values = match self.page.borrowed {
                Some((offset, length)) => {
                    &self.chunk.as_slice()[offset..offset + length]
                }
                None => &self.page.values,
            };
            values.extend_from_slice(&page_values[start..start + len]);
            read += take;
        }
        Ok(read)
    }

    /// Skips the next `n` values (including nulls), returning how many were
    /// skipped. Pages are still decoded; their values are discarded.
    pub fn skip(&mut self, n: usize) -> Result<usize> {
        let mut skipped = 0;
        while skipped < n {
            if !self.ensure_page()? {
                break;
            }
            let take = std::cmp::min(n - skipped, self.page_remaining());
            self.consume_slots(take, None, None)?;
            skipped += take;
        }
        Ok(skipped)
    }

    /// Reads exactly `rows` slots for the batch reader, either appending the
    /// canonical bytes and definition levels to the outputs, or returning a
    /// borrow of the underlying shared bytes when the whole page can be
    /// viewed in place.
    pub(crate) fn read_rows_raw(
        &mut self,
        rows: usize,
        values: &mut Vec<u8>,
        def_levels: &mut Vec<u32>,
    ) -> Result<Option<(SharedBytes, usize, usize)>> {
        if rows == 0 {
            return Ok(None);
        }
        if !self.ensure_page()? {
            return Err(Error::oos(
                "the column chunk ended before the expected number of rows",
            ));
        }

        // a whole-page read of a borrow-eligible page is exposed in place
        if self.page.levels_consumed == 0 && self.page_remaining() == rows {
            if let Some((offset, length)) = self.page.borrowed {
                let shared = self.chunk.share(offset, length);
                if let Some(shared) = shared {
                    self.page.levels_consumed += rows;
                    self.page.values_bytes_consumed += length;
                    self.consumed_levels += rows;
                    return Ok(Some(shared));
                }
            }
        }

        let mut read = 0;
        while read < rows {
            if !self.ensure_page()? {
                return Err(Error::oos(
                    "the column chunk ended before the expected number of rows",
                ));
            }
            let take = std::cmp::min(rows - read, self.page_remaining());
            let (start, len) = self.consume_slots(take, Some(&mut *def_levels), None)?;
            let page_values = match self.page.borrowed {
                Some((offset, length)) => {
                    &self.chunk.as_slice()[offset..offset + length]
                }
                None => &self.page.values,
            };
            values.extend_from_slice(&page_values[start..start + len]);
            read += take;
        }
        Ok(None)
    }
}

/// Number of canonical bytes used by the next `count` values.
fn value_bytes_len(values: &[u8], count: usize, physical_type: PhysicalType) -> Result<usize> {
    match physical_type {
        PhysicalType::ByteArray => {
            let mut offset = 0;
            for _ in 0..count {
                let prefix: [u8; 4] = values
                    .get(offset..offset + 4)
                    .and_then(|x| x.try_into().ok())
                    .ok_or_else(|| {
                        Error::InvalidEncoding(
                            "the decoded page holds fewer values than requested".to_string(),
                        )
                    })?;
                offset += 4 + u32::from_le_bytes(prefix) as usize;
            }
            if offset > values.len() {
                return Err(Error::InvalidEncoding(
                    "the decoded page holds fewer bytes than requested".to_string(),
                ));
            }
            Ok(offset)
        }
        other => {
            let size = other.size().unwrap();
            if values.len() < count * size {
                return Err(Error::InvalidEncoding(
                    "the decoded page holds fewer values than requested".to_string(),
                ));
            }
            Ok(count * size)
        }
    }
}

/// Decodes `num_values` non-null values into the canonical layout.
fn decode_values(
    values: &[u8],
    encoding: Encoding,
    physical_type: PhysicalType,
    num_values: usize,
    dictionary: Option<&Dictionary>,
    indices: &mut Vec<u32>,
    out: &mut Vec<u8>,
) -> Result<()> {
    use crate::encoding::plain;
    match (encoding, physical_type) {
        (Encoding::Plain, PhysicalType::Boolean) => {
            if values.len() * 8 < num_values {
                return Err(Error::InvalidEncoding(format!(
                    "PLAIN boolean page holds {} bits but {} values were declared",
                    values.len() * 8,
                    num_values
                )));
            }
            out.extend(
                crate::encoding::hybrid_rle::BitmapIter::new(values, 0, num_values)
                    .map(|x| x as u8),
            );
            Ok(())
        }
        (Encoding::Plain, PhysicalType::ByteArray) => {
            let mut consumed = 0;
            for value in plain::BinaryIter::new(values, num_values) {
                consumed += 4 + value?.len();
            }
            out.extend_from_slice(&values[..consumed]);
            Ok(())
        }
        (Encoding::Plain, other) => {
            let size = other.size().unwrap();
            if values.len() < num_values * size {
                return Err(Error::InvalidEncoding(format!(
                    "PLAIN page holds {} bytes but {} values of {} bytes were declared",
                    values.len(),
                    num_values,
                    size
                )));
            }
            out.extend_from_slice(&values[..num_values * size]);
            Ok(())
        }
        (Encoding::PlainDictionary | Encoding::RleDictionary, _) => {
            let dictionary = dictionary.ok_or_else(|| {
                Error::oos("A dictionary-encoded page requires a dictionary page")
            })?;
            let bit_width = *values.first().ok_or_else(|| {
                Error::InvalidEncoding("A dictionary-encoded page requires a bit width".to_string())
            })?;
            if bit_width > 32 {
                return Err(Error::InvalidEncoding(format!(
                    "the dictionary index bit width {} is out of range",
                    bit_width
                )));
            }
            indices.clear();
            let decoder =
                HybridRleDecoder::try_new(&values[1..], bit_width as u32, num_values)?;
            for index in decoder {
                indices.push(index?);
            }

            // every index must point into the dictionary
            let count = dictionary.len() as u32;
            if let Some(bad) = indices.iter().find(|x| **x >= count) {
                return Err(Error::InvalidEncoding(format!(
                    "the dictionary index {} is out of range (dictionary holds {} values)",
                    bad, count
                )));
            }
            gather(dictionary, indices, physical_type, out);
            Ok(())
        }
        (Encoding::DeltaBinaryPacked, PhysicalType::Int32) => {
            let mut decoder = delta_bitpacked::Decoder::try_new(values)?;
            let mut decoded = 0;
            for value in decoder.by_ref().take(num_values) {
                out.extend_from_slice(&(value? as i32).to_le_bytes());
                decoded += 1;
            }
            check_count(decoded, num_values)
        }
        (Encoding::DeltaBinaryPacked, PhysicalType::Int64) => {
            let mut decoder = delta_bitpacked::Decoder::try_new(values)?;
            let mut decoded = 0;
            for value in decoder.by_ref().take(num_values) {
                out.extend_from_slice(&value?.to_le_bytes());
                decoded += 1;
            }
            check_count(decoded, num_values)
        }
        (Encoding::DeltaLengthByteArray, PhysicalType::ByteArray) => {
            let decoder = delta_length_byte_array::Decoder::try_new(values, num_values)?;
            for value in decoder {
                out.extend_from_slice(&(value.len() as u32).to_le_bytes());
                out.extend_from_slice(value);
            }
            Ok(())
        }
        (Encoding::ByteStreamSplit, PhysicalType::Float) => {
            let mut decoded = 0;
            for value in byte_stream_split::Decoder::<f32>::try_new(values)?.take(num_values) {
                out.extend_from_slice(&value?.to_le_bytes());
                decoded += 1;
            }
            check_count(decoded, num_values)
        }
        (Encoding::ByteStreamSplit, PhysicalType::Double) => {
            let mut decoded = 0;
            for value in byte_stream_split::Decoder::<f64>::try_new(values)?.take(num_values) {
                out.extend_from_slice(&value?.to_le_bytes());
                decoded += 1;
            }
            check_count(decoded, num_values)
        }
        (encoding, physical_type) => Err(Error::InvalidEncoding(format!(
            "the encoding {:?} is not supported for {:?} columns",
            encoding, physical_type
        ))),
    }
}

fn check_count(decoded: usize, expected: usize) -> Result<()> {
    if decoded != expected {
        return Err(Error::InvalidEncoding(format!(
            "the page declares {} values but its stream holds {}",
            expected, decoded
        )));
    }
    Ok(())
}

/// Gathers dictionary values by index into the canonical layout. The
/// fixed-stride path is unrolled when 128-bit lanes are available; a scalar
/// path is always present.
fn gather(dictionary: &Dictionary, indices: &[u32], physical_type: PhysicalType, out: &mut Vec<u8>) {
    match (dictionary, physical_type) {
        (Dictionary::Binary { .. }, _) => {
            for index in indices {
                let value = dictionary.value(*index as usize);
                out.extend_from_slice(&(value.len() as u32).to_le_bytes());
                out.extend_from_slice(value);
            }
        }
        (Dictionary::Fixed { data, size }, _) => {
            out.reserve(indices.len() * size);
            if crate::cpu::capabilities().simd128 {
                let mut chunks = indices.chunks_exact(4);
                for chunk in &mut chunks {
                    for index in chunk {
                        let start = *index as usize * size;
                        out.extend_from_slice(&data[start..start + size]);
                    }
                }
                for index in chunks.remainder() {
                    let start = *index as usize * size;
                    out.extend_from_slice(&data[start..start + size]);
                }
            } else {
                for index in indices {
                    let start = *index as usize * size;
                    out.extend_from_slice(&data[start..start + size]);
                }
            }
        }
    }
}
