use std::collections::HashMap;
use std::sync::Arc;

use parquet_format_safe::DataPageHeader as DataPageHeaderV1;

use crate::encoding::hybrid_rle::encode_u32;
use crate::encoding::{log2, plain, Encoding};
use crate::error::{Error, Result};
use crate::metadata::ColumnDescriptor;
use crate::page::{DataPage, DataPageHeader, DictPage, Page};
use crate::read::levels::get_bit_width;
use crate::schema::types::PhysicalType;
use crate::statistics::{
    serialize_statistics, BinaryStatistics, BooleanStatistics, FixedLenStatistics,
    PrimitiveStatistics, Statistics,
};
use crate::types::{decode, NativeType};

// a dictionary holding this many entries can no longer be indexed by an i32
const MAX_DICTIONARY_CARDINALITY: usize = (1 << 31) - 1;

/// One batch of values of a single column, to be written.
///
/// The slices hold only the non-null values; null positions are described by
/// the definition levels passed alongside.
#[derive(Debug, Clone, Copy)]
pub enum ColumnBatch<'a> {
    Boolean(&'a [bool]),
    Int32(&'a [i32]),
    Int64(&'a [i64]),
    Int96(&'a [[u32; 3]]),
    Float(&'a [f32]),
    Double(&'a [f64]),
    ByteArray(&'a [&'a [u8]]),
    /// Concatenated fixed-length values; the slice length must be a multiple
    /// of the column's fixed size.
    FixedLenByteArray(&'a [u8]),
}

impl<'a> ColumnBatch<'a> {
    fn physical_type(&self, fixed_size: usize) -> PhysicalType {
        match self {
            ColumnBatch::Boolean(_) => PhysicalType::Boolean,
            ColumnBatch::Int32(_) => PhysicalType::Int32,
            ColumnBatch::Int64(_) => PhysicalType::Int64,
            ColumnBatch::Int96(_) => PhysicalType::Int96,
            ColumnBatch::Float(_) => PhysicalType::Float,
            ColumnBatch::Double(_) => PhysicalType::Double,
            ColumnBatch::ByteArray(_) => PhysicalType::ByteArray,
            ColumnBatch::FixedLenByteArray(_) => PhysicalType::FixedLenByteArray(fixed_size),
        }
    }

    fn count(&self, fixed_size: usize) -> usize {
        match self {
            ColumnBatch::Boolean(values) => values.len(),
            ColumnBatch::Int32(values) => values.len(),
            ColumnBatch::Int64(values) => values.len(),
            ColumnBatch::Int96(values) => values.len(),
            ColumnBatch::Float(values) => values.len(),
            ColumnBatch::Double(values) => values.len(),
            ColumnBatch::ByteArray(values) => values.len(),
            ColumnBatch::FixedLenByteArray(values) => values.len() / fixed_size.max(1),
        }
    }
}

#[derive(Debug, Default)]
struct DictBuilder {
    map: HashMap<Vec<u8>, u32>,
    // the PLAIN body of the dictionary page, values in first-seen order
    plain: Vec<u8>,
    // one index per non-null value
    indices: Vec<u32>,
    value_bytes: usize,
}

impl DictBuilder {
    fn push(&mut self, raw: &[u8], physical_type: PhysicalType) {
        let next = self.map.len() as u32;
        let index = *self.map.entry(raw.to_vec()).or_insert_with(|| {
            if physical_type == PhysicalType::ByteArray {
                plain::encode_binary_value(raw, &mut self.plain);
            } else {
                self.plain.extend_from_slice(raw);
            }
            self.value_bytes += raw.len();
            next
        });
        self.indices.push(index);
    }
}

/// Per-page settings of [`ColumnWriter::flush_pages`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct PageOptions {
    pub data_page_bytes: usize,
    pub write_statistics: bool,
}

/// Buffers the values of one column of the open row group and encodes them
/// into pages on flush.
///
/// Values accumulate into a dictionary candidate until its byte size exceeds
/// `dictionary_page_bytes` or its cardinality can no longer be indexed; past
/// that, the whole chunk falls back to PLAIN.
pub(crate) struct ColumnWriter {
    descriptor: ColumnDescriptor,
    // canonical non-null values: little-endian fixed stride, one byte per
    // boolean, u32 length-prefixed bytes for BYTE_ARRAY
    values: Vec<u8>,
    def_levels: Vec<u32>,
    rep_levels: Vec<u32>,
    num_slots: usize,
    num_values: usize,
    dict: Option<DictBuilder>,
    dictionary_enabled: bool,
    dictionary_page_bytes: usize,
}

impl ColumnWriter {
    pub fn new(
        descriptor: ColumnDescriptor,
        dictionary_enabled: bool,
        dictionary_page_bytes: usize,
    ) -> Self {
        let physical_type = descriptor.descriptor.primitive_type.physical_type;
        let dictionary_enabled = dictionary_enabled && physical_type != PhysicalType::Boolean;
        Self {
            descriptor,
            values: vec![],
            def_levels: vec![],
            rep_levels: vec![],
            num_slots: 0,
            num_values: 0,
            dict: dictionary_enabled.then(DictBuilder::default),
            dictionary_enabled,
            dictionary_page_bytes,
        }
    }

    fn physical_type(&self) -> PhysicalType {
        self.descriptor.descriptor.primitive_type.physical_type
    }

    fn fixed_size(&self) -> usize {
        self.physical_type().size().unwrap_or(0)
    }

    /// The number of rows buffered so far.
    pub fn rows(&self) -> usize {
        if self.descriptor.descriptor.max_rep_level > 0 {
            self.rep_levels.iter().filter(|x| **x == 0).count()
        } else {
            self.num_slots
        }
    }

    /// An estimate of the uncompressed bytes buffered so far.
    pub fn buffered_bytes(&self) -> usize {
        self.values.len() + (self.def_levels.len() + self.rep_levels.len()) * 2
    }

    /// Buffers a batch of values and levels.
    pub fn write(
        &mut self,
        batch: ColumnBatch,
        def_levels: Option<&[u32]>,
        rep_levels: Option<&[u32]>,
    ) -> Result<()> {
        let physical_type = self.physical_type();
        if batch.physical_type(self.fixed_size()) != physical_type {
            return Err(Error::InvalidParameter(format!(
                "cannot write {:?} values into a {:?} column",
                batch.physical_type(self.fixed_size()),
                physical_type
            )));
        }
        if let ColumnBatch::FixedLenByteArray(values) = &batch {
            if values.len() % self.fixed_size().max(1) != 0 {
                return Err(Error::InvalidParameter(
                    "the fixed-length values are not a multiple of the column's size".to_string(),
                ));
            }
        }
        let count = batch.count(self.fixed_size());

        let max_def = self.descriptor.descriptor.max_def_level;
        let max_rep = self.descriptor.descriptor.max_rep_level;

        // definition levels: a slot is present iff its level equals the
        // maximum
        let slots = if max_def > 0 {
            match def_levels {
                Some(levels) => {
                    let present = levels
                        .iter()
                        .filter(|x| **x as i16 == max_def)
                        .count();
                    if present != count {
                        return Err(Error::InvalidParameter(format!(
                            "the definition levels declare {} present values but {} were supplied",
                            present, count
                        )));
                    }
                    if let Some(bad) = levels.iter().find(|x| **x as i16 > max_def) {
                        return Err(Error::InvalidParameter(format!(
                            "the definition level {} exceeds the column's maximum {}",
                            bad, max_def
                        )));
                    }
                    self.def_levels.extend_from_slice(levels);
                    levels.len()
                }
                None => {
                    // absent levels mean every value is present
                    self.def_levels
                        .extend(std::iter::repeat(max_def as u32).take(count));
                    count
                }
            }
        } else {
            if def_levels.is_some() {
                return Err(Error::InvalidParameter(
                    "a REQUIRED column takes no definition levels".to_string(),
                ));
            }
            count
        };

        if max_rep > 0 {
            let levels = rep_levels.ok_or_else(|| {
                Error::InvalidParameter(
                    "a REPEATED column requires repetition levels".to_string(),
                )
            })?;
            if levels.len() != slots {
                return Err(Error::InvalidParameter(
                    "the repetition levels must cover every slot".to_string(),
                ));
            }
            self.rep_levels.extend_from_slice(levels);
        } else if rep_levels.is_some() {
            return Err(Error::InvalidParameter(
                "a non-repeated column takes no repetition levels".to_string(),
            ));
        }

        self.append_values(&batch);
        self.num_slots += slots;
        self.num_values += count;

        // a dictionary that grew past its budget falls back to PLAIN for
        // this chunk
        if let Some(dict) = &self.dict {
            if dict.value_bytes > self.dictionary_page_bytes
                || dict.map.len() >= MAX_DICTIONARY_CARDINALITY
            {
                self.dict = None;
            }
        }
        Ok(())
    }

    fn append_values(&mut self, batch: &ColumnBatch) {
        match batch {
            ColumnBatch::Boolean(values) => {
                self.values.extend(values.iter().map(|x| *x as u8));
            }
            ColumnBatch::Int32(values) => self.append_native(values),
            ColumnBatch::Int64(values) => self.append_native(values),
            ColumnBatch::Int96(values) => self.append_native(values),
            ColumnBatch::Float(values) => self.append_native(values),
            ColumnBatch::Double(values) => self.append_native(values),
            ColumnBatch::ByteArray(values) => {
                for value in values.iter() {
                    plain::encode_binary_value(value, &mut self.values);
                    if let Some(dict) = &mut self.dict {
                        dict.push(value, PhysicalType::ByteArray);
                    }
                }
            }
            ColumnBatch::FixedLenByteArray(values) => {
                self.values.extend_from_slice(values);
                if let Some(dict) = self.dict.as_mut() {
                    let size = self
                        .descriptor
                        .descriptor
                        .primitive_type
                        .physical_type
                        .size()
                        .unwrap()
                        .max(1);
                    let physical_type = self.descriptor.descriptor.primitive_type.physical_type;
                    for value in values.chunks_exact(size) {
                        dict.push(value, physical_type);
                    }
                }
            }
        }
    }

    fn append_native<T: NativeType>(&mut self, values: &[T]) {
        let physical_type = self.physical_type();
        for value in values {
            let bytes = value.to_le_bytes();
            self.values.extend_from_slice(bytes.as_ref());
            if let Some(dict) = &mut self.dict {
                dict.push(bytes.as_ref(), physical_type);
            }
        }
    }

    /// Encodes the buffered chunk into pages (an optional dictionary page
    /// first, then data pages of at most `data_page_bytes` values each) and
    /// resets the buffers for the next chunk.
    pub fn flush_pages(&mut self, options: &PageOptions) -> Result<Vec<Page>> {
        let physical_type = self.physical_type();

        let dict = self.dict.take();
        let mut pages = vec![];

        if let Some(dict) = &dict {
            pages.push(Page::Dict(DictPage::new(
                dict.plain.clone(),
                dict.map.len(),
                false,
            )));
        }

        // cut the slots into pages at the soft byte threshold
        let boundaries = self.page_boundaries(options.data_page_bytes)?;

        for window in boundaries.windows(2) {
            let (start, end) = (window[0], window[1]);
            pages.push(self.encode_page(start, end, dict.as_ref(), options)?);
        }
        // a chunk with no rows still emits no data pages
        debug_assert!(boundaries.len() >= 2 || self.num_slots == 0);

        self.values.clear();
        self.def_levels.clear();
        self.rep_levels.clear();
        self.num_slots = 0;
        self.num_values = 0;
        self.dict = (self.dictionary_enabled && physical_type != PhysicalType::Boolean)
            .then(DictBuilder::default);

        Ok(pages)
    }

    // per-page boundaries: (slot, non-null value index, value byte offset)
    fn page_boundaries(&self, data_page_bytes: usize) -> Result<Vec<PageBoundary>> {
        let physical_type = self.physical_type();
        let max_def = self.descriptor.descriptor.max_def_level;

        let mut boundaries = vec![PageBoundary::default()];
        if self.num_slots == 0 {
            return Ok(boundaries);
        }

        let mut cursor = PageBoundary::default();
        let mut bytes_in_page = 0usize;
        for slot in 0..self.num_slots {
            let is_present = max_def == 0 || self.def_levels[slot] as i16 == max_def;
            cursor.slot += 1;
            if is_present {
                let size = match physical_type {
                    PhysicalType::ByteArray => {
                        let prefix: [u8; 4] = self.values
                            [cursor.value_byte..cursor.value_byte + 4]
                            .try_into()
                            .unwrap();
                        4 + u32::from_le_bytes(prefix) as usize
                    }
                    PhysicalType::Boolean => 1,
                    other => other.size().unwrap(),
                };
                cursor.value += 1;
                cursor.value_byte += size;
                bytes_in_page += size;
            }
            if bytes_in_page >= data_page_bytes && slot + 1 < self.num_slots {
                boundaries.push(cursor);
                bytes_in_page = 0;
            }
        }
        boundaries.push(cursor);
        Ok(boundaries)
    }

    fn encode_page(
        &self,
        start: PageBoundary,
        end: PageBoundary,
        dict: Option<&DictBuilder>,
        options: &PageOptions,
    ) -> Result<Page> {
        let max_def = self.descriptor.descriptor.max_def_level;
        let max_rep = self.descriptor.descriptor.max_rep_level;
        let physical_type = self.physical_type();
        let num_slots = end.slot - start.slot;

        let mut buffer = vec![];

        // v1 level streams are length-prefixed hybrid-RLE
        if max_rep > 0 {
            encode_levels(
                &self.rep_levels[start.slot..end.slot],
                max_rep,
                &mut buffer,
            )?;
        }
        if max_def > 0 {
            encode_levels(
                &self.def_levels[start.slot..end.slot],
                max_def,
                &mut buffer,
            )?;
        }

        let encoding = if let Some(dict) = dict {
            let indices = &dict.indices[start.value..end.value];
            let num_bits = if dict.map.len() > 1 {
                log2(dict.map.len() as u64 - 1)
            } else {
                1
            };
            buffer.push(num_bits as u8);
            encode_u32(&mut buffer, indices.iter().copied(), num_bits)?;
            Encoding::RleDictionary
        } else {
            match physical_type {
                PhysicalType::Boolean => {
                    plain::encode_bool(
                        self.values[start.value_byte..end.value_byte]
                            .iter()
                            .map(|x| *x != 0),
                        &mut buffer,
                    )?;
                }
                _ => {
                    buffer.extend_from_slice(&self.values[start.value_byte..end.value_byte]);
                }
            }
            Encoding::Plain
        };

        let statistics = if options.write_statistics {
            Some(serialize_statistics(
                self.page_statistics(start, end)?.as_ref(),
            ))
        } else {
            None
        };

        let header = DataPageHeaderV1 {
            num_values: num_slots as i32,
            encoding: encoding.into(),
            definition_level_encoding: Encoding::Rle.into(),
            repetition_level_encoding: Encoding::Rle.into(),
            statistics,
        };

        Ok(Page::Data(DataPage::new(
            DataPageHeader::V1(header),
            buffer,
            self.descriptor.descriptor.clone(),
        )))
    }

    fn page_statistics(
        &self,
        start: PageBoundary,
        end: PageBoundary,
    ) -> Result<Arc<dyn Statistics>> {
        let physical_type = self.physical_type();
        let primitive_type = self.descriptor.descriptor.primitive_type.clone();
        let max_def = self.descriptor.descriptor.max_def_level;

        let null_count = if max_def > 0 {
            self.def_levels[start.slot..end.slot]
                .iter()
                .filter(|x| (**x as i16) < max_def)
                .count() as i64
        } else {
            0
        };

        let values = &self.values[start.value_byte..end.value_byte];

        Ok(match physical_type {
            PhysicalType::Boolean => {
                let mut min = None;
                let mut max = None;
                for value in values.iter().map(|x| *x != 0) {
                    min = Some(min.map_or(value, |x: bool| x & value));
                    max = Some(max.map_or(value, |x: bool| x | value));
                }
                Arc::new(BooleanStatistics {
                    null_count: Some(null_count),
                    distinct_count: None,
                    min_value: min,
                    max_value: max,
                })
            }
            PhysicalType::Int32 => min_max_native::<i32>(values, primitive_type, null_count),
            PhysicalType::Int64 => min_max_native::<i64>(values, primitive_type, null_count),
            PhysicalType::Int96 => min_max_native::<[u32; 3]>(values, primitive_type, null_count),
            PhysicalType::Float => min_max_native::<f32>(values, primitive_type, null_count),
            PhysicalType::Double => min_max_native::<f64>(values, primitive_type, null_count),
            PhysicalType::ByteArray => {
                let mut min: Option<&[u8]> = None;
                let mut max: Option<&[u8]> = None;
                let mut remaining = values;
                while !remaining.is_empty() {
                    let length =
                        u32::from_le_bytes(remaining[..4].try_into().unwrap()) as usize;
                    let value = &remaining[4..4 + length];
                    min = Some(min.map_or(value, |x| x.min(value)));
                    max = Some(max.map_or(value, |x| x.max(value)));
                    remaining = &remaining[4 + length..];
                }
                Arc::new(BinaryStatistics {
                    primitive_type,
                    null_count: Some(null_count),
                    distinct_count: None,
                    min_value: min.map(|x| x.to_vec()),
                    max_value: max.map(|x| x.to_vec()),
                })
            }
            PhysicalType::FixedLenByteArray(size) => {
                let mut min: Option<&[u8]> = None;
                let mut max: Option<&[u8]> = None;
                for value in values.chunks_exact(size.max(1)) {
                    min = Some(min.map_or(value, |x| x.min(value)));
                    max = Some(max.map_or(value, |x| x.max(value)));
                }
                Arc::new(FixedLenStatistics::new(
                    size,
                    Some(null_count),
                    None,
                    min.map(|x| x.to_vec()),
                    max.map(|x| x.to_vec()),
                ))
            }
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PageBoundary {
    slot: usize,
    value: usize,
    value_byte: usize,
}

fn min_max_native<T: NativeType>(
    values: &[u8],
    primitive_type: crate::schema::types::PrimitiveType,
    null_count: i64,
) -> Arc<dyn Statistics> {
    let mut min: Option<T> = None;
    let mut max: Option<T> = None;
    for value in values
        .chunks_exact(std::mem::size_of::<T>())
        .map(decode::<T>)
    {
        min = Some(min.map_or(value, |x| {
            if x.ord(&value) == std::cmp::Ordering::Greater {
                value
            } else {
                x
            }
        }));
        max = Some(max.map_or(value, |x| {
            if x.ord(&value) == std::cmp::Ordering::Less {
                value
            } else {
                x
            }
        }));
    }
    Arc::new(PrimitiveStatistics::<T> {
        primitive_type,
        null_count: Some(null_count),
        distinct_count: None,
        min_value: min,
        max_value: max,
    })
}

fn encode_levels(levels: &[u32], max_level: i16, buffer: &mut Vec<u8>) -> Result<()> {
    let num_bits = get_bit_width(max_level);
    let mut encoded = vec![];
    encode_u32(&mut encoded, levels.iter().copied(), num_bits)?;
    buffer.extend_from_slice(&(encoded.len() as u32).to_le_bytes());
    buffer.extend_from_slice(&encoded);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::SchemaDescriptor;

    fn writer_for(message: &str, dictionary: bool) -> ColumnWriter {
        let schema = SchemaDescriptor::try_from_message(message).unwrap();
        ColumnWriter::new(schema.columns()[0].clone(), dictionary, 1024 * 1024)
    }

    #[test]
    fn plain_pages_cut_at_threshold() -> Result<()> {
        let mut writer = writer_for("message m { REQUIRED INT32 a; }", false);
        let values = (0..1000i32).collect::<Vec<_>>();
        writer.write(ColumnBatch::Int32(&values), None, None)?;

        let pages = writer.flush_pages(&PageOptions {
            data_page_bytes: 1024,
            write_statistics: true,
        })?;
        // 4000 bytes at a 1024-byte threshold
        assert_eq!(pages.len(), 4);
        Ok(())
    }

    #[test]
    fn dictionary_page_comes_first() -> Result<()> {
        let mut writer = writer_for("message m { REQUIRED INT32 a; }", true);
        let values = (0..1000i32).map(|x| x % 10).collect::<Vec<_>>();
        writer.write(ColumnBatch::Int32(&values), None, None)?;

        let pages = writer.flush_pages(&PageOptions {
            data_page_bytes: 1024 * 1024,
            write_statistics: true,
        })?;
        assert!(matches!(pages[0], Page::Dict(_)));
        assert_eq!(pages.len(), 2);
        if let Page::Dict(dict) = &pages[0] {
            assert_eq!(dict.num_values, 10);
        }
        Ok(())
    }

    #[test]
    fn dictionary_falls_back_when_too_large() -> Result<()> {
        let schema = SchemaDescriptor::try_from_message("message m { REQUIRED INT64 a; }").unwrap();
        let mut writer = ColumnWriter::new(schema.columns()[0].clone(), true, 64);
        let values = (0..1000i64).collect::<Vec<_>>();
        writer.write(ColumnBatch::Int64(&values), None, None)?;

        let pages = writer.flush_pages(&PageOptions {
            data_page_bytes: 1024 * 1024,
            write_statistics: false,
        })?;
        assert_eq!(pages.len(), 1);
        assert!(matches!(pages[0], Page::Data(_)));
        Ok(())
    }

    #[test]
    fn nullable_values_and_levels() -> Result<()> {
        let mut writer = writer_for("message m { OPTIONAL INT32 a; }", false);
        writer.write(
            ColumnBatch::Int32(&[1, 2, 3]),
            Some(&[1, 0, 1, 1, 0]),
            None,
        )?;
        assert_eq!(writer.rows(), 5);

        let pages = writer.flush_pages(&PageOptions {
            data_page_bytes: 1024,
            write_statistics: true,
        })?;
        assert_eq!(pages.len(), 1);
        if let Page::Data(page) = &pages[0] {
            assert_eq!(page.num_values(), 5);
            let statistics = page.statistics().unwrap()?;
            assert_eq!(statistics.null_count(), Some(2));
        } else {
            panic!("expected a data page");
        }
        Ok(())
    }

    #[test]
    fn mismatched_levels_are_rejected() {
        let mut writer = writer_for("message m { OPTIONAL INT32 a; }", false);
        // two values declared present but three supplied
        let result = writer.write(ColumnBatch::Int32(&[1, 2, 3]), Some(&[1, 1, 0]), None);
        assert!(result.is_err());
    }
}
