use crate::error::{Error, Result};
use crate::page::DictPage;
use crate::schema::types::PhysicalType;

/// A dictionary page decoded into an indexable table of values.
///
/// Numeric and fixed-length values are stored at a fixed stride; BYTE_ARRAY
/// values are stored as a contiguous blob with an eagerly-built offset table,
/// trading O(count) memory for O(1) lookup per index.
#[derive(Debug, Clone)]
pub enum Dictionary {
    Fixed {
        data: Vec<u8>,
        size: usize,
    },
    Binary {
        data: Vec<u8>,
        // monotonically increasing, `len() == count + 1`
        offsets: Vec<u32>,
    },
}

impl Dictionary {
    /// Decodes a PLAIN-encoded dictionary page.
    pub fn try_new(page: &DictPage, physical_type: PhysicalType) -> Result<Self> {
        match physical_type {
            PhysicalType::Boolean => Err(Error::oos(
                "Boolean physical type cannot be dictionary-encoded",
            )),
            PhysicalType::ByteArray => {
                let mut offsets = Vec::with_capacity(page.num_values + 1);
                let mut data = Vec::with_capacity(page.buffer.len());
                let mut remaining = page.buffer.as_slice();
                offsets.push(0u32);
                for _ in 0..page.num_values {
                    if remaining.len() < 4 {
                        return Err(Error::oos(
                            "The dictionary page ends within a length prefix",
                        ));
                    }
                    let length =
                        u32::from_le_bytes(remaining[..4].try_into().unwrap()) as usize;
                    remaining = &remaining[4..];
                    if length > remaining.len() {
                        return Err(Error::oos(
                            "A dictionary length prefix points past the end of the page",
                        ));
                    }
                    data.extend_from_slice(&remaining[..length]);
                    offsets.push(data.len() as u32);
                    remaining = &remaining[length..];
                }
                Ok(Self::Binary { data, offsets })
            }
            other => {
                let size = other.size().unwrap();
                let needed = size * page.num_values;
                if page.buffer.len() < needed {
                    return Err(Error::oos(format!(
                        "The dictionary page declares {} values of {} bytes but holds {} bytes",
                        page.num_values,
                        size,
                        page.buffer.len()
                    )));
                }
                Ok(Self::Fixed {
                    data: page.buffer[..needed].to_vec(),
                    size,
                })
            }
        }
    }

    /// The number of values in this dictionary.
    pub fn len(&self) -> usize {
        match self {
            Self::Fixed { data, size } => data.len() / size,
            Self::Binary { offsets, .. } => offsets.len() - 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The raw bytes of value `i`.
    /// # Panics
    /// Panics iff `i >= self.len()`.
    #[inline]
    pub fn value(&self, i: usize) -> &[u8] {
        match self {
            Self::Fixed { data, size } => &data[i * size..(i + 1) * size],
            Self::Binary { data, offsets } => {
                &data[offsets[i] as usize..offsets[i + 1] as usize]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_lookup() {
        let mut buffer = vec![];
        for v in [10i32, 20, 30] {
            buffer.extend_from_slice(&v.to_le_bytes());
        }
        let page = DictPage::new(buffer, 3, false);
        let dict = Dictionary::try_new(&page, PhysicalType::Int32).unwrap();
        assert_eq!(dict.len(), 3);
        assert_eq!(dict.value(1), &20i32.to_le_bytes());
    }

    #[test]
    fn binary_offset_table() {
        let mut buffer = vec![];
        for v in [b"aa".as_slice(), b"".as_slice(), b"ccc".as_slice()] {
            buffer.extend_from_slice(&(v.len() as u32).to_le_bytes());
            buffer.extend_from_slice(v);
        }
        let page = DictPage::new(buffer, 3, false);
        let dict = Dictionary::try_new(&page, PhysicalType::ByteArray).unwrap();
        assert_eq!(dict.len(), 3);
        assert_eq!(dict.value(0), b"aa");
        assert_eq!(dict.value(1), b"");
        assert_eq!(dict.value(2), b"ccc");
    }

    #[test]
    fn truncated_dictionary_errors() {
        let page = DictPage::new(vec![0u8; 7], 2, false);
        assert!(Dictionary::try_new(&page, PhysicalType::Int32).is_err());

        let page = DictPage::new(vec![9, 0, 0, 0, 1], 1, false);
        assert!(Dictionary::try_new(&page, PhysicalType::ByteArray).is_err());
    }
}
