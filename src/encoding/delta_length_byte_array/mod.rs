//! `DELTA_LENGTH_BYTE_ARRAY`: all lengths delta-binary-packed up front,
//! followed by the concatenated byte arrays.

use super::delta_bitpacked;
use crate::error::{Error, Result};

/// Encodes an iterator of byte slices.
pub fn encode<'a, I: Iterator<Item = &'a [u8]> + Clone>(iterator: I, buffer: &mut Vec<u8>) {
    delta_bitpacked::encode(iterator.clone().map(|x| x.len() as i64), buffer);

    for bytes in iterator {
        buffer.extend_from_slice(bytes);
    }
}

/// Decoder of a `DELTA_LENGTH_BYTE_ARRAY` page body; an [`Iterator`] of the
/// byte arrays.
#[derive(Debug)]
pub struct Decoder<'a> {
    data: &'a [u8],
    offset: usize,
    lengths: std::vec::IntoIter<usize>,
}

impl<'a> Decoder<'a> {
    pub fn try_new(values: &'a [u8], count: usize) -> Result<Self> {
        let mut lengths_decoder = delta_bitpacked::Decoder::try_new(values)?;
        let mut lengths = Vec::with_capacity(count);
        let mut total = 0usize;
        for _ in 0..count {
            let length = lengths_decoder.next().transpose()?.ok_or_else(|| {
                Error::InvalidEncoding(
                    "DELTA_LENGTH_BYTE_ARRAY holds fewer lengths than values".to_string(),
                )
            })?;
            let length: usize = length
                .try_into()
                .map_err(|_| Error::InvalidEncoding("negative byte array length".to_string()))?;
            total += length;
            lengths.push(length);
        }

        let offset = lengths_decoder.consumed_bytes();
        if offset + total > values.len() {
            return Err(Error::InvalidEncoding(
                "DELTA_LENGTH_BYTE_ARRAY data is shorter than the sum of its lengths".to_string(),
            ));
        }

        Ok(Self {
            data: values,
            offset,
            lengths: lengths.into_iter(),
        })
    }
}

impl<'a> Iterator for Decoder<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let length = self.lengths.next()?;
        let result = &self.data[self.offset..self.offset + length];
        self.offset += length;
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.lengths.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let data: Vec<&[u8]> = vec![b"aa", b"bbb", b"", b"a", b"aa", b""];

        let mut buffer = vec![];
        encode(data.clone().into_iter(), &mut buffer);

        let iter = Decoder::try_new(&buffer, data.len()).unwrap();
        let result = iter.collect::<Vec<_>>();
        assert_eq!(result, data);
    }

    #[test]
    fn many_values() {
        let owned: Vec<Vec<u8>> = (0..500).map(|i| vec![(i % 250) as u8; i % 31]).collect();
        let data: Vec<&[u8]> = owned.iter().map(|x| x.as_slice()).collect();

        let mut buffer = vec![];
        encode(data.clone().into_iter(), &mut buffer);

        let iter = Decoder::try_new(&buffer, data.len()).unwrap();
        let result = iter.collect::<Vec<_>>();
        assert_eq!(result, data);
    }

    #[test]
    fn truncated_data_errors() {
        let data: Vec<&[u8]> = vec![b"aaaa", b"bbbb"];
        let mut buffer = vec![];
        encode(data.into_iter(), &mut buffer);
        buffer.truncate(buffer.len() - 2);
        assert!(Decoder::try_new(&buffer, 2).is_err());
    }
}
