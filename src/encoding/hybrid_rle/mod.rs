// See https://github.com/apache/parquet-format/blob/master/Encodings.md#run-length-encoding--bit-packing-hybrid-rle--3
mod bitmap;
mod decoder;
mod encoder;
pub use bitmap::{encode_bool as bitpacked_encode, BitmapIter};
pub use decoder::Decoder;
pub use encoder::{encode_bool, encode_u32};

use crate::encoding::bitpacked;
use crate::error::{Error, Result};

/// A single run of the hybrid encoding.
#[derive(Debug, PartialEq, Eq)]
pub enum HybridEncoded<'a> {
    /// A bit-packed group of `run_length` values (a multiple of 8).
    Bitpacked(&'a [u8]),
    /// `run_length` repetitions of the value stored in the
    /// `ceil8(num_bits)`-byte little-endian slice.
    Rle(&'a [u8], usize),
}

enum State<'a> {
    Bitpacked(bitpacked::Decoder<'a>),
    Rle { value: u32, remaining: usize },
    Finished,
}

/// A flat [`Iterator`] of `u32` over a hybrid RLE/bit-packed stream whose
/// total number of values is known from the page header.
pub struct HybridRleDecoder<'a> {
    runs: Decoder<'a>,
    state: State<'a>,
    num_bits: u32,
    remaining: usize,
}

impl<'a> HybridRleDecoder<'a> {
    /// Returns a new [`HybridRleDecoder`]. A `num_bits` of zero decodes
    /// `num_values` zeros without touching the stream.
    pub fn try_new(values: &'a [u8], num_bits: u32, num_values: usize) -> Result<Self> {
        if num_bits > 32 {
            return Err(Error::InvalidEncoding(format!(
                "bit width {} is out of the supported range",
                num_bits
            )));
        }
        let mut this = Self {
            runs: Decoder::new(values, num_bits),
            state: State::Finished,
            num_bits,
            remaining: num_values,
        };
        this.load_run()?;
        Ok(this)
    }

    fn load_run(&mut self) -> Result<()> {
        if self.num_bits == 0 {
            // all-zero levels; nothing to read
            self.state = State::Rle {
                value: 0,
                remaining: self.remaining,
            };
            return Ok(());
        }
        self.state = match self.runs.next().transpose()? {
            Some(HybridEncoded::Bitpacked(compressed)) => {
                let pack_length = compressed.len() * 8 / self.num_bits as usize;
                let length = std::cmp::min(pack_length, self.remaining);
                State::Bitpacked(bitpacked::Decoder::new(
                    compressed,
                    self.num_bits as u8,
                    length,
                ))
            }
            Some(HybridEncoded::Rle(pack, run_length)) => {
                let mut bytes = [0u8; std::mem::size_of::<u32>()];
                pack.iter().zip(bytes.iter_mut()).for_each(|(src, dst)| *dst = *src);
                State::Rle {
                    value: u32::from_le_bytes(bytes),
                    remaining: run_length,
                }
            }
            None => State::Finished,
        };
        Ok(())
    }
}

impl<'a> Iterator for HybridRleDecoder<'a> {
    type Item = Result<u32>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        loop {
            let value = match &mut self.state {
                State::Bitpacked(decoder) => decoder.next(),
                State::Rle { value, remaining } => {
                    if *remaining == 0 {
                        None
                    } else {
                        *remaining -= 1;
                        Some(*value)
                    }
                }
                State::Finished => {
                    return Some(Err(Error::InvalidEncoding(
                        "hybrid RLE stream ended before the declared number of values".to_string(),
                    )))
                }
            };
            match value {
                Some(value) => {
                    self.remaining -= 1;
                    return Some(Ok(value));
                }
                None => {
                    if let Err(e) = self.load_run() {
                        return Some(Err(e));
                    }
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() -> Result<()> {
        let mut buffer = vec![];
        let num_bits = 10u32;

        let data = (0..1000).collect::<Vec<_>>();

        encode_u32(&mut buffer, data.iter().cloned(), num_bits).unwrap();

        let decoder = HybridRleDecoder::try_new(&buffer, num_bits, data.len())?;

        let result = decoder.collect::<Result<Vec<_>>>()?;

        assert_eq!(result, data);
        Ok(())
    }

    #[test]
    fn pyarrow_integration() -> Result<()> {
        // data encoded from pyarrow representing [0, 1, 1, 2, 2, 2]
        let data = vec![128, 1, 1, 0, 2, 1, 0, 2, 2, 0];
        let num_bits = 2;

        let decoder = HybridRleDecoder::try_new(&data, num_bits, 6)?;

        let result = decoder.collect::<Result<Vec<_>>>()?;

        assert_eq!(result, &[0, 1, 1, 2, 2, 2]);
        Ok(())
    }

    #[test]
    fn small() -> Result<()> {
        let data = vec![3, 2];
        let num_bits = 1;

        let decoder = HybridRleDecoder::try_new(&data, num_bits, 1)?;

        let result = decoder.collect::<Result<Vec<_>>>()?;

        assert_eq!(result, &[0]);
        Ok(())
    }

    #[test]
    fn zero_bit_width() -> Result<()> {
        let data = vec![3];
        let num_bits = 0;

        let decoder = HybridRleDecoder::try_new(&data, num_bits, 2)?;

        let result = decoder.collect::<Result<Vec<_>>>()?;

        assert_eq!(result, &[0, 0]);
        Ok(())
    }

    #[test]
    fn empty_values() -> Result<()> {
        let data = [];
        let num_bits = 1;

        let decoder = HybridRleDecoder::try_new(&data, num_bits, 100)?;

        let result = decoder.collect::<Result<Vec<_>>>();

        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn runs_and_literals() -> Result<()> {
        let mut data = vec![1u32; 100];
        data.extend((0..17).map(|x| x % 4));
        data.extend(std::iter::repeat(3).take(24));

        let mut buffer = vec![];
        encode_u32(&mut buffer, data.iter().cloned(), 2).unwrap();

        let decoder = HybridRleDecoder::try_new(&buffer, 2, data.len())?;
        let result = decoder.collect::<Result<Vec<_>>>()?;
        assert_eq!(result, data);
        Ok(())
    }
}
