use super::super::{ceil8, uleb128};
use super::HybridEncoded;
use crate::error::{Error, Result};

/// An [`Iterator`] of [`HybridEncoded`] runs. Each run is validated against
/// the remaining bytes of the stream before being handed out.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    values: &'a [u8],
    num_bits: u32,
}

impl<'a> Decoder<'a> {
    pub fn new(values: &'a [u8], num_bits: u32) -> Self {
        Self { values, num_bits }
    }

    /// Returns the number of bits being used by this decoder.
    #[inline]
    pub fn num_bits(&self) -> u32 {
        self.num_bits
    }
}

impl<'a> Iterator for Decoder<'a> {
    type Item = Result<HybridEncoded<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.values.is_empty() {
            return None;
        }
        let (indicator, consumed) = match uleb128::decode(self.values) {
            Ok(x) => x,
            Err(e) => {
                self.values = &[];
                return Some(Err(e));
            }
        };
        self.values = &self.values[consumed..];
        if indicator & 1 == 1 {
            // is bitpacked
            let bytes = (indicator as usize >> 1) * self.num_bits as usize;
            if bytes > self.values.len() {
                self.values = &[];
                return Some(Err(Error::InvalidEncoding(
                    "bit-packed run extends past the end of the stream".to_string(),
                )));
            }
            let result = Some(Ok(HybridEncoded::Bitpacked(&self.values[..bytes])));
            self.values = &self.values[bytes..];
            result
        } else {
            // is rle
            let run_length = indicator as usize >> 1;
            // repeated-value := value that is repeated, using a fixed-width of round-up-to-next-byte(bit-width)
            let rle_bytes = ceil8(self.num_bits as usize);
            if rle_bytes > self.values.len() {
                self.values = &[];
                return Some(Err(Error::InvalidEncoding(
                    "RLE run value extends past the end of the stream".to_string(),
                )));
            }
            let result = Some(Ok(HybridEncoded::Rle(&self.values[..rle_bytes], run_length)));
            self.values = &self.values[rle_bytes..];
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use super::super::super::bitpacked;

    #[test]
    fn basics_1() {
        let bit_width = 1u32;
        let length = 5;
        let values = vec![
            2, 0, 0, 0, // length
            0b00000011, 0b00001011, // data
        ];

        let mut decoder = Decoder::new(&values[4..6], bit_width);

        let run = decoder.next().unwrap().unwrap();

        if let HybridEncoded::Bitpacked(values) = run {
            assert_eq!(values, &[0b00001011]);
            let result = bitpacked::Decoder::new(values, bit_width as u8, length)
                .collect::<Vec<_>>();
            assert_eq!(result, &[1, 1, 0, 1, 0]);
        } else {
            panic!()
        };
    }

    #[test]
    fn basics_2() {
        // This test was validated by the result of what pyarrow3 outputs when
        // the bitmap is used.
        let bit_width = 1;
        let values = vec![
            3, 0, 0, 0, // length
            0b00000101, 0b11101011, 0b00000010, // data
        ];
        let expected = &[1, 1, 0, 1, 0, 1, 1, 1, 0, 1];

        let mut decoder = Decoder::new(&values[4..4 + 3], bit_width);

        let run = decoder.next().unwrap().unwrap();

        if let HybridEncoded::Bitpacked(values) = run {
            assert_eq!(values, &[0b11101011, 0b00000010]);
            let result = bitpacked::Decoder::new(values, bit_width as u8, 10).collect::<Vec<_>>();
            assert_eq!(result, expected);
        } else {
            panic!()
        };
    }

    #[test]
    fn basics_3() {
        let bit_width = 1;
        let length = 8;
        let values = vec![
            2, 0, 0, 0,          // length
            0b00010000, // data
            0b00000001,
        ];

        let mut decoder = Decoder::new(&values[4..4 + 2], bit_width);

        let run = decoder.next().unwrap().unwrap();

        if let HybridEncoded::Rle(values, items) = run {
            assert_eq!(values, &[0b00000001]);
            assert_eq!(items, length);
        } else {
            panic!()
        };
    }

    #[test]
    fn truncated_bitpacked_run_errors() {
        // declares 2 groups (2 bytes at 1 bit) but holds only one byte
        let values = vec![(2 << 1) | 1, 0b00000001];
        let mut decoder = Decoder::new(&values, 1);
        assert!(decoder.next().unwrap().is_err());
    }

    #[test]
    fn truncated_rle_value_errors() {
        // RLE run of 8 at 16 bits needs 2 value bytes; none follow
        let values = vec![8 << 1];
        let mut decoder = Decoder::new(&values, 16);
        assert!(decoder.next().unwrap().is_err());
    }
}
