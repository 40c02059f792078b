use super::super::{bit_read::BitReader, ceil8, uleb128, zigzag_leb128};
use crate::error::{Error, Result};

#[derive(Debug)]
struct MiniBlock<'a> {
    reader: BitReader<'a>,
    num_bits: usize,
    remaining: usize,
}

impl<'a> MiniBlock<'a> {
    fn next(&mut self) -> Result<u64> {
        if self.remaining == 0 || self.num_bits == 0 {
            return Ok(0);
        }
        self.remaining -= 1;
        self.reader.get_value64(self.num_bits).ok_or_else(|| {
            Error::InvalidEncoding("delta mini-block ends before its declared values".to_string())
        })
    }
}

#[derive(Debug)]
struct Block<'a> {
    // this is the minimum delta that must be added to every value.
    min_delta: i64,
    bitwidths: &'a [u8],
    values: &'a [u8],
    values_per_mini_block: usize,
    remaining: usize,     // number of elements
    current_index: usize, // invariant: < values_per_mini_block
    current_miniblock: Option<MiniBlock<'a>>,
    // number of bytes consumed.
    consumed_bytes: usize,
}

impl<'a> Block<'a> {
    fn try_new(
        mut values: &'a [u8],
        num_mini_blocks: usize,
        values_per_mini_block: usize,
        length: usize,
    ) -> Result<Self> {
        let length = std::cmp::min(length, num_mini_blocks * values_per_mini_block);

        let mut consumed_bytes = 0;
        let (min_delta, consumed) = zigzag_leb128::decode(values)?;
        consumed_bytes += consumed;
        values = &values[consumed..];

        if num_mini_blocks > values.len() {
            return Err(Error::InvalidEncoding(
                "delta block ends within its mini-block bit widths".to_string(),
            ));
        }
        let bitwidths = &values[..num_mini_blocks];
        consumed_bytes += num_mini_blocks;
        values = &values[num_mini_blocks..];

        let mut block = Block {
            min_delta,
            bitwidths,
            values,
            values_per_mini_block,
            remaining: length,
            current_index: 0,
            current_miniblock: None,
            consumed_bytes,
        };

        // Set up first mini-block
        block.advance_miniblock()?;

        Ok(block)
    }

    fn advance_miniblock(&mut self) -> Result<()> {
        let num_bits = *self.bitwidths.first().ok_or_else(|| {
            Error::InvalidEncoding("delta block holds more values than mini-blocks".to_string())
        })? as usize;
        self.bitwidths = &self.bitwidths[1..];

        self.current_miniblock = if num_bits > 0 {
            let length = std::cmp::min(self.remaining, self.values_per_mini_block);

            let miniblock_length = ceil8(self.values_per_mini_block * num_bits);
            if miniblock_length > self.values.len() {
                return Err(Error::InvalidEncoding(
                    "delta mini-block extends past the end of the page".to_string(),
                ));
            }
            let (miniblock, remainder) = self.values.split_at(miniblock_length);

            self.values = remainder;
            self.consumed_bytes += miniblock_length;

            Some(MiniBlock {
                reader: BitReader::new(miniblock),
                num_bits,
                remaining: length,
            })
        } else {
            None
        };
        self.current_index = 0;
        Ok(())
    }

    fn next(&mut self) -> Option<Result<i64>> {
        if self.remaining == 0 {
            return None;
        }
        let delta = match self.current_miniblock.as_mut() {
            Some(miniblock) => match miniblock.next() {
                Ok(x) => x,
                Err(e) => return Some(Err(e)),
            },
            None => 0,
        };
        let result = self.min_delta.wrapping_add(delta as i64);
        self.current_index += 1;
        self.remaining -= 1;

        if self.remaining > 0 && self.current_index == self.values_per_mini_block {
            if let Err(e) = self.advance_miniblock() {
                return Some(Err(e));
            }
        }

        Some(Ok(result))
    }
}

/// Decoder of parquets' `DELTA_BINARY_PACKED`. Implements `Iterator<Item = Result<i64>>`,
/// serving both INT32 and INT64 columns.
#[derive(Debug)]
pub struct Decoder<'a> {
    num_mini_blocks: usize,
    values_per_mini_block: usize,
    total_count: usize, // remaining number of elements
    next_value: i64,    // the running sum
    values: &'a [u8],
    current_block: Option<Block<'a>>,
    // the total number of bytes consumed up to a given point, excluding the bytes on the current_block
    consumed_bytes: usize,
}

impl<'a> Decoder<'a> {
    pub fn try_new(mut values: &'a [u8]) -> Result<Self> {
        let mut consumed_bytes = 0;
        let (block_size, consumed) = uleb128::decode(values)?;
        consumed_bytes += consumed;
        values = &values[consumed..];
        if block_size % 128 != 0 || block_size == 0 {
            return Err(Error::InvalidEncoding(format!(
                "delta block size must be a positive multiple of 128, got {}",
                block_size
            )));
        }

        let (num_mini_blocks, consumed) = uleb128::decode(values)?;
        let num_mini_blocks = num_mini_blocks as usize;
        consumed_bytes += consumed;
        values = &values[consumed..];

        let (total_count, consumed) = uleb128::decode(values)?;
        let total_count = total_count as usize;
        consumed_bytes += consumed;
        values = &values[consumed..];

        let (first_value, consumed) = zigzag_leb128::decode(values)?;
        consumed_bytes += consumed;
        values = &values[consumed..];

        if num_mini_blocks == 0 {
            return Err(Error::InvalidEncoding(
                "delta header declares zero mini-blocks per block".to_string(),
            ));
        }
        let values_per_mini_block = block_size as usize / num_mini_blocks;
        if values_per_mini_block % 8 != 0 {
            return Err(Error::InvalidEncoding(format!(
                "delta mini-blocks must hold a multiple of 8 values, got {}",
                values_per_mini_block
            )));
        }

        // the first value is stored in the header; blocks hold the remaining deltas
        let current_block = if total_count > 1 {
            Some(Block::try_new(
                values,
                num_mini_blocks,
                values_per_mini_block,
                total_count - 1,
            )?)
        } else {
            None
        };

        Ok(Self {
            num_mini_blocks,
            values_per_mini_block,
            total_count,
            next_value: first_value,
            values,
            current_block,
            consumed_bytes,
        })
    }

    /// Returns the total number of bytes consumed up to this point by [`Decoder`].
    pub fn consumed_bytes(&self) -> usize {
        self.consumed_bytes
            + self
                .current_block
                .as_ref()
                .map(|x| x.consumed_bytes)
                .unwrap_or_default()
    }
}

impl<'a> Iterator for Decoder<'a> {
    type Item = Result<i64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.total_count == 0 {
            return None;
        }
        self.total_count -= 1;
        let result = self.next_value;

        // the next delta, if any, feeds the running sum
        if self.total_count > 0 {
            let block = self.current_block.as_mut()?;
            let delta = match block.next() {
                Some(Ok(delta)) => delta,
                Some(Err(e)) => return Some(Err(e)),
                None => {
                    // load next block
                    let consumed = block.consumed_bytes;
                    self.values = &self.values[consumed..];
                    self.consumed_bytes += consumed;
                    let new_block = match Block::try_new(
                        self.values,
                        self.num_mini_blocks,
                        self.values_per_mini_block,
                        self.total_count,
                    ) {
                        Ok(block) => block,
                        Err(e) => return Some(Err(e)),
                    };
                    self.current_block = Some(new_block);
                    match self.current_block.as_mut().unwrap().next() {
                        Some(Ok(delta)) => delta,
                        Some(Err(e)) => return Some(Err(e)),
                        None => {
                            return Some(Err(Error::InvalidEncoding(
                                "delta stream ended before the declared number of values"
                                    .to_string(),
                            )))
                        }
                    }
                }
            };
            self.next_value = self.next_value.wrapping_add(delta);
        }

        Some(Ok(result))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.total_count, Some(self.total_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_spec() {
        let expected = (1i64..=5).collect::<Vec<_>>();
        // VALIDATED FROM SPARK==3.1.1
        // header: [128, 1, 4, 5, 2]
        // block size: 128, 1
        // mini-blocks: 4
        // elements: 5
        // first_value: 2 <=z> 1
        // block1: [2, 0, 0, 0, 0]
        // min_delta: 2 <=z> 1
        // bit_width: 0
        let data = &[128, 1, 4, 5, 2, 2, 0, 0, 0, 0];

        let mut decoder = Decoder::try_new(data).unwrap();
        let r = decoder.by_ref().collect::<Result<Vec<_>>>().unwrap();

        assert_eq!(expected, r);

        assert_eq!(decoder.consumed_bytes(), 10);
    }

    #[test]
    fn case2() {
        let expected = vec![1i64, 2, 3, 4, 5, 1];
        // VALIDATED FROM SPARK==3.1.1
        // header: [128, 1, 4, 6, 2]
        // block size: 128, 1 <=u> 128
        // mini-blocks: 4     <=u> 4
        // elements: 6        <=u> 6
        // first_value: 2     <=z> 1
        // block1: [7, 3, 0, 0, 0]
        // min_delta: 7       <=z> -4
        // bit_widths: [3, 0, 0, 0]
        // values: [
        //      0b01101101
        //      0b00001011
        //      ...
        // ]                  <=b> [3, 3, 3, 3, 0]
        let data = &[
            128, 1, 4, 6, 2, 7, 3, 0, 0, 0, 0b01101101, 0b00001011, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            // these should not be consumed
            1, 2, 3,
        ];

        let mut decoder = Decoder::try_new(data).unwrap();
        let r = decoder.by_ref().collect::<Result<Vec<_>>>().unwrap();

        assert_eq!(expected, r);
        assert_eq!(decoder.consumed_bytes(), data.len() - 3);
    }

    #[test]
    fn multiple_miniblocks() {
        #[rustfmt::skip]
        let data = &[
            // Header: [128, 1, 4, 65, 100]
            128, 1, // block size <=u> 128
            4,      // number of mini-blocks <=u> 4
            65,     // number of elements <=u> 65
            100,    // first_value <=z> 50

            // Block 1 header: [7, 3, 4, 0, 0]
            7,          // min_delta <=z> -4
            3, 4, 0, 0, // bit_widths [3, 4, 0, 0]

            // 32 3-bit values of 0 for mini-block 1 (12 bytes)
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,

            // 32 4-bit values of 8 for mini-block 2 (16 bytes)
            0x88, 0x88, 0x88, 0x88, 0x88, 0x88, 0x88, 0x88, 0x88, 0x88, 0x88, 0x88, 0x88, 0x88,
            0x88, 0x88,

            // these should not be consumed
            1, 2, 3,
        ];

        #[rustfmt::skip]
        let expected = [
            // First value
            50,

            // Mini-block 1: 32 deltas of -4
            46, 42, 38, 34, 30, 26, 22, 18, 14, 10, 6, 2, -2, -6, -10, -14, -18, -22, -26, -30, -34,
            -38, -42, -46, -50, -54, -58, -62, -66, -70, -74, -78,

            // Mini-block 2: 32 deltas of 4
            -74, -70, -66, -62, -58, -54, -50, -46, -42, -38, -34, -30, -26, -22, -18, -14, -10, -6,
            -2, 2, 6, 10, 14, 18, 22, 26, 30, 34, 38, 42, 46, 50,
        ];

        let mut decoder = Decoder::try_new(data).unwrap();
        let r = decoder.by_ref().collect::<Result<Vec<_>>>().unwrap();

        assert_eq!(&expected[..], &r[..]);
        assert_eq!(decoder.consumed_bytes(), data.len() - 3);
    }
}
