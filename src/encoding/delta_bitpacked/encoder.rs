use super::super::{bit_write::BitWriter, ceil8, uleb128, zigzag_leb128};
use crate::encoding::log2;

const BLOCK_SIZE: usize = 256;
const MINI_BLOCKS: usize = 4;
const VALUES_PER_MINI_BLOCK: usize = BLOCK_SIZE / MINI_BLOCKS;

/// Encodes an iterator of `i64` according to parquet's `DELTA_BINARY_PACKED`.
pub fn encode<I: Iterator<Item = i64>>(iterator: I, buffer: &mut Vec<u8>) {
    let values = iterator.collect::<Vec<_>>();

    let mut container = [0u8; 10];
    let encoded_len = uleb128::encode(BLOCK_SIZE as u64, &mut container);
    buffer.extend_from_slice(&container[..encoded_len]);

    let encoded_len = uleb128::encode(MINI_BLOCKS as u64, &mut container);
    buffer.extend_from_slice(&container[..encoded_len]);

    let encoded_len = uleb128::encode(values.len() as u64, &mut container);
    buffer.extend_from_slice(&container[..encoded_len]);

    let first_value = values.first().copied().unwrap_or(0);
    let (container, encoded_len) = zigzag_leb128::encode(first_value);
    buffer.extend_from_slice(&container[..encoded_len]);

    let deltas = values
        .windows(2)
        .map(|w| w[1].wrapping_sub(w[0]))
        .collect::<Vec<_>>();

    for block in deltas.chunks(BLOCK_SIZE) {
        encode_block(block, buffer);
    }
}

fn encode_block(deltas: &[i64], buffer: &mut Vec<u8>) {
    let min_delta = deltas.iter().copied().min().unwrap();

    let (container, encoded_len) = zigzag_leb128::encode(min_delta);
    buffer.extend_from_slice(&container[..encoded_len]);

    // relative deltas fit in u64 by construction
    let relative = deltas
        .iter()
        .map(|x| x.wrapping_sub(min_delta) as u64)
        .collect::<Vec<_>>();

    let mut widths = [0u8; MINI_BLOCKS];
    for (width, mini) in widths.iter_mut().zip(relative.chunks(VALUES_PER_MINI_BLOCK)) {
        let max = mini.iter().copied().max().unwrap_or(0);
        *width = log2(max) as u8;
    }
    buffer.extend_from_slice(&widths);

    for (mini, num_bits) in relative.chunks(VALUES_PER_MINI_BLOCK).zip(widths) {
        if num_bits == 0 {
            continue;
        }
        let mut writer = BitWriter::new();
        for delta in mini {
            writer.put_value64(*delta, num_bits as usize);
        }
        // mini-blocks are always full-sized; pad the last one with zeros
        let mut packed = writer.into_inner();
        packed.resize(ceil8(VALUES_PER_MINI_BLOCK * num_bits as usize), 0);
        buffer.extend_from_slice(&packed);
    }
}
