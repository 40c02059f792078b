use crate::encoding::bitpacked;
use crate::encoding::{ceil8, uleb128};

use std::io::Write;

use super::bitpacked_encode;

// run lengths at or above this are worth an RLE run over bit-packing
const RLE_THRESHOLD: usize = 8;

fn write_header<W: Write>(writer: &mut W, header: u64) -> std::io::Result<()> {
    let mut container = [0; 10];
    let used = uleb128::encode(header, &mut container);
    writer.write_all(&container[..used])
}

fn write_rle_run<W: Write>(
    writer: &mut W,
    value: u32,
    run_length: usize,
    num_bits: u32,
) -> std::io::Result<()> {
    write_header(writer, (run_length as u64) << 1)?;
    let bytes = ceil8(num_bits as usize);
    writer.write_all(&value.to_le_bytes()[..bytes])
}

fn write_bitpacked_run<W: Write>(
    writer: &mut W,
    values: &[u32],
    num_bits: u32,
) -> std::io::Result<()> {
    // mid-stream groups hold exactly groups * 8 values; the last group of the
    // stream may be zero-padded
    let groups = ceil8(values.len());
    write_header(writer, ((groups as u64) << 1) | 1)?;

    let mut packed = vec![0u8; ceil8(groups * 8 * num_bits as usize)];
    let mut padded;
    let values = if values.len() == groups * 8 {
        values
    } else {
        padded = values.to_vec();
        padded.resize(groups * 8, 0);
        &padded[..]
    };
    bitpacked::encode(values, num_bits as u8, &mut packed);
    writer.write_all(&packed)
}

/// RLE-hybrid encoding of an iterator of `u32`. Maximal runs of at least 8
/// equal values become RLE runs; everything else is bit-packed in groups
/// of 8.
pub fn encode_u32<W: Write, I: Iterator<Item = u32>>(
    writer: &mut W,
    iterator: I,
    num_bits: u32,
) -> std::io::Result<()> {
    let values = iterator.collect::<Vec<_>>();

    let mut literals: Vec<u32> = vec![];
    let mut i = 0;
    while i < values.len() {
        let value = values[i];
        let mut run = 1;
        while i + run < values.len() && values[i + run] == value {
            run += 1;
        }

        // literals may only be flushed in whole groups of 8 mid-stream, so
        // the run donates values until the pending literals align
        let mut donated = 0;
        if run >= RLE_THRESHOLD && !literals.is_empty() {
            donated = (8 - literals.len() % 8) % 8;
            if donated > run {
                donated = run;
            }
            literals.extend(std::iter::repeat(value).take(donated));
        }

        if run - donated >= RLE_THRESHOLD {
            if !literals.is_empty() {
                write_bitpacked_run(writer, &literals, num_bits)?;
                literals.clear();
            }
            write_rle_run(writer, value, run - donated, num_bits)?;
        } else {
            literals.extend(std::iter::repeat(value).take(run - donated));
        }
        i += run;
    }
    if !literals.is_empty() {
        write_bitpacked_run(writer, &literals, num_bits)?;
    }
    Ok(())
}

/// The bit-packed-only encoding of an iterator of `bool`, framed as a single
/// hybrid run.
pub fn encode_bool<W: Write, I: Iterator<Item = bool>>(
    writer: &mut W,
    iterator: I,
) -> std::io::Result<()> {
    let length = iterator.size_hint().1.unwrap();

    // write the length + indicator
    let mut header = ceil8(length) as u64;
    header <<= 1;
    header |= 1; // it is bitpacked => first bit is set
    let mut container = [0; 10];
    let used = uleb128::encode(header, &mut container);

    writer.write_all(&container[..used])?;

    bitpacked_encode(writer, iterator)
}
