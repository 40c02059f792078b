//! The PLAIN encoding: tightly packed little-endian for fixed-size types,
//! `u32` length-prefixed bytes for BYTE_ARRAY, LSB-first bits for BOOLEAN.

use super::hybrid_rle::{bitpacked_encode, BitmapIter};
use crate::error::{Error, Result};
use crate::types::{decode, NativeType};

/// Appends `values` in their little-endian byte representation.
pub fn encode_native<T: NativeType>(values: &[T], buffer: &mut Vec<u8>) {
    buffer.reserve(values.len() * std::mem::size_of::<T>());
    for value in values {
        buffer.extend_from_slice(value.to_le_bytes().as_ref());
    }
}

/// Decodes exactly `count` values, appending to `out`.
pub fn decode_native<T: NativeType>(values: &[u8], count: usize, out: &mut Vec<T>) -> Result<()> {
    let size = std::mem::size_of::<T>();
    if values.len() < count * size {
        return Err(Error::InvalidEncoding(format!(
            "PLAIN page holds {} bytes but {} values of {} bytes were declared",
            values.len(),
            count,
            size
        )));
    }
    out.reserve(count);
    out.extend(values[..count * size].chunks_exact(size).map(decode::<T>));
    Ok(())
}

/// Appends `values` as LSB-first packed bits.
pub fn encode_bool(values: impl Iterator<Item = bool>, buffer: &mut Vec<u8>) -> Result<()> {
    bitpacked_encode(buffer, values)?;
    Ok(())
}

/// Decodes exactly `count` bools, appending to `out`.
pub fn decode_bool(values: &[u8], count: usize, out: &mut Vec<bool>) -> Result<()> {
    if values.len() * 8 < count {
        return Err(Error::InvalidEncoding(format!(
            "PLAIN boolean page holds {} bits but {} values were declared",
            values.len() * 8,
            count
        )));
    }
    out.reserve(count);
    out.extend(BitmapIter::new(values, 0, count));
    Ok(())
}

/// Appends one length-prefixed byte array.
#[inline]
pub fn encode_binary_value(value: &[u8], buffer: &mut Vec<u8>) {
    buffer.extend_from_slice(&(value.len() as u32).to_le_bytes());
    buffer.extend_from_slice(value);
}

/// An [`Iterator`] over a PLAIN-encoded sequence of length-prefixed byte
/// arrays. Truncated prefixes or bodies surface as errors.
#[derive(Debug)]
pub struct BinaryIter<'a> {
    values: &'a [u8],
    remaining: usize,
}

impl<'a> BinaryIter<'a> {
    pub fn new(values: &'a [u8], count: usize) -> Self {
        Self {
            values,
            remaining: count,
        }
    }
}

impl<'a> Iterator for BinaryIter<'a> {
    type Item = Result<&'a [u8]>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        if self.values.len() < 4 {
            self.remaining = 0;
            return Some(Err(Error::InvalidEncoding(
                "BYTE_ARRAY page ends within a length prefix".to_string(),
            )));
        }
        let length = u32::from_le_bytes(self.values[0..4].try_into().unwrap()) as usize;
        self.values = &self.values[4..];
        if length > self.values.len() {
            self.remaining = 0;
            return Some(Err(Error::InvalidEncoding(
                "BYTE_ARRAY length prefix points past the end of the page".to_string(),
            )));
        }
        let (result, remaining) = self.values.split_at(length);
        self.values = remaining;
        Some(Ok(result))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

/// Decodes exactly `count` fixed-length values of `size` bytes, appending
/// their concatenation to `out`.
pub fn decode_fixed(values: &[u8], size: usize, count: usize, out: &mut Vec<u8>) -> Result<()> {
    if values.len() < count * size {
        return Err(Error::InvalidEncoding(format!(
            "FIXED_LEN_BYTE_ARRAY page holds {} bytes but {} values of {} bytes were declared",
            values.len(),
            count,
            size
        )));
    }
    out.extend_from_slice(&values[..count * size]);
    Ok(())
}
