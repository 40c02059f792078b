use super::uleb128;
use crate::error::Result;

/// Decodes a zigzag ULEB128-encoded `i64`, returning the value and the
/// number of bytes consumed.
pub fn decode(values: &[u8]) -> Result<(i64, usize)> {
    let (u, consumed) = uleb128::decode(values)?;
    Ok(((u >> 1) as i64 ^ -((u & 1) as i64), consumed))
}

/// Encodes `value` in zigzag ULEB128, returning the container and the
/// number of bytes used.
pub fn encode(value: i64) -> ([u8; 10], usize) {
    let zigzag = ((value << 1) ^ (value >> 63)) as u64;
    let mut container = [0u8; 10];
    let used = uleb128::encode(zigzag, &mut container);
    (container, used)
}
