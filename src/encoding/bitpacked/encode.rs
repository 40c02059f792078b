use super::super::bit_write::BitWriter;
use super::super::ceil8;

/// Encodes `values` at `num_bits` each into `packed`, LSB-first.
/// # Panics
/// Panics iff `packed` cannot hold `ceil8(values.len() * num_bits)` bytes.
pub fn encode(values: &[u32], num_bits: u8, packed: &mut [u8]) {
    let needed = ceil8(values.len() * num_bits as usize);
    assert!(packed.len() >= needed);

    let mut writer = BitWriter::new();
    for value in values {
        writer.put_value(*value as u64, num_bits as usize);
    }
    let bytes = writer.into_inner();
    packed[..bytes.len()].copy_from_slice(&bytes);
}
