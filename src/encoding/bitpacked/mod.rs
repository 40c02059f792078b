// LSB-first bit-packed values, as used by the hybrid RLE/bit-packing runs
// and by delta mini-blocks.
mod decode;
mod encode;

pub use decode::Decoder;
pub use encode::encode;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rle() {
        // Test data: 0-7 with bit width 3
        let num_bits = 3;
        let length = 8;
        let data = vec![0b10001000u8, 0b11000110, 0b11111010];

        let decoded = Decoder::new(&data, num_bits, length).collect::<Vec<_>>();
        assert_eq!(decoded, vec![0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_decode_bool() {
        let num_bits = 1;
        let length = 8;
        let data = vec![0b10101010];

        let decoded = Decoder::new(&data, num_bits, length).collect::<Vec<_>>();
        assert_eq!(decoded, vec![0, 1, 0, 1, 0, 1, 0, 1]);
    }

    #[test]
    fn zero_bit_width() {
        let decoded = Decoder::new(&[], 0, 5).collect::<Vec<_>>();
        assert_eq!(decoded, vec![0, 0, 0, 0, 0]);
    }

    #[test]
    fn truncated_input_stops_short() {
        // 10 values at 3 bits require 4 bytes; only 2 given
        let decoded = Decoder::new(&[0b10001000, 0b11000110], 3, 10).collect::<Vec<_>>();
        assert_eq!(decoded.len(), 5);
    }

    #[test]
    fn round_trip() {
        let values = (0..127u32).map(|x| x % 16).collect::<Vec<_>>();
        for num_bits in 4..=9u8 {
            let mut packed = vec![0u8; super::super::ceil8(values.len() * num_bits as usize)];
            encode(&values, num_bits, &mut packed);
            let decoded = Decoder::new(&packed, num_bits, values.len()).collect::<Vec<_>>();
            assert_eq!(decoded, values);
        }
    }
}
