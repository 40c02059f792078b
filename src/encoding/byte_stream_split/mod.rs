//! `BYTE_STREAM_SPLIT`: the i-th byte of every value is scattered into the
//! i-th of `size_of::<T>()` planes, each `count` bytes long.
mod decoder;
mod encoder;

pub use decoder::Decoder;
pub use encoder::encode;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;

    #[test]
    fn round_trip_f32() -> Result<()> {
        let data = vec![1.5f32, -0.25, 3.75, f32::MIN, f32::MAX, 0.0];
        let mut buffer = vec![];
        encode(&data, &mut buffer);

        let result = Decoder::<f32>::try_new(&buffer)?.collect::<Result<Vec<_>>>()?;
        assert_eq!(result, data);
        Ok(())
    }

    #[test]
    fn round_trip_f64() -> Result<()> {
        let data = (0..1000).map(|x| x as f64 * 0.3).collect::<Vec<_>>();
        let mut buffer = vec![];
        encode(&data, &mut buffer);

        let result = Decoder::<f64>::try_new(&buffer)?.collect::<Result<Vec<_>>>()?;
        assert_eq!(result, data);
        Ok(())
    }

    #[test]
    fn misaligned_length_errors() {
        assert!(Decoder::<f64>::try_new(&[0u8; 12]).is_err());
    }
}
