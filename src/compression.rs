//! Functionality to compress and decompress page bodies.
pub use super::parquet_bridge::{Compression, CompressionOptions, GzipLevel, ZstdLevel};

use crate::error::{Error, Result};

#[cfg(any(feature = "snappy", feature = "lz4"))]
fn inner_compress<
    G: Fn(usize) -> usize,
    F: Fn(&[u8], &mut [u8]) -> Result<usize>,
>(
    input: &[u8],
    output: &mut Vec<u8>,
    get_length: G,
    compress: F,
) -> Result<()> {
    let original_length = output.len();
    let max_required_length = get_length(input.len());

    output.resize(original_length + max_required_length, 0);
    let compressed_size = compress(input, &mut output[original_length..])?;

    output.truncate(original_length + compressed_size);
    Ok(())
}

/// Compresses data stored in slice `input_buf` and appends the compressed
/// result to `output_buf`.
pub fn compress(
    compression: CompressionOptions,
    input_buf: &[u8],
    output_buf: &mut Vec<u8>,
) -> Result<()> {
    match compression {
        #[cfg(feature = "snappy")]
        CompressionOptions::Snappy => inner_compress(
            input_buf,
            output_buf,
            snap::raw::max_compress_len,
            |input, output| Ok(snap::raw::Encoder::new().compress(input, output)?),
        ),
        #[cfg(not(feature = "snappy"))]
        CompressionOptions::Snappy => Err(Error::FeatureNotActive(
            crate::error::Feature::Snappy,
            "compress to snappy".to_string(),
        )),
        #[cfg(feature = "gzip")]
        CompressionOptions::Gzip(level) => {
            use std::io::Write;
            let level = level.unwrap_or_default();
            let mut encoder = flate2::write::GzEncoder::new(
                output_buf,
                flate2::Compression::new(level.compression_level()),
            );
            encoder.write_all(input_buf)?;
            encoder.try_finish().map_err(|e| e.into())
        }
        #[cfg(not(feature = "gzip"))]
        CompressionOptions::Gzip(_) => Err(Error::FeatureNotActive(
            crate::error::Feature::Gzip,
            "compress to gzip".to_string(),
        )),
        #[cfg(feature = "lz4")]
        CompressionOptions::Lz4Raw => inner_compress(
            input_buf,
            output_buf,
            lz4_flex::block::get_maximum_output_size,
            |input, output| Ok(lz4_flex::block::compress_into(input, output)?),
        ),
        #[cfg(not(feature = "lz4"))]
        CompressionOptions::Lz4Raw => Err(Error::FeatureNotActive(
            crate::error::Feature::Lz4,
            "compress to lz4".to_string(),
        )),
        #[cfg(feature = "zstd")]
        CompressionOptions::Zstd(level) => {
            use std::io::Write;
            let level = level.unwrap_or_default().compression_level();
            let mut encoder = zstd::Encoder::new(output_buf, level)
                .map_err(|e| Error::Compression(e.to_string()))?;
            encoder.write_all(input_buf)?;
            encoder
                .finish()
                .map(|_| ())
                .map_err(|e| Error::Compression(e.to_string()))
        }
        #[cfg(not(feature = "zstd"))]
        CompressionOptions::Zstd(_) => Err(Error::FeatureNotActive(
            crate::error::Feature::Zstd,
            "compress to zstd".to_string(),
        )),
        CompressionOptions::Uncompressed => {
            output_buf.extend_from_slice(input_buf);
            Ok(())
        }
    }
}

/// Decompresses data stored in slice `input_buf` and writes output to
/// `output_buf`, which must be sized to the declared uncompressed length.
pub fn decompress(
    compression: Compression,
    input_buf: &[u8],
    output_buf: &mut [u8],
) -> Result<()> {
    match compression {
        #[cfg(feature = "snappy")]
        Compression::Snappy => {
            let declared = snap::raw::decompress_len(input_buf)?;
            if declared != output_buf.len() {
                return Err(Error::oos(format!(
                    "page declares {} uncompressed bytes but its snappy stream holds {}",
                    output_buf.len(),
                    declared
                )));
            }
            snap::raw::Decoder::new()
                .decompress(input_buf, output_buf)
                .map(|_| ())
                .map_err(|e| e.into())
        }
        #[cfg(not(feature = "snappy"))]
        Compression::Snappy => Err(Error::FeatureNotActive(
            crate::error::Feature::Snappy,
            "decompress with snappy".to_string(),
        )),
        #[cfg(feature = "gzip")]
        Compression::Gzip => {
            use std::io::Read;
            // parquet's GZIP codec is a gzip member, but some writers emit the
            // bare DEFLATE stream. Sniff the two-byte gzip magic and accept both.
            if input_buf.len() >= 2 && input_buf[0] == 0x1f && input_buf[1] == 0x8b {
                let mut decoder = flate2::read::GzDecoder::new(input_buf);
                decoder.read_exact(output_buf).map_err(|e| e.into())
            } else {
                let mut decoder = flate2::read::DeflateDecoder::new(input_buf);
                decoder.read_exact(output_buf).map_err(|e| e.into())
            }
        }
        #[cfg(not(feature = "gzip"))]
        Compression::Gzip => Err(Error::FeatureNotActive(
            crate::error::Feature::Gzip,
            "decompress with gzip".to_string(),
        )),
        #[cfg(feature = "lz4")]
        Compression::Lz4Raw => {
            let read = lz4_flex::block::decompress_into(input_buf, output_buf)?;
            if read != output_buf.len() {
                return Err(Error::oos(format!(
                    "page declares {} uncompressed bytes but its lz4 stream holds {}",
                    output_buf.len(),
                    read
                )));
            }
            Ok(())
        }
        #[cfg(not(feature = "lz4"))]
        Compression::Lz4Raw => Err(Error::FeatureNotActive(
            crate::error::Feature::Lz4,
            "decompress with lz4".to_string(),
        )),
        #[cfg(feature = "zstd")]
        Compression::Zstd => {
            use std::io::Read;
            let mut decoder =
                zstd::Decoder::new(input_buf).map_err(|e| Error::Compression(e.to_string()))?;
            decoder.read_exact(output_buf).map_err(|e| e.into())
        }
        #[cfg(not(feature = "zstd"))]
        Compression::Zstd => Err(Error::FeatureNotActive(
            crate::error::Feature::Zstd,
            "decompress with zstd".to_string(),
        )),
        Compression::Uncompressed => {
            if input_buf.len() != output_buf.len() {
                return Err(Error::oos(
                    "declared uncompressed length does not match the page body",
                ));
            }
            output_buf.copy_from_slice(input_buf);
            Ok(())
        }
        _ => Err(Error::Compression(format!(
            "compression {:?} is not supported",
            compression
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_roundtrip(c: CompressionOptions, data: &[u8]) {
        let offset = 2048;

        // Compress to a buffer that already has data is possible
        let mut compressed = vec![2; offset];
        compress(c, data, &mut compressed).expect("Error when compressing");

        // data is compressed...
        assert!(compressed.len() - offset < data.len() || data.len() < 100);

        let mut decompressed = vec![0; data.len()];
        decompress(c.into(), &compressed[offset..], &mut decompressed)
            .expect("Error when decompressing");
        assert_eq!(data, decompressed.as_slice());
    }

    fn test_codec(c: CompressionOptions) {
        let sizes = vec![1000, 10000, 100000];
        for size in sizes {
            let data = (0..size).map(|x| (x % 255) as u8).collect::<Vec<_>>();
            test_roundtrip(c, &data);
        }
    }

    fn test_empty(c: CompressionOptions) {
        let mut compressed = vec![];
        compress(c, &[], &mut compressed).unwrap();
        let mut decompressed = vec![];
        decompress(c.into(), &compressed, &mut decompressed).unwrap();
        assert!(decompressed.is_empty());
    }

    #[test]
    fn test_codec_snappy() {
        test_codec(CompressionOptions::Snappy);
        test_empty(CompressionOptions::Snappy);
    }

    #[test]
    fn test_codec_gzip_default() {
        test_codec(CompressionOptions::Gzip(None));
        test_empty(CompressionOptions::Gzip(None));
    }

    #[test]
    fn test_codec_gzip_high_compression() {
        test_codec(CompressionOptions::Gzip(Some(GzipLevel::new(9))));
    }

    #[test]
    fn test_codec_lz4_raw() {
        test_codec(CompressionOptions::Lz4Raw);
        test_empty(CompressionOptions::Lz4Raw);
    }

    #[test]
    fn test_codec_zstd_default() {
        test_codec(CompressionOptions::Zstd(None));
        test_empty(CompressionOptions::Zstd(None));
    }

    #[test]
    fn test_codec_zstd_high_compression() {
        test_codec(CompressionOptions::Zstd(Some(ZstdLevel::new(18))));
    }

    #[test]
    fn test_uncompressed() {
        test_empty(CompressionOptions::Uncompressed);
        let data = (0..1000).map(|x| (x % 255) as u8).collect::<Vec<_>>();
        let mut compressed = vec![];
        compress(CompressionOptions::Uncompressed, &data, &mut compressed).unwrap();
        assert_eq!(compressed, data);
    }

    #[test]
    fn gzip_accepts_raw_deflate() {
        use std::io::Write;
        let data = b"a stream compressed without the gzip wrapper".to_vec();
        let mut deflated = vec![];
        let mut encoder =
            flate2::write::DeflateEncoder::new(&mut deflated, flate2::Compression::default());
        encoder.write_all(&data).unwrap();
        encoder.finish().unwrap();

        let mut decompressed = vec![0; data.len()];
        decompress(Compression::Gzip, &deflated, &mut decompressed).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn snappy_rejects_length_mismatch() {
        let data = (0..100u8).collect::<Vec<_>>();
        let mut compressed = vec![];
        compress(CompressionOptions::Snappy, &data, &mut compressed).unwrap();

        let mut too_small = vec![0; data.len() - 1];
        assert!(decompress(Compression::Snappy, &compressed, &mut too_small).is_err());
    }
}
