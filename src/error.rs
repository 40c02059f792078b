//! Errors of this crate, grouped by the failure they describe.

/// Codecs that may not have been compiled into this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Snappy compression
    Snappy,
    /// Gzip compression
    Gzip,
    /// Lz4 raw compression
    Lz4,
    /// Zstd compression
    Zstd,
}

/// Errors generated by this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The caller passed an invalid argument.
    InvalidParameter(String),
    /// An operation would allocate beyond the configured limits.
    WouldOverAllocate,
    /// A fault of the underlying reader or writer (open, read, seek, write),
    /// including truncated input.
    Transport(String),
    /// The parquet file is known to be out of spec: bad magic, truncated or
    /// oversized footer, malformed schema, inconsistent metadata.
    OutOfSpec(String),
    /// An encoded stream could not be decoded: unknown encoding, bit width
    /// out of range, stream ended mid-value, dictionary index out of range.
    InvalidEncoding(String),
    /// A block codec rejected its input or output.
    Compression(String),
    /// The CRC stored in a page header does not match its body.
    ChecksumMismatch { expected: u32, got: u32 },
    /// The operation is not allowed in the current lifecycle state.
    InvalidState(String),
    /// A column or row group does not exist.
    NotFound(String),
    /// A code branch that requires a feature that was not activated.
    FeatureNotActive(Feature, String),
}

impl Error {
    pub(crate) fn oos<I: Into<String>>(message: I) -> Self {
        Self::OutOfSpec(message.into())
    }

    /// Whether the caller may retry the operation from the beginning.
    /// Format and integrity errors describe the bytes themselves and thus
    /// cannot be retried away; transport errors on transient sources can.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Error::OutOfSpec(_) | Error::ChecksumMismatch { .. } | Error::InvalidEncoding(_)
        )
    }
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::InvalidParameter(message) => write!(fmt, "invalid parameter: {}", message),
            Error::WouldOverAllocate => {
                write!(fmt, "operation would allocate beyond the configured limit")
            }
            Error::Transport(message) => write!(fmt, "underlying IO error: {}", message),
            Error::OutOfSpec(message) => write!(fmt, "file out of spec: {}", message),
            Error::InvalidEncoding(message) => write!(fmt, "invalid encoding: {}", message),
            Error::Compression(message) => write!(fmt, "compression error: {}", message),
            Error::ChecksumMismatch { expected, got } => write!(
                fmt,
                "page checksum mismatch: header declares {:#010x}, body hashes to {:#010x}",
                expected, got
            ),
            Error::InvalidState(message) => write!(fmt, "invalid state: {}", message),
            Error::NotFound(message) => write!(fmt, "not found: {}", message),
            Error::FeatureNotActive(feature, message) => {
                write!(
                    fmt,
                    "the feature \"{:?}\" needs to be active to {}",
                    feature, message
                )
            }
        }
    }
}

#[cfg(feature = "snappy")]
impl From<snap::Error> for Error {
    fn from(e: snap::Error) -> Error {
        Error::Compression(format!("underlying snap error: {}", e))
    }
}

#[cfg(feature = "lz4")]
impl From<lz4_flex::block::DecompressError> for Error {
    fn from(e: lz4_flex::block::DecompressError) -> Error {
        Error::Compression(format!("underlying lz4 error: {}", e))
    }
}

#[cfg(feature = "lz4")]
impl From<lz4_flex::block::CompressError> for Error {
    fn from(e: lz4_flex::block::CompressError) -> Error {
        Error::Compression(format!("underlying lz4 error: {}", e))
    }
}

impl From<parquet_format_safe::thrift::Error> for Error {
    fn from(e: parquet_format_safe::thrift::Error) -> Error {
        Error::OutOfSpec(format!("underlying thrift error: {}", e))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::Transport(e.to_string())
    }
}

/// A specialized `Result` for errors of this crate.
pub type Result<T> = std::result::Result<T, Error>;
