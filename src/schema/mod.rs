//! Models of the parquet schema: the typed tree, its thrift representation
//! and the message text format.
pub mod io_message;
pub mod io_thrift;
pub mod types;

pub use crate::parquet_bridge::Repetition;
