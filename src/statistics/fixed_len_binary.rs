use std::sync::Arc;

use parquet_format_safe::Statistics as ParquetStatistics;

use super::Statistics;
use crate::error::{Error, Result};
use crate::schema::types::PhysicalType;

#[derive(Debug, Clone, PartialEq)]
pub struct FixedLenStatistics {
    pub size: usize,
    pub null_count: Option<i64>,
    pub distinct_count: Option<i64>,
    pub min_value: Option<Vec<u8>>,
    pub max_value: Option<Vec<u8>>,
    physical_type: PhysicalType,
}

impl Statistics for FixedLenStatistics {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn physical_type(&self) -> &PhysicalType {
        &self.physical_type
    }

    fn null_count(&self) -> Option<i64> {
        self.null_count
    }
}

impl FixedLenStatistics {
    pub fn new(
        size: usize,
        null_count: Option<i64>,
        distinct_count: Option<i64>,
        min_value: Option<Vec<u8>>,
        max_value: Option<Vec<u8>>,
    ) -> Self {
        Self {
            size,
            null_count,
            distinct_count,
            min_value,
            max_value,
            physical_type: PhysicalType::FixedLenByteArray(size),
        }
    }
}

pub fn read(v: &ParquetStatistics, size: usize) -> Result<Arc<dyn Statistics>> {
    if let Some(ref v) = v.max_value {
        if v.len() != size {
            return Err(Error::oos(
                "The max_value of statistics MUST be plain encoded",
            ));
        }
    };
    if let Some(ref v) = v.min_value {
        if v.len() != size {
            return Err(Error::oos(
                "The min_value of statistics MUST be plain encoded",
            ));
        }
    };

    Ok(Arc::new(FixedLenStatistics::new(
        size,
        v.null_count,
        v.distinct_count,
        v.min_value.clone(),
        v.max_value.clone(),
    )))
}

pub fn write(v: &FixedLenStatistics) -> ParquetStatistics {
    ParquetStatistics {
        null_count: v.null_count,
        distinct_count: v.distinct_count,
        max_value: v.max_value.clone(),
        min_value: v.min_value.clone(),
        min: None,
        max: None,
    }
}
