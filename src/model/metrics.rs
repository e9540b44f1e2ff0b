use crate::error::StorageError;
use chrono::{DateTime, Utc};
use influxdb2::models::DataPoint;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

use super::traits::DataPointBuilder;

/// One consumption sample taken from an export.
///
/// `timestamp` is the end of the measurement interval in UTC with second
/// precision; `value` keeps the exact decimal the portal reported. Points are
/// written as floats, and a value whose float text differs from the decimal
/// is refused rather than rounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementRow {
    pub timestamp: DateTime<Utc>,
    pub value: Decimal,
}

impl DataPointBuilder for MeasurementRow {
    fn to_point(&self, measurement: &str) -> Result<DataPoint, StorageError> {
        let timestamp = self
            .timestamp
            .timestamp_nanos_opt()
            .ok_or_else(|| StorageError::InvalidDataPoint("Timestamp overflow".to_string()))?;
        let value = self
            .value
            .to_f64()
            .filter(|f| Decimal::from_str(&f.to_string()).ok() == Some(self.value))
            .ok_or_else(|| {
                StorageError::InvalidDataPoint(format!(
                    "Value {} is not exactly representable as a float",
                    self.value
                ))
            })?;

        DataPoint::builder(measurement)
            .field("value", value)
            .timestamp(timestamp)
            .build()
            .map_err(|e| {
                StorageError::InvalidDataPoint(format!("Failed to build MeasurementRow: {}", e))
            })
    }
}
