use crate::error::StorageError;
use async_trait::async_trait;
use influxdb2::models::DataPoint;

use super::metrics::MeasurementRow;

/// Trait for types that can be converted to InfluxDB data points.
pub trait DataPointBuilder: Send + Sync {
    /// Converts the value into a DataPoint of the given measurement.
    ///
    /// # Returns
    /// - `Ok(DataPoint)` if conversion succeeds
    /// - `Err` if the data cannot be converted to a valid DataPoint
    fn to_point(&self, measurement: &str) -> Result<DataPoint, StorageError>;
}

/// Destination for parsed consumption rows.
///
/// Implementors insert rows whose timestamp is not yet present in the
/// destination and silently skip the others, so writing the same export
/// twice leaves the store unchanged.
#[async_trait]
pub trait MeasurementSink: Send + Sync {
    /// Inserts the rows absent from `destination`.
    ///
    /// # Returns
    /// The number of rows actually written.
    async fn insert_absent(
        &self,
        destination: &str,
        rows: &[MeasurementRow],
    ) -> Result<usize, StorageError>;
}
