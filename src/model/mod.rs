//! Model definitions for consumption rows and their storage.
//!
//! This module provides the granularities a run requests, the rows the
//! export parser produces, and the traits that turn rows into stored
//! InfluxDB data points.

pub mod metrics;
pub mod traits;
pub mod types;

pub use metrics::MeasurementRow;
pub use traits::{DataPointBuilder, MeasurementSink};
pub use types::Granularity;
