use crate::config::InfluxConfig;
use crate::error::StorageError;
use crate::model::{DataPointBuilder, MeasurementRow, MeasurementSink};
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use futures::prelude::stream;
use reqwest::StatusCode;
use serde_json::json;
use std::collections::HashSet;

/// InfluxDB 2 store for consumption rows.
///
/// Each destination is a measurement in the configured bucket, keyed by
/// timestamp. Clients are created per insert and dropped when it returns.
pub struct Client {
    config: InfluxConfig,
}

impl Client {
    pub(crate) fn new(config: InfluxConfig) -> Self {
        Self { config }
    }

    pub fn measurement_prefix(&self) -> &str {
        &self.config.measurement_prefix
    }

    /// Timestamps already stored in `measurement` within `[start, stop)`.
    async fn existing_timestamps(
        &self,
        http_client: &reqwest::Client,
        measurement: &str,
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    ) -> Result<HashSet<DateTime<Utc>>, StorageError> {
        let flux = format!(
            "from(bucket: {})\n  |> range(start: {}, stop: {})\n  |> filter(fn: (r) => r._measurement == {} and r._field == \"value\")\n  |> keep(columns: [\"_time\"])",
            flux_string(&self.config.bucket),
            start.to_rfc3339_opts(SecondsFormat::Secs, true),
            stop.to_rfc3339_opts(SecondsFormat::Secs, true),
            flux_string(measurement),
        );

        let url = format!("{}/api/v2/query", self.config.url.trim_end_matches('/'));
        let response = http_client
            .post(&url)
            .query(&[("org", self.config.org.as_str())])
            .header("authorization", format!("Token {}", self.config.token))
            .header("accept", "application/csv")
            .json(&json!({
                "query": flux,
                "type": "flux",
                "dialect": {"header": true, "annotations": [], "delimiter": ","}
            }))
            .send()
            .await
            .map_err(|e| StorageError::connection_failed(&self.config.url, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StorageError::connection_failed(&self.config.url, e))?;
        match status {
            s if s.is_success() => parse_times(&body),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(
                StorageError::connection_failed(&self.config.url, format!("{}: {}", status, body)),
            ),
            _ => Err(StorageError::QueryFailed(format!("{}: {}", status, body))),
        }
    }
}

#[async_trait]
impl MeasurementSink for Client {
    async fn insert_absent(
        &self,
        destination: &str,
        rows: &[MeasurementRow],
    ) -> Result<usize, StorageError> {
        let (Some(start), Some(last)) = (
            rows.iter().map(|r| r.timestamp).min(),
            rows.iter().map(|r| r.timestamp).max(),
        ) else {
            return Ok(0);
        };

        let http_client = reqwest::Client::new();
        let mut seen = self
            .existing_timestamps(&http_client, destination, start, last + Duration::seconds(1))
            .await?;
        let existing = seen.len();

        let points = rows
            .iter()
            .filter(|row| seen.insert(row.timestamp))
            .map(|row| row.to_point(destination))
            .collect::<Result<Vec<_>, _>>()?;
        let count = points.len();
        tracing::debug!(
            "{}: {} rows, {} already stored, {} to write",
            destination,
            rows.len(),
            existing,
            count
        );
        if points.is_empty() {
            return Ok(0);
        }

        let client =
            influxdb2::Client::new(&self.config.url, &self.config.org, &self.config.token);
        client
            .write(self.config.bucket.as_str(), stream::iter(points))
            .await
            .map_err(|e| StorageError::write_failed(count, e))?;
        Ok(count)
    }
}

/// Quotes a value as a Flux string literal.
fn flux_string(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace("${", "\\${");
    format!("\"{}\"", escaped)
}

/// Reads the `_time` column of a Flux CSV answer. Tables repeat their header.
fn parse_times(body: &str) -> Result<HashSet<DateTime<Utc>>, StorageError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut times = HashSet::new();
    let mut time_column: Option<usize> = None;
    for result in rdr.records() {
        let record = result.map_err(|e| StorageError::QueryFailed(e.to_string()))?;
        if let Some(index) = record.iter().position(|field| field == "_time") {
            time_column = Some(index);
            continue;
        }
        let Some(text) = time_column.and_then(|index| record.get(index)) else {
            continue;
        };
        if text.is_empty() {
            continue;
        }
        let time = DateTime::parse_from_rfc3339(text)
            .map_err(|e| StorageError::QueryFailed(format!("bad _time '{}': {}", text, e)))?;
        times.insert(time.with_timezone(&Utc));
    }

    Ok(times)
}
