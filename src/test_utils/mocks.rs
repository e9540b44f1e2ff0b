//! Mock implementations and server helpers for testing.
//!
//! This module provides in-memory sinks and a mock portal server builder for
//! testing the pipeline without a real portal or InfluxDB.

use crate::error::StorageError;
use crate::model::{MeasurementRow, MeasurementSink};
use crate::test_utils::fixtures::{analysis_response, constants::*, export_payload};
use crate::test_utils::html::current_layout_page;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockito::{Matcher, Mock, Server, ServerGuard};
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// A sink that keeps rows in memory with insert-if-absent semantics.
#[derive(Default)]
pub struct MemorySink {
    tables: Mutex<HashMap<String, BTreeMap<DateTime<Utc>, Decimal>>>,
    calls: Mutex<Vec<(String, usize)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Destinations and row counts in call order.
    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().unwrap().clone()
    }

    /// Stored values of `destination` in timestamp order.
    pub fn values(&self, destination: &str) -> Vec<String> {
        self.tables
            .lock()
            .unwrap()
            .get(destination)
            .map_or_else(Vec::new, |table| {
                table.values().map(Decimal::to_string).collect()
            })
    }

    pub fn row_count(&self, destination: &str) -> usize {
        self.tables
            .lock()
            .unwrap()
            .get(destination)
            .map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl MeasurementSink for MemorySink {
    async fn insert_absent(
        &self,
        destination: &str,
        rows: &[MeasurementRow],
    ) -> Result<usize, StorageError> {
        self.calls
            .lock()
            .unwrap()
            .push((destination.to_string(), rows.len()));

        let mut tables = self.tables.lock().unwrap();
        let table = tables.entry(destination.to_string()).or_default();
        let mut written = 0;
        for row in rows {
            if !table.contains_key(&row.timestamp) {
                table.insert(row.timestamp, row.value);
                written += 1;
            }
        }
        Ok(written)
    }
}

/// A sink that fails every insert, optionally as an unreachable store.
pub struct FailingSink {
    connection_failure: bool,
    calls: Mutex<Vec<String>>,
}

impl FailingSink {
    pub fn unreachable() -> Self {
        Self {
            connection_failure: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            connection_failure: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MeasurementSink for FailingSink {
    async fn insert_absent(
        &self,
        destination: &str,
        rows: &[MeasurementRow],
    ) -> Result<usize, StorageError> {
        self.calls.lock().unwrap().push(destination.to_string());
        if self.connection_failure {
            Err(StorageError::connection_failed(
                "http://localhost:8086",
                "connection refused",
            ))
        } else {
            Err(StorageError::write_failed(rows.len(), "field type conflict"))
        }
    }
}

/// Builder for creating mockito server mocks for portal endpoints.
pub struct MockPortalServerBuilder {
    server: ServerGuard,
    mocks: Vec<Mock>,
    logout: Option<Mock>,
}

impl MockPortalServerBuilder {
    /// Creates a new mock server builder.
    pub async fn new() -> Self {
        Self {
            server: Server::new_async().await,
            mocks: Vec::new(),
            logout: None,
        }
    }

    /// Gets the server URL.
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Adds mocks for the landing page and login form.
    pub async fn mock_login(mut self) -> Self {
        let start = self
            .server
            .mock("GET", "/start")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;
        let login = self
            .server
            .mock("POST", "/loginProcess")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;
        self.mocks.extend([start, login]);
        self
    }

    /// Adds a home page listing `("1000", "aaa")` and a pivot revealing the
    /// test contract.
    pub async fn mock_contracts(mut self) -> Self {
        let home = self
            .server
            .mock("GET", "/home")
            .with_status(200)
            .with_body(current_layout_page(&[("1000", "aaa")]))
            .create_async()
            .await;
        let pivot = self
            .server
            .mock("GET", "/dataContextUpdate")
            .match_query(Matcher::UrlEncoded("key".into(), "aaa".into()))
            .with_status(200)
            .with_body(current_layout_page(&[(TEST_CONTRACT, "bbb")]))
            .expect(1)
            .create_async()
            .await;
        let select = self
            .server
            .mock("GET", "/dataContextUpdate")
            .match_query(Matcher::UrlEncoded("key".into(), "bbb".into()))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;
        self.mocks.extend([home, pivot, select]);
        self
    }

    /// Adds meter selection and an analysis response with the given body.
    pub async fn mock_meter(mut self, analysis_body: &str) -> Self {
        let meter = self
            .server
            .mock("GET", "/consumptionDetails")
            .match_query(Matcher::UrlEncoded("meteringCode".into(), TEST_METER.into()))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;
        let init = self
            .server
            .mock("POST", "/analysis/initData")
            .with_status(200)
            .with_body(analysis_body)
            .expect(1)
            .create_async()
            .await;
        self.mocks.extend([meter, init]);
        self
    }

    /// Adds meter selection answering with [`TEST_METER_UUID`].
    pub async fn mock_valid_meter(self) -> Self {
        self.mock_meter(&analysis_response(TEST_METER_UUID)).await
    }

    /// Adds one export request and one download per granularity keyword.
    ///
    /// Downloads are served in the given order, each with its own lines, so a
    /// destination only receives its own values when exports run in order.
    pub async fn mock_exports(mut self, exports: &[(&str, &[&str])]) -> Self {
        for (keyword, _) in exports {
            let request = self
                .server
                .mock("POST", "/analysis/csvRequest")
                .match_body(Matcher::PartialJson(json!({
                    "indicatorValueRequests": [{
                        "indicatorID": TEST_METER_UUID,
                        "featureValueRequests": [{"granularityType": keyword}]
                    }]
                })))
                .with_status(200)
                .with_body("{}")
                .expect(1)
                .create_async()
                .await;
            self.mocks.push(request);
        }
        for (_, lines) in exports {
            let download = self
                .server
                .mock("GET", "/analysis/csvDownload")
                .with_status(200)
                .with_body(export_payload(lines))
                .expect(1)
                .create_async()
                .await;
            self.mocks.push(download);
        }
        self
    }

    /// Adds the logout endpoint, expected exactly once.
    pub async fn mock_logout(mut self) -> Self {
        let logout = self
            .server
            .mock("GET", "/logout")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;
        self.logout = Some(logout);
        self
    }

    /// Verifies the logout endpoint was hit exactly once.
    pub async fn assert_logged_out(&self) {
        match &self.logout {
            Some(logout) => logout.assert_async().await,
            None => panic!("logout endpoint was not mocked"),
        }
    }

    /// Verifies every mock was hit as often as expected.
    pub async fn assert_all(&self) {
        for mock in self.mocks.iter().chain(&self.logout) {
            mock.assert_async().await;
        }
    }
}
