//! One forwarding run: portal session, exports, parsing and storage.

use crate::config::{FetchConfig, PortalConfig};
use crate::error::Result;
use crate::model::{Granularity, MeasurementSink};
use crate::portal::{parse_export, ExportWindow, Session};
use crate::timezone::resolve_local_timezone;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Outcome of storing one granularity's export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationResult {
    pub destination: String,
    /// Rows read from the export
    pub parsed: usize,
    /// Rows newly written, `None` if the insert failed
    pub written: Option<usize>,
}

/// Per-destination results of a run, in processing order.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub destinations: Vec<DestinationResult>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.destinations.iter().all(|d| d.written.is_some())
    }

    /// Destinations whose insert failed.
    pub fn failed(&self) -> Vec<&str> {
        self.destinations
            .iter()
            .filter(|d| d.written.is_none())
            .map(|d| d.destination.as_str())
            .collect()
    }
}

/// Runs the pipeline for the current time in the host's timezone.
pub async fn run(
    portal: &PortalConfig,
    fetch: &FetchConfig,
    measurement_prefix: &str,
    sink: &dyn MeasurementSink,
) -> Result<RunSummary> {
    let timezone = resolve_local_timezone();
    let now = Utc::now().with_timezone(&timezone);
    run_at(portal, fetch, measurement_prefix, sink, now).await
}

/// Runs the pipeline with `now` as the end of the export window.
///
/// # Behavior
///
/// - Granularities are processed strictly one after another, in configured order
/// - Portal errors, a missing meter UUID and an unreachable store end the run
/// - A rejected insert is recorded in the summary and the next granularity proceeds
/// - Once login succeeded the session is logged out whatever happens afterwards
pub async fn run_at(
    portal: &PortalConfig,
    fetch: &FetchConfig,
    measurement_prefix: &str,
    sink: &dyn MeasurementSink,
    now: DateTime<Tz>,
) -> Result<RunSummary> {
    let mut session = Session::new(&portal.url)?;
    session.open().await?;
    session.authenticate(&portal.user, &portal.password).await?;

    let result = fetch_and_store(&mut session, portal, fetch, measurement_prefix, sink, now).await;
    if result.is_err() {
        tracing::debug!("Run stopped while the session was {}", session.stage());
    }

    if let Err(e) = session.close().await {
        tracing::warn!("Failed to log out of portal: {}", e);
    }
    result
}

async fn fetch_and_store(
    session: &mut Session,
    portal: &PortalConfig,
    fetch: &FetchConfig,
    measurement_prefix: &str,
    sink: &dyn MeasurementSink,
    now: DateTime<Tz>,
) -> Result<RunSummary> {
    if let Some(token) = session.discover_contracts(&portal.contract).await? {
        session.select_contract(&token).await?;
        tracing::info!("Selected contract {}", portal.contract);
    }
    session.select_meter(&portal.meter).await?;
    session.request_export_metadata().await?;

    let window = ExportWindow::new(now, fetch.days)?;
    let mut summary = RunSummary::default();
    for &granularity in &fetch.granularities {
        let result = store_granularity(session, sink, granularity, &window, measurement_prefix).await?;
        summary.destinations.push(result);
    }
    Ok(summary)
}

async fn store_granularity(
    session: &mut Session,
    sink: &dyn MeasurementSink,
    granularity: Granularity,
    window: &ExportWindow,
    measurement_prefix: &str,
) -> Result<DestinationResult> {
    let destination = granularity.destination(measurement_prefix);

    session.request_export(granularity, window).await?;
    let payload = session.download_export().await?;
    let rows = parse_export(&payload, window.timezone);
    tracing::info!("Parsed {} {} rows", rows.len(), granularity);

    let written = match sink.insert_absent(&destination, &rows).await {
        Ok(written) => {
            tracing::info!("Wrote {} new rows to {}", written, destination);
            Some(written)
        }
        Err(e) if e.is_connection_failure() => return Err(e.into()),
        Err(e) => {
            tracing::error!("Failed to store rows in {}: {}", destination, e);
            None
        }
    };

    Ok(DestinationResult {
        destination,
        parsed: rows.len(),
        written,
    })
}
