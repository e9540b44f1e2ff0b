//! TINETZ consumption data to InfluxDB2 forwarder
//!
//! This application logs in to the TINETZ customer portal, exports the
//! consumption of one metering point for the last few days and stores the
//! values in InfluxDB2, skipping rows that are already present.
//!
//! # Architecture
//!
//! A run is one strictly sequential pass:
//! - **Portal session**: login, contract and meter selection
//! - **Exports**: one CSV export per configured granularity
//! - **Storage**: rows written to `{prefix}_day` and `{prefix}_15m`
//!
//! The process exits with a non-zero status when any part of the run failed.

mod config;
mod error;
mod influxdb;
mod model;
mod pipeline;
mod portal;
mod timezone;

#[cfg(test)]
mod test_utils;

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let app_config = match config::load_app_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };
    tracing_subscriber::fmt()
        .with_max_level(app_config.log_level())
        .with_writer(std::io::stderr)
        .init();

    match forward().await {
        Ok(summary) if summary.is_success() => {
            for result in &summary.destinations {
                tracing::info!(
                    "{}: {} rows exported, {} new",
                    result.destination,
                    result.parsed,
                    result.written.unwrap_or_default()
                );
            }
            tracing::info!("Run finished");
            ExitCode::SUCCESS
        }
        Ok(summary) => {
            tracing::error!("Run finished with failed destinations: {:?}", summary.failed());
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!("Run failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Loads the remaining configuration and performs one run.
async fn forward() -> anyhow::Result<pipeline::RunSummary> {
    let fetch_config = config::load_fetch_config()?;
    let portal_config = config::load_portal_config()?;
    let influx_config = config::load_influx_config()?;
    let influx_client = influxdb::Client::new(influx_config);

    tracing::info!(
        "Fetching the last {} days of {:?} for meter {}",
        fetch_config.days,
        fetch_config.granularities,
        portal_config.meter
    );
    let summary = pipeline::run(
        &portal_config,
        &fetch_config,
        influx_client.measurement_prefix(),
        &influx_client,
    )
    .await?;
    Ok(summary)
}
