//! Request bodies for the portal's analysis and CSV export endpoints.

use crate::error::{ConfigError, PortalError};
use crate::model::Granularity;
use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use serde_derive::Serialize;
use std::collections::BTreeMap;

const FEATURE_ID: &str = "POWER_ACTIVE_PURCHASE_CONSUMPTION";

/// Time range of an export, rendered the way the portal expects it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportWindow {
    pub begin: String,
    pub end: String,
    pub timezone: Tz,
}

impl ExportWindow {
    /// Window from local midnight `lookback_days` ago until `now`.
    ///
    /// Only the begin date is shifted, so a `now` whose wall-clock time does
    /// not exist or repeats on that date still yields a window.
    pub fn new(now: DateTime<Tz>, lookback_days: u64) -> Result<Self, ConfigError> {
        let timezone = now.timezone();
        let begin = now
            .date_naive()
            .checked_sub_days(Days::new(lookback_days))
            .and_then(|date| start_of_day(timezone, date))
            .ok_or_else(|| ConfigError::invalid("FETCH_DAYS", "lookback window out of range"))?;

        Ok(Self {
            begin: begin.format("%Y-%m-%dT00:00:00.000%z").to_string(),
            end: now.format("%Y-%m-%dT%H:%M:%S.000%z").to_string(),
            timezone,
        })
    }
}

/// First instant of `date`, which is midnight unless midnight falls in a gap.
fn start_of_day(timezone: Tz, date: NaiveDate) -> Option<DateTime<Tz>> {
    (0..24).find_map(|hour| {
        let time = NaiveTime::from_hms_opt(hour, 0, 0)?;
        timezone.from_local_datetime(&date.and_time(time)).earliest()
    })
}

/// Body of the analysis-init call that reveals the selected meter.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisInitRequest {
    fetch_last_import: bool,
    fetch_energy_performance_indicator: bool,
    fetch_installation: bool,
    #[serde(rename = "compareIndicatorIDs")]
    compare_indicator_ids: Vec<String>,
}

impl Default for AnalysisInitRequest {
    fn default() -> Self {
        Self {
            fetch_last_import: true,
            fetch_energy_performance_indicator: true,
            fetch_installation: true,
            compare_indicator_ids: Vec::new(),
        }
    }
}

/// Reads `currentIndicator.indicatorID` from an analysis-init response.
///
/// The response also describes the installation, so a failure only reports
/// the top-level keys.
pub fn meter_uuid_from_analysis(body: &str) -> Result<String, PortalError> {
    let document: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| PortalError::invalid_response("analysis/initData", e))?;

    document
        .pointer("/currentIndicator/indicatorID")
        .and_then(serde_json::Value::as_str)
        .filter(|uuid| !uuid.is_empty())
        .map(str::to_string)
        .ok_or_else(|| PortalError::MeterUuidMissing {
            keys: document
                .as_object()
                .map(|object| object.keys().cloned().collect())
                .unwrap_or_default(),
        })
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct FeatureValueRequest {
    #[serde(rename = "featureID")]
    feature_id: &'static str,
    granularity_type: &'static str,
    aggregation_type: &'static str,
    request_options: Vec<&'static str>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct IndicatorValueRequest {
    value_range: BTreeMap<String, String>,
    #[serde(rename = "indicatorID")]
    indicator_id: String,
    indicator_type: &'static str,
    index: u32,
    feature_value_requests: Vec<FeatureValueRequest>,
}

/// Body of the CSV export request for one meter and granularity.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    date_type: &'static str,
    user_time_zone: String,
    indicator_value_requests: Vec<IndicatorValueRequest>,
}

impl ExportRequest {
    pub fn new(meter_uuid: &str, granularity: Granularity, window: &ExportWindow) -> Self {
        // the portal keys the range by its begin: {"<begin>": "<end>"}
        let value_range = BTreeMap::from([(window.begin.clone(), window.end.clone())]);

        Self {
            date_type: "DAY",
            user_time_zone: window.timezone.name().to_string(),
            indicator_value_requests: vec![IndicatorValueRequest {
                value_range,
                indicator_id: meter_uuid.to_string(),
                indicator_type: "METER",
                index: 0,
                feature_value_requests: vec![FeatureValueRequest {
                    feature_id: FEATURE_ID,
                    granularity_type: granularity.keyword(),
                    aggregation_type: "SUM",
                    request_options: vec!["NORMALIZE"],
                }],
            }],
        }
    }
}
