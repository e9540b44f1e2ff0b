//! Parser for the CSV export the portal hands out after an export request.
//!
//! The export starts with a free-form preamble (meter, period, units) that is
//! discarded up to and including the column header, which begins with
//! [`HEADER_MARKER`]. Every following line is
//! `{interval_start};{interval_end};{value}` with local timestamps and a
//! comma as decimal separator.

use crate::error::ParseError;
use crate::model::MeasurementRow;
use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use std::str::FromStr;

pub const HEADER_MARKER: &str = "DATE_FROM";

const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S";
const FIELD_COUNT: usize = 3;

/// Parses an export into rows keyed by the interval end in UTC.
///
/// Lines with a field count other than three are skipped, as are lines whose
/// timestamp or value cannot be read. Source order is kept.
pub fn parse_export(payload: &str, timezone: Tz) -> Vec<MeasurementRow> {
    let Some((header_line, data)) = data_section(payload) else {
        tracing::warn!("Export has no {} header, nothing to parse", HEADER_MARKER);
        return Vec::new();
    };

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(data.as_bytes());

    let mut rows = Vec::new();
    let mut previous: Option<DateTime<Utc>> = None;
    for result in rdr.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Skipping unreadable export line: {}", e);
                continue;
            }
        };
        let line = header_line + record.position().map_or(0, |p| p.line());

        if record.len() != FIELD_COUNT {
            tracing::debug!(
                "{}",
                ParseError::MalformedLine {
                    line,
                    fields: record.len()
                }
            );
            continue;
        }

        let row = parse_timestamp(&record[1], timezone, previous).and_then(|timestamp| {
            parse_value(&record[2]).map(|value| MeasurementRow { timestamp, value })
        });
        match row {
            Ok(row) => {
                previous = Some(row.timestamp);
                rows.push(row);
            }
            Err(e) => tracing::warn!("Skipping export line {}: {}", line, e),
        }
    }

    rows
}

/// Splits off everything after the header line, with the header's line number.
fn data_section(payload: &str) -> Option<(u64, String)> {
    let mut lines = payload.lines().enumerate();
    let (header_index, _) = lines
        .by_ref()
        .find(|(_, line)| line.starts_with(HEADER_MARKER))?;
    let data = lines.map(|(_, line)| line).collect::<Vec<_>>().join("\n");
    Some((header_index as u64 + 1, data))
}

/// Reads a local interval timestamp and converts it to UTC.
///
/// Inside a daylight-saving fold the earlier instant is used, unless the
/// previous row already reached it: then the repeated hour is under way and
/// the later instant is used.
fn parse_timestamp(
    text: &str,
    timezone: Tz,
    previous: Option<DateTime<Utc>>,
) -> Result<DateTime<Utc>, ParseError> {
    let text = text.trim();
    let naive = NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .map_err(|e| ParseError::timestamp(text, e))?;

    match timezone.from_local_datetime(&naive) {
        LocalResult::Single(local) => Ok(local.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, latest) => {
            let earliest = earliest.with_timezone(&Utc);
            if previous.is_some_and(|p| p >= earliest) {
                Ok(latest.with_timezone(&Utc))
            } else {
                Ok(earliest)
            }
        }
        LocalResult::None => Err(ParseError::timestamp(
            text,
            format!("does not exist in {}", timezone),
        )),
    }
}

fn parse_value(text: &str) -> Result<Decimal, ParseError> {
    let text = text.trim().replace(',', ".");
    Decimal::from_str(&text).map_err(|e| ParseError::value(&text, e))
}
