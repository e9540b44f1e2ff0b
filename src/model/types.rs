use serde_derive::Deserialize;
use std::fmt;

/// Sampling resolution of requested consumption data.
///
/// Each granularity maps to the portal's aggregation keyword and to the
/// suffix of the InfluxDB measurement its rows are stored in.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Deserialize)]
pub enum Granularity {
    /// Daily totals
    #[serde(rename = "DAY")]
    Daily,
    /// 15-minute interval values
    #[serde(rename = "QUARTER_HOUR")]
    QuarterHour,
}

impl Granularity {
    /// All granularities in the order a run processes them.
    pub fn all() -> &'static [Granularity] {
        &[Granularity::Daily, Granularity::QuarterHour]
    }

    /// Keyword the portal expects as `granularityType`.
    pub fn keyword(&self) -> &'static str {
        match self {
            Granularity::Daily => "DAY",
            Granularity::QuarterHour => "QUARTER_HOUR",
        }
    }

    pub fn destination_suffix(&self) -> &'static str {
        match self {
            Granularity::Daily => "_day",
            Granularity::QuarterHour => "_15m",
        }
    }

    /// Destination name for this granularity, e.g. `tinetz_day`.
    pub fn destination(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.destination_suffix())
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.keyword())
    }
}
