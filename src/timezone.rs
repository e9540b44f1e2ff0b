//! Resolution of the civil timezone used to read portal timestamps.

use chrono_tz::Tz;
use std::path::Path;

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Berlin;

const LOCALTIME_PATH: &str = "/etc/localtime";

/// Returns the system's configured timezone, or [`DEFAULT_TIMEZONE`].
///
/// Never fails: a missing `/etc/localtime`, a target that is not a zoneinfo
/// path, or an unknown zone name all fall back to the default.
pub fn resolve_local_timezone() -> Tz {
    resolve_from_path(Path::new(LOCALTIME_PATH))
}

/// Resolves the zone from a zoneinfo symlink such as
/// `/etc/localtime -> /usr/share/zoneinfo/Europe/Vienna`.
pub fn resolve_from_path(path: &Path) -> Tz {
    match zone_from_link(path) {
        Some(tz) => {
            tracing::debug!("Resolved local timezone {} from {}", tz, path.display());
            tz
        }
        None => {
            tracing::warn!(
                "Could not resolve timezone from {}, using {}",
                path.display(),
                DEFAULT_TIMEZONE
            );
            DEFAULT_TIMEZONE
        }
    }
}

fn zone_from_link(path: &Path) -> Option<Tz> {
    let target = std::fs::canonicalize(path).ok()?;
    let mut components = target.components().rev();
    let city = components.next()?.as_os_str().to_str()?;
    let region = components.next()?.as_os_str().to_str()?;
    format!("{}/{}", region, city).parse::<Tz>().ok()
}
