use std::fmt;

use time::{OffsetDateTime, UtcOffset, format_description::well_known::Rfc3339};
use tracing_subscriber::fmt::{format::Writer, time::FormatTime};

use crate::logger::LoggerTimeZone;

/// RFC 3339 timestamps at a fixed offset.
#[derive(Debug, Clone, Copy)]
pub struct LogTimer {
    offset: UtcOffset,
}

impl LogTimer {
    pub fn utc() -> Self {
        Self {
            offset: UtcOffset::UTC,
        }
    }

    /// Resolve `tz` now; local detection falls back to UTC when it is unavailable.
    pub fn for_zone(tz: LoggerTimeZone) -> Self {
        match tz {
            LoggerTimeZone::Utc => Self::utc(),
            LoggerTimeZone::Local => Self {
                offset: UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC),
            },
        }
    }

    pub fn offset(&self) -> UtcOffset {
        self.offset
    }
}

impl FormatTime for LogTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        match OffsetDateTime::now_utc().to_offset(self.offset).format(&Rfc3339) {
            Ok(ts) => write!(w, "{ts} "),
            Err(_) => write!(w, "<invalid-time> "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utc_zone_has_zero_offset() {
        assert_eq!(LogTimer::for_zone(LoggerTimeZone::Utc).offset(), UtcOffset::UTC);
    }

    #[test]
    fn local_zone_is_within_range() {
        let offset = LogTimer::for_zone(LoggerTimeZone::Local).offset();
        assert!(offset.whole_hours().abs() <= 14);
    }
}
