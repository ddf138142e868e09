//! Timestamp zone normalization.
//!
//! Every timestamp handed back to callers is expressed in one fixed offset.
//! The offset is a configuration value ([`TimeZoneConfig`]) carried by each
//! client rather than a process-wide constant.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};

/// Default offset applied to API timestamps (UTC+9).
pub const DEFAULT_UTC_OFFSET_SECS: i32 = 9 * 60 * 60;

/// Timezone that API timestamps are converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeZoneConfig {
    offset: FixedOffset,
}

impl TimeZoneConfig {
    /// Create a config for an offset east of UTC, in seconds.
    ///
    /// # Errors
    ///
    /// Returns an error if the offset is not strictly within one day.
    pub fn new(offset_secs: i32) -> Result<Self> {
        FixedOffset::east_opt(offset_secs)
            .map(Self::from_offset)
            .ok_or_else(|| Error::ConfigError(format!("Invalid UTC offset: {offset_secs}s")))
    }

    /// Create a config from a chrono offset.
    #[must_use]
    pub const fn from_offset(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Config that leaves timestamps in UTC.
    #[must_use]
    pub fn utc() -> Self {
        Self::from_offset(Utc.fix())
    }

    /// The configured offset.
    #[must_use]
    pub const fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Convert a timestamp to the configured offset. The instant is unchanged.
    #[must_use]
    pub fn normalize(&self, timestamp: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        timestamp.with_timezone(&self.offset)
    }

    /// Convert an optional timestamp in place.
    pub fn normalize_opt(&self, timestamp: &mut Option<DateTime<FixedOffset>>) {
        if let Some(value) = timestamp.as_mut() {
            *value = self.normalize(*value);
        }
    }

    /// The Unix epoch expressed in the configured offset.
    ///
    /// Used as the "never authenticated" marker for sessions.
    #[must_use]
    pub fn epoch(&self) -> DateTime<FixedOffset> {
        DateTime::<Utc>::default().with_timezone(&self.offset)
    }

    /// Parse an RFC 3339 timestamp (fractional seconds allowed) and normalize it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TimestampParse`] if the input is not RFC 3339.
    pub fn parse_rfc3339(&self, input: &str) -> Result<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(input)
            .map(|timestamp| self.normalize(timestamp))
            .map_err(|err| Error::TimestampParse(format!("`{input}`: {err}")))
    }
}

impl Default for TimeZoneConfig {
    fn default() -> Self {
        FixedOffset::east_opt(DEFAULT_UTC_OFFSET_SECS).map_or_else(Self::utc, Self::from_offset)
    }
}

/// Response types whose timestamps are converted to the configured offset.
pub trait Normalize {
    /// Convert every timestamp field to `zone`.
    fn normalize_timestamps(&mut self, zone: &TimeZoneConfig);
}

impl Normalize for () {
    fn normalize_timestamps(&mut self, _zone: &TimeZoneConfig) {}
}

impl<T: Normalize> Normalize for Vec<T> {
    fn normalize_timestamps(&mut self, zone: &TimeZoneConfig) {
        for item in self.iter_mut() {
            item.normalize_timestamps(zone);
        }
    }
}

impl<T: Normalize> Normalize for Option<T> {
    fn normalize_timestamps(&mut self, zone: &TimeZoneConfig) {
        if let Some(item) = self.as_mut() {
            item.normalize_timestamps(zone);
        }
    }
}

/// Deserialize an optional timestamp that may or may not carry an offset.
///
/// Accepts RFC 3339 strings, offset-less `YYYY-MM-DDTHH:MM:SS[.ffffff]`
/// strings (read as UTC), `null` and the empty string.
///
/// # Errors
///
/// Fails when a non-empty string matches neither format.
pub fn deserialize_lenient<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<FixedOffset>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => parse_lenient(raw).map(Some).map_err(serde::de::Error::custom),
    }
}

fn parse_lenient(raw: &str) -> Result<DateTime<FixedOffset>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(timestamp);
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| Utc.from_utc_datetime(&naive).fixed_offset())
        .map_err(|err| Error::TimestampParse(format!("`{raw}`: {err}")))
}
