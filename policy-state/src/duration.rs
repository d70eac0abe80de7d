//! Protobuf JSON encoding for durations (`"60s"`, `"1.500s"`).

use std::time::Duration;

use crate::{Error, Result};

const NANOS_PER_SECOND: u32 = 1_000_000_000;

/// Formats a duration the way the protobuf JSON mapping does.
///
/// Whole seconds render without a fraction; otherwise the fraction uses 3, 6,
/// or 9 digits, whichever is the shortest exact representation.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let nanos = duration.subsec_nanos();
    if nanos == 0 {
        format!("{secs}s")
    } else if nanos % 1_000_000 == 0 {
        format!("{secs}.{:03}s", nanos / 1_000_000)
    } else if nanos % 1_000 == 0 {
        format!("{secs}.{:06}s", nanos / 1_000)
    } else {
        format!("{secs}.{nanos:09}s")
    }
}

/// Parses a protobuf JSON duration string.
///
/// # Errors
///
/// Returns [`Error::InvalidDuration`] when the value lacks the `s` suffix, is
/// negative, or carries more than nine fractional digits.
pub fn parse_duration(value: &str) -> Result<Duration> {
    let body = value
        .strip_suffix('s')
        .ok_or_else(|| Error::invalid_duration(value, "missing `s` suffix"))?;
    if body.starts_with('-') {
        return Err(Error::invalid_duration(value, "negative durations are not supported"));
    }

    let (secs, frac) = body.split_once('.').unwrap_or((body, ""));
    if secs.is_empty() || !secs.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::invalid_duration(value, "seconds must be a decimal integer"));
    }
    let secs: u64 = secs
        .parse()
        .map_err(|_| Error::invalid_duration(value, "seconds out of range"))?;

    if frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::invalid_duration(
            value,
            "fraction must be at most nine decimal digits",
        ));
    }
    let mut nanos = 0_u32;
    for (idx, digit) in frac.bytes().enumerate() {
        let place = 10_u32.pow(8 - u32::try_from(idx).unwrap_or(8));
        nanos += u32::from(digit - b'0') * place;
    }
    debug_assert!(nanos < NANOS_PER_SECOND);

    Ok(Duration::new(secs, nanos))
}

/// Serde adapter for `Option<Duration>` fields encoded as duration strings.
pub(crate) mod optional {
    use std::time::Duration;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub(crate) fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(duration) => serializer.serialize_str(&super::format_duration(*duration)),
            None => serializer.serialize_none(),
        }
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| super::parse_duration(&raw).map_err(D::Error::custom))
            .transpose()
    }
}
