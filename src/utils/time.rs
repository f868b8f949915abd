//! Timestamp helpers: RFC 3339 serde adapters and display formatting.

use serde::{Deserialize, Deserializer, Serializer};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

/// Deserialize an RFC 3339 formatted string into an OffsetDateTime
pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    OffsetDateTime::parse(&s, &Rfc3339).map_err(serde::de::Error::custom)
}

/// Serialize an OffsetDateTime into an RFC 3339 formatted string
pub fn serialize<S>(datetime: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let s = datetime
        .format(&Rfc3339)
        .map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&s)
}

/// Formats the wall-clock part of a timestamp as `HH:MM`.
pub fn clock(datetime: &OffsetDateTime) -> String {
    datetime
        .format(format_description!("[hour]:[minute]"))
        .unwrap_or_else(|_| "--:--".to_string())
}

/// Returns `candidate` unless it is earlier than `floor`, in which case `floor`.
pub fn not_before(candidate: OffsetDateTime, floor: Option<OffsetDateTime>) -> OffsetDateTime {
    match floor {
        Some(floor) if candidate < floor => floor,
        _ => candidate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn clock_formats_hours_and_minutes() {
        assert_eq!(clock(&datetime!(2025-03-10 09:05:59 UTC)), "09:05");
    }

    #[test]
    fn not_before_clamps_backwards_clock() {
        let earlier = datetime!(2025-03-10 09:00 UTC);
        let later = datetime!(2025-03-10 09:01 UTC);
        assert_eq!(not_before(earlier, Some(later)), later);
        assert_eq!(not_before(later, Some(earlier)), later);
        assert_eq!(not_before(earlier, None), earlier);
    }
}
