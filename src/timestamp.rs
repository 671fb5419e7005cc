//! Decoding of Active Directory FILETIME values.
//!
//! Attributes such as `lastLogonTimestamp` and `pwdLastSet` hold the number of
//! 100-nanosecond intervals since 1601-01-01T00:00:00 UTC, as decimal text.
//! Values whose calendar year falls outside `1..=9999` cannot be shown as
//! `YYYY-MM-DD HH:MM:SS`; the directory uses such values (`i64::MAX`) to mean
//! "never expires", so they decode to [`Decoded::NeverExpires`].
use std::fmt;
use std::num::IntErrorKind;

use chrono::{DateTime, Datelike, Duration, NaiveDateTime};

use crate::error::{CalculationError, DecodeError};

pub const TICKS_PER_SECOND: i64 = 10_000_000;
/// Seconds between 1601-01-01 and 1970-01-01.
pub const EPOCH_OFFSET_SECS: i64 = 11_644_473_600;
/// Assumed password rotation policy, in days.
pub const DEFAULT_PASSWORD_MAX_AGE_DAYS: u32 = 90;

pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    At(NaiveDateTime),
    NeverExpires,
}

impl fmt::Display for Decoded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decoded::At(t) => write!(f, "{}", format_time(t)),
            Decoded::NeverExpires => f.write_str("Never Expires"),
        }
    }
}

pub fn format_time(t: &NaiveDateTime) -> String {
    t.format(DISPLAY_FORMAT).to_string()
}

fn representable(t: &NaiveDateTime) -> bool {
    (1..=9999).contains(&t.year())
}

/// Convert a tick count to calendar time, or `None` when out of range.
pub fn from_ticks(ticks: i64) -> Option<NaiveDateTime> {
    let secs = ticks
        .div_euclid(TICKS_PER_SECOND)
        .checked_sub(EPOCH_OFFSET_SECS)?;
    let nanos = u32::try_from(ticks.rem_euclid(TICKS_PER_SECOND) * 100).ok()?;
    DateTime::from_timestamp(secs, nanos)
        .map(|dt| dt.naive_utc())
        .filter(representable)
}

/// Decode a FILETIME string. Only non-integer text is an error; integers
/// that do not fit the calendar are [`Decoded::NeverExpires`].
pub fn decode_timestamp(raw: &str) -> Result<Decoded, DecodeError> {
    let ticks: i128 = match raw.trim().parse() {
        Ok(t) => t,
        Err(e) if matches!(e.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) => {
            return Ok(Decoded::NeverExpires);
        }
        Err(_) => return Err(DecodeError(raw.to_string())),
    };
    Ok(i64::try_from(ticks)
        .ok()
        .and_then(from_ticks)
        .map_or(Decoded::NeverExpires, Decoded::At))
}

/// Estimated password expiry: `pwdLastSet` plus the default rotation age.
pub fn estimate_password_expiry(raw: &str) -> Result<NaiveDateTime, CalculationError> {
    estimate_password_expiry_with(raw, DEFAULT_PASSWORD_MAX_AGE_DAYS)
}

pub fn estimate_password_expiry_with(
    raw: &str,
    max_age_days: u32,
) -> Result<NaiveDateTime, CalculationError> {
    match decode_timestamp(raw) {
        Ok(Decoded::At(set)) => set
            .checked_add_signed(Duration::days(i64::from(max_age_days)))
            .filter(representable)
            .ok_or(CalculationError),
        _ => Err(CalculationError),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_known_values() {
        assert_eq!(
            decode_timestamp("132000000000000000").unwrap().to_string(),
            "2019-04-17 18:40:00"
        );
        // sub-second remainder is dropped by the display format
        assert_eq!(
            decode_timestamp("133500000001234567").unwrap().to_string(),
            "2024-01-17 21:20:00"
        );
        assert_eq!(
            decode_timestamp("0").unwrap().to_string(),
            "1601-01-01 00:00:00"
        );
    }

    #[test]
    fn decode_is_deterministic() {
        let a = decode_timestamp(" 133500000000000000 ").unwrap();
        let b = decode_timestamp("133500000000000000").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn never_expires_sentinel_is_not_an_error() {
        assert_eq!(
            decode_timestamp("9223372036854775807").unwrap(),
            Decoded::NeverExpires
        );
        assert_eq!(
            decode_timestamp("99999999999999999999999").unwrap(),
            Decoded::NeverExpires
        );
        assert_eq!(Decoded::NeverExpires.to_string(), "Never Expires");
    }

    #[test]
    fn integers_wider_than_i128_never_expire() {
        assert_eq!(
            decode_timestamp(&"9".repeat(45)).unwrap(),
            Decoded::NeverExpires
        );
        assert_eq!(
            decode_timestamp(&format!("-{}", "9".repeat(45))).unwrap(),
            Decoded::NeverExpires
        );
        assert!(estimate_password_expiry(&"9".repeat(45)).is_err());
    }

    #[test]
    fn last_representable_second() {
        assert_eq!(
            decode_timestamp("2650467743990000000").unwrap().to_string(),
            "9999-12-31 23:59:59"
        );
        assert_eq!(
            decode_timestamp("2650467744000000000").unwrap(),
            Decoded::NeverExpires
        );
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(decode_timestamp("yesterday").is_err());
        assert!(decode_timestamp("").is_err());
    }

    #[test]
    fn expiry_is_decode_plus_ninety_days() {
        for raw in ["132000000000000000", "133500000001234567", "0"] {
            let Decoded::At(set) = decode_timestamp(raw).unwrap() else {
                panic!("expected a calendar time for {raw}");
            };
            assert_eq!(
                estimate_password_expiry(raw).unwrap(),
                set + Duration::days(90)
            );
        }
        assert_eq!(
            format_time(&estimate_password_expiry("132000000000000000").unwrap()),
            "2019-07-16 18:40:00"
        );
    }

    #[test]
    fn expiry_fails_when_decode_does_not_yield_a_time() {
        assert_eq!(estimate_password_expiry("nope"), Err(CalculationError));
        assert_eq!(
            estimate_password_expiry("9223372036854775807"),
            Err(CalculationError)
        );
        // representable on its own, out of range once the offset is added
        assert_eq!(
            estimate_password_expiry("2650467743990000000"),
            Err(CalculationError)
        );
    }

    #[test]
    fn custom_max_age() {
        let t = estimate_password_expiry_with("132000000000000000", 30).unwrap();
        assert_eq!(format_time(&t), "2019-05-17 18:40:00");
    }
}
