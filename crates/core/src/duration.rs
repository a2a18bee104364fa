//! Duration strings such as `"300ms"`, `"1h30m"` or `"1.5h"`.
//!
//! The accepted grammar is a possibly signed sequence of decimal numbers, each
//! with an optional fraction and a mandatory unit suffix. Valid units are
//! `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`. The bare string `"0"` is
//! also accepted.

use chrono::TimeDelta;

use crate::error::DomainError;

const NANOS_PER_MICRO: i128 = 1_000;
const NANOS_PER_MILLI: i128 = 1_000_000;
const NANOS_PER_SECOND: i128 = 1_000_000_000;

// Fraction digits past nanosecond precision of the smallest unit are dropped.
const MAX_FRACTION_DIGITS: usize = 18;

/// Parse a duration string into a signed [`TimeDelta`].
pub fn parse_duration(input: &str) -> Result<TimeDelta, DomainError> {
    let err = |reason: &str| DomainError::invalid_duration(input, reason);

    let (negative, mut rest) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        _ => (false, input),
    };

    if rest == "0" {
        return Ok(TimeDelta::zero());
    }
    if rest.is_empty() {
        return Err(err("empty duration"));
    }

    let mut total: i128 = 0;
    while !rest.is_empty() {
        let int_len = leading_digits(rest);
        let (int_part, after_int) = rest.split_at(int_len);

        let (frac_part, after_number) = match after_int.strip_prefix('.') {
            Some(stripped) => stripped.split_at(leading_digits(stripped)),
            None => ("", after_int),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(err("expected a number"));
        }

        let unit_len = after_number
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(after_number.len());
        let (unit, tail) = after_number.split_at(unit_len);
        let scale = unit_scale(unit).ok_or_else(|| {
            if unit.is_empty() {
                err("missing unit")
            } else {
                err(&format!("unknown unit {unit:?}"))
            }
        })?;

        let whole = parse_digits(int_part).ok_or_else(|| err("number out of range"))?;
        let mut segment = whole
            .checked_mul(scale)
            .ok_or_else(|| err("duration out of range"))?;

        if !frac_part.is_empty() {
            let digits = &frac_part[..frac_part.len().min(MAX_FRACTION_DIGITS)];
            let numerator = parse_digits(digits).ok_or_else(|| err("number out of range"))?;
            let denominator = 10_i128.pow(digits.len() as u32);
            segment = segment
                .checked_add(numerator * scale / denominator)
                .ok_or_else(|| err("duration out of range"))?;
        }

        total = total
            .checked_add(segment)
            .ok_or_else(|| err("duration out of range"))?;
        rest = tail;
    }

    if total > i64::MAX as i128 {
        return Err(err("duration out of range"));
    }
    let nanos = total as i64;
    Ok(TimeDelta::nanoseconds(if negative { -nanos } else { nanos }))
}

fn leading_digits(s: &str) -> usize {
    s.bytes().take_while(u8::is_ascii_digit).count()
}

fn parse_digits(digits: &str) -> Option<i128> {
    if digits.is_empty() {
        return Some(0);
    }
    // 30 digits keeps the later multiplication inside i128.
    if digits.len() > 30 {
        return None;
    }
    digits.parse().ok()
}

fn unit_scale(unit: &str) -> Option<i128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SECOND),
        "m" => Some(60 * NANOS_PER_SECOND),
        "h" => Some(3600 * NANOS_PER_SECOND),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_single_units() {
        assert_eq!(parse_duration("300ms").unwrap(), TimeDelta::milliseconds(300));
        assert_eq!(parse_duration("10s").unwrap(), TimeDelta::seconds(10));
        assert_eq!(parse_duration("5m").unwrap(), TimeDelta::minutes(5));
        assert_eq!(parse_duration("2h").unwrap(), TimeDelta::hours(2));
        assert_eq!(parse_duration("2µs").unwrap(), TimeDelta::microseconds(2));
        assert_eq!(parse_duration("7ns").unwrap(), TimeDelta::nanoseconds(7));
    }

    #[test]
    fn parses_compound_and_fractional_values() {
        assert_eq!(parse_duration("1h30m").unwrap(), TimeDelta::minutes(90));
        assert_eq!(parse_duration("1.5h").unwrap(), TimeDelta::minutes(90));
        assert_eq!(parse_duration(".5s").unwrap(), TimeDelta::milliseconds(500));
        assert_eq!(parse_duration("1.s").unwrap(), TimeDelta::seconds(1));
        assert_eq!(parse_duration("2m0.25s").unwrap(), TimeDelta::milliseconds(120_250));
    }

    #[test]
    fn accepts_sign_and_bare_zero() {
        assert_eq!(parse_duration("0").unwrap(), TimeDelta::zero());
        assert_eq!(parse_duration("-2s").unwrap(), TimeDelta::seconds(-2));
        assert_eq!(parse_duration("+2s").unwrap(), TimeDelta::seconds(2));
    }

    #[test]
    fn rejects_malformed_input() {
        for input in ["", "-", "not-a-duration", "10", "1x", "s", ".s", "1h-30m", "1 s"] {
            assert!(
                matches!(parse_duration(input), Err(DomainError::InvalidDuration { .. })),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_overflow() {
        assert!(parse_duration("9999999999999999999h").is_err());
    }

    proptest! {
        #[test]
        fn hours_minutes_seconds_add_up(h in 0i64..10_000, m in 0i64..60, s in 0i64..60) {
            let parsed = parse_duration(&format!("{h}h{m}m{s}s")).unwrap();
            prop_assert_eq!(parsed, TimeDelta::seconds(h * 3600 + m * 60 + s));
        }
    }
}
