//! Data size strings as printed by tracker listings.

use thiserror::Error;

const SI_UNITS: [&str; 5] = ["B", "kB", "MB", "GB", "TB"];
const IEC_UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

#[derive(Debug, Error, PartialEq)]
pub enum SizeParseError {
    #[error("Expected \"<number> <unit>\", got {0:?}")]
    Malformed(String),

    #[error("Invalid number in size {0:?}")]
    InvalidNumber(String),

    #[error("Unknown size unit {0:?}")]
    UnknownUnit(String),
}

/// Parse a `"<number> <unit>"` size string into bytes.
///
/// Trackers print SI suffixes for values they computed in base 1024, so the
/// unit family is only used to find the power: both `"1.5 GB"` and
/// `"1.5 GiB"` are `1.5 * 1024^3`. The result is rounded up to a whole byte.
/// A comma is accepted as decimal separator.
pub fn parse_size(text: &str) -> Result<u64, SizeParseError> {
    let mut parts = text.split_whitespace();
    let (Some(number), Some(unit), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(SizeParseError::Malformed(text.to_string()));
    };

    let value: f64 = number
        .replace(',', ".")
        .parse()
        .map_err(|_| SizeParseError::InvalidNumber(number.to_string()))?;
    if !value.is_finite() || value < 0.0 {
        return Err(SizeParseError::InvalidNumber(number.to_string()));
    }

    let power = unit_power(unit).ok_or_else(|| SizeParseError::UnknownUnit(unit.to_string()))?;

    Ok((value * 1024f64.powi(power)).ceil() as u64)
}

fn unit_power(unit: &str) -> Option<i32> {
    let unit = unit.to_lowercase();
    IEC_UNITS
        .iter()
        .position(|u| u.to_lowercase() == unit)
        .or_else(|| SI_UNITS.iter().position(|u| u.to_lowercase() == unit))
        .map(|p| p as i32)
}

/// Human-readable size with two decimals, e.g. `"1.50 GiB"`.
///
/// `iec` selects base 1024 with `KiB`-style suffixes; otherwise base 1000 with
/// `kB`-style suffixes.
pub fn format_size(bytes: u64, iec: bool) -> String {
    let (base, units) = if iec {
        (1024.0, IEC_UNITS)
    } else {
        (1000.0, SI_UNITS)
    };

    let mut value = bytes as f64;
    for unit in &units[..units.len() - 1] {
        if value < base {
            return format!("{:.2} {}", value, unit);
        }
        value /= base;
    }
    format!("{:.2} {}", value, units[units.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_si_and_iec_resolve_identically() {
        let expected = (1.5 * 1024f64.powi(3)).ceil() as u64;
        assert_eq!(parse_size("1.5 GB").unwrap(), expected);
        assert_eq!(parse_size("1.5 GiB").unwrap(), expected);
        assert_eq!(expected, 1_610_612_736);
    }

    #[test]
    fn test_rounds_up_to_whole_byte() {
        // 0.1 KiB = 102.4 bytes
        assert_eq!(parse_size("0.1 KB").unwrap(), 103);
        assert_eq!(parse_size("0.1 kB").unwrap(), 103);
    }

    #[test]
    fn test_units_are_case_insensitive() {
        assert_eq!(parse_size("2 mb").unwrap(), 2 * 1024 * 1024);
        assert_eq!(parse_size("2 MIB").unwrap(), 2 * 1024 * 1024);
        assert_eq!(parse_size("512 B").unwrap(), 512);
        assert_eq!(parse_size("1 TB").unwrap(), 1024u64.pow(4));
    }

    #[test]
    fn test_comma_decimal_separator() {
        assert_eq!(parse_size("1,5 GB").unwrap(), parse_size("1.5 GB").unwrap());
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(parse_size("1.5GB"), Err(SizeParseError::Malformed(_))));
        assert!(matches!(parse_size(""), Err(SizeParseError::Malformed(_))));
        assert!(matches!(parse_size("1 GB extra"), Err(SizeParseError::Malformed(_))));
        assert!(matches!(parse_size("big GB"), Err(SizeParseError::InvalidNumber(_))));
        assert!(matches!(parse_size("-1 GB"), Err(SizeParseError::InvalidNumber(_))));
        assert!(matches!(parse_size("1 PB"), Err(SizeParseError::UnknownUnit(_))));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512, true), "512.00 B");
        assert_eq!(format_size(1_610_612_736, true), "1.50 GiB");
        assert_eq!(format_size(1_500_000, false), "1.50 MB");
        assert_eq!(format_size(3 * 1024u64.pow(4) * 1024, true), "3072.00 TiB");
    }
}
