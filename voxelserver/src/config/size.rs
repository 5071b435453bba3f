//! Byte sizes written the way people write them, like `512MB` or `1GB`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid size '{input}' - expected a whole number with an optional KB, MB or GB suffix")]
pub struct SizeParseError {
    input: String,
}

/// Binary units, largest first. Each unit also accepts its one-letter form.
const UNITS: [(&str, usize); 3] = [
    ("GB", 1 << 30),
    ("MB", 1 << 20),
    ("KB", 1 << 10),
];

/// Parse a size into bytes. Case and surrounding whitespace are ignored;
/// a bare number is bytes.
pub fn parse_size(input: &str) -> Result<usize, SizeParseError> {
    let err = || SizeParseError {
        input: input.to_string(),
    };
    let upper = input.trim().to_ascii_uppercase();

    let (digits, multiplier) = UNITS
        .iter()
        .find_map(|&(unit, bytes)| {
            let short = &unit[..1];
            upper
                .strip_suffix(unit)
                .or_else(|| upper.strip_suffix(short))
                .map(|rest| (rest.trim_end(), bytes))
        })
        .unwrap_or((upper.as_str(), 1));

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err());
    }
    digits
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(err)
}

/// Format bytes using the largest unit that divides them exactly.
pub fn format_size(bytes: usize) -> String {
    UNITS
        .iter()
        .find(|&&(_, unit)| bytes >= unit && bytes % unit == 0)
        .map(|&(suffix, unit)| format!("{}{}", bytes / unit, suffix))
        .unwrap_or_else(|| bytes.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_size("4096").unwrap(), 4096);
        assert_eq!(parse_size("64KB").unwrap(), 64 << 10);
        assert_eq!(parse_size("512mb").unwrap(), 512 << 20);
        assert_eq!(parse_size("1G").unwrap(), 1 << 30);
        assert_eq!(parse_size(" 3 GB ").unwrap(), 3 << 30);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "MB", "1.5GB", "-2MB", "2TB", "twelve"] {
            assert!(parse_size(bad).is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn test_parse_overflow() {
        assert!(parse_size(&format!("{}GB", usize::MAX)).is_err());
    }

    #[test]
    fn test_format_picks_exact_unit() {
        assert_eq!(format_size(1 << 30), "1GB");
        assert_eq!(format_size(768 << 20), "768MB");
        assert_eq!(format_size(1536), "1536");
        assert_eq!(format_size(0), "0");
        assert_eq!(parse_size(&format_size(5 << 20)).unwrap(), 5 << 20);
    }
}
