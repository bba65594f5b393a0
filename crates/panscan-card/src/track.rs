//! Payment field extraction from track-equivalent data
//!
//! Track data is not self-describing: the field layout is positional.
//! All functions here operate on the record's hex text (two uppercase hex
//! characters per raw byte, no separators) and are pure.
//!
//! Two PAN-detection rules are seen across card programs. They are kept
//! as explicitly selectable strategies rather than merged, because they
//! disagree on where the PAN sits when both would apply.

use crate::error::ParseError;

/// Hex characters in a full PAN.
const PAN_LEN: usize = 16;

/// BIN-range marker announcing the fixed-offset layout.
const PREFIX_MARKER: &str = "4580";

/// PAN offset (hex characters) under the fixed-offset layout.
const PREFIX_PAN_OFFSET: usize = 8;

/// Expiration field offset (hex characters); the field is YYMM packed.
const EXPIRATION_OFFSET: usize = 30;

/// How to decide whether a record carries a PAN, and where it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanStrategy {
    /// A `4` followed by exactly 15 decimal digits, anywhere in the text.
    #[default]
    Pattern,
    /// The `4580` marker anywhere in the text; the PAN sits at a fixed
    /// offset regardless of where the marker was found.
    PrefixOffset,
}

/// Two-digit expiration date as stored on the card.
///
/// Month is not calendar-validated: raw card data occasionally carries
/// sentinel dates, and rejecting them is a caller concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpirationDate {
    pub month: u8,
    pub year: u8,
}

/// Extract the PAN from `hex_text` under the given strategy.
///
/// `Ok(None)` means the record carries no PAN; `Err` means the layout
/// announced a PAN but the data ends before it.
pub fn find_pan(hex_text: &str, strategy: PanStrategy) -> Result<Option<String>, ParseError> {
    match strategy {
        PanStrategy::Pattern => Ok(find_pan_pattern(hex_text)),
        PanStrategy::PrefixOffset => find_pan_prefix(hex_text),
    }
}

/// Leftmost run of `4` plus 15 decimal digits.
fn find_pan_pattern(hex_text: &str) -> Option<String> {
    let bytes = hex_text.as_bytes();
    if bytes.len() < PAN_LEN {
        return None;
    }
    for start in 0..=bytes.len() - PAN_LEN {
        if bytes[start] == b'4'
            && bytes[start + 1..start + PAN_LEN].iter().all(u8::is_ascii_digit)
        {
            return Some(hex_text[start..start + PAN_LEN].to_string());
        }
    }
    None
}

fn find_pan_prefix(hex_text: &str) -> Result<Option<String>, ParseError> {
    if !hex_text.contains(PREFIX_MARKER) {
        return Ok(None);
    }
    let end = PREFIX_PAN_OFFSET + PAN_LEN;
    if hex_text.len() < end {
        return Err(ParseError::Truncated {
            needed: end,
            have: hex_text.len(),
        });
    }
    Ok(Some(hex_text[PREFIX_PAN_OFFSET..end].to_string()))
}

/// Parse the YYMM-packed expiration field.
///
/// Only meaningful on a record known to carry a PAN; callers gate on that.
pub fn expiration(hex_text: &str) -> Result<ExpirationDate, ParseError> {
    let end = EXPIRATION_OFFSET + 4;
    if hex_text.len() < end {
        return Err(ParseError::Truncated {
            needed: end,
            have: hex_text.len(),
        });
    }
    let field = &hex_text[EXPIRATION_OFFSET..end];
    let year = parse_two_digits(&field[..2])?;
    let month = parse_two_digits(&field[2..])?;
    Ok(ExpirationDate { month, year })
}

fn parse_two_digits(field: &str) -> Result<u8, ParseError> {
    field.parse().map_err(|_| ParseError::NonDecimal {
        field: field.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // marker in the header, PAN at offset 8, expiration 12/25 at offset 30
    const PREFIX_LAYOUT: &str = "000045804000123412341234ABCDEF251200";

    #[test]
    fn pattern_finds_pan_anywhere() {
        let hex_text = "5A0870FF4111111111111111FFFF";
        assert_eq!(
            find_pan(hex_text, PanStrategy::Pattern).unwrap(),
            Some("4111111111111111".to_string())
        );
    }

    #[test]
    fn pattern_takes_leftmost_match() {
        // seventeen digits starting with 44: the match starts at the first 4
        let hex_text = "FF44111111111111112FF";
        assert_eq!(
            find_pan(hex_text, PanStrategy::Pattern).unwrap(),
            Some("4411111111111111".to_string())
        );
    }

    #[test]
    fn pattern_rejects_hex_letters_inside_run() {
        let hex_text = "4A11111111111111411111111111111";
        assert_eq!(find_pan(hex_text, PanStrategy::Pattern).unwrap(), None);
    }

    #[test]
    fn pattern_absent_on_short_text() {
        assert_eq!(find_pan("411111", PanStrategy::Pattern).unwrap(), None);
    }

    #[test]
    fn prefix_extracts_fixed_offset() {
        assert_eq!(
            find_pan(PREFIX_LAYOUT, PanStrategy::PrefixOffset).unwrap(),
            Some("4000123412341234".to_string())
        );
    }

    #[test]
    fn prefix_absent_without_marker() {
        let hex_text = "000012344000123412341234ABCDEF2512";
        assert_eq!(find_pan(hex_text, PanStrategy::PrefixOffset).unwrap(), None);
    }

    #[test]
    fn prefix_truncated_when_pan_runs_past_end() {
        let err = find_pan("45801234", PanStrategy::PrefixOffset).unwrap_err();
        assert_eq!(err, ParseError::Truncated { needed: 24, have: 8 });
    }

    #[test]
    fn expiration_is_yymm_packed() {
        let date = expiration(PREFIX_LAYOUT).unwrap();
        assert_eq!(date.month, 12);
        assert_eq!(date.year, 25);
    }

    #[test]
    fn expiration_keeps_sentinel_months() {
        // month 49 is nonsense on a calendar but faithful to the bytes
        let hex_text = "000045804000123412341234ABCDEF9949";
        let date = expiration(hex_text).unwrap();
        assert_eq!(date.month, 49);
        assert_eq!(date.year, 99);
    }

    #[test]
    fn expiration_truncated_on_short_text() {
        let err = expiration("45804000123412341234").unwrap_err();
        assert_eq!(
            err,
            ParseError::Truncated {
                needed: 34,
                have: 20
            }
        );
    }

    #[test]
    fn expiration_rejects_non_decimal_field() {
        let hex_text = "000045804000123412341234ABCDEF2A1B";
        assert!(matches!(
            expiration(hex_text),
            Err(ParseError::NonDecimal { .. })
        ));
    }
}
