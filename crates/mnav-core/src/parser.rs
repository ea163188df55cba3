//! Tolerant numeric parsing of captured disclosure text.
//!
//! Disclosures arrive as display text: currency symbols, thousands
//! separators, percent signs, and a second line of commentary such as a
//! daily change. Only the first line is considered, and everything except
//! ASCII digits and `.` is discarded before parsing.

use crate::types::ExtractedValue;

/// Parse display text into a number, falling back to the zero sentinel.
///
/// Never fails: empty input, input without digits, multiple decimal points,
/// and out-of-range values all yield [`ExtractedValue::Unparsed`].
pub fn parse_numeric(raw: &str) -> ExtractedValue {
    let first_line = raw.split('\n').next().unwrap_or_default();

    let cleaned: String = first_line
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if cleaned.is_empty() {
        return ExtractedValue::Unparsed;
    }

    if cleaned.contains('.') {
        match cleaned.parse::<f64>() {
            Ok(v) if v.is_finite() => ExtractedValue::Decimal(v),
            _ => ExtractedValue::Unparsed,
        }
    } else {
        cleaned
            .parse::<i64>()
            .map(ExtractedValue::Integer)
            .unwrap_or(ExtractedValue::Unparsed)
    }
}
