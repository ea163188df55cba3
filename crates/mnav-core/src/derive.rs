//! Derived ratio metric and result-set finalization.

use chrono::{DateTime, Utc};

use crate::fields::RatioSpec;
use crate::types::{ExtractedFields, ResultSet};

/// `round(numerator / denominator, precision)`, or zero for a zero denominator.
pub fn derive_ratio(numerator: f64, denominator: f64, precision: u32) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let ratio = numerator / denominator;
    if !ratio.is_finite() {
        return 0.0;
    }
    // Precision formatting rounds the exact binary value, half to even.
    format!("{ratio:.*}", precision as usize)
        .parse()
        .unwrap_or(0.0)
}

impl ResultSet {
    /// Append the ratio and the UTC timestamp to an accepted extraction.
    pub fn finalize(fields: ExtractedFields, spec: &RatioSpec, now: DateTime<Utc>) -> Self {
        let numerator = fields.get(&spec.numerator).map(|v| v.as_f64()).unwrap_or(0.0);
        let denominator = fields
            .get(&spec.denominator)
            .map(|v| v.as_f64())
            .unwrap_or(0.0);
        let ratio = derive_ratio(numerator, denominator, spec.precision);

        ResultSet::new(
            fields,
            spec.output.clone(),
            ratio,
            spec.timestamp_key.clone(),
            now,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExtractedValue;
    use chrono::TimeZone;

    #[test]
    fn test_ratio_rounds_to_four_places() {
        assert_eq!(derive_ratio(1.0, 3.0, 4), 0.3333);
        assert_eq!(derive_ratio(2.0, 3.0, 4), 0.6667);
        assert_eq!(derive_ratio(107_000_000_000.0, 64_500_000_000.0, 4), 1.6589);
    }

    #[test]
    fn test_ratio_ties_round_to_even() {
        assert_eq!(derive_ratio(5.0, 32.0, 4), 0.1562);
        assert_eq!(derive_ratio(1.0, 32.0, 4), 0.0312);
        assert_eq!(derive_ratio(49.0, 32.0, 4), 1.5312);
        assert_eq!(derive_ratio(7.0, 32.0, 4), 0.2188);
    }

    #[test]
    fn test_ratio_rounds_stored_value_not_scaled_value() {
        // 3/160 is stored just below 0.01875.
        assert_eq!(derive_ratio(3.0, 160.0, 4), 0.0187);
    }

    #[test]
    fn test_zero_denominator_is_zero() {
        assert_eq!(derive_ratio(5.0, 0.0, 4), 0.0);
        assert_eq!(derive_ratio(0.0, 0.0, 4), 0.0);
    }

    #[test]
    fn test_finalize_appends_ratio_and_timestamp() {
        let mut fields = ExtractedFields::new();
        fields.insert("enterpriseValue", ExtractedValue::Integer(90_000));
        fields.insert("btcReserve", ExtractedValue::Decimal(60_000.0));
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 9, 15, 42).unwrap();

        let result = ResultSet::finalize(fields, &RatioSpec::default(), now);
        assert_eq!(result.ratio(), 1.5);
        assert_eq!(result.timestamp(), "Mar 04, 2026, 09:15 UTC");

        let map = result.to_store_map();
        assert_eq!(map["mnav"], serde_json::json!(1.5));
        assert_eq!(map["updatetime"], serde_json::json!("Mar 04, 2026, 09:15 UTC"));
        assert_eq!(map["enterpriseValue"], serde_json::json!(90_000));
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn test_finalize_missing_denominator_is_zero() {
        let mut fields = ExtractedFields::new();
        fields.insert("enterpriseValue", ExtractedValue::Integer(10));
        let result = ResultSet::finalize(fields, &RatioSpec::default(), Utc::now());
        assert_eq!(result.ratio(), 0.0);
    }
}
