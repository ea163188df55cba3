//! Static field table: which fragment position carries which disclosure.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::{CoreError, CoreResult, FieldSpec};

/// Reference deployment: field name and 1-based fragment position.
const DEFAULT_FIELDS: [(&str, usize); 9] = [
    ("mstrPrice", 19),
    ("marketCap", 40),
    ("enterpriseValue", 46),
    ("btcReserve", 83),
    ("btcPrice", 89),
    ("btcQuantity", 95),
    ("usdReserve", 107),
    ("debt", 127),
    ("pref", 137),
];

/// Ordered set of field specs. Order is preserved into the result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldTable {
    specs: Vec<FieldSpec>,
}

impl FieldTable {
    /// Build a table, rejecting empty names, duplicates, and position 0.
    pub fn new(specs: Vec<FieldSpec>) -> CoreResult<Self> {
        let table = Self { specs };
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.specs.is_empty() {
            return Err(CoreError::EmptyFieldTable);
        }
        let mut seen = HashSet::new();
        for spec in &self.specs {
            if spec.name.trim().is_empty() {
                return Err(CoreError::EmptyFieldName(spec.position));
            }
            if spec.position == 0 {
                return Err(CoreError::ZeroPosition {
                    name: spec.name.clone(),
                });
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(CoreError::DuplicateField(spec.name.clone()));
            }
        }
        Ok(())
    }

    pub fn specs(&self) -> &[FieldSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.specs.iter().any(|s| s.name == name)
    }
}

impl Default for FieldTable {
    fn default() -> Self {
        Self {
            specs: DEFAULT_FIELDS
                .iter()
                .map(|(name, pos)| FieldSpec::new(*name, *pos))
                .collect(),
        }
    }
}

/// Which fields feed the derived ratio and where results are keyed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatioSpec {
    pub output: String,
    pub numerator: String,
    pub denominator: String,
    pub precision: u32,
    pub timestamp_key: String,
}

impl Default for RatioSpec {
    fn default() -> Self {
        Self {
            output: "mnav".to_string(),
            numerator: "enterpriseValue".to_string(),
            denominator: "btcReserve".to_string(),
            precision: 4,
            timestamp_key: "updatetime".to_string(),
        }
    }
}

impl RatioSpec {
    /// Check the ratio inputs exist and the output keys do not shadow a field.
    pub fn validate_against(&self, table: &FieldTable) -> CoreResult<()> {
        for input in [&self.numerator, &self.denominator] {
            if !table.contains(input) {
                return Err(CoreError::UnknownRatioInput(input.clone()));
            }
        }
        for key in [&self.output, &self.timestamp_key] {
            if key.trim().is_empty() {
                return Err(CoreError::InvalidRatio("output keys must not be empty".into()));
            }
            if table.contains(key) {
                return Err(CoreError::InvalidRatio(format!(
                    "output key {key} collides with a base field"
                )));
            }
        }
        if self.output == self.timestamp_key {
            return Err(CoreError::InvalidRatio(
                "ratio and timestamp keys must differ".into(),
            ));
        }
        if self.precision > 12 {
            return Err(CoreError::InvalidRatio(format!(
                "precision {} exceeds 12 digits",
                self.precision
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_is_reference_deployment() {
        let table = FieldTable::default();
        assert_eq!(table.len(), 9);
        assert!(table.validate().is_ok());
        assert_eq!(table.specs()[0], FieldSpec::new("mstrPrice", 19));
        assert_eq!(table.specs()[8], FieldSpec::new("pref", 137));
        assert!(RatioSpec::default().validate_against(&table).is_ok());
    }

    #[test]
    fn test_rejects_duplicates_and_zero_position() {
        let dup = FieldTable::new(vec![FieldSpec::new("a", 1), FieldSpec::new("a", 2)]);
        assert!(matches!(dup, Err(CoreError::DuplicateField(n)) if n == "a"));

        let zero = FieldTable::new(vec![FieldSpec::new("a", 0)]);
        assert!(matches!(zero, Err(CoreError::ZeroPosition { .. })));

        assert!(matches!(FieldTable::new(vec![]), Err(CoreError::EmptyFieldTable)));
    }

    #[test]
    fn test_ratio_inputs_must_exist() {
        let table = FieldTable::new(vec![FieldSpec::new("enterpriseValue", 1)]).unwrap();
        let err = RatioSpec::default().validate_against(&table).unwrap_err();
        assert!(matches!(err, CoreError::UnknownRatioInput(n) if n == "btcReserve"));
    }

    #[test]
    fn test_table_deserializes_from_list() {
        let json = r#"[{"name":"price","position":3},{"name":"cap","position":7}]"#;
        let table: FieldTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.specs()[1].position, 7);
    }
}
