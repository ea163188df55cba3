//! Quorum check deciding whether an extraction may be published.

use crate::types::{ExtractedFields, FailureKind, FailureReport};

/// Outcome of checking a set of extracted fields.
#[derive(Debug, Clone, PartialEq)]
pub enum GateVerdict {
    Accepted,
    Rejected {
        valid: usize,
        required: usize,
        report: FailureReport,
    },
}

impl GateVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, GateVerdict::Accepted)
    }
}

/// Requires every base field to be strictly positive.
#[derive(Debug, Clone, Copy)]
pub struct CompletenessGate {
    quorum: usize,
}

impl CompletenessGate {
    /// Gate whose quorum equals the number of base fields.
    pub fn for_field_count(count: usize) -> Self {
        Self { quorum: count }
    }

    pub fn quorum(&self) -> usize {
        self.quorum
    }

    pub fn check(&self, fields: &ExtractedFields) -> GateVerdict {
        let valid = fields.valid_count();
        let required = self.quorum.max(fields.len());

        if valid >= required {
            tracing::info!(valid, required, "completeness gate accepted");
            return GateVerdict::Accepted;
        }

        let invalid = fields.invalid_names();
        tracing::warn!(valid, required, invalid = ?invalid, "completeness gate rejected");

        let message = format!(
            "insufficient valid data ({valid}/{required} fields); update aborted. invalid: {}",
            invalid.join(", ")
        );
        let report = FailureReport::new(FailureKind::Shortfall, message)
            .with_payload(serde_json::Value::Object(fields.to_json_map()));

        GateVerdict::Rejected {
            valid,
            required,
            report,
        }
    }
}
