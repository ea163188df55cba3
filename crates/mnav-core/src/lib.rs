//! mnav-core — positional extraction, tolerant numeric parsing, completeness gating, and mNAV derivation.

pub mod derive;
pub mod extract;
pub mod fields;
pub mod gate;
pub mod parser;
pub mod types;

pub use derive::derive_ratio;
pub use extract::{Extractor, FieldResolver, PositionalResolver};
pub use fields::{FieldTable, RatioSpec};
pub use gate::{CompletenessGate, GateVerdict};
pub use parser::parse_numeric;
pub use types::*;
