//! Field resolution and extraction over a captured fragment sequence.
//!
//! Resolution is index-based: each field names a fixed 1-based position.
//! That coupling to the page layout is intentional; when the layout shifts,
//! fields degrade to the zero sentinel and the completeness gate rejects the
//! run. The strategy sits behind [`FieldResolver`] so a label-based resolver
//! can replace it without touching the pipeline.

use crate::fields::FieldTable;
use crate::parser::parse_numeric;
use crate::types::{ExtractedFields, FieldSpec, FragmentSequence};

/// Maps a field spec onto the raw text that carries its value.
pub trait FieldResolver: Send + Sync {
    /// Raw text for the field, or an empty string when it cannot be found.
    fn resolve<'a>(&self, fragments: &'a FragmentSequence, spec: &FieldSpec) -> &'a str;
}

/// Resolves a field to the fragment at its configured position.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionalResolver;

impl FieldResolver for PositionalResolver {
    fn resolve<'a>(&self, fragments: &'a FragmentSequence, spec: &FieldSpec) -> &'a str {
        fragments.at_position(spec.position).unwrap_or("")
    }
}

/// Runs every field of a table through a resolver and the numeric parser.
pub struct Extractor {
    table: FieldTable,
    resolver: Box<dyn FieldResolver>,
}

impl Extractor {
    /// Extractor using positional resolution.
    pub fn positional(table: FieldTable) -> Self {
        Self::with_resolver(table, Box::new(PositionalResolver))
    }

    pub fn with_resolver(table: FieldTable, resolver: Box<dyn FieldResolver>) -> Self {
        Self { table, resolver }
    }

    pub fn table(&self) -> &FieldTable {
        &self.table
    }

    /// Raw text for one field, as the resolver sees it.
    pub fn raw_text<'a>(&self, fragments: &'a FragmentSequence, spec: &FieldSpec) -> &'a str {
        self.resolver.resolve(fragments, spec)
    }

    /// Extract all fields in table order. Never fails.
    pub fn extract(&self, fragments: &FragmentSequence) -> ExtractedFields {
        let mut fields = ExtractedFields::new();
        for spec in self.table.specs() {
            let raw = self.resolver.resolve(fragments, spec);
            let value = parse_numeric(raw);
            if value.is_unparsed() {
                tracing::debug!(
                    field = %spec.name,
                    position = spec.position,
                    raw,
                    "field did not parse"
                );
            }
            fields.insert(spec.name.clone(), value);
        }
        fields
    }
}
