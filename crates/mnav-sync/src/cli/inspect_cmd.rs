//! `mnav-sync inspect`: show the numbered fragments and what each field resolves to.
//!
//! Used to re-map field positions after the page layout changes. Never
//! publishes or alerts.

use anyhow::Result;
use mnav_core::{parse_numeric, Extractor, FragmentSequence};
use serde::Serialize;

use crate::config::SyncConfig;

#[derive(Serialize)]
struct FieldResolution<'a> {
    name: &'a str,
    position: usize,
    raw: &'a str,
    value: serde_json::Value,
    valid: bool,
}

#[derive(Serialize)]
struct InspectReport<'a> {
    fragment_count: usize,
    fragments: Vec<(usize, &'a str)>,
    fields: Vec<FieldResolution<'a>>,
}

fn resolve<'a>(extractor: &'a Extractor, fragments: &'a FragmentSequence) -> Vec<FieldResolution<'a>> {
    extractor
        .table()
        .specs()
        .iter()
        .map(|spec| {
            let raw = extractor.raw_text(fragments, spec);
            let value = parse_numeric(raw);
            FieldResolution {
                name: &spec.name,
                position: spec.position,
                raw,
                value: value.to_json(),
                valid: value.is_valid(),
            }
        })
        .collect()
}

pub async fn run(config: SyncConfig, json: bool) -> Result<()> {
    let orchestrator = super::build_orchestrator(&config)?;
    let fragments = orchestrator.capture().await?;
    let fields = resolve(orchestrator.extractor(), &fragments);

    if json {
        let report = InspectReport {
            fragment_count: fragments.len(),
            fragments: fragments.numbered().collect(),
            fields,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Fragments ({})", fragments.len());
    println!("==============");
    for (position, text) in fragments.numbered() {
        println!("{position:>5}  {}", text.replace('\n', " | "));
    }
    println!();
    println!("Fields");
    println!("======");
    for field in &fields {
        let marker = if field.valid { "OK" } else { "!!" };
        println!(
            "[{marker}] {:<16} #{:<5} {:<14} {:?}",
            field.name,
            field.position,
            field.value.to_string(),
            field.raw
        );
    }
    let valid = fields.iter().filter(|f| f.valid).count();
    println!();
    println!("Valid: {valid}/{}", fields.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnav_core::{FieldSpec, FieldTable};

    #[test]
    fn test_resolution_reports_raw_and_parsed() {
        let table = FieldTable::new(vec![FieldSpec::new("price", 2), FieldSpec::new("cap", 9)]).unwrap();
        let extractor = Extractor::positional(table);
        let fragments = FragmentSequence::from_raw(["MSTR", "$412.50\n(+1.2%)"]);

        let fields = resolve(&extractor, &fragments);
        assert_eq!(fields[0].raw, "$412.50\n(+1.2%)");
        assert_eq!(fields[0].value, serde_json::json!(412.5));
        assert!(fields[0].valid);
        assert_eq!(fields[1].raw, "");
        assert!(!fields[1].valid);
    }
}
