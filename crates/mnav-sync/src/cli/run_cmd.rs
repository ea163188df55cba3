//! `mnav-sync run`: one pipeline pass.

use std::path::PathBuf;

use anyhow::Result;

use crate::config::SyncConfig;
use crate::pipeline::RunOutcome;

/// Exit code for a run that ended without publishing under `--strict`.
pub const STRICT_FAILURE_EXIT: i32 = 2;

/// Execute the pipeline and return the process exit code.
pub async fn run(mut config: SyncConfig, check_file: Option<PathBuf>, strict: bool) -> Result<i32> {
    if check_file.is_some() {
        config.check_file = check_file;
    }

    let orchestrator = super::build_orchestrator(&config)?;
    tracing::info!(url = %config.target_url, "collecting disclosures");

    let outcome = orchestrator.run().await;
    match &outcome {
        RunOutcome::Published(result) => {
            tracing::info!(
                ratio = result.ratio(),
                fields = result.fields().len(),
                "update complete"
            );
        }
        RunOutcome::Rejected { valid, required } => {
            tracing::warn!(valid, required, "update skipped: incomplete extraction");
        }
        RunOutcome::RenderFailed(msg) | RunOutcome::PublishFailed(msg) => {
            tracing::warn!("update failed: {msg}");
        }
    }

    Ok(exit_code(&outcome, strict))
}

fn exit_code(outcome: &RunOutcome, strict: bool) -> i32 {
    if strict && !outcome.is_published() {
        STRICT_FAILURE_EXIT
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_is_zero_unless_strict() {
        let rejected = RunOutcome::Rejected { valid: 8, required: 9 };
        assert_eq!(exit_code(&rejected, false), 0);
        assert_eq!(exit_code(&rejected, true), STRICT_FAILURE_EXIT);
        assert_eq!(exit_code(&RunOutcome::RenderFailed("x".into()), true), STRICT_FAILURE_EXIT);
    }
}
