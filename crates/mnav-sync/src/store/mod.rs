//! Publish sink: the shared remote key-value store the result set lands in.

pub mod firebase;
pub mod service_account;

use anyhow::Result;
use async_trait::async_trait;

pub use firebase::{FirebaseStore, StoreAuth};
pub use service_account::{AccessToken, ServiceAccountKey};

/// Flat mapping of scalar values written in one update.
pub type ScalarMap = serde_json::Map<String, serde_json::Value>;

/// A store that can merge a mapping of scalars into a fixed logical path.
///
/// Only the supplied keys are overwritten; sibling keys stay untouched.
/// A single call is the unit of atomicity and there is no read-modify-write.
#[async_trait]
pub trait PublishSink: Send + Sync {
    async fn merge_update(&self, path: &str, values: &ScalarMap) -> Result<()>;
}
