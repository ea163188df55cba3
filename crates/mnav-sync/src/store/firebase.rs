//! Firebase Realtime Database client over its REST API.
//!
//! A merge-update is an HTTP `PATCH` of a JSON object to `{path}.json`,
//! which the database applies atomically to the named children only.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::OnceCell;
use url::Url;

use super::service_account::ServiceAccountKey;
use super::{PublishSink, ScalarMap};

/// How requests to the database are authenticated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StoreAuth {
    /// Unauthenticated; only works against open rules or the emulator.
    #[default]
    None,
    /// Legacy database secret or a Firebase ID token (`auth=`).
    Token(String),
    /// Google OAuth2 access token (`access_token=`).
    AccessToken(String),
    /// Service-account key, exchanged for an access token on first use.
    ServiceAccount(ServiceAccountKey),
}

impl StoreAuth {
    /// Resolve from `FIREBASE_ACCESS_TOKEN`, then `FIREBASE_AUTH`, then a
    /// service-account key in `FIREBASE_KEY` or `./serviceAccountKey.json`.
    ///
    /// Fails only when a key is present but cannot be read or parsed.
    pub fn from_env() -> Result<Self> {
        if let Some(token) = non_empty_env("FIREBASE_ACCESS_TOKEN") {
            return Ok(StoreAuth::AccessToken(token));
        }
        if let Some(token) = non_empty_env("FIREBASE_AUTH") {
            return Ok(StoreAuth::Token(token));
        }
        Ok(ServiceAccountKey::discover()?.map_or(StoreAuth::None, StoreAuth::ServiceAccount))
    }

    pub fn is_configured(&self) -> bool {
        !matches!(self, StoreAuth::None)
    }

    pub fn describe(&self) -> String {
        match self {
            StoreAuth::None => "unauthenticated".to_string(),
            StoreAuth::Token(_) => "database secret or ID token".to_string(),
            StoreAuth::AccessToken(_) => "OAuth2 access token".to_string(),
            StoreAuth::ServiceAccount(key) => format!("service account {}", key.client_email),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// HTTP client plus the query credential every request carries.
struct Connection {
    http: reqwest::Client,
    credential: Option<(&'static str, String)>,
}

/// Handle to one database. Owned by the pipeline and passed in explicitly.
///
/// The HTTP client and, for a service account, the access token are set up
/// on first use and reused afterwards, so running the pipeline several times
/// in one process initializes the connection only once.
pub struct FirebaseStore {
    database_url: Url,
    auth: StoreAuth,
    timeout: Duration,
    connection: OnceCell<Connection>,
}

impl FirebaseStore {
    pub fn new(database_url: &str, auth: StoreAuth) -> Result<Self> {
        let mut database_url = Url::parse(database_url)
            .with_context(|| format!("invalid database URL '{database_url}'"))?;
        if !database_url.path().ends_with('/') {
            let path = format!("{}/", database_url.path());
            database_url.set_path(&path);
        }
        Ok(Self {
            database_url,
            auth,
            timeout: Duration::from_secs(30),
            connection: OnceCell::new(),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether the connection has been set up yet.
    pub fn is_initialized(&self) -> bool {
        self.connection.initialized()
    }

    async fn connection(&self) -> Result<&Connection> {
        self.connection
            .get_or_try_init(|| async {
                tracing::debug!(
                    database = %self.database_url,
                    auth = %self.auth.describe(),
                    "initializing store connection"
                );
                let http = reqwest::Client::builder()
                    .timeout(self.timeout)
                    .build()
                    .context("failed to build store HTTP client")?;

                let credential = match &self.auth {
                    StoreAuth::None => None,
                    StoreAuth::Token(token) => Some(("auth", token.clone())),
                    StoreAuth::AccessToken(token) => Some(("access_token", token.clone())),
                    StoreAuth::ServiceAccount(key) => {
                        let token = key
                            .fetch_access_token(&http)
                            .await
                            .context("service-account authentication failed")?;
                        Some(("access_token", token.access_token))
                    }
                };
                anyhow::Ok(Connection { http, credential })
            })
            .await
    }

    /// REST endpoint for a logical path, e.g. `params` → `{db}/params.json`.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let trimmed = path.trim_matches('/');
        self.database_url
            .join(&format!("{trimmed}.json"))
            .with_context(|| format!("invalid store path '{path}'"))
    }
}

#[async_trait]
impl PublishSink for FirebaseStore {
    async fn merge_update(&self, path: &str, values: &ScalarMap) -> Result<()> {
        let mut url = self.endpoint(path)?;
        let connection = self.connection().await?;
        if let Some((name, value)) = &connection.credential {
            url.query_pairs_mut().append_pair(name, value);
        }

        let resp = connection
            .http
            .patch(url)
            .json(values)
            .send()
            .await
            .context("sending store update")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!(
                "store update rejected: {} {}",
                status,
                resp.text().await.unwrap_or_default()
            );
        }

        tracing::info!(path, keys = values.len(), "store updated");
        Ok(())
    }
}
