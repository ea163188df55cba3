//! Environment readiness check.

use std::path::Path;

use anyhow::Result;

use crate::alert::{SmtpSettings, TelegramSettings};
use crate::config::resolve_config_path;
use crate::renderer::chromium::find_chromium;
use crate::store::StoreAuth;

/// Check Chromium availability, config resolution, and credentials.
pub async fn run(explicit_config: Option<&Path>) -> Result<()> {
    println!("mnav-sync Doctor");
    println!("================");
    println!();

    let chromium_path = find_chromium();
    match &chromium_path {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => println!("[!!] Chromium NOT found. Set MNAV_CHROMIUM_PATH or install google-chrome."),
    }

    match resolve_config_path(explicit_config) {
        Some(path) if path.exists() => println!("[OK] Config file: {}", path.display()),
        Some(path) => println!("[!!] Config file does not exist: {}", path.display()),
        None => println!("[OK] No config file; using built-in defaults"),
    }

    match StoreAuth::from_env() {
        Ok(auth) if auth.is_configured() => println!("[OK] Store credentials: {}", auth.describe()),
        Ok(_) => println!(
            "[??] No FIREBASE_KEY, serviceAccountKey.json, FIREBASE_ACCESS_TOKEN or FIREBASE_AUTH; \
             writes only succeed against open rules"
        ),
        Err(e) => println!("[!!] Store credentials unusable: {e:#}"),
    }

    match SmtpSettings::from_env() {
        Ok(s) => println!("[OK] Email alerts: {} via {}:{}", s.to, s.host, s.port),
        Err(missing) => println!("[--] Email alerts off ({missing} unset)"),
    }
    match TelegramSettings::from_env() {
        Ok(s) => println!("[OK] Telegram alerts: chat {}", s.chat_id),
        Err(missing) => println!("[--] Telegram alerts off ({missing} unset)"),
    }

    println!();
    if chromium_path.is_some() {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }

    Ok(())
}
