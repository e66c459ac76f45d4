//! Configuration management for the external API client.
//!
//! This module handles loading and accessing configuration values from
//! environment variables and `.env` files. Values are collected once into a
//! [`Settings`] value which is passed explicitly to the provider client and
//! the external API caller.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults (where applicable)

use std::{env, path::PathBuf};

pub const DEFAULT_API_ORIGIN: &str = "http://localhost:3001";
pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:3000";
pub const DEFAULT_SCOPE: &str = "openid profile email offline_access";
pub const DEFAULT_WRONG_AUDIENCE: &str = "https://wrong-account-api.com/";
pub const DEFAULT_AUTH_TIMEOUT_SECS: u64 = 120;

/// Placeholder shipped in downloaded samples; treated as "no audience".
pub const PLACEHOLDER_AUDIENCE: &str = "YOUR_API_IDENTIFIER";

/// Loads environment variables from a `.env` file in the local data directory.
///
/// The file lives under `extapi/.env` in the platform-specific local data
/// directory:
/// - Linux: `~/.local/share/extapi/.env`
/// - macOS: `~/Library/Application Support/extapi/.env`
/// - Windows: `%LOCALAPPDATA%/extapi/.env`
///
/// A missing file is not an error; plain environment variables are enough.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or an existing
/// `.env` file cannot be parsed.
pub async fn load_env() -> Result<(), String> {
    let path = env_path();
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    if !path.is_file() {
        return Ok(());
    }

    dotenv::from_path(&path)
        .map(|_| ())
        .map_err(|e| format!("Failed to load {}: {}", path.display(), e))
}

fn env_path() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("extapi/.env");
    path
}

/// Runtime configuration gathered from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Issuer base URL, e.g. `https://tenant.eu.auth0.com`.
    pub issuer: String,
    pub client_id: String,
    /// `None` disables calling the API.
    pub audience: Option<String>,
    pub api_origin: String,
    pub server_address: String,
    pub redirect_uri: String,
    pub scope: String,
    pub wrong_audience: String,
    pub auth_timeout_secs: u64,
}

impl Settings {
    /// Builds settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error naming the variable when `AUTH_DOMAIN` or
    /// `AUTH_CLIENT_ID` is missing, or when `AUTH_TIMEOUT_SECS` is not a number.
    pub fn from_env() -> Result<Self, String> {
        let issuer = issuer_from_domain(&required("AUTH_DOMAIN")?);
        let client_id = required("AUTH_CLIENT_ID")?;
        let server_address = optional("SERVER_ADDRESS")
            .unwrap_or_else(|| DEFAULT_SERVER_ADDRESS.to_string());
        let redirect_uri = optional("AUTH_REDIRECT_URI")
            .unwrap_or_else(|| format!("http://{}/callback", server_address));
        let auth_timeout_secs = match optional("AUTH_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|e| format!("AUTH_TIMEOUT_SECS must be a number: {}", e))?,
            None => DEFAULT_AUTH_TIMEOUT_SECS,
        };

        Ok(Settings {
            issuer,
            client_id,
            audience: audience(),
            api_origin: optional("API_ORIGIN").unwrap_or_else(|| DEFAULT_API_ORIGIN.to_string()),
            server_address,
            redirect_uri,
            scope: optional("AUTH_SCOPE").unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
            wrong_audience: optional("WRONG_AUDIENCE")
                .unwrap_or_else(|| DEFAULT_WRONG_AUDIENCE.to_string()),
            auth_timeout_secs,
        })
    }

    pub fn authorize_url(&self) -> String {
        format!("{}/authorize", self.issuer)
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth/token", self.issuer)
    }

    pub fn external_api_url(&self) -> String {
        format!("{}/api/external", self.api_origin.trim_end_matches('/'))
    }
}

/// Turns a bare provider domain into an issuer URL.
///
/// `tenant.auth0.com` becomes `https://tenant.auth0.com`; values that already
/// carry a scheme are kept. Trailing slashes are removed.
pub fn issuer_from_domain(domain: &str) -> String {
    let domain = domain.trim().trim_end_matches('/');
    if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.to_string()
    } else {
        format!("https://{}", domain)
    }
}

/// The configured API audience, if any.
pub fn audience() -> Option<String> {
    normalize_audience(optional("AUTH_AUDIENCE"))
}

/// Empty values and the sample placeholder count as "no audience".
pub fn normalize_audience(audience: Option<String>) -> Option<String> {
    audience
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty() && a != PLACEHOLDER_AUDIENCE)
}

fn required(key: &str) -> Result<String, String> {
    optional(key).ok_or_else(|| format!("{} must be set", key))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
