use std::fmt;

use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::provider::AuthError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub scope: String,
    pub expires_in: u64,
    pub obtained_at: u64,
    pub audience: String,
}

/// State shared between the interactive flow and the callback handler.
#[derive(Debug, Clone)]
pub struct PkceSession {
    pub code_verifier: String,
    pub state: String,
    pub audience: String,
    pub outcome: Option<Result<Token, AuthError>>,
}

/// Value of the `prompt` parameter sent with an interactive request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    /// Let the provider decide.
    Default,
    Consent,
    Login,
}

impl Prompt {
    pub fn as_param(&self) -> Option<&'static str> {
        match self {
            Prompt::Default => None,
            Prompt::Consent => Some("consent"),
            Prompt::Login => Some("login"),
        }
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param().unwrap_or("default"))
    }
}

/// Successful body of the provider's token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub scope: Option<String>,
    pub expires_in: Option<u64>,
}

/// Error body of the provider's token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_description: Option<String>,
}

#[derive(Tabled)]
pub struct ClaimsTableRow {
    pub claim: String,
    pub value: String,
}
