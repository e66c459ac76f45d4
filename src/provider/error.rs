use std::fmt;

pub const CONSENT_REQUIRED: &str = "consent_required";
pub const LOGIN_REQUIRED: &str = "login_required";

/// Failure of a token acquisition or of the external API call.
///
/// Every variant maps to a stable string code through [`AuthError::code`];
/// the view state only keeps that code.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthError {
    ConsentRequired,
    LoginRequired,
    /// Any other error code reported by the identity provider.
    Provider {
        code: String,
        description: Option<String>,
    },
    StateMismatch,
    Timeout,
    Network(String),
    InvalidResponse(String),
    Session(String),
    InvalidToken(String),
    Config(String),
    MissingAudience,
}

impl AuthError {
    pub fn from_code(code: &str, description: Option<String>) -> Self {
        match code {
            CONSENT_REQUIRED => AuthError::ConsentRequired,
            LOGIN_REQUIRED => AuthError::LoginRequired,
            _ => AuthError::Provider {
                code: code.to_string(),
                description,
            },
        }
    }

    pub fn code(&self) -> &str {
        match self {
            AuthError::ConsentRequired => CONSENT_REQUIRED,
            AuthError::LoginRequired => LOGIN_REQUIRED,
            AuthError::Provider { code, .. } => code,
            AuthError::StateMismatch => "state_mismatch",
            AuthError::Timeout => "timeout",
            AuthError::Network(_) => "network_error",
            AuthError::InvalidResponse(_) => "invalid_response",
            AuthError::Session(_) => "session_error",
            AuthError::InvalidToken(_) => "invalid_token",
            AuthError::Config(_) => "configuration_error",
            AuthError::MissingAudience => "missing_audience",
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::ConsentRequired => write!(f, "consent is required for this audience"),
            AuthError::LoginRequired => write!(f, "login is required"),
            AuthError::Provider {
                code,
                description: Some(d),
            } => write!(f, "{}: {}", code, d),
            AuthError::Provider {
                code,
                description: None,
            } => write!(f, "{}", code),
            AuthError::StateMismatch => write!(f, "callback state does not match the request"),
            AuthError::Timeout => write!(f, "timed out waiting for the browser login"),
            AuthError::Network(e) => write!(f, "network error: {}", e),
            AuthError::InvalidResponse(e) => write!(f, "invalid response: {}", e),
            AuthError::Session(e) => write!(f, "session error: {}", e),
            AuthError::InvalidToken(e) => write!(f, "invalid token: {}", e),
            AuthError::Config(e) => write!(f, "configuration error: {}", e),
            AuthError::MissingAudience => write!(f, "no audience configured"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Network(err.to_string())
    }
}
