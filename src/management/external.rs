use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use crate::{
    config::Settings,
    debug,
    provider::{AuthError, TokenSource, external::call_external},
    types::{Prompt, Token},
    utils,
};

/// Progress of the view.
///
/// `Idle` only before the first operation. `Success` and `Error` are settled:
/// they describe the last completed call and stay until the next operation
/// starts, which moves straight to `Requesting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Requesting,
    Success,
    Error,
}

/// What the external API view shows. Reflects the most recent completed call.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalApiState {
    pub show_result: bool,
    pub api_message: Value,
    pub api_status: Option<StatusCode>,
    pub error: Option<String>,
    pub error_detail: Option<String>,
    pub access_token: String,
    pub decoded_jwt: Value,
    /// Seconds left until `exp`, measured when the call completed.
    pub token_expiration: i64,
    pub access_token_unix_time: i64,
    pub token_audience: String,
    pub wrong_at_message: bool,
    pub is_authorized: bool,
    pub phase: Phase,
}

impl Default for ExternalApiState {
    fn default() -> Self {
        ExternalApiState {
            show_result: false,
            api_message: Value::String(String::new()),
            api_status: None,
            error: None,
            error_detail: None,
            access_token: String::new(),
            decoded_jwt: json!({}),
            token_expiration: 0,
            access_token_unix_time: 0,
            token_audience: String::new(),
            wrong_at_message: false,
            is_authorized: false,
            phase: Phase::Idle,
        }
    }
}

impl ExternalApiState {
    /// The interactive recovery matching the last error, if it has one.
    pub fn recovery(&self) -> Option<Prompt> {
        match AuthError::from_code(self.error.as_deref()?, None) {
            AuthError::ConsentRequired => Some(Prompt::Consent),
            AuthError::LoginRequired => Some(Prompt::Login),
            _ => None,
        }
    }

    fn fail(&mut self, err: &AuthError) {
        self.error = Some(err.code().to_string());
        self.error_detail = Some(err.to_string());
        self.phase = Phase::Error;
    }
}

/// The parts of [`Settings`] the caller needs.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub api_url: String,
    pub audience: Option<String>,
    pub wrong_audience: String,
}

impl From<&Settings> for ApiSettings {
    fn from(settings: &Settings) -> Self {
        ApiSettings {
            api_url: settings.external_api_url(),
            audience: settings.audience.clone(),
            wrong_audience: settings.wrong_audience.clone(),
        }
    }
}

/// Calls the external API with tokens from a [`TokenSource`].
///
/// Each operation is a single attempt: no retries, no timeouts beyond those of
/// the token source. State moves `Idle → Requesting → Success | Error`; the
/// settled phase is kept until the next operation (see [`Phase`]).
pub struct ExternalApi<S: TokenSource> {
    source: S,
    http: Client,
    settings: ApiSettings,
    state: ExternalApiState,
}

impl<S: TokenSource> ExternalApi<S> {
    pub fn new(source: S, settings: ApiSettings) -> Self {
        ExternalApi {
            source,
            http: Client::new(),
            settings,
            state: ExternalApiState::default(),
        }
    }

    pub fn state(&self) -> &ExternalApiState {
        &self.state
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// False when no audience is configured.
    pub fn can_call(&self) -> bool {
        self.settings.audience.is_some()
    }

    /// Calls the external API with a silently acquired token.
    ///
    /// Requests one token for the configured audience, decodes its claims and
    /// sends one GET with it as bearer credential. On success the whole state
    /// is replaced by the response and the token details, and any earlier
    /// error is cleared.
    ///
    /// # Errors
    ///
    /// Nothing is returned; failures land in the state instead. `error` holds
    /// the stable code (`consent_required`, `login_required`,
    /// `missing_audience`, `network_error`, ...) and `error_detail` the
    /// message. Without an audience no token is requested.
    ///
    /// # Example
    ///
    /// ```
    /// let mut api = ExternalApi::new(provider, ApiSettings::from(&settings));
    /// api.call_api().await;
    /// if api.state().is_authorized {
    ///     println!("{}", api.state().api_message);
    /// }
    /// ```
    pub async fn call_api(&mut self) {
        let Some(audience) = self.settings.audience.clone() else {
            self.state.fail(&AuthError::MissingAudience);
            return;
        };

        self.state.phase = Phase::Requesting;
        match self.fetch_with_silent_token(&audience).await {
            Ok((token, claims, status, body)) => {
                let exp = utils::token_expiry(&claims).unwrap_or_default();
                self.state = ExternalApiState {
                    show_result: true,
                    api_message: body,
                    api_status: Some(status),
                    error: None,
                    error_detail: None,
                    access_token: token.access_token,
                    token_expiration: utils::seconds_until(exp, Utc::now().timestamp()),
                    access_token_unix_time: exp,
                    token_audience: utils::token_audiences(&claims)
                        .into_iter()
                        .next()
                        .unwrap_or_default(),
                    decoded_jwt: claims,
                    wrong_at_message: false,
                    is_authorized: true,
                    phase: Phase::Success,
                };
            }
            Err(e) => {
                self.state.is_authorized = false;
                self.state.fail(&e);
            }
        }
    }

    /// Same call with a token requested for the wrong audience.
    ///
    /// Never authorizes the view. A token failure or a rejected request turns
    /// on the "unauthorized" message.
    pub async fn call_api_wrong_audience(&mut self) {
        let audience = self.settings.wrong_audience.clone();

        self.state.phase = Phase::Requesting;
        self.state.is_authorized = false;
        match self.fetch_with_silent_token(&audience).await {
            Ok((_, _, status, body)) if status.is_success() => {
                self.state.api_message = body;
                self.state.api_status = Some(status);
                self.state.phase = Phase::Success;
            }
            Ok((_, _, status, body)) => {
                self.state.api_message = body;
                self.state.api_status = Some(status);
                self.state.wrong_at_message = true;
                self.state.show_result = true;
                self.state.fail(&AuthError::Provider {
                    code: "unauthorized".to_string(),
                    description: Some(format!("external API answered {}", status)),
                });
            }
            Err(e) => {
                self.state.wrong_at_message = true;
                self.state.show_result = true;
                self.state.fail(&e);
            }
        }
    }

    /// Recovery for `consent_required`: consent interactively, then call again.
    ///
    /// A failed popup keeps its own error and skips the follow-up call.
    pub async fn handle_consent(&mut self) {
        self.recover(Prompt::Consent).await;
    }

    /// Recovery for `login_required`: log in interactively, then call again.
    pub async fn handle_login_again(&mut self) {
        self.recover(Prompt::Login).await;
    }

    async fn recover(&mut self, prompt: Prompt) {
        let Some(audience) = self.settings.audience.clone() else {
            self.state.fail(&AuthError::MissingAudience);
            return;
        };

        self.state.phase = Phase::Requesting;
        if let Err(e) = self.source.get_token_with_popup(&audience, prompt).await {
            self.state.is_authorized = false;
            self.state.fail(&e);
            return;
        }

        self.state.error = None;
        self.state.error_detail = None;
        self.call_api().await;
    }

    async fn fetch_with_silent_token(
        &mut self,
        audience: &str,
    ) -> Result<(Token, Value, StatusCode, Value), AuthError> {
        let token = self.source.get_token_silently(audience).await?;
        let claims = utils::decode_claims(&token.access_token)?;
        debug!("Decoded access token: {}", claims);

        let res = call_external(&self.http, &self.settings.api_url, &token.access_token).await?;
        Ok((token, claims, res.status, res.body))
    }
}
