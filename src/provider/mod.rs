//! # Provider Module
//!
//! Client side of the identity provider and of the external API.
//!
//! ## Token acquisition
//!
//! Two paths, mirroring what a browser SDK offers:
//!
//! - **silent** ([`TokenSource::get_token_silently`]) uses the local session
//!   only. A fresh token is returned without network access, an expired one is
//!   refreshed. Without a usable session it fails with `login_required`, or
//!   with `consent_required` when a session exists for other audiences only.
//! - **interactive** ([`TokenSource::get_token_with_popup`]) runs the OAuth 2.0
//!   authorization code flow with PKCE through the system browser and a local
//!   callback server, optionally forcing a consent or login prompt.
//!
//! ```text
//! ExternalApi (management)
//!      ↓ TokenSource
//! Provider ── silent ──→ TokenStore / refresh_token grant
//!          └─ popup ───→ browser → /callback (api) → authorization_code grant
//! ```
//!
//! ## External API
//!
//! [`external::call_external`] issues the single bearer-authenticated GET.

pub mod auth;
mod error;
pub mod external;

use chrono::Utc;
use reqwest::Client;

pub use error::{AuthError, CONSENT_REQUIRED, LOGIN_REQUIRED};

use crate::{
    config::Settings,
    debug,
    management::{Lookup, TokenStore},
    types::{Prompt, Token},
};

/// Where the external API caller gets its access tokens from.
#[allow(async_fn_in_trait)]
pub trait TokenSource {
    /// Returns a token without user interaction.
    async fn get_token_silently(&mut self, audience: &str) -> Result<Token, AuthError>;

    /// Returns a token after an interactive login or consent step.
    async fn get_token_with_popup(
        &mut self,
        audience: &str,
        prompt: Prompt,
    ) -> Result<Token, AuthError>;
}

/// Token source backed by the real identity provider and the session store.
pub struct Provider {
    settings: Settings,
    store: TokenStore,
    http: Client,
}

impl Provider {
    pub fn new(settings: Settings, store: TokenStore) -> Self {
        Provider {
            settings,
            store,
            http: Client::new(),
        }
    }

    /// Creates a provider on top of the session persisted at the default path.
    pub async fn load(settings: Settings) -> Result<Self, AuthError> {
        let store = TokenStore::load(TokenStore::default_path())
            .await
            .map_err(AuthError::Session)?;
        Ok(Self::new(settings, store))
    }

    async fn remember(&mut self, token: Token) -> Result<(), AuthError> {
        self.store.insert(token);
        self.store.persist().await.map_err(AuthError::Session)
    }
}

impl TokenSource for Provider {
    async fn get_token_silently(&mut self, audience: &str) -> Result<Token, AuthError> {
        let now = Utc::now().timestamp() as u64;

        match self.store.lookup(audience, now) {
            Lookup::Fresh(token) => Ok(token),
            Lookup::Refreshable(refresh_token) => {
                debug!("Refreshing session token for {}", audience);
                let token =
                    auth::refresh_token(&self.http, &self.settings, &refresh_token, audience)
                        .await?;
                self.remember(token.clone()).await?;
                Ok(token)
            }
            Lookup::Expired | Lookup::NoSession => Err(AuthError::LoginRequired),
            Lookup::OtherAudience => Err(AuthError::ConsentRequired),
        }
    }

    async fn get_token_with_popup(
        &mut self,
        audience: &str,
        prompt: Prompt,
    ) -> Result<Token, AuthError> {
        let token = auth::authorize_interactive(&self.settings, audience, prompt).await?;
        self.remember(token.clone()).await?;
        Ok(token)
    }
}
