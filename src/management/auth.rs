use std::{collections::BTreeMap, io::ErrorKind, path::PathBuf};

use crate::types::Token;

/// Tokens are treated as expired this many seconds early.
pub const EXPIRY_LEEWAY_SECS: u64 = 60;

/// What the session can offer for a given audience.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Fresh(Token),
    /// Expired, but the carried refresh token can renew it.
    Refreshable(String),
    Expired,
    /// Tokens exist, none of them for this audience.
    OtherAudience,
    NoSession,
}

/// Local login session: the tokens obtained so far, keyed by audience.
pub struct TokenStore {
    path: PathBuf,
    tokens: BTreeMap<String, Token>,
}

impl TokenStore {
    pub fn new(path: PathBuf) -> Self {
        TokenStore {
            path,
            tokens: BTreeMap::new(),
        }
    }

    /// Loads the session at `path`; a missing file is an empty session.
    pub async fn load(path: PathBuf) -> Result<Self, String> {
        let content = match async_fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::new(path)),
            Err(e) => return Err(e.to_string()),
        };

        let tokens: BTreeMap<String, Token> =
            serde_json::from_str(&content).map_err(|e| e.to_string())?;
        Ok(Self { path, tokens })
    }

    pub async fn persist(&self) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(&self.tokens).map_err(|e| e.to_string())?;
        async_fs::write(&self.path, json)
            .await
            .map_err(|e| e.to_string())
    }

    /// Forgets every token and removes the session file.
    pub async fn clear(&mut self) -> Result<(), String> {
        self.tokens.clear();
        match async_fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.to_string()),
        }
    }

    pub fn insert(&mut self, token: Token) {
        self.tokens.insert(token.audience.clone(), token);
    }

    pub fn get(&self, audience: &str) -> Option<&Token> {
        self.tokens.get(audience)
    }

    pub fn audiences(&self) -> impl Iterator<Item = &str> {
        self.tokens.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn lookup(&self, audience: &str, now: u64) -> Lookup {
        match self.tokens.get(audience) {
            Some(token) if !is_expired(token, now) => Lookup::Fresh(token.clone()),
            Some(token) => match &token.refresh_token {
                Some(rt) if !rt.is_empty() => Lookup::Refreshable(rt.clone()),
                _ => Lookup::Expired,
            },
            None if self.tokens.is_empty() => Lookup::NoSession,
            None => Lookup::OtherAudience,
        }
    }

    pub fn default_path() -> PathBuf {
        let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("extapi/cache/tokens.json");
        path
    }
}

pub fn is_expired(token: &Token, now: u64) -> bool {
    now + EXPIRY_LEEWAY_SECS >= token.obtained_at + token.expires_in
}
