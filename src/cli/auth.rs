use tabled::Table;

use crate::{
    config, error, info,
    management::{TokenStore, is_expired},
    success, utils, warning,
};

/// Shows the claims of the session token for `audience` (default: configured).
pub async fn token(audience: Option<String>) {
    let store = match TokenStore::load(TokenStore::default_path()).await {
        Ok(store) => store,
        Err(e) => error!("Failed to load login session. Err: {}", e),
    };

    let Some(audience) = audience.or_else(config::audience) else {
        warning!("No audience configured. Pass --audience or set AUTH_AUDIENCE.");
        return;
    };

    let Some(token) = store.get(&audience) else {
        let known: Vec<&str> = store.audiences().collect();
        if known.is_empty() {
            warning!("Not logged in. Run {} login", env!("CARGO_PKG_NAME"));
        } else {
            warning!(
                "No token for {}. Session holds tokens for: {}",
                audience,
                known.join(", ")
            );
        }
        return;
    };

    let claims = match utils::decode_claims(&token.access_token) {
        Ok(claims) => claims,
        Err(e) => {
            warning!("Access token for {} is not a JWT: {}", audience, e);
            return;
        }
    };

    let now = chrono::Utc::now().timestamp() as u64;
    if is_expired(token, now) {
        info!("Token for {} is expired", audience);
    } else {
        info!("Token for {} is valid", audience);
    }

    println!("{}", Table::new(utils::claims_table_rows(&claims)));
}

/// Forgets the local login session.
pub async fn logout() {
    let mut store = match TokenStore::load(TokenStore::default_path()).await {
        Ok(store) => store,
        Err(_) => TokenStore::new(TokenStore::default_path()),
    };

    match store.clear().await {
        Ok(()) => success!("Logged out"),
        Err(e) => error!("Failed to remove session {}: {}", store.path().display(), e),
    }
}
