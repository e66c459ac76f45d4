use std::{collections::HashMap, sync::Arc};

use axum::{Extension, extract::Query, response::Html};
use tokio::sync::Mutex;

use crate::{
    config::Settings,
    provider::{AuthError, auth::resolve_callback},
    types::PkceSession,
    warning,
};

/// Handles the identity provider's redirect back to the local server.
///
/// Resolves the query against the pending session and stores the outcome for
/// the waiting interactive flow. The session lock is only held to copy the
/// session and to store the outcome, never across the code exchange.
///
/// # Arguments
///
/// * `params` - The redirect query (`state` plus `code` or `error`)
/// * `shared_state` - The pending session, `None` when no login is running
/// * `settings` - Provider settings for the token endpoint
///
/// # Returns
///
/// A short HTML page telling the user whether the browser can be closed.
pub async fn callback(
    Query(params): Query<HashMap<String, String>>,
    Extension(shared_state): Extension<Arc<Mutex<Option<PkceSession>>>>,
    Extension(settings): Extension<Arc<Settings>>,
) -> Html<&'static str> {
    let Some(session) = shared_state.lock().await.clone() else {
        return Html("<h4>No login in progress.</h4>");
    };

    let outcome = resolve_callback(&params, &session, &settings).await;
    let page = match &outcome {
        Ok(_) => Html("<h2>Authentication successful.</h2><p>Close browser window.</p>"),
        Err(AuthError::ConsentRequired) => Html("<h4>Consent was not granted.</h4>"),
        Err(AuthError::LoginRequired) => Html("<h4>Login is required.</h4>"),
        Err(AuthError::StateMismatch) => {
            // keep waiting for the genuine redirect
            warning!("Ignoring callback with unexpected state");
            return Html("<h4>Unexpected login state.</h4>");
        }
        Err(e) => {
            warning!("Token exchange failed: {}", e);
            Html("<h4>Login failed.</h4>")
        }
    };

    let mut lock = shared_state.lock().await;
    match lock.as_mut() {
        // the flow may have given up while the exchange was running
        Some(pending) if pending.state == session.state => pending.outcome = Some(outcome),
        _ => return Html("<h4>Login attempt expired.</h4>"),
    }
    page
}
