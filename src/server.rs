use axum::{Extension, Router, routing::get};
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::{net::TcpListener, sync::Mutex};

use crate::{api, config::Settings, types::PkceSession, warning};

/// Builds the callback server's routes.
///
/// The pending login and the settings are attached as router-level
/// extensions, so every handler can extract them.
///
/// # Arguments
///
/// * `settings` - Provider and redirect settings used for the code exchange
/// * `state` - The pending PKCE session the `/callback` handler resolves
///
/// # Example
///
/// ```
/// let shared = Arc::new(Mutex::new(None));
/// let app = server::router(Arc::new(settings), shared);
/// axum::serve(listener, app).await?;
/// ```
pub fn router(settings: Arc<Settings>, state: Arc<Mutex<Option<PkceSession>>>) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/callback", get(api::callback))
        .layer(Extension(state))
        .layer(Extension(settings))
}

/// Binds the callback listener on `address` (e.g. `127.0.0.1:3000`).
///
/// # Errors
///
/// Returns a message when the address does not parse or the port is taken.
pub async fn bind(address: &str) -> Result<TcpListener, String> {
    let addr = SocketAddr::from_str(address)
        .map_err(|e| format!("Failed to parse server address {}: {}", address, e))?;

    TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind callback server on {}: {}", addr, e))
}

/// Serves [`router`] on `listener` until the task is aborted.
pub async fn serve(
    listener: TcpListener,
    settings: Arc<Settings>,
    state: Arc<Mutex<Option<PkceSession>>>,
) {
    if let Err(e) = axum::serve(listener, router(settings, state)).await {
        warning!("Callback server stopped: {}", e);
    }
}
