//! # API Module
//!
//! HTTP endpoints of the local callback server that stands in for the
//! provider's login popup.
//!
//! ## Endpoints
//!
//! - [`callback`] - OAuth redirect target. Validates `state`, maps an `error`
//!   parameter (e.g. `consent_required`) to its code, or exchanges `code` for
//!   a token with the PKCE verifier, and stores the outcome for the waiting
//!   interactive flow.
//! - [`health`] - Returns status, name and version for quick checks.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use axum::{Router, routing::get};
//! use extapi::api::{callback, health};
//!
//! let app = Router::new()
//!     .route("/callback", get(callback))
//!     .route("/health", get(health));
//! ```

mod callback;
mod health;

pub use callback::callback;
pub use health::health;
