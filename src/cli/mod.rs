//! # CLI Module
//!
//! User-facing commands. Each command plays the role of one control of the
//! external API page:
//!
//! - [`ping`] - "Get Access Token for External API" (or, with
//!   `--wrong-audience`, the deliberately misconfigured call)
//! - [`consent`] - the "consent to get access" recovery link
//! - [`login`] - the "log in again" recovery link
//! - [`token`] - inspect the session token's claims
//! - [`logout`] - forget the local session
//!
//! Output goes through [`render_external_api`] plus the crate's status macros.
//!
//! ## Usage Patterns
//!
//! ```bash
//! extapi login                     # first login, then call the API
//! extapi ping                      # silent token, call the API
//! extapi ping --interactive        # recover from consent/login errors in the browser
//! extapi ping --wrong-audience     # show what a wrong audience looks like
//! extapi token                     # decoded claims as a table
//! ```

mod auth;
mod external;
mod render;

pub use auth::logout;
pub use auth::token;
pub use external::consent;
pub use external::login;
pub use external::ping;
pub use external::recover_interactively;
pub use render::UNAUTHORIZED_MESSAGE;
pub use render::render_external_api;
