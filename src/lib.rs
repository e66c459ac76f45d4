//! External API Client Library
//!
//! This library obtains an OAuth2/OIDC access token from a third-party identity
//! provider, decodes its claims for display, and calls an external API with
//! the token as a bearer credential. It includes modules for the provider
//! flows, the local callback server, session handling and terminal rendering.
//!
//! # Modules
//!
//! - `api` - HTTP endpoints for the local callback server
//! - `cli` - Command-line interface implementations and rendering
//! - `config` - Configuration management and environment variables
//! - `management` - Session store and the external API view state
//! - `provider` - Identity provider and external API client
//! - `server` - Local HTTP server for OAuth callbacks
//! - `types` - Data structures and type definitions
//! - `utils` - PKCE helpers and token claim decoding
//!
//! # Example
//!
//! ```
//! use extapi::{config, cli};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), String> {
//!     config::load_env().await?;
//!     // Use CLI functions...
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod management;
pub mod provider;
pub mod server;
pub mod types;
pub mod utils;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```
/// info!("Requesting access token...");
/// info!("Calling {}", url);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only used for fatal errors where recovery is not possible, such as a
/// missing client id. Code after this macro does not execute.
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// Used for recoverable issues, e.g. a browser that could not be opened or a
/// request that failed with an error code that has no recovery action.
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a dimmed diagnostic line when `EXTAPI_DEBUG` is set.
///
/// # Example
///
/// ```
/// debug!("Decoded access token: {}", claims);
/// ```
#[macro_export]
macro_rules! debug {
  ($($arg:tt)*) => ({
    if std::env::var_os("EXTAPI_DEBUG").is_some() {
      use colored::Colorize;
      println!("[{}] {}", "~".dimmed(), std::format_args!($($arg)*));
    }
  })
}
