use std::fmt::Write;

use colored::Colorize;

use crate::{
    management::ExternalApiState,
    provider::{CONSENT_REQUIRED, LOGIN_REQUIRED},
    utils,
};

pub const UNAUTHORIZED_MESSAGE: &str =
    "Unauthorized! Sorry, you don't have permission to access this API";

/// Renders the external API view as terminal text.
///
/// `has_audience` mirrors the disabled state of the call buttons: without it
/// the configuration warning replaces any result.
pub fn render_external_api(
    state: &ExternalApiState,
    has_audience: bool,
    api_origin: &str,
) -> String {
    let mut out = String::new();

    if state.error.as_deref() == Some(CONSENT_REQUIRED) {
        let _ = writeln!(
            out,
            "[{}] You need to consent to get access to users api: run `{} consent`",
            "!".yellow().bold(),
            env!("CARGO_PKG_NAME")
        );
    }

    if state.error.as_deref() == Some(LOGIN_REQUIRED) {
        let _ = writeln!(
            out,
            "[{}] You need to log in again: run `{} login`",
            "!".yellow().bold(),
            env!("CARGO_PKG_NAME")
        );
    }

    let _ = writeln!(out, "{}", "External API".bold());
    let _ = writeln!(out, "Ping an external API with an access token.");
    let _ = writeln!(
        out,
        "This calls the API at {} and sends the access token in the `Authorization` header; \
         the API validates it against its audience.",
        api_origin
    );

    if !has_audience {
        out.push_str(&missing_audience_warning());
        return out;
    }

    if state.is_authorized && state.show_result {
        let _ = writeln!(out);
        match state.api_status {
            Some(status) => {
                let _ = writeln!(out, "{} ({})", "Result".dimmed(), status);
            }
            None => {
                let _ = writeln!(out, "{}", "Result".dimmed());
            }
        }
        let _ = writeln!(out, "{}", pretty(&state.api_message));
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", "Access token".dimmed());
        let _ = writeln!(out, "{}", state.access_token);
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", "Decoded token".dimmed());
        let _ = writeln!(out, "{}", pretty(&state.decoded_jwt));
        let _ = writeln!(
            out,
            "Audience {}, expires in {}s (at {})",
            state.token_audience,
            state.token_expiration,
            utils::format_unix_time(state.access_token_unix_time)
        );
    }

    if state.wrong_at_message {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", UNAUTHORIZED_MESSAGE.red().bold());
    }

    out
}

fn missing_audience_warning() -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "[{}] You can't call the API at the moment because no `audience` is configured, \
         or it is still the default value `YOUR_API_IDENTIFIER`.",
        "!".yellow().bold()
    );
    let _ = writeln!(
        out,
        "    The audience is the identifier of the API you want to call. Set AUTH_AUDIENCE \
         in the environment or in the .env file of the local data directory, then run the \
         command again."
    );
    out
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
