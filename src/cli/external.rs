use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    cli::render_external_api,
    config::Settings,
    error,
    management::{ApiSettings, ExternalApi},
    provider::{Provider, TokenSource},
    success,
    types::Prompt,
    warning,
};

/// Primary (or, with `wrong_audience`, secondary) call of the external API.
///
/// With `interactive`, a `consent_required` or `login_required` outcome runs
/// the matching recovery right away instead of only pointing at it.
pub async fn ping(settings: Settings, wrong_audience: bool, interactive: bool) {
    let mut api = build(settings.clone()).await;

    if !api.can_call() {
        print!("{}", render_external_api(api.state(), false, &settings.api_origin));
        return;
    }

    let pb = spinner("Calling external API...");
    if wrong_audience {
        api.call_api_wrong_audience().await;
    } else {
        api.call_api().await;
    }
    pb.finish_and_clear();

    if interactive {
        recover_interactively(&mut api, wrong_audience).await;
    }

    finish(&api, &settings);
}

/// Runs the recovery matching the last error: consent for
/// `consent_required`, a fresh login for `login_required`.
///
/// The wrong-audience call is meant to fail, so it is never recovered.
///
/// # Returns
///
/// The prompt that was used, `None` when nothing was run.
pub async fn recover_interactively<S: TokenSource>(
    api: &mut ExternalApi<S>,
    wrong_audience: bool,
) -> Option<Prompt> {
    if wrong_audience {
        return None;
    }

    let prompt = api.state().recovery()?;
    match prompt {
        Prompt::Consent => api.handle_consent().await,
        _ => api.handle_login_again().await,
    }
    Some(prompt)
}

/// Consent interactively for the configured audience, then call the API.
pub async fn consent(settings: Settings) {
    let mut api = build(settings.clone()).await;
    if api.can_call() {
        api.handle_consent().await;
    }
    finish(&api, &settings);
}

/// Log in interactively for the configured audience, then call the API.
pub async fn login(settings: Settings) {
    let mut api = build(settings.clone()).await;
    if api.can_call() {
        api.handle_login_again().await;
    }
    finish(&api, &settings);
}

async fn build(settings: Settings) -> ExternalApi<Provider> {
    let api_settings = ApiSettings::from(&settings);
    match Provider::load(settings).await {
        Ok(provider) => ExternalApi::new(provider, api_settings),
        Err(e) => error!("Failed to load login session. Err: {}", e),
    }
}

fn finish(api: &ExternalApi<Provider>, settings: &Settings) {
    let state = api.state();
    print!(
        "{}",
        render_external_api(state, api.can_call(), &settings.api_origin)
    );

    match state.error.as_deref() {
        None if state.is_authorized => success!("External API called successfully"),
        None => {}
        Some(_) if state.recovery().is_some() => {}
        Some(code) => warning!(
            "Request failed ({}): {}",
            code,
            state.error_detail.as_deref().unwrap_or("no details")
        ),
    }
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb
}
