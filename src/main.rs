use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use extapi::{cli, config, error};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Get an access token and call the external API
    Ping(PingOptions),

    /// Grant consent for the API audience in the browser, then call the API
    Consent,

    /// Log in (again) in the browser, then call the API
    Login,

    /// Show the decoded claims of the session token
    Token(TokenOptions),

    /// Forget the local login session
    Logout,

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct PingOptions {
    /// Request the token for the wrong audience to see the API reject it
    #[clap(long)]
    pub wrong_audience: bool,

    /// Open the browser when consent or a new login is required
    #[clap(long)]
    pub interactive: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct TokenOptions {
    /// Audience of the token to show (defaults to AUTH_AUDIENCE)
    #[clap(long)]
    pub audience: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

fn settings() -> config::Settings {
    match config::Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => error!("Invalid configuration: {}", e),
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    match cli.command {
        Command::Ping(opt) => cli::ping(settings(), opt.wrong_audience, opt.interactive).await,
        Command::Consent => cli::consent(settings()).await,
        Command::Login => cli::login(settings()).await,
        Command::Token(opt) => cli::token(opt.audience).await,
        Command::Logout => cli::logout().await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
