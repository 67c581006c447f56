//! CLI entry point for LazyTeams.

pub mod account;
pub mod signin;

use clap::{Parser, Subcommand};

use crate::config::{keys, DefaultDirs, Settings};
use crate::context::AppContext;
use crate::error::{Error, ErrorKind, RecoverySuggestion, Result};
use crate::telemetry;

/// Exit status for configuration failures.
pub const EXIT_CONFIGURATION: i32 = 9;
/// Exit status for every other failure.
pub const EXIT_FAILURE: i32 = 1;

/// LazyTeams terminal client
#[derive(Parser, Debug)]
#[command(name = "lazyteams", version, about = "LazyTeams - Microsoft Teams in the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in with a device code
    Signin(SigninArgs),
    /// Show the active account and stored credentials
    Status,
    /// Forget the active account's tokens
    Signout,
    /// Configuration helpers
    Settings(SettingsArgs),
}

/// Arguments for `lazyteams signin`.
#[derive(Parser, Debug)]
pub struct SigninArgs {
    /// Do not copy the user code to the clipboard
    #[arg(long)]
    pub no_clipboard: bool,
}

/// Arguments for the `settings` subcommand group.
#[derive(Parser, Debug)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: SettingsCommands,
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    /// Print a commented `.env` sample
    EnvSample,
    /// Print the Markdown configuration reference
    Reference,
}

/// Run one command to completion.
pub async fn run(cli: Cli) -> Result<()> {
    let command = match cli.command {
        Commands::Settings(args) => {
            let specs = keys::specifications(&DefaultDirs::detect());
            match args.command {
                SettingsCommands::EnvSample => print!("{}", keys::dotenv_sample(&specs)),
                SettingsCommands::Reference => print!("{}", keys::configuration_reference(&specs)),
            }
            return Ok(());
        }
        other => other,
    };

    let settings = Settings::from_env()?;
    settings.ensure_directories()?;
    let _telemetry = telemetry::init_tracing(&settings);
    if settings.log_on_startup {
        settings.log_resolved();
    }
    let context = AppContext::new(settings);

    match command {
        Commands::Signin(args) => signin::handle_signin(&context, &args).await,
        Commands::Status => account::handle_status(&context).await,
        Commands::Signout => account::handle_signout(&context),
        Commands::Settings(_) => Ok(()),
    }
}

/// Process exit status for a failed run.
pub fn exit_code(err: &Error) -> i32 {
    match err.kind() {
        ErrorKind::Configuration => EXIT_CONFIGURATION,
        _ => EXIT_FAILURE,
    }
}

/// Print an error, its causes and the recovery hint to stderr.
pub fn report(err: &Error) {
    eprintln!("Error: {err}");
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
    let hint = match err.recovery_suggestion() {
        RecoverySuggestion::CheckConfiguration => {
            "Check your environment or .env file (see `lazyteams settings reference`)."
        }
        RecoverySuggestion::CheckCredentialStore => {
            "Check that the credentials file is readable and valid JSON."
        }
        RecoverySuggestion::RestartSignin => "Run `lazyteams signin` to start again.",
    };
    eprintln!("{hint}");
}
