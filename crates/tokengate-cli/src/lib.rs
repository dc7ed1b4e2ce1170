//! # tokengate CLI
//!
//! Command-line front end to the `tokengate` verification engine.
//!
//! ## Usage
//!
//! ```bash
//! # Look inside a token (no signature check)
//! tokengate decode --token "$TOKEN"
//!
//! # Verify with a shared HMAC secret
//! tokengate verify --token "$TOKEN" --secret "$SECRET" \
//!   --issuer https://demo-issuer --audience workout10-api
//!
//! # Verify with a JWKS document
//! tokengate verify --token "$TOKEN" --jwks keys.json
//!
//! # Verify the way a configured service would
//! tokengate check --config trust-domain.toml --token "$TOKEN"
//!
//! # Fetch a client-credentials token from an authorization server
//! tokengate token --issuer http://127.0.0.1:8000 --client-id service-a --secret "$SECRET"
//! ```

pub mod cli;
pub mod commands;
pub mod error;
pub mod formatter;
pub mod token;

pub use cli::{Cli, Commands, OutputFormat};
pub use error::{CliError, CliResult};

use clap::Parser;
use formatter::Formatter;
use tracing_subscriber::EnvFilter;

/// Run the CLI application
///
/// # Errors
///
/// Returns the failed command's error after it has been shown on stderr.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let formatter = Formatter::new(cli.format, !cli.no_color);
    if let Err(e) = execute(&cli, &formatter).await {
        formatter.display_error(&e);
        return Err(anyhow::Error::new(e).context("command failed"));
    }
    Ok(())
}

async fn execute(cli: &Cli, formatter: &Formatter) -> CliResult<()> {
    match &cli.command {
        Commands::Decode(args) => formatter.display_decoded(&commands::decode(args)?),
        Commands::Verify(args) => formatter.display_verified(&commands::verify(args).await?),
        Commands::Check(args) => formatter.display_verified(&commands::check(args).await?),
        Commands::Token(args) => formatter.display_token(&commands::token(args).await?),
    }
}

/// Logs go to stderr so JSON output on stdout stays parseable
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
