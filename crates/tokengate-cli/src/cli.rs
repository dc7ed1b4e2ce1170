//! CLI argument parsing

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::str::FromStr;
use tokengate::Algorithm;

/// Main CLI application structure
#[derive(Parser, Debug)]
#[command(
    name = "tokengate",
    version,
    about = "Inspect and verify JWT bearer tokens",
    long_about = "tokengate decodes JWT bearer tokens and verifies them against a shared secret, \
                  a JWKS document, or a full trust-domain configuration (local keys or remote \
                  introspection).\n\n\
                  `decode` never checks the signature: its output is untrusted."
)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, short = 'f', global = true, value_enum, default_value = "human")]
    pub format: OutputFormat,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decode a token without verifying it
    Decode(DecodeArgs),

    /// Verify a token's signature and claims
    Verify(VerifyArgs),

    /// Verify a token against a trust-domain configuration file
    Check(CheckArgs),

    /// Fetch an access token with the client-credentials grant
    Token(TokenArgs),
}

#[derive(Args, Debug, Clone)]
pub struct DecodeArgs {
    /// Compact JWS to decode
    #[arg(long, short = 't')]
    pub token: String,
}

#[derive(Args, Debug, Clone)]
#[command(group(ArgGroup::new("key").required(true).args(["secret", "jwks"])))]
pub struct VerifyArgs {
    /// Compact JWS to verify
    #[arg(long, short = 't')]
    pub token: String,

    /// Shared HMAC secret
    #[arg(long, env = "TOKENGATE_SECRET", hide_env_values = true)]
    pub secret: Option<String>,

    /// JWKS document on disk
    #[arg(long, value_name = "FILE")]
    pub jwks: Option<PathBuf>,

    /// Expected algorithm (HS256 when verifying with --secret)
    #[arg(long, short = 'a', value_parser = parse_algorithm)]
    pub algorithm: Option<Algorithm>,

    /// Required issuer
    #[arg(long)]
    pub issuer: Option<String>,

    /// Required audience
    #[arg(long)]
    pub audience: Option<String>,

    /// Clock skew tolerance in seconds
    #[arg(long, default_value_t = 30)]
    pub leeway: u64,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Trust-domain configuration (TOML, YAML or JSON)
    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: PathBuf,

    /// Compact JWS or opaque token to verify
    #[arg(long, short = 't')]
    pub token: String,

    /// Prefix of environment variables overriding the file
    #[arg(long, default_value = "TOKENGATE")]
    pub env_prefix: String,
}

#[derive(Args, Debug, Clone)]
pub struct TokenArgs {
    /// Authorization server base URL; the token endpoint is `<issuer>/token`
    #[arg(long, short = 'i')]
    pub issuer: String,

    /// OAuth client identifier
    #[arg(long)]
    pub client_id: String,

    /// OAuth client secret
    #[arg(long, env = "TOKENGATE_CLIENT_SECRET", hide_env_values = true)]
    pub secret: String,

    /// Space-separated scopes to request
    #[arg(long)]
    pub scope: Option<String>,

    /// Print the full token instead of a masked one
    #[arg(long)]
    pub reveal: bool,
}

/// Output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Labelled sections for terminals
    Human,
    /// Pretty-printed JSON
    Json,
}

fn parse_algorithm(value: &str) -> Result<Algorithm, String> {
    Algorithm::from_str(&value.to_ascii_uppercase())
        .or_else(|_| Algorithm::from_str(value))
        .map_err(|_| format!("unsupported algorithm '{value}'"))
}
