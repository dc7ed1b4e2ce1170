//! Output formatting for decoded and verified tokens

use crate::cli::OutputFormat;
use crate::error::{CliError, CliResult};
use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::Value;

/// Result of `tokengate decode`
#[derive(Debug, Clone, Serialize)]
pub struct DecodeReport {
    pub header: Value,
    pub payload: Value,
    pub signature_hex: String,
}

/// Result of `tokengate verify` and `tokengate check`
#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    /// `local_key` or `introspection`
    pub source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    pub claims: Value,
    /// `exp` rendered as RFC 3339
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// Result of `tokengate token`
#[derive(Debug, Clone, Serialize)]
pub struct TokenReport {
    pub token_endpoint: String,
    pub access_token: String,
    pub masked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Format and display output based on format preference
pub struct Formatter {
    format: OutputFormat,
    colored: bool,
}

impl Formatter {
    #[must_use]
    pub fn new(format: OutputFormat, colored: bool) -> Self {
        Self { format, colored }
    }

    /// Display a decoded, unverified token
    pub fn display_decoded(&self, report: &DecodeReport) -> CliResult<()> {
        match self.format {
            OutputFormat::Json => self.display_json(report),
            OutputFormat::Human => {
                self.print_header("Header:");
                println!("{}", serde_json::to_string_pretty(&report.header)?);
                self.print_header("Payload:");
                println!("{}", serde_json::to_string_pretty(&report.payload)?);
                self.print_header("Signature (hex):");
                println!("{}", report.signature_hex);
                self.print_footer("Signature not verified");
                Ok(())
            }
        }
    }

    /// Display an accepted token
    pub fn display_verified(&self, report: &VerifyReport) -> CliResult<()> {
        match self.format {
            OutputFormat::Json => self.display_json(report),
            OutputFormat::Human => {
                if self.colored {
                    println!("{}", "Token verified successfully.".bright_green().bold());
                } else {
                    println!("Token verified successfully.");
                }
                self.print_kv("Source", report.source);
                if let Some(kid) = &report.key_id {
                    self.print_kv("Key", kid);
                }
                if let Some(alg) = &report.algorithm {
                    self.print_kv("Algorithm", alg);
                }
                self.print_header("Claims:");
                println!("{}", serde_json::to_string_pretty(&report.claims)?);
                if let Some(expires_at) = &report.expires_at {
                    self.print_footer(&format!("Expires at: {expires_at}"));
                }
                Ok(())
            }
        }
    }

    /// Display a fetched access token
    pub fn display_token(&self, report: &TokenReport) -> CliResult<()> {
        match self.format {
            OutputFormat::Json => self.display_json(report),
            OutputFormat::Human => {
                let label = if report.masked {
                    "Access token (masked)"
                } else {
                    "Access token"
                };
                self.print_kv(label, &report.access_token);
                self.print_kv("Endpoint", &report.token_endpoint);
                if let Some(token_type) = &report.token_type {
                    self.print_kv("Type", token_type);
                }
                if let Some(expires_in) = report.expires_in {
                    self.print_kv("Expires in", &format!("{expires_in}s"));
                }
                if let Some(scope) = &report.scope {
                    self.print_kv("Scope", scope);
                }
                Ok(())
            }
        }
    }

    /// Display error with suggestions
    pub fn display_error(&self, error: &CliError) {
        if self.colored {
            eprintln!(
                "{} [{}]: {}",
                "Error".bright_red().bold(),
                error.category(),
                error
            );

            let suggestions = error.suggestions();
            if !suggestions.is_empty() {
                eprintln!("\n{}", "Suggestions:".bright_yellow().bold());
                for suggestion in suggestions {
                    eprintln!("  {} {}", "•".bright_blue(), suggestion);
                }
            }
        } else {
            eprintln!("Error [{}]: {error}", error.category());

            let suggestions = error.suggestions();
            if !suggestions.is_empty() {
                eprintln!("\nSuggestions:");
                for suggestion in suggestions {
                    eprintln!("  • {suggestion}");
                }
            }
        }
    }

    fn display_json<T: Serialize + ?Sized>(&self, value: &T) -> CliResult<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    fn print_header(&self, text: &str) {
        if self.colored {
            println!("\n{}", text.bright_cyan().bold());
        } else {
            println!("\n{text}");
        }
    }

    fn print_footer(&self, text: &str) {
        if self.colored {
            println!("\n{}", text.bright_black());
        } else {
            println!("\n{text}");
        }
    }

    fn print_kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("  {}: {}", key.bright_green().bold(), value);
        } else {
            println!("  {key}: {value}");
        }
    }
}
