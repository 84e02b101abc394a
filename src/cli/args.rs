//! CLI argument definitions using clap

use crate::config::Settings;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "certscope")]
#[command(version)]
#[command(about = "Inspect the live TLS certificate of a domain", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Domain to inspect
    #[arg(value_name = "DOMAIN")]
    pub domain: Option<String>,

    #[command(flatten)]
    pub fetch: FetchArgs,

    /// Print the certificate record as JSON
    #[arg(long)]
    pub json: bool,

    /// Write the certificate record as JSON to a file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Days before expiry at which a certificate counts as expiring soon
    #[arg(long, value_name = "DAYS")]
    pub expiring_days: Option<i64>,

    /// Settings file (default: config/default.toml)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Connection flags; unset values fall back to the settings file
#[derive(Args, Debug, Default, Clone)]
pub struct FetchArgs {
    /// Port to connect to (default: 443)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Server name to send in the TLS handshake (default: the domain)
    #[arg(long, value_name = "NAME")]
    pub sni: Option<String>,

    /// Connect and handshake timeout in milliseconds (default: 10000)
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API
    Serve(ServeArgs),

    /// Show the base domain and known subdomains of a host
    Subdomains(SubdomainsArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on (default: 127.0.0.1:8080)
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,
}

#[derive(Args, Debug)]
pub struct SubdomainsArgs {
    /// Domain or URL
    #[arg(required = true)]
    pub domain: String,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Fold command-line overrides into loaded settings
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(port) = self.fetch.port {
            settings.fetch.port = port;
        }
        if let Some(timeout_ms) = self.fetch.timeout_ms {
            settings.fetch.timeout_ms = timeout_ms;
        }
        if let Some(days) = self.expiring_days {
            settings.analysis.expiring_soon_days = days;
        }
        if let Some(Commands::Serve(serve)) = &self.command {
            if let Some(bind) = &serve.bind {
                settings.server.bind = bind.clone();
            }
        }
    }
}
