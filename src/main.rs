//! certscope - inspect the live TLS certificate of a domain
//!
//! Fetches the certificate, prints an overview with a security score, and
//! optionally exports the record as JSON. `certscope serve` exposes the
//! same lookup over HTTP.

use anyhow::Context;
use certscope::certificate::{CertificateAnalyzer, CertificateFetcher, FetchOptions};
use certscope::cli::{Cli, Commands};
use certscope::config::{self, Settings};
use certscope::output;
use certscope::server::{self, AppState};
use certscope::utils::progress::create_spinner;
use certscope::utils::{lookup_subdomains, normalize_hostname, FetchError};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if cli.no_color {
        console::set_colors_enabled(false);
    }

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(exit_code(&e));
    }
}

/// 2 for invalid input, 1 for every other failure
fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<FetchError>()
        .map(|e| e.kind().exit_code())
        .unwrap_or(1)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut settings =
        config::load_settings(cli.config.as_ref()).context("Failed to load settings")?;
    cli.apply_overrides(&mut settings);

    match &cli.command {
        Some(Commands::Serve(_)) => run_server(settings).await,
        Some(Commands::Subdomains(args)) => {
            let report = lookup_subdomains(&args.domain);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", output::format_subdomain_report(&report));
            }
            Ok(())
        }
        None => {
            let domain = cli
                .domain
                .as_deref()
                .ok_or_else(|| FetchError::invalid_input("A domain is required"))?;
            run_fetch(&cli, domain, &settings).await
        }
    }
}

async fn run_fetch(cli: &Cli, domain: &str, settings: &Settings) -> anyhow::Result<()> {
    let host = normalize_hostname(domain);
    if host.is_empty() {
        return Err(FetchError::invalid_input(format!("'{}' is not a valid domain", domain)).into());
    }

    let mut options = FetchOptions::from(&settings.fetch);
    if let Some(sni) = &cli.fetch.sni {
        options.server_name = Some(sni.clone());
    }

    let spinner = create_spinner(
        &format!("Fetching certificate for {}...", host),
        !cli.json && console::user_attended(),
    );
    let result = CertificateFetcher::new().fetch(&host, &options).await;
    spinner.finish_and_clear();
    let cert = result?;

    if cli.json {
        output::print_json(&cert)?;
    } else {
        let analyzer = CertificateAnalyzer::new(settings.analysis.expiring_soon_days);
        output::print_certificate_report(&cert, &analyzer.assess(&cert), cli.verbose);
    }

    if let Some(path) = &cli.output {
        let written = output::write_json_file(&cert, path)?;
        if !cli.json {
            output::print_success(&format!("Saved certificate to {}", written.display()));
        }
    }

    Ok(())
}

async fn run_server(settings: Settings) -> anyhow::Result<()> {
    let addr = settings.server.bind_addr()?;
    output::print_info(&format!("Serving certificate API on http://{}", addr));
    server::run(addr, Arc::new(AppState::new(settings))).await
}
