use certscope::cli::{Cli, Commands};
use certscope::config::Settings;
use clap::Parser;

#[test]
fn test_domain_with_flags() {
    let cli = Cli::try_parse_from([
        "certscope",
        "example.com",
        "--port",
        "8443",
        "--sni",
        "alt.example.com",
        "--timeout-ms",
        "2500",
        "--json",
    ])
    .unwrap();

    assert_eq!(cli.domain.as_deref(), Some("example.com"));
    assert_eq!(cli.fetch.port, Some(8443));
    assert_eq!(cli.fetch.sni.as_deref(), Some("alt.example.com"));
    assert_eq!(cli.fetch.timeout_ms, Some(2500));
    assert!(cli.json);
    assert!(cli.command.is_none());
}

#[test]
fn test_serve_subcommand() {
    let cli = Cli::try_parse_from(["certscope", "serve", "--bind", "0.0.0.0:9000"]).unwrap();
    match cli.command {
        Some(Commands::Serve(args)) => assert_eq!(args.bind.as_deref(), Some("0.0.0.0:9000")),
        other => panic!("expected serve, got {:?}", other),
    }
}

#[test]
fn test_overrides_replace_settings() {
    let cli = Cli::try_parse_from([
        "certscope",
        "example.com",
        "--timeout-ms",
        "500",
        "--expiring-days",
        "14",
    ])
    .unwrap();

    let mut settings = Settings::default();
    cli.apply_overrides(&mut settings);
    assert_eq!(settings.fetch.timeout_ms, 500);
    assert_eq!(settings.fetch.port, 443);
    assert_eq!(settings.analysis.expiring_soon_days, 14);
}

#[test]
fn test_serve_bind_override() {
    let cli = Cli::try_parse_from(["certscope", "serve", "--bind", "127.0.0.1:9999"]).unwrap();
    let mut settings = Settings::default();
    cli.apply_overrides(&mut settings);
    assert_eq!(settings.server.bind, "127.0.0.1:9999");
}

#[test]
fn test_invalid_port_rejected() {
    assert!(Cli::try_parse_from(["certscope", "example.com", "--port", "70000"]).is_err());
}
