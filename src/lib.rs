//! certscope library
//!
//! Retrieves the certificate a TLS server presents and turns it into a
//! JSON-safe record:
//! - Live retrieval over rustls with chain validation disabled
//! - Normalization of the cyclic raw certificate graph
//! - Expiry classification and a heuristic security score
//! - A small HTTP API and a bounded history of recent lookups
//!
//! # Usage
//!
//! ```rust,ignore
//! use certscope::certificate::{fetch, CertificateAnalyzer, FetchOptions};
//!
//! #[tokio::main]
//! async fn main() {
//!     let cert = fetch("example.com", &FetchOptions::default()).await.unwrap();
//!     let score = CertificateAnalyzer::default().security_score(&cert);
//!     println!("{} scores {}", cert.domains[0], score);
//! }
//! ```

pub mod certificate;
pub mod cli;
pub mod config;
pub mod history;
pub mod models;
pub mod output;
pub mod server;
pub mod utils;

// Re-export commonly used types
pub use cli::Cli;
pub use config::Settings;
pub use models::NormalizedCertificate;
pub use utils::{ErrorKind, FetchError};
