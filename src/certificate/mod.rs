//! Certificate handling module
//!
//! This module provides functionality for:
//! - Retrieving the certificate chain a server presents
//! - Parsing DER certificates into a raw field graph
//! - Normalizing that graph into a JSON-safe record
//! - Expiry classification and security scoring

pub mod analysis;
pub mod fetch;
pub mod normalize;
pub mod parse;
pub mod raw;

pub use analysis::{
    CertificateAnalyzer, ScoreRating, SecurityAssessment, SecurityCheck, StatusLabel,
};
pub use fetch::{fetch, CertificateFetcher, FetchOptions};
pub use normalize::{extract_domains, normalize, sanitize, CIRCULAR_PLACEHOLDER};
pub use parse::build_raw_chain;
pub use raw::{NodeId, RawCertificate, RawNode, RawValue, ISSUER_LINK};
