//! Utility modules for certscope
//!
//! This module contains error types, hostname helpers and progress indicators.

pub mod domain;
pub mod error;
pub mod progress;

pub use domain::{extract_base_domain, lookup_subdomains, normalize_hostname, SubdomainReport};
pub use error::{ConfigError, ErrorKind, ErrorResponse, FetchError};
