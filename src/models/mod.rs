//! Data models for certscope
//!
//! This module contains the records shared by the fetcher, the analyzer and
//! the front-ends.

pub mod certificate;

pub use certificate::{
    CertificateDetails, DistinguishedName, DnValue, IssuerSummary, NormalizedCertificate,
    PublicKeyInfo,
};
