//! Certificate health: expiry classification and security scoring

use crate::models::NormalizedCertificate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_EXPIRING_SOON_DAYS: i64 = 30;

const MS_PER_DAY: i64 = 86_400_000;
const MIN_KEY_BITS: u32 = 2048;
const WEAK_ALGORITHMS: [&str; 2] = ["SHA1", "MD5"];

const EXPIRED_PENALTY: i32 = 60;
const EXPIRING_SOON_PENALTY: i32 = 20;
const WEAK_ALGORITHM_PENALTY: i32 = 30;
const WEAK_KEY_PENALTY: i32 = 30;
const WILDCARD_PENALTY: i32 = 10;

/// Expiry classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusLabel {
    Expired,
    ExpiringSoon,
    Valid,
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusLabel::Expired => write!(f, "Expired"),
            StatusLabel::ExpiringSoon => write!(f, "Expiring Soon"),
            StatusLabel::Valid => write!(f, "Valid"),
        }
    }
}

/// Coarse band of the security score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreRating {
    Good,
    Fair,
    Poor,
}

impl ScoreRating {
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => ScoreRating::Good,
            60..=79 => ScoreRating::Fair,
            _ => ScoreRating::Poor,
        }
    }
}

impl fmt::Display for ScoreRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreRating::Good => write!(f, "Good"),
            ScoreRating::Fair => write!(f, "Fair"),
            ScoreRating::Poor => write!(f, "Poor"),
        }
    }
}

/// One scored factor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityCheck {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl SecurityCheck {
    fn new(name: &str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed,
            detail: detail.into(),
        }
    }
}

/// Everything the analyzer derives from one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityAssessment {
    pub score: u8,
    pub rating: ScoreRating,
    pub status: StatusLabel,
    pub days_remaining: i64,
    pub checks: Vec<SecurityCheck>,
}

/// Pure computations over a [`NormalizedCertificate`]
///
/// The plain methods read the clock when called; the `_at` variants take
/// the reference instant explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CertificateAnalyzer {
    pub expiring_soon_days: i64,
}

impl Default for CertificateAnalyzer {
    fn default() -> Self {
        Self {
            expiring_soon_days: DEFAULT_EXPIRING_SOON_DAYS,
        }
    }
}

impl CertificateAnalyzer {
    pub fn new(expiring_soon_days: i64) -> Self {
        Self { expiring_soon_days }
    }

    pub fn days_remaining(&self, cert: &NormalizedCertificate) -> i64 {
        self.days_remaining_at(cert, Utc::now())
    }

    /// Whole days until `not_after`, rounded up. Zero or negative once expired.
    pub fn days_remaining_at(&self, cert: &NormalizedCertificate, now: DateTime<Utc>) -> i64 {
        let ms = (cert.not_after - now).num_milliseconds();
        // Integer division truncates toward zero, which is already the
        // ceiling for negative values
        let days = ms / MS_PER_DAY;
        if ms % MS_PER_DAY > 0 {
            days + 1
        } else {
            days
        }
    }

    pub fn is_expired(&self, cert: &NormalizedCertificate) -> bool {
        self.is_expired_at(cert, Utc::now())
    }

    pub fn is_expired_at(&self, cert: &NormalizedCertificate, now: DateTime<Utc>) -> bool {
        self.days_remaining_at(cert, now) <= 0
    }

    pub fn is_expiring_soon(&self, cert: &NormalizedCertificate) -> bool {
        self.is_expiring_soon_at(cert, Utc::now())
    }

    pub fn is_expiring_soon_at(&self, cert: &NormalizedCertificate, now: DateTime<Utc>) -> bool {
        let days = self.days_remaining_at(cert, now);
        days > 0 && days <= self.expiring_soon_days
    }

    pub fn status(&self, cert: &NormalizedCertificate) -> StatusLabel {
        self.status_at(cert, Utc::now())
    }

    pub fn status_at(&self, cert: &NormalizedCertificate, now: DateTime<Utc>) -> StatusLabel {
        if self.is_expired_at(cert, now) {
            StatusLabel::Expired
        } else if self.is_expiring_soon_at(cert, now) {
            StatusLabel::ExpiringSoon
        } else {
            StatusLabel::Valid
        }
    }

    pub fn security_score(&self, cert: &NormalizedCertificate) -> u8 {
        self.security_score_at(cert, Utc::now())
    }

    /// Heuristic 0-100 score
    pub fn security_score_at(&self, cert: &NormalizedCertificate, now: DateTime<Utc>) -> u8 {
        let mut score: i32 = 100;

        match self.status_at(cert, now) {
            StatusLabel::Expired => score -= EXPIRED_PENALTY,
            StatusLabel::ExpiringSoon => score -= EXPIRING_SOON_PENALTY,
            StatusLabel::Valid => {}
        }
        if !has_strong_algorithm(cert) {
            score -= WEAK_ALGORITHM_PENALTY;
        }
        if !has_strong_key(cert) {
            score -= WEAK_KEY_PENALTY;
        }
        if cert.has_wildcard() {
            score -= WILDCARD_PENALTY;
        }

        score.clamp(0, 100) as u8
    }

    pub fn assess(&self, cert: &NormalizedCertificate) -> SecurityAssessment {
        self.assess_at(cert, Utc::now())
    }

    /// Score, status and the individual factors behind them
    pub fn assess_at(
        &self,
        cert: &NormalizedCertificate,
        now: DateTime<Utc>,
    ) -> SecurityAssessment {
        let days_remaining = self.days_remaining_at(cert, now);
        let status = self.status_at(cert, now);
        let score = self.security_score_at(cert, now);

        let validity_detail = match status {
            StatusLabel::Expired => format!("Expired {} days ago", -days_remaining),
            StatusLabel::ExpiringSoon => format!("Expires in {} days", days_remaining),
            StatusLabel::Valid => format!("{} days remaining", days_remaining),
        };

        let algorithm = cert.details.signature_algorithm.as_deref();
        let algorithm_detail = match algorithm {
            Some(name) => name.to_string(),
            None => "Unknown signature algorithm".to_string(),
        };

        let key_detail = match cert.details.key_bits() {
            Some(bits) => format!("{} bits", bits),
            None => "Unknown key size".to_string(),
        };

        let wildcard_detail = if cert.has_wildcard() {
            "Wildcard certificate"
        } else {
            "Names specific hosts"
        };

        SecurityAssessment {
            score,
            rating: ScoreRating::from_score(score),
            status,
            days_remaining,
            checks: vec![
                SecurityCheck::new("Valid Period", status == StatusLabel::Valid, validity_detail),
                SecurityCheck::new(
                    "Strong Algorithm",
                    has_strong_algorithm(cert),
                    algorithm_detail,
                ),
                SecurityCheck::new("Strong Key Length", has_strong_key(cert), key_detail),
                SecurityCheck::new("Specific Domain", !cert.has_wildcard(), wildcard_detail),
            ],
        }
    }
}

/// Signature algorithm is known and not SHA1/MD5 based (case-sensitive)
fn has_strong_algorithm(cert: &NormalizedCertificate) -> bool {
    cert.details
        .signature_algorithm
        .as_deref()
        .is_some_and(|name| !WEAK_ALGORITHMS.iter().any(|weak| name.contains(weak)))
}

fn has_strong_key(cert: &NormalizedCertificate) -> bool {
    cert.details.key_bits().is_some_and(|bits| bits >= MIN_KEY_BITS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CertificateDetails, PublicKeyInfo};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn cert_expiring_in(duration: Duration) -> NormalizedCertificate {
        NormalizedCertificate {
            domains: vec!["example.com".to_string(), "www.example.com".to_string()],
            issuer: "CN=Test CA".to_string(),
            not_before: now() - Duration::days(60),
            not_after: now() + duration,
            details: CertificateDetails {
                signature_algorithm: Some("SHA256withRSA".to_string()),
                public_key: Some(PublicKeyInfo {
                    algorithm: Some("RSA".to_string()),
                    bits: Some(2048),
                    ..Default::default()
                }),
                ..Default::default()
            },
            retrieved_at: now(),
        }
    }

    fn baseline() -> NormalizedCertificate {
        cert_expiring_in(Duration::days(90))
    }

    #[test]
    fn test_status_classification() {
        let analyzer = CertificateAnalyzer::default();
        let at = now();
        assert_eq!(
            analyzer.status_at(&cert_expiring_in(Duration::days(45)), at),
            StatusLabel::Valid
        );
        assert_eq!(
            analyzer.status_at(&cert_expiring_in(Duration::days(10)), at),
            StatusLabel::ExpiringSoon
        );
        assert_eq!(
            analyzer.status_at(&cert_expiring_in(Duration::days(-1)), at),
            StatusLabel::Expired
        );
    }

    #[test]
    fn test_status_boundaries() {
        let analyzer = CertificateAnalyzer::default();
        let at = now();

        let thirty = cert_expiring_in(Duration::days(30));
        assert_eq!(analyzer.days_remaining_at(&thirty, at), 30);
        assert_eq!(analyzer.status_at(&thirty, at), StatusLabel::ExpiringSoon);

        let thirty_one = cert_expiring_in(Duration::days(31));
        assert_eq!(analyzer.status_at(&thirty_one, at), StatusLabel::Valid);

        let zero = cert_expiring_in(Duration::zero());
        assert_eq!(analyzer.days_remaining_at(&zero, at), 0);
        assert_eq!(analyzer.status_at(&zero, at), StatusLabel::Expired);
    }

    #[test]
    fn test_days_remaining_rounds_up() {
        let analyzer = CertificateAnalyzer::default();
        let at = now();
        assert_eq!(analyzer.days_remaining_at(&cert_expiring_in(Duration::hours(1)), at), 1);
        assert_eq!(analyzer.days_remaining_at(&cert_expiring_in(Duration::hours(25)), at), 2);
        assert_eq!(analyzer.days_remaining_at(&cert_expiring_in(Duration::hours(-1)), at), 0);
        assert_eq!(analyzer.days_remaining_at(&cert_expiring_in(Duration::hours(-25)), at), -1);
    }

    #[test]
    fn test_custom_threshold() {
        let analyzer = CertificateAnalyzer::new(7);
        let at = now();
        assert_eq!(
            analyzer.status_at(&cert_expiring_in(Duration::days(10)), at),
            StatusLabel::Valid
        );
        assert!(analyzer.is_expiring_soon_at(&cert_expiring_in(Duration::days(7)), at));
    }

    #[test]
    fn test_baseline_scores_100() {
        let analyzer = CertificateAnalyzer::default();
        assert_eq!(analyzer.security_score_at(&baseline(), now()), 100);
    }

    #[test]
    fn test_single_weakness_penalties() {
        let analyzer = CertificateAnalyzer::default();
        let at = now();

        let mut sha1 = baseline();
        sha1.details.signature_algorithm = Some("SHA1withRSA".to_string());
        assert_eq!(analyzer.security_score_at(&sha1, at), 70);

        let mut small_key = baseline();
        small_key.details.public_key.as_mut().unwrap().bits = Some(1024);
        assert_eq!(analyzer.security_score_at(&small_key, at), 70);

        let mut wildcard = baseline();
        wildcard.domains.push("*.example.com".to_string());
        assert_eq!(analyzer.security_score_at(&wildcard, at), 90);

        assert_eq!(analyzer.security_score_at(&cert_expiring_in(Duration::days(10)), at), 80);
        assert_eq!(analyzer.security_score_at(&cert_expiring_in(Duration::days(-1)), at), 40);
    }

    #[test]
    fn test_absent_fields_are_penalized() {
        let analyzer = CertificateAnalyzer::default();
        let mut cert = baseline();
        cert.details.signature_algorithm = None;
        cert.details.public_key = None;
        assert_eq!(analyzer.security_score_at(&cert, now()), 40);
    }

    #[test]
    fn test_algorithm_check_is_case_sensitive() {
        let analyzer = CertificateAnalyzer::default();
        let mut cert = baseline();
        cert.details.signature_algorithm = Some("sha1WithRSAEncryption".to_string());
        assert_eq!(analyzer.security_score_at(&cert, now()), 100);

        cert.details.signature_algorithm = Some("MD5withRSA".to_string());
        assert_eq!(analyzer.security_score_at(&cert, now()), 70);
    }

    #[test]
    fn test_score_clamps_at_zero() {
        let analyzer = CertificateAnalyzer::default();
        let mut cert = cert_expiring_in(Duration::days(-5));
        cert.details.signature_algorithm = Some("MD5withRSA".to_string());
        cert.details.public_key = None;
        cert.domains = vec!["*.example.com".to_string()];
        assert_eq!(analyzer.security_score_at(&cert, now()), 0);
    }

    #[test]
    fn test_assessment_rows() {
        let analyzer = CertificateAnalyzer::default();
        let mut cert = baseline();
        cert.domains.push("*.example.com".to_string());

        let assessment = analyzer.assess_at(&cert, now());
        assert_eq!(assessment.score, 90);
        assert_eq!(assessment.rating, ScoreRating::Good);
        assert_eq!(assessment.status, StatusLabel::Valid);
        assert_eq!(assessment.days_remaining, 90);
        assert_eq!(assessment.checks.len(), 4);

        let failed: Vec<&str> = assessment
            .checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(failed, vec!["Specific Domain"]);
    }

    #[test]
    fn test_rating_bands() {
        assert_eq!(ScoreRating::from_score(100), ScoreRating::Good);
        assert_eq!(ScoreRating::from_score(80), ScoreRating::Good);
        assert_eq!(ScoreRating::from_score(79), ScoreRating::Fair);
        assert_eq!(ScoreRating::from_score(60), ScoreRating::Fair);
        assert_eq!(ScoreRating::from_score(59), ScoreRating::Poor);
    }
}
