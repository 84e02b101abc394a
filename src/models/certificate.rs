//! Normalized certificate record
//!
//! The shape handed from the fetcher to every consumer. It is plain data:
//! fully serializable, free of cycles, never mutated after creation.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Value of one DN attribute. Repeated attributes (several `OU`s, say)
/// keep every value in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DnValue {
    Single(String),
    Multiple(Vec<String>),
}

impl DnValue {
    /// The first value of the attribute
    pub fn first(&self) -> Option<&str> {
        match self {
            DnValue::Single(value) => Some(value),
            DnValue::Multiple(values) => values.first().map(String::as_str),
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            DnValue::Single(value) => vec![value.as_str()],
            DnValue::Multiple(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for DnValue {
    fn from(value: &str) -> Self {
        DnValue::Single(value.to_string())
    }
}

impl From<String> for DnValue {
    fn from(value: String) -> Self {
        DnValue::Single(value)
    }
}

impl From<Vec<String>> for DnValue {
    fn from(mut values: Vec<String>) -> Self {
        if values.len() == 1 {
            DnValue::Single(values.remove(0))
        } else {
            DnValue::Multiple(values)
        }
    }
}

/// Repeated values are joined with `,`
impl fmt::Display for DnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.values().join(","))
    }
}

/// Distinguished Name components, keyed by attribute short name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistinguishedName {
    #[serde(rename = "C", default, skip_serializing_if = "Option::is_none")]
    pub country: Option<DnValue>,
    #[serde(rename = "ST", default, skip_serializing_if = "Option::is_none")]
    pub state: Option<DnValue>,
    #[serde(rename = "L", default, skip_serializing_if = "Option::is_none")]
    pub locality: Option<DnValue>,
    #[serde(rename = "O", default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<DnValue>,
    #[serde(rename = "OU", default, skip_serializing_if = "Option::is_none")]
    pub organizational_unit: Option<DnValue>,
    #[serde(rename = "CN", default, skip_serializing_if = "Option::is_none")]
    pub common_name: Option<DnValue>,
    /// Any other attribute (emailAddress, serialNumber, ...)
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl DistinguishedName {
    /// Short issuer label: `CN=…, O=…, OU=…` with absent parts left out
    pub fn issuer_label(&self) -> String {
        join_parts(&[
            ("CN", &self.common_name),
            ("O", &self.organization),
            ("OU", &self.organizational_unit),
        ])
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = join_parts(&[
            ("CN", &self.common_name),
            ("O", &self.organization),
            ("OU", &self.organizational_unit),
            ("L", &self.locality),
            ("ST", &self.state),
            ("C", &self.country),
        ]);
        f.write_str(&label)
    }
}

fn join_parts(parts: &[(&str, &Option<DnValue>)]) -> String {
    parts
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_ref()
                .map(DnValue::to_string)
                .filter(|v| !v.is_empty())
                .map(|v| format!("{}={}", key, v))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Typed fields accept whatever the raw copy produced. A value of the wrong
/// shape, such as a cycle placeholder, reads as the field's default.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Public key description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicKeyInfo {
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub algorithm: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub bits: Option<u32>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Flat projection of the immediate issuer certificate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssuerSummary {
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub subject: Option<DistinguishedName>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub issuer: Option<DistinguishedName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// Sanitized raw certificate: the commonly used fields are typed, the long
/// tail stays in `extensions`. Treat every optional field as possibly absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CertificateDetails {
    #[serde(default, deserialize_with = "lenient")]
    pub subject: DistinguishedName,
    #[serde(default, deserialize_with = "lenient")]
    pub issuer: DistinguishedName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subjectaltname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint256: Option<String>,
    #[serde(
        rename = "serialNumber",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub serial_number: Option<String>,
    #[serde(
        rename = "signatureAlgorithm",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub signature_algorithm: Option<String>,
    #[serde(
        rename = "publicKey",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub public_key: Option<PublicKeyInfo>,
    #[serde(
        rename = "issuerSummary",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub issuer_summary: Option<IssuerSummary>,
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl CertificateDetails {
    /// Public key size in bits, if known
    pub fn key_bits(&self) -> Option<u32> {
        self.public_key.as_ref().and_then(|pk| pk.bits)
    }

    /// Look up an entry of the open extension map
    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.extensions.get(key)
    }
}

/// A live certificate, normalized for display and export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedCertificate {
    /// Subject CN followed by the SAN DNS names, deduplicated
    pub domains: Vec<String>,
    /// Issuer label (`CN=…, O=…, OU=…`)
    pub issuer: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub details: CertificateDetails,
    /// When this record was produced
    pub retrieved_at: DateTime<Utc>,
}

impl NormalizedCertificate {
    /// The first listed domain, used as the record's key
    pub fn primary_domain(&self) -> Option<&str> {
        self.domains.first().map(String::as_str)
    }

    /// True when any domain is a wildcard name
    pub fn has_wildcard(&self) -> bool {
        self.domains.iter().any(|d| d.contains('*'))
    }

    /// Total validity period in whole days
    pub fn validity_period_days(&self) -> i64 {
        (self.not_after - self.not_before).num_days()
    }

    /// Default file name for a JSON export of this record
    pub fn export_file_name(&self) -> String {
        match self.primary_domain() {
            Some(domain) => format!("{}-certificate.json", domain.replace('*', "_")),
            None => "certificate.json".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dn(cn: Option<&str>, o: Option<&str>, ou: Option<&str>) -> DistinguishedName {
        DistinguishedName {
            common_name: cn.map(DnValue::from),
            organization: o.map(DnValue::from),
            organizational_unit: ou.map(DnValue::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_issuer_label_order_and_omission() {
        assert_eq!(
            dn(Some("R3"), Some("Let's Encrypt"), None).issuer_label(),
            "CN=R3, O=Let's Encrypt"
        );
        assert_eq!(dn(None, Some("Org"), Some("Unit")).issuer_label(), "O=Org, OU=Unit");
        assert_eq!(dn(None, None, None).issuer_label(), "");
    }

    #[test]
    fn test_issuer_label_ignores_locality() {
        let mut name = dn(Some("CA"), None, None);
        name.locality = Some(DnValue::from("Paris"));
        name.country = Some(DnValue::from("FR"));
        assert_eq!(name.issuer_label(), "CN=CA");
        assert_eq!(name.to_string(), "CN=CA, L=Paris, C=FR");
    }

    #[test]
    fn test_distinguished_name_keys() {
        let json = serde_json::json!({"CN": "a.com", "O": "Org", "emailAddress": "x@a.com"});
        let name: DistinguishedName = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(name.common_name, Some(DnValue::from("a.com")));
        assert_eq!(name.other.get("emailAddress"), Some(&Value::from("x@a.com")));
        assert_eq!(serde_json::to_value(&name).unwrap(), json);
    }

    #[test]
    fn test_repeated_attribute_keeps_every_value() {
        let json = serde_json::json!({
            "CN": "multi.test",
            "O": "Org",
            "OU": ["First Unit", "Second Unit"]
        });
        let name: DistinguishedName = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(
            name.organizational_unit.as_ref().map(DnValue::values),
            Some(vec!["First Unit", "Second Unit"])
        );
        assert_eq!(
            name.issuer_label(),
            "CN=multi.test, O=Org, OU=First Unit,Second Unit"
        );
        assert_eq!(serde_json::to_value(&name).unwrap(), json);
    }

    #[test]
    fn test_misshapen_typed_fields_fall_back() {
        let json = serde_json::json!({
            "subject": {"CN": "a.com"},
            "issuer": "[Circular Reference]",
            "publicKey": "[Circular Reference]",
            "issuerSummary": {"subject": 7, "fingerprint": "AA"}
        });
        let details: CertificateDetails = serde_json::from_value(json).unwrap();
        assert_eq!(details.subject.common_name, Some(DnValue::from("a.com")));
        assert_eq!(details.issuer, DistinguishedName::default());
        assert!(details.public_key.is_none());
        let summary = details.issuer_summary.unwrap();
        assert!(summary.subject.is_none());
        assert_eq!(summary.fingerprint.as_deref(), Some("AA"));
    }

    #[test]
    fn test_details_keep_unknown_fields() {
        let json = serde_json::json!({
            "subject": {"CN": "a.com"},
            "issuer": {"CN": "CA"},
            "signatureAlgorithm": "SHA256withRSA",
            "publicKey": {"algorithm": "RSA", "bits": 2048},
            "ext_key_usage": ["1.3.6.1.5.5.7.3.1"],
            "ca": false
        });
        let details: CertificateDetails = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(details.key_bits(), Some(2048));
        assert_eq!(details.signature_algorithm.as_deref(), Some("SHA256withRSA"));
        assert_eq!(details.extension("ca"), Some(&Value::Bool(false)));
        assert_eq!(serde_json::to_value(&details).unwrap(), json);
    }

    #[test]
    fn test_export_file_name() {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut cert = NormalizedCertificate {
            domains: vec!["*.example.com".to_string()],
            issuer: String::new(),
            not_before: at,
            not_after: at,
            details: CertificateDetails::default(),
            retrieved_at: at,
        };
        assert_eq!(cert.export_file_name(), "_.example.com-certificate.json");
        assert!(cert.has_wildcard());

        cert.domains.clear();
        assert_eq!(cert.export_file_name(), "certificate.json");
        assert_eq!(cert.primary_domain(), None);
    }
}
