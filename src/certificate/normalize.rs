//! Raw certificate graph to [`NormalizedCertificate`]
//!
//! The copy into plain JSON replaces every `issuerCertificate` link with a
//! flat `issuerSummary`, and a seen-node guard stops any other cycle with a
//! `"[Circular Reference]"` placeholder.

use crate::certificate::raw::{NodeId, RawCertificate, RawNode, RawValue, ISSUER_LINK};
use crate::models::{CertificateDetails, NormalizedCertificate};
use crate::utils::FetchError;
use base64::Engine;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};
use std::collections::HashSet;

/// Emitted in place of a node met a second time during one copy
pub const CIRCULAR_PLACEHOLDER: &str = "[Circular Reference]";

/// Fields of the issuer certificate kept in `issuerSummary`
const SUMMARY_FIELDS: [&str; 5] = ["subject", "issuer", "valid_from", "valid_to", "fingerprint"];

/// Turn the raw graph of a leaf certificate into a normalized record
pub fn normalize(raw: &RawCertificate) -> Result<NormalizedCertificate, FetchError> {
    let root = match raw.root() {
        Some(root) if !raw.is_empty() => root,
        _ => return Err(FetchError::NoCertificate),
    };

    let common_name = raw
        .child(root, "subject")
        .and_then(|subject| first_text(raw, subject, "CN"));
    let domains = extract_domains(common_name, raw.text(root, "subjectaltname"));

    let not_before = raw_date(raw, root, "valid_from")?;
    let not_after = raw_date(raw, root, "valid_to")?;

    let details: CertificateDetails = serde_json::from_value(sanitize(raw, root))
        .map_err(|e| FetchError::normalization(format!("Unexpected certificate shape: {}", e)))?;

    Ok(NormalizedCertificate {
        domains,
        issuer: details.issuer.issuer_label(),
        not_before,
        not_after,
        details,
        retrieved_at: Utc::now(),
    })
}

/// Subject CN followed by every `DNS:` entry of the SAN string, trimmed,
/// deduplicated in order of first appearance, empty values dropped.
pub fn extract_domains(common_name: Option<&str>, subject_alt_names: Option<&str>) -> Vec<String> {
    let san_dns = subject_alt_names
        .into_iter()
        .flat_map(|san| san.split(','))
        .filter_map(|token| token.trim().strip_prefix("DNS:"));

    let mut seen = HashSet::new();
    common_name
        .into_iter()
        .chain(san_dns)
        .map(str::trim)
        .filter(|domain| !domain.is_empty())
        .filter(|domain| seen.insert(domain.to_string()))
        .map(String::from)
        .collect()
}

/// Copy the graph below `root` into a JSON value
pub fn sanitize(raw: &RawCertificate, root: NodeId) -> Value {
    let mut seen = HashSet::new();
    sanitize_node(raw, root, &mut seen)
}

fn sanitize_node(raw: &RawCertificate, id: NodeId, seen: &mut HashSet<NodeId>) -> Value {
    if !seen.insert(id) {
        return Value::String(CIRCULAR_PLACEHOLDER.to_string());
    }

    match raw.node(id) {
        None => Value::Null,
        Some(RawNode::Array(items)) => Value::Array(
            items
                .iter()
                .map(|item| sanitize_value(raw, item, seen))
                .collect(),
        ),
        Some(RawNode::Object(fields)) => {
            let mut out = Map::new();
            for (key, value) in fields {
                if key == ISSUER_LINK {
                    if let Some(summary) = summarize_issuer(raw, value) {
                        out.insert("issuerSummary".to_string(), summary);
                    }
                    continue;
                }
                out.insert(key.clone(), sanitize_value(raw, value, seen));
            }
            Value::Object(out)
        }
    }
}

fn sanitize_value(raw: &RawCertificate, value: &RawValue, seen: &mut HashSet<NodeId>) -> Value {
    match value {
        RawValue::Null => Value::Null,
        RawValue::Bool(b) => Value::Bool(*b),
        RawValue::Integer(i) => Value::from(*i),
        RawValue::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
        RawValue::Text(s) => Value::String(s.clone()),
        RawValue::Date(dt) => Value::String(iso_string(dt)),
        RawValue::Bytes(bytes) => {
            Value::String(base64::engine::general_purpose::STANDARD.encode(bytes))
        }
        RawValue::Node(id) => sanitize_node(raw, *id, seen),
    }
}

/// One level deep: only a handful of the issuer's fields, each copied with
/// its own guard so nodes already visited in the main copy still show up.
fn summarize_issuer(raw: &RawCertificate, link: &RawValue) -> Option<Value> {
    let RawValue::Node(issuer) = link else {
        return None;
    };
    raw.object(*issuer)?;

    let mut summary = Map::new();
    for key in SUMMARY_FIELDS {
        if let Some(value) = raw.field(*issuer, key) {
            let mut seen = HashSet::new();
            summary.insert(key.to_string(), sanitize_value(raw, value, &mut seen));
        }
    }
    Some(Value::Object(summary))
}

/// A text field, or the first entry when the attribute was repeated
fn first_text<'a>(raw: &'a RawCertificate, node: NodeId, key: &str) -> Option<&'a str> {
    match raw.field(node, key)? {
        RawValue::Text(text) => Some(text),
        RawValue::Node(list) => match raw.node(*list)? {
            RawNode::Array(items) => items.iter().find_map(|item| match item {
                RawValue::Text(text) => Some(text.as_str()),
                _ => None,
            }),
            RawNode::Object(_) => None,
        },
        _ => None,
    }
}

fn iso_string(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Read a validity timestamp, accepting dates as well as ISO-8601 or
/// `Jan  1 00:00:00 2025 GMT` style strings.
fn raw_date(raw: &RawCertificate, node: NodeId, key: &str) -> Result<DateTime<Utc>, FetchError> {
    let parsed = match raw.field(node, key) {
        Some(RawValue::Date(dt)) => Some(*dt),
        Some(RawValue::Text(text)) => parse_date_text(text),
        _ => None,
    };
    parsed.ok_or_else(|| FetchError::normalization(format!("Missing or invalid {}", key)))
}

fn parse_date_text(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    NaiveDateTime::parse_from_str(&collapsed, "%b %d %H:%M:%S %Y GMT")
        .ok()
        .map(|naive| naive.and_utc())
}
