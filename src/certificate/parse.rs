//! DER chain to raw certificate graph
//!
//! Parses each presented certificate with x509-parser and lays it out as a
//! raw object with the field names the rest of the pipeline expects
//! (`subject`, `issuer`, `subjectaltname`, `valid_from`, `valid_to`,
//! `fingerprint`, `serialNumber`, ...), linking every certificate to the
//! next one in the chain through `issuerCertificate`.

use crate::certificate::raw::{NodeId, RawCertificate, RawValue, ISSUER_LINK};
use crate::utils::FetchError;
use chrono::{TimeZone, Utc};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use x509_parser::prelude::*;
use x509_parser::public_key::PublicKey;

/// Build the raw graph for a peer chain, leaf first.
///
/// An empty chain, or an empty leaf, means the server presented nothing.
/// A leaf that cannot be parsed is a normalization failure; an unparsable
/// intermediate only cuts the chain short.
pub fn build_raw_chain(chain: &[Vec<u8>]) -> Result<RawCertificate, FetchError> {
    let leaf = match chain.first() {
        Some(der) if !der.is_empty() => der,
        _ => return Err(FetchError::NoCertificate),
    };

    let mut raw = RawCertificate::new();
    let (leaf_id, leaf_self_signed) = add_certificate(&mut raw, leaf)?;
    raw.set_root(leaf_id);

    let mut previous = (leaf_id, leaf_self_signed);
    for (index, der) in chain.iter().enumerate().skip(1) {
        match add_certificate(&mut raw, der) {
            Ok(current) => {
                raw.set(previous.0, ISSUER_LINK, RawValue::Node(current.0));
                previous = current;
            }
            Err(e) => {
                tracing::warn!("Skipping rest of chain at certificate {}: {}", index, e);
                break;
            }
        }
    }

    // A self-signed certificate is its own issuer
    let (last_id, last_self_signed) = previous;
    if last_self_signed {
        raw.set(last_id, ISSUER_LINK, RawValue::Node(last_id));
    }

    Ok(raw)
}

/// Parse one DER certificate into a new object node.
/// Returns the node id and whether the certificate is self-signed.
fn add_certificate(raw: &mut RawCertificate, der: &[u8]) -> Result<(NodeId, bool), FetchError> {
    let (_, cert) = X509Certificate::from_der(der)
        .map_err(|e| FetchError::normalization(format!("Failed to parse certificate: {}", e)))?;

    let node = raw.add_object();

    let subject = add_distinguished_name(raw, cert.subject());
    raw.set(node, "subject", RawValue::Node(subject));
    let issuer = add_distinguished_name(raw, cert.issuer());
    raw.set(node, "issuer", RawValue::Node(issuer));

    if let Some(san) = format_subject_alt_names(&cert) {
        raw.set(node, "subjectaltname", san);
    }
    if let Some(info_access) = extract_info_access(raw, &cert) {
        raw.set(node, "infoAccess", RawValue::Node(info_access));
    }

    raw.set(node, "valid_from", asn1_time_value(cert.validity().not_before));
    raw.set(node, "valid_to", asn1_time_value(cert.validity().not_after));

    raw.set(node, "fingerprint", colon_hex(&Sha1::digest(der)));
    raw.set(node, "fingerprint256", colon_hex(&Sha256::digest(der)));
    raw.set(node, "serialNumber", hex::encode_upper(cert.raw_serial()));
    raw.set(node, "version", i64::from(cert.version().0) + 1);
    raw.set(node, "ca", cert.is_ca());

    raw.set(
        node,
        "signatureAlgorithm",
        oid_to_signature_name(&cert.signature_algorithm.algorithm.to_id_string()),
    );

    add_public_key(raw, node, &cert);

    let usages = extract_ext_key_usage(&cert);
    if !usages.is_empty() {
        let items = usages.into_iter().map(RawValue::Text).collect();
        let list = raw.add_array(items);
        raw.set(node, "ext_key_usage", RawValue::Node(list));
    }

    raw.set(node, "raw", RawValue::Bytes(der.to_vec()));

    Ok((node, cert.subject() == cert.issuer()))
}

/// Attributes are keyed by short name. A repeated attribute becomes an
/// array of its values in the order they appear.
fn add_distinguished_name(raw: &mut RawCertificate, name: &X509Name) -> NodeId {
    let mut attributes: Vec<(String, Vec<String>)> = Vec::new();

    for rdn in name.iter() {
        for attr in rdn.iter() {
            let Ok(value) = attr.as_str() else {
                continue;
            };
            let oid = attr.attr_type().to_id_string();
            let key = match oid.as_str() {
                "2.5.4.3" => "CN",
                "2.5.4.10" => "O",
                "2.5.4.11" => "OU",
                "2.5.4.6" => "C",
                "2.5.4.8" => "ST",
                "2.5.4.7" => "L",
                "2.5.4.5" => "serialNumber",
                "1.2.840.113549.1.9.1" => "emailAddress",
                other => other,
            };
            match attributes.iter_mut().find(|(k, _)| k == key) {
                Some((_, values)) => values.push(value.to_string()),
                None => attributes.push((key.to_string(), vec![value.to_string()])),
            }
        }
    }

    let node = raw.add_object();
    for (key, mut values) in attributes {
        if values.len() == 1 {
            raw.set(node, &key, values.remove(0));
        } else {
            let list = raw.add_array(values.into_iter().map(RawValue::Text).collect());
            raw.set(node, &key, RawValue::Node(list));
        }
    }

    node
}

/// Render the SAN extension as `DNS:a, DNS:b, IP Address:1.2.3.4`
fn format_subject_alt_names(cert: &X509Certificate) -> Option<String> {
    let san = cert.subject_alternative_name().ok().flatten()?;

    let entries: Vec<String> = san
        .value
        .general_names
        .iter()
        .filter_map(|name| match name {
            GeneralName::DNSName(dns) => Some(format!("DNS:{}", dns)),
            GeneralName::IPAddress(ip) => format_ip(ip).map(|ip| format!("IP Address:{}", ip)),
            GeneralName::RFC822Name(email) => Some(format!("email:{}", email)),
            GeneralName::URI(uri) => Some(format!("URI:{}", uri)),
            _ => None,
        })
        .collect();

    if entries.is_empty() {
        None
    } else {
        Some(entries.join(", "))
    }
}

fn format_ip(bytes: &[u8]) -> Option<String> {
    match bytes.len() {
        4 => Some(format!("{}.{}.{}.{}", bytes[0], bytes[1], bytes[2], bytes[3])),
        16 => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(bytes);
            Some(std::net::Ipv6Addr::from(octets).to_string())
        }
        _ => None,
    }
}

/// Authority Information Access as `{ "OCSP - URI": [...], "CA Issuers - URI": [...] }`
fn extract_info_access(raw: &mut RawCertificate, cert: &X509Certificate) -> Option<NodeId> {
    let mut ocsp = Vec::new();
    let mut ca_issuers = Vec::new();

    for ext in cert.extensions() {
        if let ParsedExtension::AuthorityInfoAccess(aia) = ext.parsed_extension() {
            for desc in &aia.accessdescs {
                let GeneralName::URI(uri) = &desc.access_location else {
                    continue;
                };
                match desc.access_method.to_id_string().as_str() {
                    "1.3.6.1.5.5.7.48.1" => ocsp.push(RawValue::from(*uri)),
                    "1.3.6.1.5.5.7.48.2" => ca_issuers.push(RawValue::from(*uri)),
                    _ => {}
                }
            }
        }
    }

    if ocsp.is_empty() && ca_issuers.is_empty() {
        return None;
    }

    let node = raw.add_object();
    if !ocsp.is_empty() {
        let list = raw.add_array(ocsp);
        raw.set(node, "OCSP - URI", RawValue::Node(list));
    }
    if !ca_issuers.is_empty() {
        let list = raw.add_array(ca_issuers);
        raw.set(node, "CA Issuers - URI", RawValue::Node(list));
    }
    Some(node)
}

fn extract_ext_key_usage(cert: &X509Certificate) -> Vec<String> {
    let mut oids = Vec::new();

    if let Ok(Some(eku)) = cert.extended_key_usage() {
        let eku = eku.value;
        let flags = [
            (eku.any, "2.5.29.37.0"),
            (eku.server_auth, "1.3.6.1.5.5.7.3.1"),
            (eku.client_auth, "1.3.6.1.5.5.7.3.2"),
            (eku.code_signing, "1.3.6.1.5.5.7.3.3"),
            (eku.email_protection, "1.3.6.1.5.5.7.3.4"),
            (eku.time_stamping, "1.3.6.1.5.5.7.3.8"),
            (eku.ocsp_signing, "1.3.6.1.5.5.7.3.9"),
        ];
        for (set, oid) in flags {
            if set {
                oids.push(oid.to_string());
            }
        }
        oids.extend(eku.other.iter().map(|oid| oid.to_id_string()));
    }

    oids
}

/// Adds `publicKey { algorithm, bits, curve? }` plus the RSA-only
/// `bits`, `modulus` and `exponent` fields.
fn add_public_key(raw: &mut RawCertificate, node: NodeId, cert: &X509Certificate) {
    let spki = cert.public_key();
    let alg_oid = spki.algorithm.algorithm.to_id_string();
    let key = raw.add_object();

    match spki.parsed() {
        Ok(PublicKey::RSA(rsa)) => {
            let modulus = trim_leading_zeros(rsa.modulus);
            let bits = modulus_bits(modulus);
            raw.set(key, "algorithm", "RSA");
            raw.set(key, "bits", i64::from(bits));
            raw.set(node, "bits", i64::from(bits));
            raw.set(node, "modulus", hex::encode_upper(modulus));
            if let Ok(exponent) = rsa.try_exponent() {
                raw.set(node, "exponent", format!("0x{:x}", exponent));
            }
        }
        _ if alg_oid == "1.2.840.10045.2.1" => {
            let curve_oid = spki
                .algorithm
                .parameters
                .as_ref()
                .and_then(|p| p.as_oid().ok())
                .map(|oid| oid.to_id_string());
            raw.set(key, "algorithm", "EC");
            if let Some((name, bits)) = curve_oid.as_deref().and_then(curve_info) {
                raw.set(key, "curve", name);
                raw.set(key, "bits", i64::from(bits));
            } else if let Some(oid) = curve_oid {
                raw.set(key, "curve", oid);
            }
        }
        _ if alg_oid == "1.3.101.112" => {
            raw.set(key, "algorithm", "Ed25519");
            raw.set(key, "bits", 256i64);
        }
        _ if alg_oid == "1.3.101.113" => {
            raw.set(key, "algorithm", "Ed448");
            raw.set(key, "bits", 456i64);
        }
        _ if alg_oid == "1.2.840.10040.4.1" => {
            raw.set(key, "algorithm", "DSA");
        }
        _ => {
            raw.set(key, "algorithm", alg_oid);
        }
    }

    raw.set(node, "publicKey", RawValue::Node(key));
}

fn curve_info(oid: &str) -> Option<(&'static str, u32)> {
    match oid {
        "1.2.840.10045.3.1.7" => Some(("P-256", 256)),
        "1.3.132.0.34" => Some(("P-384", 384)),
        "1.3.132.0.35" => Some(("P-521", 521)),
        "1.3.132.0.10" => Some(("secp256k1", 256)),
        _ => None,
    }
}

fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

fn modulus_bits(modulus: &[u8]) -> u32 {
    match modulus.first() {
        Some(first) => modulus.len() as u32 * 8 - first.leading_zeros(),
        None => 0,
    }
}

/// Convert signature algorithm OID to human-readable name
pub fn oid_to_signature_name(oid: &str) -> String {
    let name = match oid {
        "1.2.840.113549.1.1.4" => "MD5withRSA",
        "1.2.840.113549.1.1.5" => "SHA1withRSA",
        "1.2.840.113549.1.1.11" => "SHA256withRSA",
        "1.2.840.113549.1.1.12" => "SHA384withRSA",
        "1.2.840.113549.1.1.13" => "SHA512withRSA",
        "1.2.840.113549.1.1.10" => "RSA-PSS",
        "1.2.840.10045.4.1" => "ECDSA-SHA1",
        "1.2.840.10045.4.3.2" => "ECDSA-SHA256",
        "1.2.840.10045.4.3.3" => "ECDSA-SHA384",
        "1.2.840.10045.4.3.4" => "ECDSA-SHA512",
        "1.2.840.10040.4.3" => "DSA-SHA1",
        "1.3.101.112" => "Ed25519",
        "1.3.101.113" => "Ed448",
        _ => return oid.to_string(),
    };
    name.to_string()
}

fn asn1_time_value(time: ASN1Time) -> RawValue {
    match Utc.timestamp_opt(time.timestamp(), 0).single() {
        Some(dt) => RawValue::Date(dt),
        None => RawValue::Null,
    }
}

/// `AB:CD:…` upper-case hex, as fingerprints are usually shown
pub fn colon_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}
