//! Hostname clean-up and the subdomain lookup stub

use serde::Serialize;

/// Second-level suffixes under which a registrable domain has three labels
const MULTI_LABEL_SUFFIXES: &[&str] = &["co.uk", "com.au", "co.nz", "co.za", "org.uk", "net.au"];

/// Reduce user input such as `https://Example.COM:8443/path` to a bare
/// lower-case hostname (`example.com`).
pub fn normalize_hostname(input: &str) -> String {
    let mut host = input.trim();

    if let Some(idx) = host.find("://") {
        host = &host[idx + 3..];
    }

    let host = host
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();

    // Bracketed IPv6 literals keep their colons
    let host = if let Some(rest) = host.strip_prefix('[') {
        rest.split(']').next().unwrap_or_default()
    } else {
        host.split(':').next().unwrap_or_default()
    };

    host.trim_end_matches('.').to_lowercase()
}

/// Extract the registrable base domain, e.g. `www.api.example.co.uk` ->
/// `example.co.uk`.
pub fn extract_base_domain(hostname: &str) -> String {
    let mut domain = hostname.trim();
    for scheme in ["https://", "http://"] {
        if domain
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
        {
            domain = &domain[scheme.len()..];
            break;
        }
    }
    if domain
        .get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("www."))
    {
        domain = &domain[4..];
    }
    let domain = domain.split(':').next().unwrap_or_default();

    let parts: Vec<&str> = domain.split('.').collect();
    if parts.len() <= 2 {
        return domain.to_string();
    }

    let suffix = parts[parts.len() - 2..].join(".");
    let keep = if MULTI_LABEL_SUFFIXES.contains(&suffix.as_str()) {
        3
    } else {
        2
    };

    parts[parts.len() - keep..].join(".")
}

/// Result of a subdomain lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubdomainReport {
    pub base_domain: String,
    pub subdomains: Vec<String>,
}

/// Subdomain discovery. Certificate transparency logs are not queried, so
/// the list is always empty.
pub fn lookup_subdomains(hostname: &str) -> SubdomainReport {
    SubdomainReport {
        base_domain: extract_base_domain(hostname),
        subdomains: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_hostname() {
        assert_eq!(normalize_hostname("https://Example.COM/"), "example.com");
        assert_eq!(normalize_hostname("  example.com.  "), "example.com");
        assert_eq!(normalize_hostname("example.com:8443"), "example.com");
        assert_eq!(
            normalize_hostname("http://www.example.com/path?q=1"),
            "www.example.com"
        );
        assert_eq!(normalize_hostname("[::1]:443"), "::1");
        assert_eq!(normalize_hostname(""), "");
    }

    #[test]
    fn test_extract_base_domain() {
        assert_eq!(extract_base_domain("example.com"), "example.com");
        assert_eq!(extract_base_domain("www.example.com"), "example.com");
        assert_eq!(extract_base_domain("a.b.example.com"), "example.com");
        assert_eq!(
            extract_base_domain("https://www.shop.example.co.uk:443"),
            "example.co.uk"
        );
        assert_eq!(extract_base_domain("api.example.com.au"), "example.com.au");
        assert_eq!(extract_base_domain("localhost"), "localhost");
    }

    #[test]
    fn test_lookup_subdomains_is_empty() {
        let report = lookup_subdomains("mail.example.org");
        assert_eq!(report.base_domain, "example.org");
        assert!(report.subdomains.is_empty());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["baseDomain"], "example.org");
        assert_eq!(json["subdomains"], serde_json::json!([]));
    }
}
