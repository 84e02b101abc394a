//! Recently fetched certificates
//!
//! Front-ends record every successful fetch here. Entries are keyed by the
//! certificate's primary domain and capped at a fixed number of records.

use crate::models::NormalizedCertificate;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;
pub const DEFAULT_RECENT_COUNT: usize = 5;

/// A stored record together with its key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub domain: String,
    pub certificate: NormalizedCertificate,
}

/// Storage backend for [`History`]
pub trait HistoryStore: Send {
    fn get(&self, key: &str) -> Option<NormalizedCertificate>;
    /// Insert or replace the record under `key`
    fn set(&mut self, key: &str, certificate: NormalizedCertificate);
    fn remove(&mut self, key: &str) -> Option<NormalizedCertificate>;
    /// Every stored key with the retrieval time of its record, in no
    /// particular order
    fn stamps(&self) -> Vec<(String, DateTime<Utc>)>;
    fn len(&self) -> usize;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    entries: HashMap<String, NormalizedCertificate>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn get(&self, key: &str) -> Option<NormalizedCertificate> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, certificate: NormalizedCertificate) {
        self.entries.insert(key.to_string(), certificate);
    }

    fn remove(&mut self, key: &str) -> Option<NormalizedCertificate> {
        self.entries.remove(key)
    }

    fn stamps(&self) -> Vec<(String, DateTime<Utc>)> {
        self.entries
            .iter()
            .map(|(domain, certificate)| (domain.clone(), certificate.retrieved_at))
            .collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Bounded, most-recent-first certificate history
#[derive(Debug)]
pub struct History<S: HistoryStore> {
    store: S,
    limit: usize,
}

impl Default for History<MemoryHistoryStore> {
    fn default() -> Self {
        Self::new(MemoryHistoryStore::new(), DEFAULT_HISTORY_LIMIT)
    }
}

impl<S: HistoryStore> History<S> {
    pub fn new(store: S, limit: usize) -> Self {
        Self {
            store,
            limit: limit.max(1),
        }
    }

    /// Key a record is stored under: its first domain, or the host that
    /// was asked for when the certificate names no domain
    pub fn key_for(requested_host: &str, certificate: &NormalizedCertificate) -> String {
        certificate
            .primary_domain()
            .unwrap_or(requested_host)
            .to_string()
    }

    /// Store `certificate`, replacing any earlier record with the same key,
    /// then drop the oldest records beyond the limit
    pub fn record(&mut self, requested_host: &str, certificate: NormalizedCertificate) {
        let key = Self::key_for(requested_host, &certificate);
        tracing::debug!("Recording {} in history", key);
        self.store.set(&key, certificate);

        if self.store.len() <= self.limit {
            return;
        }
        for stale in self.keys_newest_first().into_iter().skip(self.limit) {
            tracing::debug!("Dropping {} from history", stale);
            self.store.remove(&stale);
        }
    }

    pub fn get(&self, key: &str) -> Option<NormalizedCertificate> {
        self.store.get(key)
    }

    /// Up to `count` entries, most recently retrieved first
    pub fn recent(&self, count: usize) -> Vec<HistoryEntry> {
        self.keys_newest_first()
            .into_iter()
            .take(count)
            .filter_map(|domain| {
                let certificate = self.store.get(&domain)?;
                Some(HistoryEntry {
                    domain,
                    certificate,
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn keys_newest_first(&self) -> Vec<String> {
        let mut stamps = self.store.stamps();
        stamps.sort_by(|(a_key, a_at), (b_key, b_at)| {
            b_at.cmp(a_at).then_with(|| a_key.cmp(b_key))
        });
        stamps.into_iter().map(|(key, _)| key).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CertificateDetails;
    use chrono::{Duration, TimeZone, Utc};

    fn cert(domain: Option<&str>, minutes: i64) -> NormalizedCertificate {
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        NormalizedCertificate {
            domains: domain.map(|d| vec![d.to_string()]).unwrap_or_default(),
            issuer: "CN=CA".to_string(),
            not_before: base,
            not_after: base + Duration::days(90),
            details: CertificateDetails::default(),
            retrieved_at: base + Duration::minutes(minutes),
        }
    }

    fn domains(entries: &[HistoryEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.domain.as_str()).collect()
    }

    #[test]
    fn test_recent_is_newest_first() {
        let mut history: History<MemoryHistoryStore> = History::default();
        history.record("a.com", cert(Some("a.com"), 1));
        history.record("b.com", cert(Some("b.com"), 3));
        history.record("c.com", cert(Some("c.com"), 2));

        assert_eq!(domains(&history.recent(5)), vec!["b.com", "c.com", "a.com"]);
        assert_eq!(domains(&history.recent(1)), vec!["b.com"]);
    }

    #[test]
    fn test_same_domain_replaces() {
        let mut history: History<MemoryHistoryStore> = History::default();
        history.record("a.com", cert(Some("a.com"), 1));
        history.record("b.com", cert(Some("b.com"), 2));
        history.record("a.com", cert(Some("a.com"), 3));

        assert_eq!(history.len(), 2);
        assert_eq!(domains(&history.recent(5)), vec!["a.com", "b.com"]);
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = History::new(MemoryHistoryStore::new(), 3);
        for i in 0..5 {
            let domain = format!("site{}.com", i);
            history.record(&domain, cert(Some(&domain), i));
        }

        assert_eq!(history.len(), 3);
        assert_eq!(
            domains(&history.recent(10)),
            vec!["site4.com", "site3.com", "site2.com"]
        );
        assert!(history.get("site0.com").is_none());
    }

    #[test]
    fn test_default_limit() {
        let mut history: History<MemoryHistoryStore> = History::default();
        for i in 0..60 {
            let domain = format!("site{}.com", i);
            history.record(&domain, cert(Some(&domain), i));
        }
        assert_eq!(history.len(), DEFAULT_HISTORY_LIMIT);
    }

    /// Memory store that counts how many full records were read back
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryHistoryStore,
        reads: std::cell::Cell<usize>,
    }

    impl HistoryStore for CountingStore {
        fn get(&self, key: &str) -> Option<NormalizedCertificate> {
            self.reads.set(self.reads.get() + 1);
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, certificate: NormalizedCertificate) {
            self.inner.set(key, certificate)
        }

        fn remove(&mut self, key: &str) -> Option<NormalizedCertificate> {
            self.inner.remove(key)
        }

        fn stamps(&self) -> Vec<(String, DateTime<Utc>)> {
            self.inner.stamps()
        }

        fn len(&self) -> usize {
            self.inner.len()
        }
    }

    #[test]
    fn test_bookkeeping_reads_no_records() {
        let mut history = History::new(CountingStore::default(), 2);
        for i in 0..4 {
            let domain = format!("site{}.com", i);
            history.record(&domain, cert(Some(&domain), i));
        }
        assert_eq!(history.len(), 2);
        assert_eq!(history.store.reads.get(), 0);

        assert_eq!(domains(&history.recent(1)), vec!["site3.com"]);
        assert_eq!(history.store.reads.get(), 1);
    }

    #[test]
    fn test_empty_domains_use_requested_host() {
        let mut history: History<MemoryHistoryStore> = History::default();
        history.record("10.0.0.1", cert(None, 1));
        assert!(history.get("10.0.0.1").is_some());
    }
}
