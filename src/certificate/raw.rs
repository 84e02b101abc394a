//! Raw certificate object graph
//!
//! The transport layer describes a presented chain as a loosely typed bag of
//! fields per certificate, where every certificate links to its issuer
//! through an `issuerCertificate` field. A self-signed root links back to
//! itself, so the graph is cyclic. Nodes live in an arena and refer to each
//! other by [`NodeId`], which lets cycles exist without shared ownership.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Key under which a certificate object links to its issuer
pub const ISSUER_LINK: &str = "issuerCertificate";

/// Index of a node inside a [`RawCertificate`] arena
pub type NodeId = usize;

/// A value stored in a raw object field or array slot
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Date(DateTime<Utc>),
    Bytes(Vec<u8>),
    Node(NodeId),
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Bool(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Integer(value)
    }
}

impl From<DateTime<Utc>> for RawValue {
    fn from(value: DateTime<Utc>) -> Self {
        RawValue::Date(value)
    }
}

/// A composite node of the graph
#[derive(Debug, Clone, PartialEq)]
pub enum RawNode {
    Object(BTreeMap<String, RawValue>),
    Array(Vec<RawValue>),
}

/// Arena holding a leaf certificate and everything reachable from it
#[derive(Debug, Clone, Default)]
pub struct RawCertificate {
    nodes: Vec<RawNode>,
    root: Option<NodeId>,
}

impl RawCertificate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an empty object node
    pub fn add_object(&mut self) -> NodeId {
        self.nodes.push(RawNode::Object(BTreeMap::new()));
        self.nodes.len() - 1
    }

    /// Add an array node
    pub fn add_array(&mut self, items: Vec<RawValue>) -> NodeId {
        self.nodes.push(RawNode::Array(items));
        self.nodes.len() - 1
    }

    /// Add an object node whose fields are all text, skipping absent values
    pub fn add_text_object<'a, I>(&mut self, fields: I) -> NodeId
    where
        I: IntoIterator<Item = (&'a str, Option<String>)>,
    {
        let id = self.add_object();
        for (key, value) in fields {
            if let Some(value) = value {
                self.set(id, key, RawValue::Text(value));
            }
        }
        id
    }

    /// Set a field on an object node. Setting a field on an array node or a
    /// missing node is a no-op.
    pub fn set(&mut self, node: NodeId, key: &str, value: impl Into<RawValue>) {
        if let Some(RawNode::Object(fields)) = self.nodes.get_mut(node) {
            fields.insert(key.to_string(), value.into());
        }
    }

    /// Mark the node that represents the leaf certificate
    pub fn set_root(&mut self, node: NodeId) {
        self.root = Some(node);
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&RawNode> {
        self.nodes.get(id)
    }

    /// Fields of an object node
    pub fn object(&self, id: NodeId) -> Option<&BTreeMap<String, RawValue>> {
        match self.nodes.get(id) {
            Some(RawNode::Object(fields)) => Some(fields),
            _ => None,
        }
    }

    /// Look up a field of an object node
    pub fn field(&self, id: NodeId, key: &str) -> Option<&RawValue> {
        self.object(id).and_then(|fields| fields.get(key))
    }

    /// Look up a text field of an object node
    pub fn text(&self, id: NodeId, key: &str) -> Option<&str> {
        match self.field(id, key) {
            Some(RawValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Look up a nested object, e.g. `subject` on a certificate node
    pub fn child(&self, id: NodeId, key: &str) -> Option<NodeId> {
        match self.field(id, key) {
            Some(RawValue::Node(child)) => Some(*child),
            _ => None,
        }
    }

    /// True when the leaf is missing or carries no fields at all
    pub fn is_empty(&self) -> bool {
        match self.root.and_then(|root| self.object(root)) {
            Some(fields) => fields.is_empty(),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_link() {
        let mut raw = RawCertificate::new();
        let cert = raw.add_object();
        raw.set(cert, "serialNumber", "01");
        raw.set(cert, ISSUER_LINK, RawValue::Node(cert));
        raw.set_root(cert);

        assert_eq!(raw.child(cert, ISSUER_LINK), Some(cert));
        assert_eq!(raw.text(cert, "serialNumber"), Some("01"));
        assert!(!raw.is_empty());
    }

    #[test]
    fn test_empty_without_root() {
        let mut raw = RawCertificate::new();
        assert!(raw.is_empty());

        let cert = raw.add_object();
        raw.set_root(cert);
        assert!(raw.is_empty());
    }

    #[test]
    fn test_text_object_skips_absent() {
        let mut raw = RawCertificate::new();
        let dn = raw.add_text_object([("CN", Some("a.com".to_string())), ("O", None)]);
        assert_eq!(raw.text(dn, "CN"), Some("a.com"));
        assert!(raw.field(dn, "O").is_none());
    }

    #[test]
    fn test_set_on_array_is_noop() {
        let mut raw = RawCertificate::new();
        let arr = raw.add_array(vec![RawValue::Integer(1)]);
        raw.set(arr, "x", true);
        assert_eq!(raw.node(arr), Some(&RawNode::Array(vec![RawValue::Integer(1)])));
    }
}
