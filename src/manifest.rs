use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("document has no kind field")]
    MissingKind,

    #[error("unsupported resource kind: {0}")]
    UnsupportedKind(String),

    #[error("document has no metadata.name")]
    MissingName,

    #[error("malformed document: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Deployment,
    Service,
}

impl ResourceKind {
    fn from_kind_field(kind: &str) -> Option<ResourceKind> {
        match kind {
            "Deployment" => Some(ResourceKind::Deployment),
            "Service" => Some(ResourceKind::Service),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Deployment => write!(f, "Deployment"),
            ResourceKind::Service => write!(f, "Service"),
        }
    }
}

/// One declared unit of desired state. Immutable once parsed; the manifest
/// payload is forwarded verbatim to the cluster on create.
#[derive(Debug, Clone)]
pub struct ResourceDocument {
    kind: ResourceKind,
    namespace: String,
    name: String,
    manifest: Value,
}

impl ResourceDocument {
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn manifest(&self) -> &Value {
        &self.manifest
    }

    /// Declared replica count, when the document states one.
    pub fn replicas(&self) -> Option<i32> {
        self.manifest
            .get("spec")
            .and_then(|spec| spec.get("replicas"))
            .and_then(Value::as_i64)
            .map(|n| n as i32)
    }
}

/// Outcome of parsing one document of the stream. Empty documents are
/// dropped rather than treated as errors; a rejected document does not
/// abort the rest of the stream.
#[derive(Debug)]
pub enum DocEntry {
    Resource(ResourceDocument),
    Empty,
    Rejected(ParseError),
}

/// The full ordered batch from one manifest invocation.
#[derive(Debug)]
pub struct DesiredState {
    pub docs: Vec<DocEntry>,
}

impl DesiredState {
    pub fn resources(&self) -> impl Iterator<Item = &ResourceDocument> {
        self.docs.iter().filter_map(|entry| match entry {
            DocEntry::Resource(doc) => Some(doc),
            _ => None,
        })
    }
}

/// Parses a multi-document YAML stream into a batch of declared resources.
/// Pure transformation; documents that fail validation are recorded
/// individually and never stop the remaining documents.
pub fn parse_manifest(input: &str, default_namespace: &str) -> DesiredState {
    let mut docs = Vec::new();
    for document in serde_yaml::Deserializer::from_str(input) {
        let entry = match serde_yaml::Value::deserialize(document) {
            Ok(value) => parse_document(value, default_namespace),
            Err(err) => DocEntry::Rejected(ParseError::Malformed(err.to_string())),
        };
        docs.push(entry);
    }
    DesiredState { docs }
}

fn parse_document(value: serde_yaml::Value, default_namespace: &str) -> DocEntry {
    if value.is_null() {
        return DocEntry::Empty;
    }
    let manifest: Value = match serde_json::to_value(&value) {
        Ok(manifest) => manifest,
        Err(err) => return DocEntry::Rejected(ParseError::Malformed(err.to_string())),
    };

    let kind_field = match manifest.get("kind").and_then(Value::as_str) {
        Some(kind) if !kind.is_empty() => kind,
        _ => return DocEntry::Rejected(ParseError::MissingKind),
    };
    let kind = match ResourceKind::from_kind_field(kind_field) {
        Some(kind) => kind,
        None => return DocEntry::Rejected(ParseError::UnsupportedKind(kind_field.to_string())),
    };

    let metadata = manifest.get("metadata");
    let name = match metadata.and_then(|m| m.get("name")).and_then(Value::as_str) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => return DocEntry::Rejected(ParseError::MissingName),
    };
    let namespace = metadata
        .and_then(|m| m.get("namespace"))
        .and_then(Value::as_str)
        .unwrap_or(default_namespace)
        .to_string();

    DocEntry::Resource(ResourceDocument {
        kind,
        namespace,
        name,
        manifest,
    })
}
