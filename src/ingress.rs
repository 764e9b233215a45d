use crate::error::ManifestError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The parts of an ingress resource that annotation validation reads.
///
/// Decoding ignores every other field of the manifest (`spec`, `status`, ...).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressItem {
    #[serde(default)]
    pub metadata: ObjectMeta,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub name: String,
    /// A missing or `null` map means no annotations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
}

impl IngressItem {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        IngressItem {
            metadata: ObjectMeta {
                namespace: namespace.into(),
                name: name.into(),
                annotations: None,
            },
        }
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(key))
            .map(String::as_str)
    }

    pub fn from_json(input: &str) -> Result<Self, ManifestError> {
        serde_json::from_str(input).map_err(|e| ManifestError::Decode(e.to_string()))
    }

    pub fn from_yaml(input: &str) -> Result<Self, ManifestError> {
        serde_saphyr::from_str(input).map_err(|e| ManifestError::Decode(e.to_string()))
    }

    /// Decodes a JSON object or a YAML document, chosen by the first
    /// non-whitespace character.
    pub fn decode(input: &str) -> Result<Self, ManifestError> {
        if input.trim().is_empty() {
            return Err(ManifestError::Decode("empty input".to_string()));
        }
        if input.trim_start().starts_with('{') {
            Self::from_json(input)
        } else {
            Self::from_yaml(input)
        }
    }
}
