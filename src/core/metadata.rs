//! Pipeline identity: a required name plus free-form labels and annotations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identity and display information for a pipeline or system.
///
/// ```rust
/// use glu::Metadata;
///
/// let meta = Metadata::new("checkout")
///     .with_label("team", "payments")
///     .with_annotation("glu.dev/owner", "payments@example.com");
///
/// assert_eq!(meta.name, "checkout");
/// assert_eq!(meta.labels["team"], "payments");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Metadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set a single label, replacing any previous value for the key
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Set a single annotation, replacing any previous value for the key
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }
}
