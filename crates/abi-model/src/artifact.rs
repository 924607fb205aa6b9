use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

/// Identity of one classpath unit: a coordinate, a directory path or a module name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactName(Arc<str>);

impl ArtifactName {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArtifactName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ArtifactName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl Serialize for ArtifactName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
