use abi_model::{ArtifactName, ClassType};
use indexmap::IndexMap;

use crate::artifact::Artifact;
use crate::location::ClassLocation;

/// The canonical view of a classpath: one location per class name.
///
/// Built from artifacts in classpath order; the first artifact defining a
/// name owns it and later definitions are shadowed.
#[derive(Debug, Clone, Default)]
pub struct ClassIndex {
    known_classes: IndexMap<ClassType, ClassLocation>,
    source_mappings: IndexMap<ClassType, ArtifactName>,
}

impl ClassIndex {
    pub fn from_artifacts<'a>(artifacts: impl IntoIterator<Item = &'a Artifact>) -> Self {
        let mut index = Self::default();
        for artifact in artifacts {
            let mut shadowed = 0usize;
            for (class, location) in artifact.classes() {
                if index.known_classes.contains_key(class) {
                    shadowed += 1;
                    continue;
                }
                index.known_classes.insert(class.clone(), location.clone());
                index
                    .source_mappings
                    .insert(class.clone(), artifact.name().clone());
            }
            if shadowed > 0 {
                tracing::debug!(
                    target = "abi.classpath",
                    artifact = %artifact.name(),
                    shadowed,
                    "classes shadowed by earlier classpath entries"
                );
            }
        }
        index
    }

    pub fn known_classes(&self) -> &IndexMap<ClassType, ClassLocation> {
        &self.known_classes
    }

    pub fn source_mappings(&self) -> &IndexMap<ClassType, ArtifactName> {
        &self.source_mappings
    }

    pub fn location(&self, class: &ClassType) -> Option<&ClassLocation> {
        self.known_classes.get(class)
    }

    pub fn artifact_of(&self, class: &ClassType) -> Option<&ArtifactName> {
        self.source_mappings.get(class)
    }

    pub fn len(&self) -> usize {
        self.known_classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known_classes.is_empty()
    }
}
