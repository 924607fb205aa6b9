use abi_model::{ArtifactName, ClassType};
use indexmap::IndexMap;

use crate::location::ClassLocation;

/// One classpath unit and the classes it defines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    name: ArtifactName,
    classes: IndexMap<ClassType, ClassLocation>,
}

impl Artifact {
    pub fn new(name: ArtifactName, classes: IndexMap<ClassType, ClassLocation>) -> Self {
        Self { name, classes }
    }

    pub fn empty(name: ArtifactName) -> Self {
        Self::new(name, IndexMap::new())
    }

    pub fn name(&self) -> &ArtifactName {
        &self.name
    }

    pub fn classes(&self) -> &IndexMap<ClassType, ClassLocation> {
        &self.classes
    }

    pub fn get(&self, class: &ClassType) -> Option<&ClassLocation> {
        self.classes.get(class)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
