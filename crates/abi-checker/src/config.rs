use std::collections::BTreeSet;

use abi_model::{ArtifactName, ClassType};
use serde::{Deserialize, Serialize};

/// Filters deciding which classes and artifacts the checker analyses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConflictCheckerConfiguration {
    /// Artifact name prefixes whose conflicts are reported. Empty means every
    /// artifact is analysed.
    pub error_artifact_prefixes: BTreeSet<String>,

    /// Artifact name prefixes that are never analysed. Takes precedence over
    /// `error_artifact_prefixes`.
    pub ignored_artifact_prefixes: BTreeSet<String>,

    /// Dotted class name prefixes that are skipped both as callers and as
    /// targets.
    pub ignored_class_prefixes: BTreeSet<String>,

    /// Case-insensitive substrings of class names to skip.
    pub ignored_classname_keywords: BTreeSet<String>,

    /// Treat every class on the classpath as reachable instead of walking
    /// from the entry points.
    pub check_completely: bool,
}

impl ConflictCheckerConfiguration {
    pub fn should_ignore_artifact(&self, artifact: &ArtifactName) -> bool {
        let name = artifact.as_str();
        if self
            .ignored_artifact_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
        {
            return true;
        }

        let analysed = self.error_artifact_prefixes.is_empty()
            || self
                .error_artifact_prefixes
                .iter()
                .any(|prefix| name.starts_with(prefix.as_str()));
        !analysed
    }

    pub fn should_ignore_class(&self, class: &ClassType) -> bool {
        self.should_ignore_class_name(class.class_name())
    }

    pub fn should_ignore_class_name(&self, class_name: &str) -> bool {
        if self
            .ignored_class_prefixes
            .iter()
            .any(|prefix| class_name.starts_with(prefix.as_str()))
        {
            return true;
        }

        if self.ignored_classname_keywords.is_empty() {
            return false;
        }
        let lowercase = class_name.to_lowercase();
        self.ignored_classname_keywords
            .iter()
            .any(|keyword| lowercase.contains(&keyword.to_lowercase()))
    }
}
