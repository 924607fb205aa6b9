use std::fmt;

use abi_model::{ArtifactName, ClassType, MemberReference, MethodReference, Reference};
use serde::{Serialize, Serializer};

/// Rendered in place of `existsIn` when no artifact defines the target.
pub const UNKNOWN_ARTIFACT_NAME: &str = "<unknown>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictCategory {
    ClassNotFound,
    MethodSignatureNotFound,
    FieldNotFound,
}

impl fmt::Display for ConflictCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConflictCategory::ClassNotFound => "class not found",
            ConflictCategory::MethodSignatureNotFound => "method not found",
            ConflictCategory::FieldNotFound => "field not found",
        })
    }
}

/// One outbound reference from a reachable method, with the path that made
/// its class reachable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    reachability_path: Vec<ClassType>,
    from_method: MethodReference,
    from_line: u32,
    target: MemberReference,
}

impl Dependency {
    pub fn new(
        reachability_path: Vec<ClassType>,
        from_method: MethodReference,
        from_line: u32,
        target: impl Into<MemberReference>,
    ) -> Self {
        Self {
            reachability_path,
            from_method,
            from_line,
            target: target.into(),
        }
    }

    pub fn reachability_path(&self) -> &[ClassType] {
        &self.reachability_path
    }

    pub fn from_class(&self) -> &ClassType {
        self.from_method.owner()
    }

    pub fn from_method(&self) -> &MethodReference {
        &self.from_method
    }

    pub fn from_line(&self) -> u32 {
        self.from_line
    }

    pub fn target(&self) -> &MemberReference {
        &self.target
    }

    pub fn target_class(&self) -> &ClassType {
        self.target.owner()
    }
}

/// A reference that will fail to link at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Conflict {
    dependency: Dependency,
    exists_in: Option<ArtifactName>,
    used_by: ArtifactName,
    category: ConflictCategory,
}

impl Conflict {
    pub fn new(
        category: ConflictCategory,
        dependency: Dependency,
        used_by: ArtifactName,
        exists_in: Option<ArtifactName>,
    ) -> Self {
        Self {
            dependency,
            exists_in,
            used_by,
            category,
        }
    }

    pub fn dependency(&self) -> &Dependency {
        &self.dependency
    }

    /// The artifact that defines the target class, if any does.
    pub fn exists_in(&self) -> Option<&ArtifactName> {
        self.exists_in.as_ref()
    }

    pub fn exists_in_name(&self) -> &str {
        self.exists_in
            .as_ref()
            .map_or(UNKNOWN_ARTIFACT_NAME, ArtifactName::as_str)
    }

    /// The artifact containing the calling class.
    pub fn used_by(&self) -> &ArtifactName {
        &self.used_by
    }

    pub fn category(&self) -> ConflictCategory {
        self.category
    }

    pub fn reason(&self) -> String {
        match self.category {
            ConflictCategory::ClassNotFound => {
                format!("Class not found: {}", self.dependency.target_class())
            }
            ConflictCategory::MethodSignatureNotFound => {
                format!("Method not found: {}", self.dependency.target.pretty())
            }
            ConflictCategory::FieldNotFound => {
                format!("Field not found: {}", self.dependency.target.pretty())
            }
        }
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (from {} line {}, used by {}, exists in {})",
            self.reason(),
            self.dependency.from_method.pretty(),
            self.dependency.from_line,
            self.used_by,
            self.exists_in_name()
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConflictRecord<'a> {
    exists_in: &'a str,
    used_by: &'a ArtifactName,
    category: ConflictCategory,
    reason: String,
    from_class: &'a ClassType,
    from_method: &'a MethodReference,
    from_line: u32,
    target: &'a MemberReference,
    reachability_path: &'a [ClassType],
}

impl Serialize for Conflict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ConflictRecord {
            exists_in: self.exists_in_name(),
            used_by: &self.used_by,
            category: self.category,
            reason: self.reason(),
            from_class: self.dependency.from_class(),
            from_method: &self.dependency.from_method,
            from_line: self.dependency.from_line,
            target: &self.dependency.target,
            reachability_path: &self.dependency.reachability_path,
        }
        .serialize(serializer)
    }
}
