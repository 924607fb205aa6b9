use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::types::{ClassType, TypeDescriptor};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldDescriptor {
    name: Arc<str>,
    ty: TypeDescriptor,
}

impl FieldDescriptor {
    pub fn new(ty: TypeDescriptor, name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &TypeDescriptor {
        &self.ty
    }
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.ty, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldReference {
    owner: ClassType,
    descriptor: FieldDescriptor,
    is_static: bool,
}

impl FieldReference {
    pub fn new(owner: ClassType, descriptor: FieldDescriptor, is_static: bool) -> Self {
        Self {
            owner,
            descriptor,
            is_static,
        }
    }

    pub fn owner(&self) -> &ClassType {
        &self.owner
    }

    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn ty(&self) -> &TypeDescriptor {
        self.descriptor.ty()
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// `com.example.Foo#count (int)`
    pub fn pretty(&self) -> String {
        format!("{}#{} ({})", self.owner, self.name(), self.ty())
    }
}

impl fmt::Display for FieldReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}.{}", self.ty(), self.owner, self.name())
    }
}

impl Serialize for FieldReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
