use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::error::{ModelError, Result};
use crate::types::{split_type, ClassType, TypeDescriptor};

/// A method's binary identity: name, parameter types and return type.
///
/// The return type takes part in equality because the linker matches on the
/// full descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodDescriptor {
    name: Arc<str>,
    parameter_types: Vec<TypeDescriptor>,
    return_type: TypeDescriptor,
}

impl MethodDescriptor {
    pub fn new(
        return_type: TypeDescriptor,
        name: impl Into<Arc<str>>,
        parameter_types: Vec<TypeDescriptor>,
    ) -> Self {
        Self {
            name: name.into(),
            parameter_types,
            return_type,
        }
    }

    /// Parse a raw method type such as `(ILjava/lang/String;)[I`.
    pub fn from_descriptor(descriptor: &str, name: impl Into<Arc<str>>) -> Result<Self> {
        let malformed = || ModelError::MalformedDescriptor(descriptor.to_owned());

        let mut rest = descriptor.strip_prefix('(').ok_or_else(malformed)?;
        let mut parameter_types = Vec::new();
        loop {
            if let Some(after) = rest.strip_prefix(')') {
                rest = after;
                break;
            }
            let (param, after) = split_type(rest, false).ok_or_else(malformed)?;
            parameter_types.push(param);
            rest = after;
        }

        let (return_type, rest) = split_type(rest, true).ok_or_else(malformed)?;
        if !rest.is_empty() {
            return Err(malformed());
        }

        Ok(Self::new(return_type, name, parameter_types))
    }

    /// Convenience constructor from raw field descriptors, mostly for tests.
    pub fn of(return_type: &str, name: &str, parameter_types: &[&str]) -> Result<Self> {
        let params = parameter_types
            .iter()
            .map(|raw| TypeDescriptor::parse(raw))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(TypeDescriptor::parse(return_type)?, name, params))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn return_type(&self) -> &TypeDescriptor {
        &self.return_type
    }

    pub fn parameter_types(&self) -> &[TypeDescriptor] {
        &self.parameter_types
    }

    /// `void method(java.lang.String, int)`
    pub fn pretty(&self) -> String {
        format!("{} {}", self.return_type, self.pretty_without_return_type())
    }

    /// `method(java.lang.String, int)`
    pub fn pretty_without_return_type(&self) -> String {
        let params: Vec<String> = self.parameter_types.iter().map(ToString::to_string).collect();
        format!("{}({})", self.name, params.join(", "))
    }

    /// The raw method type, `(Ljava/lang/String;I)V`.
    pub fn to_raw(&self) -> String {
        let mut out = String::from("(");
        for param in &self.parameter_types {
            out.push_str(&param.to_raw());
        }
        out.push(')');
        out.push_str(&self.return_type.to_raw());
        out
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodReference {
    owner: ClassType,
    descriptor: MethodDescriptor,
    is_static: bool,
}

impl MethodReference {
    pub fn new(owner: ClassType, descriptor: MethodDescriptor, is_static: bool) -> Self {
        Self {
            owner,
            descriptor,
            is_static,
        }
    }

    pub fn owner(&self) -> &ClassType {
        &self.owner
    }

    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// `void com.example.Foo.bar(int)`
    pub fn pretty(&self) -> String {
        format!(
            "{} {}.{}",
            self.descriptor.return_type,
            self.owner,
            self.descriptor.pretty_without_return_type()
        )
    }
}

impl fmt::Display for MethodReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_static {
            f.write_str("static ")?;
        }
        f.write_str(&self.pretty())
    }
}

impl Serialize for MethodReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
