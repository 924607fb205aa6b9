use std::collections::BTreeSet;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::field::FieldReference;
use crate::method::MethodReference;
use crate::types::ClassType;

/// Common view over method and field references.
pub trait Reference {
    fn owner(&self) -> &ClassType;
    fn is_static(&self) -> bool;
    fn pretty(&self) -> String;
}

impl Reference for MethodReference {
    fn owner(&self) -> &ClassType {
        MethodReference::owner(self)
    }

    fn is_static(&self) -> bool {
        MethodReference::is_static(self)
    }

    fn pretty(&self) -> String {
        MethodReference::pretty(self)
    }
}

impl Reference for FieldReference {
    fn owner(&self) -> &ClassType {
        FieldReference::owner(self)
    }

    fn is_static(&self) -> bool {
        FieldReference::is_static(self)
    }

    fn pretty(&self) -> String {
        FieldReference::pretty(self)
    }
}

/// Either kind of member reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MemberReference {
    Method(MethodReference),
    Field(FieldReference),
}

impl Reference for MemberReference {
    fn owner(&self) -> &ClassType {
        match self {
            MemberReference::Method(method) => method.owner(),
            MemberReference::Field(field) => field.owner(),
        }
    }

    fn is_static(&self) -> bool {
        match self {
            MemberReference::Method(method) => method.is_static(),
            MemberReference::Field(field) => field.is_static(),
        }
    }

    fn pretty(&self) -> String {
        match self {
            MemberReference::Method(method) => method.pretty(),
            MemberReference::Field(field) => field.pretty(),
        }
    }
}

impl From<MethodReference> for MemberReference {
    fn from(value: MethodReference) -> Self {
        MemberReference::Method(value)
    }
}

impl From<FieldReference> for MemberReference {
    fn from(value: FieldReference) -> Self {
        MemberReference::Field(value)
    }
}

impl fmt::Display for MemberReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberReference::Method(method) => fmt::Display::fmt(method, f),
            MemberReference::Field(field) => fmt::Display::fmt(field, f),
        }
    }
}

impl Serialize for MemberReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One outbound reference inside a method body.
///
/// `caught_exceptions` holds every exception type whose handler lexically
/// covers the instruction; `finally` handlers are not included.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallSite<T> {
    reference: T,
    line_number: u32,
    caught_exceptions: BTreeSet<ClassType>,
}

impl<T: Reference> CallSite<T> {
    pub fn new(reference: T, line_number: u32, caught_exceptions: BTreeSet<ClassType>) -> Self {
        Self {
            reference,
            line_number,
            caught_exceptions,
        }
    }

    pub fn reference(&self) -> &T {
        &self.reference
    }

    pub fn owner(&self) -> &ClassType {
        self.reference.owner()
    }

    pub fn line_number(&self) -> u32 {
        self.line_number
    }

    pub fn caught_exceptions(&self) -> &BTreeSet<ClassType> {
        &self.caught_exceptions
    }

    pub fn catches(&self, predicate: impl Fn(&ClassType) -> bool) -> bool {
        self.caught_exceptions.iter().any(predicate)
    }
}
