//! Value types describing compiled JVM classes as seen by the linker.
//!
//! Everything in this crate is immutable once constructed. Names are stored in
//! their dotted binary form (`java.lang.String`) regardless of whether they were
//! built from internal (`java/lang/String`) or dotted input.

#![forbid(unsafe_code)]

mod artifact;
mod declared;
mod error;
mod field;
mod method;
mod reference;
mod types;

pub use crate::artifact::ArtifactName;
pub use crate::declared::{DeclaredClass, DeclaredMethod};
pub use crate::error::{ModelError, Result};
pub use crate::field::{FieldDescriptor, FieldReference};
pub use crate::method::{MethodDescriptor, MethodReference};
pub use crate::reference::{CallSite, MemberReference, Reference};
pub use crate::types::{ArrayType, ClassType, PrimitiveType, TypeDescriptor};
