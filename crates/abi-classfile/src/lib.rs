//! Class-file reading for linkage checks.
//!
//! [`ClassFile`] is the structural parse; [`ClassDecoder`] lowers it into the
//! [`abi_model::DeclaredClass`] the checker works with.

#![forbid(unsafe_code)]

mod classfile;
mod code;
mod constant_pool;
mod decode;
mod error;
mod reader;

pub use crate::classfile::{ClassFile, ClassMember, Code, ExceptionHandler, LineNumber};
pub use crate::decode::{ClassDecoder, DEFAULT_UNVERIFIABLE_OWNERS};
pub use crate::error::{Error, Result};
