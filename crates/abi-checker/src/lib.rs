//! Reachability analysis and linkage checking over a layered classpath.
//!
//! The entry point is [`ConflictChecker::check_with_entry_points`]. It builds a
//! [`ClassIndex`](abi_classpath::ClassIndex) from the given artifacts, walks
//! the classes reachable from the entry points (or every class, when
//! configured to check completely) and reports every method call or field
//! access that would fail to link at runtime.

#![forbid(unsafe_code)]

mod checker;
mod class_loader;
mod config;
mod conflict;
mod error;
mod exceptions;
mod graph;

pub use crate::checker::ConflictChecker;
pub use crate::class_loader::{ClassLoader, DEFAULT_MAX_ENTRIES};
pub use crate::config::ConflictCheckerConfiguration;
pub use crate::conflict::{Conflict, ConflictCategory, Dependency, UNKNOWN_ARTIFACT_NAME};
pub use crate::error::{CheckError, LoadError, Result};
pub use crate::graph::ClassGraph;
