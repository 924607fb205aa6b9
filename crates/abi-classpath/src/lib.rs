//! Classpath layering: artifacts, class locations and the canonical index.
//!
//! Nothing in this crate decodes bytecode; artifacts are enumerated purely
//! from directory listings and archive entry names.

#![forbid(unsafe_code)]

mod artifact;
mod error;
mod index;
mod jdk;
mod loader;
mod location;
mod multi_release;

pub use crate::artifact::Artifact;
pub use crate::error::{ClasspathError, Result};
pub use crate::index::ClassIndex;
pub use crate::jdk::{JdkInstallation, JdkModuleLoader};
pub use crate::loader::{ArtifactLoader, DEFAULT_RUNTIME_VERSION};
pub use crate::location::ClassLocation;
pub use crate::multi_release::{parse_java_version, select_entries};
