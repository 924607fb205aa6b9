use std::ffi::OsStr;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use abi_model::{ArtifactName, ClassType};
use indexmap::IndexMap;

use crate::artifact::Artifact;
use crate::error::{ClasspathError, Result};
use crate::location::ClassLocation;
use crate::multi_release::{is_pseudo_class, select_entries};

/// Runtime version assumed when no JDK is inspected.
pub const DEFAULT_RUNTIME_VERSION: u32 = 17;

/// Turns one classpath entry (class directory or jar) into an [`Artifact`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactLoader {
    runtime_version: u32,
}

impl Default for ArtifactLoader {
    fn default() -> Self {
        Self::new(DEFAULT_RUNTIME_VERSION)
    }
}

impl ArtifactLoader {
    /// `runtime_version` drives multi-release jar selection.
    pub fn new(runtime_version: u32) -> Self {
        Self { runtime_version }
    }

    pub fn runtime_version(&self) -> u32 {
        self.runtime_version
    }

    pub fn load(&self, name: ArtifactName, path: &Path) -> Result<Artifact> {
        if !path.exists() {
            // Build tools routinely declare an output `classes` directory for
            // projects that never compile anything.
            if is_class_output_dir(path) {
                tracing::debug!(
                    target = "abi.classpath",
                    artifact = %name,
                    path = %path.display(),
                    "missing classes directory treated as empty"
                );
                return Ok(Artifact::empty(name));
            }
            return Err(ClasspathError::MissingEntry(path.to_path_buf()));
        }

        let classes = if path.is_dir() {
            load_directory(path)?
        } else if has_extension(path, "jar") || has_extension(path, "zip") {
            load_archive(path, self.runtime_version)?
        } else {
            tracing::debug!(
                target = "abi.classpath",
                artifact = %name,
                path = %path.display(),
                "ignoring classpath entry of unknown type"
            );
            IndexMap::new()
        };

        tracing::debug!(
            target = "abi.classpath",
            artifact = %name,
            classes = classes.len(),
            "loaded artifact"
        );
        Ok(Artifact::new(name, classes))
    }
}

/// `.../classes` itself, or a Gradle source-set output `.../classes/<lang>/<set>`.
fn is_class_output_dir(path: &Path) -> bool {
    let classes = OsStr::new("classes");
    if path.file_name() == Some(classes) {
        return true;
    }
    path.extension().is_none()
        && path.parent().and_then(Path::parent).and_then(Path::file_name) == Some(classes)
}

fn has_extension(path: &Path, expected: &str) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case(expected))
}

fn load_directory(dir: &Path) -> Result<IndexMap<ClassType, ClassLocation>> {
    let root: Arc<Path> = Arc::from(dir);
    let mut classes = IndexMap::new();

    for entry in walkdir::WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|err| ClasspathError::Walk {
            path: dir.to_path_buf(),
            source: err,
        })?;
        if !entry.file_type().is_file() || entry.path().extension() != Some(OsStr::new("class")) {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if is_pseudo_class(&relative) {
            continue;
        }

        let class = ClassType::from_class_filename(&relative)?;
        classes.insert(
            class.clone(),
            ClassLocation::Directory {
                class,
                root: root.clone(),
                relative: relative.into_boxed_str(),
            },
        );
    }

    Ok(classes)
}

fn load_archive(path: &Path, runtime_version: u32) -> Result<IndexMap<ClassType, ClassLocation>> {
    let file = File::open(path).map_err(|err| ClasspathError::io(path, err))?;
    let archive = zip::ZipArchive::new(file).map_err(|err| ClasspathError::zip(path, err))?;

    let shared: Arc<Path> = Arc::from(path);
    let selected = select_entries(archive.file_names(), runtime_version)?;
    let classes = selected
        .into_iter()
        .map(|(class, entry)| {
            let location = ClassLocation::Archive {
                class: class.clone(),
                archive: shared.clone(),
                entry: entry.into(),
            };
            (class, location)
        })
        .collect();
    Ok(classes)
}
