//! The JDK's platform modules as classpath artifacts.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use abi_model::{ArtifactName, ClassType};
use indexmap::IndexMap;
use once_cell::sync::OnceCell;

use crate::artifact::Artifact;
use crate::error::{ClasspathError, Result};
use crate::location::ClassLocation;
use crate::multi_release::{is_pseudo_class, parse_java_version};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JdkInstallation {
    root: PathBuf,
    jmods_dir: PathBuf,
}

impl JdkInstallation {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn jmods_dir(&self) -> &Path {
        &self.jmods_dir
    }

    pub fn from_root(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let jmods_dir = root.join("jmods");
        if !jmods_dir.is_dir() {
            return Err(ClasspathError::MissingJmodsDir { root });
        }

        Ok(Self { root, jmods_dir })
    }

    /// Locate a JDK with a `jmods` directory.
    ///
    /// Candidates, first match wins: the explicit `home`, `JAVA_HOME`, then
    /// the installation owning the `java` binary on `PATH`. Each candidate may
    /// also be a `jre` directory nested in the JDK. An explicit `home` that
    /// does not qualify is an error rather than a fallthrough.
    pub fn discover(home: Option<&Path>) -> Result<Self> {
        if let Some(home) = home {
            return Self::from_root(jmods_root(home).unwrap_or(home));
        }

        let java_home = std::env::var_os("JAVA_HOME").map(PathBuf::from);
        let root = java_home
            .as_deref()
            .and_then(jmods_root)
            .map(Path::to_path_buf)
            .or_else(|| {
                let java = java_on_path()?.canonicalize().ok()?;
                jdk_root_of_binary(&java)
            });

        match root {
            Some(root) => Self::from_root(root),
            None => Err(ClasspathError::JdkNotFound),
        }
    }

    /// Feature release recorded in the installation's `release` file
    /// (`JAVA_VERSION="17.0.2"`), if present.
    pub fn java_version(&self) -> Result<Option<u32>> {
        let path = self.root.join("release");
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(ClasspathError::io(path, err)),
        };

        let Some(raw) = contents.lines().find_map(|line| {
            let (key, value) = line.split_once('=')?;
            (key.trim() == "JAVA_VERSION").then_some(value.trim())
        }) else {
            return Ok(None);
        };

        parse_java_version(raw)
            .map(Some)
            .ok_or_else(|| ClasspathError::InvalidJavaVersion(raw.to_owned()))
    }

    /// `.jmod` files of the installation, `java.base` first then by name.
    pub fn module_paths(&self) -> Result<Vec<PathBuf>> {
        let read_dir = std::fs::read_dir(&self.jmods_dir)
            .map_err(|err| ClasspathError::io(&self.jmods_dir, err))?;
        let mut module_paths: Vec<PathBuf> = read_dir
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "jmod"))
            .collect();

        // Put `java.base.jmod` first since it's where most core types live.
        module_paths.sort_by_key(|p| {
            let file_name = p.file_name().and_then(|n| n.to_str()).unwrap_or("");
            (file_name != "java.base.jmod", file_name.to_owned())
        });

        if module_paths.is_empty() {
            return Err(ClasspathError::NoModulesFound {
                dir: self.jmods_dir.clone(),
            });
        }
        Ok(module_paths)
    }
}

/// Enumerates the platform modules of one JDK installation.
///
/// The module artifacts never change during a run, so they are built on first
/// use and shared afterwards.
#[derive(Debug)]
pub struct JdkModuleLoader {
    installation: JdkInstallation,
    artifacts: OnceCell<Vec<Artifact>>,
}

impl JdkModuleLoader {
    pub fn new(installation: JdkInstallation) -> Self {
        Self {
            installation,
            artifacts: OnceCell::new(),
        }
    }

    pub fn installation(&self) -> &JdkInstallation {
        &self.installation
    }

    /// One artifact per module that exposes at least one class, named after
    /// the module.
    pub fn artifacts(&self) -> Result<&[Artifact]> {
        let artifacts = self.artifacts.get_or_try_init(|| {
            let mut artifacts = Vec::new();
            for path in self.installation.module_paths()? {
                let artifact = load_jmod(&path)?;
                if artifact.is_empty() {
                    tracing::debug!(
                        target = "abi.classpath",
                        module = %artifact.name(),
                        "skipping module without classes"
                    );
                    continue;
                }
                artifacts.push(artifact);
            }
            tracing::debug!(
                target = "abi.classpath",
                root = %self.installation.root().display(),
                modules = artifacts.len(),
                "loaded JDK modules"
            );
            Ok::<_, ClasspathError>(artifacts)
        })?;
        Ok(artifacts)
    }
}

fn load_jmod(path: &Path) -> Result<Artifact> {
    let module_name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let file = File::open(path).map_err(|err| ClasspathError::io(path, err))?;
    let archive = zip::ZipArchive::new(file).map_err(|err| ClasspathError::zip(path, err))?;

    let jmod: Arc<Path> = Arc::from(path);
    let module: Arc<str> = Arc::from(module_name.as_str());
    let mut classes = IndexMap::new();
    for entry in archive.file_names() {
        // JMODs place class files under `classes/`.
        let Some(class_path) = entry.strip_prefix("classes/") else {
            continue;
        };
        if !class_path.ends_with(".class") || is_pseudo_class(class_path) {
            continue;
        }
        let class = ClassType::from_class_filename(class_path)?;
        classes.insert(
            class.clone(),
            ClassLocation::Module {
                class,
                module: module.clone(),
                jmod: jmod.clone(),
                entry: entry.into(),
            },
        );
    }
    classes.sort_keys();

    Ok(Artifact::new(ArtifactName::new(module_name), classes))
}

/// `candidate` itself or its parent, whichever holds `jmods/`.
fn jmods_root(candidate: &Path) -> Option<&Path> {
    std::iter::successors(Some(candidate), |p| p.parent())
        .take(2)
        .find(|p| p.join("jmods").is_dir())
}

/// `$JDK/bin/java` belongs to `$JDK`.
fn jdk_root_of_binary(java: &Path) -> Option<PathBuf> {
    let bin = java.parent()?;
    jmods_root(bin.parent()?).map(Path::to_path_buf)
}

fn java_on_path() -> Option<PathBuf> {
    let exe = if cfg!(windows) { "java.exe" } else { "java" };
    std::env::split_paths(&std::env::var_os("PATH")?)
        .map(|dir| dir.join(exe))
        .find(|candidate| candidate.is_file())
}
