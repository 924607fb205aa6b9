use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use abi_model::ClassType;

use crate::error::{ClasspathError, Result};

/// Where the bytes of one class file live.
///
/// Every location of an artifact shares the artifact's root (`Arc<Path>`)
/// and keeps only its own relative path, so holding every location of a
/// large classpath stays cheap. Equality and hashing cover the full
/// location, which makes it usable as a decode-cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClassLocation {
    /// `<root>/<relative>` on disk.
    Directory {
        class: ClassType,
        root: Arc<Path>,
        relative: Box<str>,
    },
    /// An entry of a jar (or zip) archive.
    Archive {
        class: ClassType,
        archive: Arc<Path>,
        entry: Box<str>,
    },
    /// An entry of a JDK platform module's `.jmod` file.
    Module {
        class: ClassType,
        module: Arc<str>,
        jmod: Arc<Path>,
        entry: Box<str>,
    },
}

impl ClassLocation {
    pub fn class_type(&self) -> &ClassType {
        match self {
            ClassLocation::Directory { class, .. }
            | ClassLocation::Archive { class, .. }
            | ClassLocation::Module { class, .. } => class,
        }
    }

    /// Reads the whole class file. Archives are reopened on every call.
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        match self {
            ClassLocation::Directory { root, relative, .. } => {
                let path = root.join(relative.as_ref());
                std::fs::read(&path).map_err(|err| ClasspathError::io(path, err))
            }
            ClassLocation::Archive { archive, entry, .. } => read_zip_entry(archive, entry),
            ClassLocation::Module { jmod, entry, .. } => read_zip_entry(jmod, entry),
        }
    }
}

impl fmt::Display for ClassLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassLocation::Directory { root, relative, .. } => {
                write!(f, "{}", root.join(relative.as_ref()).display())
            }
            ClassLocation::Archive { archive, entry, .. } => {
                write!(f, "{}!/{entry}", archive.display())
            }
            ClassLocation::Module { module, entry, .. } => {
                let entry = entry.strip_prefix("classes/").unwrap_or(entry);
                write!(f, "jrt:/{module}/{entry}")
            }
        }
    }
}

pub(crate) fn read_zip_entry(path: &Path, entry: &str) -> Result<Vec<u8>> {
    let file = File::open(path).map_err(|err| ClasspathError::io(path, err))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|err| ClasspathError::zip(path, err))?;
    let mut file = match archive.by_name(entry) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(ClasspathError::MissingClass {
                path: path.to_path_buf(),
                entry: entry.to_owned(),
            })
        }
        Err(err) => return Err(ClasspathError::zip(path, err)),
    };

    let mut bytes = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut bytes).map_err(|err| ClasspathError::io(path, err))?;
    Ok(bytes)
}
