use std::path::PathBuf;

use abi_model::ModelError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClasspathError>;

#[derive(Debug, Error)]
pub enum ClasspathError {
    #[error("failed to read `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read archive `{path}`: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("failed to walk `{path}`: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("classpath entry `{0}` does not exist")]
    MissingEntry(PathBuf),

    #[error("`{entry}` is no longer present in `{path}`")]
    MissingClass { path: PathBuf, entry: String },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("could not discover a JDK installation (tried the configured home, JAVA_HOME and `java` on PATH)")]
    JdkNotFound,

    #[error("JDK root `{root}` does not contain a `jmods/` directory")]
    MissingJmodsDir { root: PathBuf },

    #[error("no `.jmod` modules found under `{dir}`")]
    NoModulesFound { dir: PathBuf },

    #[error("unrecognised Java version `{0}`")]
    InvalidJavaVersion(String),
}

impl ClasspathError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ClasspathError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn zip(path: impl Into<PathBuf>, source: zip::result::ZipError) -> Self {
        ClasspathError::Zip {
            path: path.into(),
            source,
        }
    }
}
