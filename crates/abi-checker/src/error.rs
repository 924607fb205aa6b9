use abi_classpath::ClasspathError;
use abi_model::ClassType;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CheckError>;

/// Why one class location could not be turned into a declaration.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Read(#[from] ClasspathError),

    #[error(transparent)]
    Decode(#[from] abi_classfile::Error),
}

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("failed to load class from `{location}`: {source}")]
    Decode {
        location: String,
        #[source]
        source: LoadError,
    },

    #[error("class `{0}` is reachable but missing from the class index")]
    InconsistentIndex(ClassType),
}
