use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("malformed descriptor: `{0}`")]
    MalformedDescriptor(String),

    #[error("got a descriptor where a class name was expected: `{0}`")]
    MalformedClassName(String),
}
