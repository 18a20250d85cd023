use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid utf-8 input: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    #[error("worker pool: {0}")]
    Resource(String),
    #[error("batch cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
