use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("product not found: {0}")]
    ProductNotFound(String),

    #[error("client not found: {0}")]
    ClientNotFound(String),

    #[error("no products")]
    EmptyCatalog,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
