use diesel::r2d2::PoolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("entity not found")]
    NotFound,
    #[error("validation error: {0}")]
    ValidationError(String),
    #[error("database error: {0}")]
    Database(diesel::result::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] PoolError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl From<diesel::result::Error> for RepositoryError {
    fn from(error: diesel::result::Error) -> Self {
        match error {
            diesel::result::Error::NotFound => Self::NotFound,
            other => Self::Database(other),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
