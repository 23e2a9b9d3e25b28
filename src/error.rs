use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Db(#[from] crate::db::DbError),
    #[error("invalid entry: {0}")]
    Validation(String),
    #[error("invalid search pattern: {0}")]
    Query(#[from] regex::Error),
    #[error("malformed import data: {0}")]
    ImportFormat(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;
