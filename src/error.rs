use thiserror::Error;

pub type GrubResult<T> = Result<T, GrubError>;

#[derive(Error, Debug)]
pub enum GrubError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not determine date from filename: {0}")]
    AnchorDateMissing(String),

    #[error("spreadsheet error: {0}")]
    Sheet(String),

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("unknown meal type: {0}")]
    UnknownMeal(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("server error: {0}")]
    Server(String),
}
