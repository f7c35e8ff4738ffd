use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Path is already linked: {0}")]
    DuplicatePath(String),

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },
}

impl LibraryError {
    /// Maps a failed write, turning a UNIQUE violation on `path` into
    /// [`LibraryError::DuplicatePath`].
    pub(crate) fn from_write(error: sqlx::Error, path: &str) -> Self {
        match &error {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                LibraryError::DuplicatePath(path.to_string())
            }
            _ => LibraryError::Database(error),
        }
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;
