use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    #[error("Schema migration failed: {0}")]
    Migration(String),

    /// The surah table shipped inside the binary could not be parsed.
    #[error("Bundled data error: {0}")]
    BundledData(String),
}

pub type Result<T> = std::result::Result<T, LibraryError>;
