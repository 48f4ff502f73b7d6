use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("{message}")]
    Conflict {
        field: &'static str,
        message: String,
    },
    /// A foreign key points at a row that does not exist (or no longer does).
    #[error("referenced {field} does not exist")]
    MissingReference { field: &'static str },
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn taken(field: &'static str) -> Self {
        StoreError::Conflict {
            field,
            message: format!("The {field} has already been taken."),
        }
    }
}
