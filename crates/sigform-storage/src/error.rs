//! Storage error types.

/// Errors that can occur during storage operations.
///
/// The taxonomy is deliberately small: constraint violations
/// (uniqueness, foreign keys, referential rules), not-found, and
/// backing-store trouble. Nothing is swallowed.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested row was not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g., "form", "class").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// A uniqueness, foreign-key, or referential rule was violated.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// A stored object references a class the registry does not know,
    /// or knows under a different kind.
    #[error("class {name:?} is not registered{detail}")]
    UnregisteredClass { name: String, detail: String },

    /// Failed to establish or maintain a database connection.
    #[error("connection error: {0}")]
    Connection(String),

    /// A transaction operation failed.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// A schema migration failed.
    #[error("migration {name} failed: {reason}")]
    Migration { name: String, reason: String },

    /// Any other backing-store error (I/O, corruption, raw SQL).
    #[error("backing store error: {0}")]
    Backing(String),
}

/// Convenience alias used throughout the storage crate.
pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    /// Creates a [`StorageError::NotFound`] for the given entity kind and id.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn constraint(message: impl Into<String>) -> Self {
        Self::Constraint(message.into())
    }

    /// Returns `true` if this is a [`StorageError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_constraint(&self) -> bool {
        matches!(self, Self::Constraint(_))
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(code, _)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::Constraint(e.to_string())
            }
            _ => Self::Backing(e.to_string()),
        }
    }
}
