use std::collections::BTreeMap;

use thiserror::Error;

use crate::models::DocumentStatus;

/// Field name to message, ordered so messages render deterministically.
pub type FieldErrors = BTreeMap<&'static str, String>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{}", join_field_errors(.0))]
    Validation(FieldErrors),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Cannot move document from {from} to {to}")]
    InvalidTransition {
        from: DocumentStatus,
        to: DocumentStatus,
    },

    #[error("Document {0} has not finished analysis")]
    NotTerminal(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("{0} lock poisoned")]
    Lock(&'static str),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field, message.into());
        AppError::Validation(errors)
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            AppError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

fn join_field_errors(errors: &FieldErrors) -> String {
    errors.values().cloned().collect::<Vec<_>>().join("; ")
}

pub type Result<T> = std::result::Result<T, AppError>;
