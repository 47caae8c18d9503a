//! Identity store errors

use artvault_core::Role;
use artvault_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("A {role} with {field} '{value}' already exists")]
    DuplicateIdentity {
        role: Role,
        field: &'static str,
        value: String,
    },

    #[error("No {role} account for {email}")]
    NotFound { role: Role, email: String },

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
