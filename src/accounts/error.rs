//! Account service error types.

use thiserror::Error;

use crate::storage::StoreError;

/// Outcome of a failed account operation.
///
/// The `Display` text of the user-facing variants is the message shown on
/// the form that triggered it.
#[derive(Debug, Error)]
pub enum AccountError {
    /// Store provisioning or connectivity failure.
    #[error("{0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("Email already registered!")]
    DuplicateAccount,

    #[error("Email not found!")]
    AccountNotFound,

    #[error("Invalid password!")]
    InvalidCredentials,

    #[error("password hashing failed")]
    PasswordHash,
}
