//! Data models for the lending inventory

pub mod book;
pub mod loan;
pub mod user;

use std::borrow::Cow;

use validator::ValidationError;

// Re-export commonly used types
pub use book::{Book, BookId, NewBook};
pub use loan::Loan;
pub use user::{Actor, ActorClaims, RegisterUser, Role, User};

/// Rejects empty and whitespace-only strings
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some(Cow::from("must not be empty or whitespace"));
        return Err(err);
    }
    Ok(())
}
