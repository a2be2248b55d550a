//! Role gate: which role may perform which inventory operation

use crate::{
    error::{AppError, AppResult},
    models::{Actor, Role},
};

/// Operations exposed by the inventory service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListAvailable,
    Borrow,
    Return,
    ListOwnLoans,
    AddBook,
    RemoveBook,
    IncreaseCopies,
}

/// Pure permission check, no side effects
pub fn permits(role: Role, operation: Operation) -> bool {
    match operation {
        Operation::ListAvailable => true,
        Operation::Borrow | Operation::Return | Operation::ListOwnLoans => role == Role::Borrower,
        Operation::AddBook | Operation::RemoveBook | Operation::IncreaseCopies => {
            role == Role::Administrator
        }
    }
}

/// Fails with `NotAuthorized` when the actor's role may not perform `operation`
pub fn require(actor: &Actor, operation: Operation) -> AppResult<()> {
    if permits(actor.role(), operation) {
        Ok(())
    } else {
        tracing::warn!(
            username = actor.username(),
            role = %actor.role(),
            ?operation,
            "Operation denied"
        );
        Err(AppError::NotAuthorized)
    }
}
