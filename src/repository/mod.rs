//! Repository layer: store contracts and their backends

pub mod books;
pub mod memory;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{Book, BookId, Loan, NewBook, User},
};

/// Persists and retrieves user records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    async fn exists(&self, username: &str) -> AppResult<bool>;

    /// Fails with `DuplicateUser` if the username is already taken
    async fn insert(&self, user: &User) -> AppResult<()>;
}

/// Persists books, their copy counts and the open loans against them.
///
/// Every mutating method is a single atomic step: the check that validates
/// it and the write it performs cannot interleave with another caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogueStore: Send + Sync {
    /// All books, ascending id
    async fn list_all(&self) -> AppResult<Vec<Book>>;

    async fn find_by_id(&self, id: BookId) -> AppResult<Option<Book>>;

    async fn insert(&self, book: &NewBook) -> AppResult<BookId>;

    /// `NotFound` if missing, `LoansOutstanding` if any copy is on loan
    async fn delete(&self, id: BookId) -> AppResult<()>;

    /// Moves available and total copies by `delta`.
    /// `InvalidQuantity` if the available count would go negative or either
    /// count would leave the `i32` range; never clamps.
    async fn adjust_copies(&self, id: BookId, delta: i32) -> AppResult<Book>;

    /// Decrements available copies if positive and records the loan.
    /// `NotFound` if the book is missing, `Unavailable` if no copy is left.
    async fn open_loan(&self, id: BookId, borrower: &str) -> AppResult<Loan>;

    /// Removes the borrower's oldest loan on the book and increments available copies.
    /// `NotFound` if the book is missing, `NoOpenLoan` if there is nothing to close.
    async fn close_loan(&self, id: BookId, borrower: &str) -> AppResult<Loan>;

    /// Open loans of one borrower, oldest first
    async fn open_loans(&self, borrower: &str) -> AppResult<Vec<Loan>>;

    async fn open_loan_count(&self, id: BookId) -> AppResult<i64>;
}

/// Handles on both stores, shared by the services
#[derive(Clone)]
pub struct Repository {
    pub users: Arc<dyn CredentialStore>,
    pub catalogue: Arc<dyn CatalogueStore>,
}

impl Repository {
    pub fn new(users: Arc<dyn CredentialStore>, catalogue: Arc<dyn CatalogueStore>) -> Self {
        Self { users, catalogue }
    }

    /// Repository backed by PostgreSQL
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self {
            users: Arc::new(users::UsersRepository::new(pool.clone())),
            catalogue: Arc::new(books::BooksRepository::new(pool)),
        }
    }

    /// Repository backed by process memory
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(memory::MemoryUsers::default()),
            catalogue: Arc::new(memory::MemoryCatalogue::default()),
        }
    }
}
