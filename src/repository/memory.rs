//! In-process stores
//!
//! All state sits behind one mutex per store; every check and the write it
//! guards happen under a single lock acquisition.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{CatalogueStore, CredentialStore};
use crate::{
    error::{AppError, AppResult, StoreError},
    models::{Book, BookId, Loan, NewBook, User},
};

fn lock<T>(mutex: &Mutex<T>) -> AppResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| AppError::Store(StoreError::Backend("memory store lock poisoned".into())))
}

fn not_found(id: BookId) -> AppError {
    AppError::NotFound(format!("Book with id {} not found", id))
}

#[derive(Default)]
pub struct MemoryUsers {
    users: Mutex<HashMap<String, User>>,
}

#[async_trait]
impl CredentialStore for MemoryUsers {
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(lock(&self.users)?.get(username).cloned())
    }

    async fn exists(&self, username: &str) -> AppResult<bool> {
        Ok(lock(&self.users)?.contains_key(username))
    }

    async fn insert(&self, user: &User) -> AppResult<()> {
        let mut users = lock(&self.users)?;
        if users.contains_key(&user.username) {
            return Err(AppError::DuplicateUser(user.username.clone()));
        }
        users.insert(user.username.clone(), user.clone());
        Ok(())
    }
}

#[derive(Default)]
struct CatalogueState {
    books: BTreeMap<BookId, Book>,
    loans: Vec<Loan>,
    last_book_id: BookId,
    last_loan_id: i32,
}

impl CatalogueState {
    fn book_mut(&mut self, id: BookId) -> AppResult<&mut Book> {
        self.books.get_mut(&id).ok_or_else(|| not_found(id))
    }
}

#[derive(Default)]
pub struct MemoryCatalogue {
    state: Mutex<CatalogueState>,
}

#[async_trait]
impl CatalogueStore for MemoryCatalogue {
    async fn list_all(&self) -> AppResult<Vec<Book>> {
        Ok(lock(&self.state)?.books.values().cloned().collect())
    }

    async fn find_by_id(&self, id: BookId) -> AppResult<Option<Book>> {
        Ok(lock(&self.state)?.books.get(&id).cloned())
    }

    async fn insert(&self, book: &NewBook) -> AppResult<BookId> {
        let mut state = lock(&self.state)?;
        state.last_book_id += 1;
        let id = state.last_book_id;
        state.books.insert(id, book.clone().into_book(id));
        Ok(id)
    }

    async fn delete(&self, id: BookId) -> AppResult<()> {
        let mut state = lock(&self.state)?;
        if !state.books.contains_key(&id) {
            return Err(not_found(id));
        }
        let on_loan = state.loans.iter().filter(|l| l.book_id == id).count();
        if on_loan > 0 {
            return Err(AppError::LoansOutstanding(format!(
                "Book {} has {} copies on loan",
                id, on_loan
            )));
        }
        state.books.remove(&id);
        Ok(())
    }

    async fn adjust_copies(&self, id: BookId, delta: i32) -> AppResult<Book> {
        let mut state = lock(&self.state)?;
        let book = state.book_mut(id)?;

        let invalid = || {
            AppError::InvalidQuantity(format!(
                "Copies of book {} must stay between 0 and {}",
                id,
                i32::MAX
            ))
        };
        let available = book
            .available_copies
            .checked_add(delta)
            .filter(|n| *n >= 0)
            .ok_or_else(invalid)?;
        let total = book.total_copies.checked_add(delta).ok_or_else(invalid)?;

        book.available_copies = available;
        book.total_copies = total;
        Ok(book.clone())
    }

    async fn open_loan(&self, id: BookId, borrower: &str) -> AppResult<Loan> {
        let mut state = lock(&self.state)?;
        let book = state.book_mut(id)?;
        if book.available_copies <= 0 {
            return Err(AppError::Unavailable(format!(
                "No copies of book {} are available",
                id
            )));
        }
        book.available_copies -= 1;

        state.last_loan_id += 1;
        let loan = Loan {
            id: state.last_loan_id,
            book_id: id,
            borrower: borrower.to_string(),
            borrowed_at: Utc::now(),
        };
        state.loans.push(loan.clone());
        Ok(loan)
    }

    async fn close_loan(&self, id: BookId, borrower: &str) -> AppResult<Loan> {
        let mut state = lock(&self.state)?;
        if !state.books.contains_key(&id) {
            return Err(not_found(id));
        }

        // Loans are appended in borrow order, so the first match is the oldest
        let position = state
            .loans
            .iter()
            .position(|l| l.book_id == id && l.borrower == borrower)
            .ok_or_else(|| {
                AppError::NoOpenLoan(format!("{} has no open loan on book {}", borrower, id))
            })?;
        let loan = state.loans.remove(position);
        state.book_mut(id)?.available_copies += 1;
        Ok(loan)
    }

    async fn open_loans(&self, borrower: &str) -> AppResult<Vec<Loan>> {
        Ok(lock(&self.state)?
            .loans
            .iter()
            .filter(|l| l.borrower == borrower)
            .cloned()
            .collect())
    }

    async fn open_loan_count(&self, id: BookId) -> AppResult<i64> {
        let count = lock(&self.state)?
            .loans
            .iter()
            .filter(|l| l.book_id == id)
            .count();
        Ok(count as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dune(copies: i32) -> NewBook {
        NewBook {
            title: "Dune".into(),
            author: "Frank Herbert".into(),
            copies,
        }
    }

    #[tokio::test]
    async fn ids_are_assigned_in_insertion_order() {
        let store = MemoryCatalogue::default();
        let a = store.insert(&dune(1)).await.unwrap();
        let b = store.insert(&dune(2)).await.unwrap();
        assert!(a < b);
        let ids: Vec<_> = store.list_all().await.unwrap().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[tokio::test]
    async fn adjust_copies_rejects_instead_of_clamping() {
        let store = MemoryCatalogue::default();
        let id = store.insert(&dune(2)).await.unwrap();

        let err = store.adjust_copies(id, -3).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidQuantity(_)));
        assert_eq!(store.find_by_id(id).await.unwrap().unwrap().available_copies, 2);

        let book = store.adjust_copies(id, -2).await.unwrap();
        assert_eq!((book.available_copies, book.total_copies), (0, 0));
    }

    #[tokio::test]
    async fn adjust_copies_overflow_is_invalid_quantity() {
        let store = MemoryCatalogue::default();
        let id = store.insert(&dune(1)).await.unwrap();
        let err = store.adjust_copies(id, i32::MAX).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidQuantity(_)));
    }

    #[tokio::test]
    async fn close_loan_picks_oldest_matching_loan() {
        let store = MemoryCatalogue::default();
        let id = store.insert(&dune(3)).await.unwrap();
        let first = store.open_loan(id, "ann").await.unwrap();
        store.open_loan(id, "bob").await.unwrap();
        store.open_loan(id, "ann").await.unwrap();

        let closed = store.close_loan(id, "ann").await.unwrap();
        assert_eq!(closed.id, first.id);
        assert_eq!(store.open_loan_count(id).await.unwrap(), 2);
        assert_eq!(store.open_loans("ann").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected_by_store() {
        let store = MemoryUsers::default();
        let user = User {
            username: "ann".into(),
            credential_hash: "h".into(),
            role: crate::models::Role::Borrower,
            created_at: Utc::now(),
        };
        store.insert(&user).await.unwrap();
        assert!(matches!(
            store.insert(&user).await,
            Err(AppError::DuplicateUser(_))
        ));
    }
}
