//! Inventory service: copy counts, loans and catalogue administration
//!
//! Every operation takes the calling [`Actor`] explicitly and passes the role
//! gate before the catalogue store is touched. The store performs each
//! mutation as one atomic step, so a rejected call leaves nothing behind.

use validator::Validate;

use crate::{
    error::AppResult,
    models::{Actor, Book, BookId, Loan, NewBook},
    repository::Repository,
    services::gate::{self, Operation},
};

#[derive(Clone)]
pub struct InventoryService {
    repository: Repository,
}

impl InventoryService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Snapshot of the whole catalogue, ascending id
    pub async fn list_available(&self, actor: &Actor) -> AppResult<Vec<Book>> {
        gate::require(actor, Operation::ListAvailable)?;
        self.repository.catalogue.list_all().await
    }

    /// Check out one copy and open a loan for the actor
    pub async fn borrow(&self, actor: &Actor, book_id: BookId) -> AppResult<Loan> {
        gate::require(actor, Operation::Borrow)?;

        let loan = self
            .repository
            .catalogue
            .open_loan(book_id, actor.username())
            .await?;

        tracing::info!(username = actor.username(), book_id, loan_id = loan.id, "Book borrowed");
        Ok(loan)
    }

    /// Close the actor's loan on the book and put the copy back
    pub async fn return_book(&self, actor: &Actor, book_id: BookId) -> AppResult<Loan> {
        gate::require(actor, Operation::Return)?;

        let loan = self
            .repository
            .catalogue
            .close_loan(book_id, actor.username())
            .await?;

        tracing::info!(username = actor.username(), book_id, loan_id = loan.id, "Book returned");
        Ok(loan)
    }

    /// Open loans held by the actor, oldest first
    pub async fn my_loans(&self, actor: &Actor) -> AppResult<Vec<Loan>> {
        gate::require(actor, Operation::ListOwnLoans)?;
        self.repository.catalogue.open_loans(actor.username()).await
    }

    pub async fn add_book(
        &self,
        actor: &Actor,
        title: &str,
        author: &str,
        copies: i32,
    ) -> AppResult<Book> {
        gate::require(actor, Operation::AddBook)?;

        let book = NewBook {
            title: title.to_string(),
            author: author.to_string(),
            copies,
        };
        book.validate()?;

        let id = self.repository.catalogue.insert(&book).await?;

        tracing::info!(username = actor.username(), book_id = id, title, copies, "Book added");
        Ok(book.into_book(id))
    }

    /// Delete a book; refused while any copy is on loan
    pub async fn remove_book(&self, actor: &Actor, book_id: BookId) -> AppResult<()> {
        gate::require(actor, Operation::RemoveBook)?;

        self.repository.catalogue.delete(book_id).await?;

        tracing::info!(username = actor.username(), book_id, "Book removed");
        Ok(())
    }

    /// Restock (or, with a negative quantity, withdraw) copies of a book
    pub async fn increase_copies(
        &self,
        actor: &Actor,
        book_id: BookId,
        quantity: i32,
    ) -> AppResult<Book> {
        gate::require(actor, Operation::IncreaseCopies)?;

        let book = self
            .repository
            .catalogue
            .adjust_copies(book_id, quantity)
            .await?;

        tracing::info!(
            username = actor.username(),
            book_id,
            quantity,
            available = book.available_copies,
            "Book copies updated"
        );
        Ok(book)
    }
}
