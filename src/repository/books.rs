//! Books and loans repository for database operations
//!
//! Each mutation runs in one transaction whose validating check is part of
//! the write itself (`UPDATE ... WHERE ... RETURNING`), so concurrent callers
//! serialize on the book row instead of racing a read against a write.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Transaction};

use super::CatalogueStore;
use crate::{
    error::{AppError, AppResult},
    models::{Book, BookId, Loan, NewBook},
};

const BOOK_COLUMNS: &str = "id, title, author, available_copies, total_copies";

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn book_exists(tx: &mut Transaction<'_, Postgres>, id: BookId) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
            .bind(id)
            .fetch_one(&mut **tx)
            .await?;
        Ok(exists)
    }
}

fn not_found(id: BookId) -> AppError {
    AppError::NotFound(format!("Book with id {} not found", id))
}

#[async_trait]
impl CatalogueStore for BooksRepository {
    async fn list_all(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books ORDER BY id",
            BOOK_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    async fn find_by_id(&self, id: BookId) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE id = $1",
            BOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    async fn insert(&self, book: &NewBook) -> AppResult<BookId> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO books (title, author, available_copies, total_copies)
            VALUES ($1, $2, $3, $3)
            RETURNING id
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.copies)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn delete(&self, id: BookId) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        // Lock the row so no borrow can slip in between the loan count and the delete
        let locked: Option<i32> =
            sqlx::query_scalar("SELECT id FROM books WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(not_found(id));
        }

        let open_loans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE book_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if open_loans > 0 {
            return Err(AppError::LoansOutstanding(format!(
                "Book {} has {} copies on loan",
                id, open_loans
            )));
        }

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn adjust_copies(&self, id: BookId, delta: i32) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Book>(&format!(
            r#"
            UPDATE books
            SET available_copies = available_copies + $2,
                total_copies = total_copies + $2
            WHERE id = $1
              AND available_copies::bigint + $2 BETWEEN 0 AND 2147483647
              AND total_copies::bigint + $2 BETWEEN 0 AND 2147483647
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(id)
        .bind(delta)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(book) = updated {
            tx.commit().await?;
            return Ok(book);
        }

        if Self::book_exists(&mut tx, id).await? {
            Err(AppError::InvalidQuantity(format!(
                "Copies of book {} must stay between 0 and {}",
                id,
                i32::MAX
            )))
        } else {
            Err(not_found(id))
        }
    }

    async fn open_loan(&self, id: BookId, borrower: &str) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let decremented: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE books
            SET available_copies = available_copies - 1
            WHERE id = $1 AND available_copies > 0
            RETURNING id
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        if decremented.is_none() {
            return if Self::book_exists(&mut tx, id).await? {
                Err(AppError::Unavailable(format!(
                    "No copies of book {} are available",
                    id
                )))
            } else {
                Err(not_found(id))
            };
        }

        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (book_id, borrower, borrowed_at)
            VALUES ($1, $2, NOW())
            RETURNING id, book_id, borrower, borrowed_at
            "#,
        )
        .bind(id)
        .bind(borrower)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(loan)
    }

    async fn close_loan(&self, id: BookId, borrower: &str) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        // Returns on one book queue on its row, so each picks the oldest loan left
        let locked: Option<i32> =
            sqlx::query_scalar("SELECT id FROM books WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(not_found(id));
        }

        let closed = sqlx::query_as::<_, Loan>(
            r#"
            DELETE FROM loans
            WHERE id = (
                SELECT id FROM loans
                WHERE book_id = $1 AND borrower = $2
                ORDER BY borrowed_at, id
                LIMIT 1
            )
            RETURNING id, book_id, borrower, borrowed_at
            "#,
        )
        .bind(id)
        .bind(borrower)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::NoOpenLoan(format!("{} has no open loan on book {}", borrower, id))
        })?;

        sqlx::query("UPDATE books SET available_copies = available_copies + 1 WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(closed)
    }

    async fn open_loans(&self, borrower: &str) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            r#"
            SELECT id, book_id, borrower, borrowed_at
            FROM loans
            WHERE borrower = $1
            ORDER BY borrowed_at, id
            "#,
        )
        .bind(borrower)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    async fn open_loan_count(&self, id: BookId) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE book_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
