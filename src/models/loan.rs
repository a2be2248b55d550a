//! Loan (borrow) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::book::BookId;

/// One outstanding borrowed copy. Exists only while the copy is checked out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub book_id: BookId,
    pub borrower: String,
    pub borrowed_at: DateTime<Utc>,
}
