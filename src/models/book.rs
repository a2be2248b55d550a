//! Book catalogue model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::not_blank;

/// Store-assigned book identifier
pub type BookId = i32;

/// Catalogue record with its copy counts
///
/// `available_copies` never drops below zero, and
/// `available_copies + open loans == total_copies`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub available_copies: i32,
    pub total_copies: i32,
}

/// New catalogue entry
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewBook {
    #[validate(custom(function = "not_blank"))]
    pub title: String,
    #[validate(custom(function = "not_blank"))]
    pub author: String,
    #[validate(range(min = 0, message = "Number of copies cannot be negative"))]
    pub copies: i32,
}

impl NewBook {
    pub fn into_book(self, id: BookId) -> Book {
        Book {
            id,
            title: self.title,
            author: self.author,
            available_copies: self.copies,
            total_copies: self.copies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_book(title: &str, author: &str, copies: i32) -> NewBook {
        NewBook {
            title: title.to_string(),
            author: author.to_string(),
            copies,
        }
    }

    #[test]
    fn zero_copies_is_valid() {
        assert!(new_book("T", "A", 0).validate().is_ok());
    }

    #[test]
    fn rejects_blank_fields_and_negative_copies() {
        assert!(new_book("", "A", 1).validate().is_err());
        assert!(new_book("T", "  ", 1).validate().is_err());
        assert!(new_book("T", "A", -1).validate().is_err());
    }

    #[test]
    fn new_book_starts_fully_available() {
        let book = new_book("Dune", "Herbert", 3).into_book(7);
        assert_eq!(book.id, 7);
        assert_eq!(book.available_copies, 3);
        assert_eq!(book.total_copies, 3);
    }
}
