//! Catalogue and borrowing endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{Book, BookId, Loan, NewBook},
    AppState,
};

use super::AuthenticatedActor;

/// Copy adjustment request; negative quantities withdraw copies
#[derive(Deserialize, ToSchema)]
pub struct CopiesRequest {
    pub quantity: i32,
}

/// List every book with its available copies
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Catalogue snapshot", body = Vec<Book>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> AppResult<Json<Vec<Book>>> {
    let books = state.services.inventory.list_available(&actor).await?;
    Ok(Json(books))
}

/// Add a new book (administrators only)
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = NewBook,
    responses(
        (status = 201, description = "Book added", body = Book),
        (status = 400, description = "Invalid title, author or copies"),
        (status = 403, description = "Operation not permitted")
    )
)]
pub async fn add_book(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(request): Json<NewBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let book = state
        .services
        .inventory
        .add_book(&actor, &request.title, &request.author, request.copies)
        .await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// Remove a book with no copies on loan (administrators only)
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book removed"),
        (status = 403, description = "Operation not permitted"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Copies still on loan")
    )
)]
pub async fn remove_book(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<BookId>,
) -> AppResult<StatusCode> {
    state.services.inventory.remove_book(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Restock or withdraw copies (administrators only)
#[utoipa::path(
    post,
    path = "/books/{id}/copies",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = CopiesRequest,
    responses(
        (status = 200, description = "Updated book", body = Book),
        (status = 403, description = "Operation not permitted"),
        (status = 404, description = "Book not found"),
        (status = 422, description = "Available copies would go negative")
    )
)]
pub async fn increase_copies(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<BookId>,
    Json(request): Json<CopiesRequest>,
) -> AppResult<Json<Book>> {
    let book = state
        .services
        .inventory
        .increase_copies(&actor, id, request.quantity)
        .await?;
    Ok(Json(book))
}

/// Borrow one copy (borrowers only)
#[utoipa::path(
    post,
    path = "/books/{id}/borrow",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 201, description = "Loan opened", body = Loan),
        (status = 403, description = "Operation not permitted"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "No copy available")
    )
)]
pub async fn borrow_book(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<BookId>,
) -> AppResult<(StatusCode, Json<Loan>)> {
    let loan = state.services.inventory.borrow(&actor, id).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Return a borrowed copy (borrowers only)
#[utoipa::path(
    post,
    path = "/books/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Loan closed", body = Loan),
        (status = 403, description = "Operation not permitted"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "No open loan on this book")
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<BookId>,
) -> AppResult<Json<Loan>> {
    let loan = state.services.inventory.return_book(&actor, id).await?;
    Ok(Json(loan))
}
