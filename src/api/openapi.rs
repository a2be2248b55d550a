//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, health, loans};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lending Inventory API",
        version = "0.1.0",
        description = "Book copies, loans and catalogue administration"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        health::health_check,
        // Auth
        auth::register,
        auth::login,
        // Books
        books::list_books,
        books::add_book,
        books::remove_book,
        books::increase_copies,
        // Loans
        books::borrow_book,
        books::return_book,
        loans::my_loans,
    ),
    components(
        schemas(
            auth::RegisterResponse,
            auth::LoginRequest,
            auth::LoginResponse,
            books::CopiesRequest,
            crate::models::Role,
            crate::models::RegisterUser,
            crate::models::Book,
            crate::models::NewBook,
            crate::models::Loan,
            health::HealthResponse,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration and login"),
        (name = "books", description = "Catalogue administration"),
        (name = "loans", description = "Borrowing and returning")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
