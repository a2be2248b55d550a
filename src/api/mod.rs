//! HTTP handlers exposing the actor-facing API

pub mod auth;
pub mod books;
pub mod health;
pub mod loans;
pub mod openapi;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::Actor, AppState};

/// Extractor for the authenticated actor from a bearer JWT
pub struct AuthenticatedActor(pub Actor);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedActor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let actor = state.services.auth.verify_token(token)?;
        Ok(AuthenticatedActor(actor))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        .route("/health", get(health::health_check))
        // Authentication
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        // Catalogue
        .route("/books", get(books::list_books).post(books::add_book))
        .route("/books/:id", delete(books::remove_book))
        .route("/books/:id/copies", post(books::increase_copies))
        // Loans
        .route("/books/:id/borrow", post(books::borrow_book))
        .route("/books/:id/return", post(books::return_book))
        .route("/loans", get(loans::my_loans))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
