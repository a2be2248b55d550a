//! Loan listing endpoint

use axum::{extract::State, Json};

use crate::{error::AppResult, models::Loan, AppState};

use super::AuthenticatedActor;

/// Open loans of the calling borrower
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's open loans, oldest first", body = Vec<Loan>),
        (status = 403, description = "Operation not permitted")
    )
)]
pub async fn my_loans(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> AppResult<Json<Vec<Loan>>> {
    let loans = state.services.inventory.my_loans(&actor).await?;
    Ok(Json(loans))
}
