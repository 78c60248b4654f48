use std::sync::Arc;

use axum::{
    extract::{Json, State},
    Extension,
};
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{
    errors::HandlerError,
    models::{auth::Claim, bid::ExpireBidsResponse, user::UserRole},
    services::bids,
    state::AppState,
    utils::now_millis,
};

use super::check_role;

pub fn router() -> OpenApiRouter<Arc<AppState>> {
    OpenApiRouter::new().routes(routes!(admin_expire_bids))
}

/// Expire every pending bid past its validity.
#[utoipa::path(
    post,
    path = "/v1/admin/expire-bids",
    tag = "Admin",
    responses(
        (status = OK, description = "Expired bid ids", body = ExpireBidsResponse),
        (status = FORBIDDEN, description = "Not an admin", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
    security(
        ("http-jwt" = []),
    ),
)]
async fn admin_expire_bids(
    Extension(claim): Extension<Claim>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ExpireBidsResponse>, HandlerError> {
    check_role(&claim, UserRole::Admin)?;

    let expired = bids::expire_stale_bids(state.store.as_ref(), now_millis()).await?;
    Ok(Json(ExpireBidsResponse { expired }))
}
