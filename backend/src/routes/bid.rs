use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    Extension,
};
use ulid::Ulid;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{
    errors::HandlerError,
    models::{auth::Claim, bid::Bid, transaction::Transaction},
    services::{bids, settlement},
    state::AppState,
};

pub fn router() -> OpenApiRouter<Arc<AppState>> {
    OpenApiRouter::new()
        .routes(routes!(get_bid))
        .routes(routes!(seller_accept_bid))
        .routes(routes!(seller_reject_bid))
}

/// Get a bid by bidId.
#[utoipa::path(
    get,
    path = "/v1/bid/{bidId}",
    tag = "Bid",
    params(
        ("bidId" = String, Path, description = "Bid ID to get", format = Ulid),
    ),
    responses(
        (status = OK, description = "Returns specified bid", body = Bid),
        (status = NOT_FOUND, description = "Bid not found", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
    security(
        ("http-jwt" = []),
    ),
)]
async fn get_bid(
    State(state): State<Arc<AppState>>,
    Path(bid_id): Path<Ulid>,
) -> Result<Json<Bid>, HandlerError> {
    Ok(Json(bids::get_bid(state.store.as_ref(), bid_id).await?))
}

/// Accept a bid, creating its transaction.
#[utoipa::path(
    post,
    path = "/v1/bid/{bidId}/accept",
    tag = "Bid",
    params(
        ("bidId" = String, Path, description = "Bid ID to accept", format = Ulid),
    ),
    responses(
        (status = OK, description = "Bid accepted, returns the new transaction", body = Transaction),
        (status = FORBIDDEN, description = "Not the listing's seller", body = HandlerError),
        (status = NOT_FOUND, description = "Bid or listing not found", body = HandlerError),
        (status = CONFLICT, description = "Bid not pending, expired, or another bid won", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
    security(
        ("http-jwt" = []),
    ),
)]
async fn seller_accept_bid(
    Extension(claim): Extension<Claim>,
    State(state): State<Arc<AppState>>,
    Path(bid_id): Path<Ulid>,
) -> Result<Json<Transaction>, HandlerError> {
    Ok(Json(
        settlement::accept_bid_and_settle(state.store.as_ref(), &claim, bid_id).await?,
    ))
}

/// Reject a bid.
#[utoipa::path(
    post,
    path = "/v1/bid/{bidId}/reject",
    tag = "Bid",
    params(
        ("bidId" = String, Path, description = "Bid ID to reject", format = Ulid),
    ),
    responses(
        (status = OK, description = "Bid rejected", body = Bid),
        (status = FORBIDDEN, description = "Not the listing's seller", body = HandlerError),
        (status = NOT_FOUND, description = "Bid or listing not found", body = HandlerError),
        (status = CONFLICT, description = "Bid not pending", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
    security(
        ("http-jwt" = []),
    ),
)]
async fn seller_reject_bid(
    Extension(claim): Extension<Claim>,
    State(state): State<Arc<AppState>>,
    Path(bid_id): Path<Ulid>,
) -> Result<Json<Bid>, HandlerError> {
    Ok(Json(
        bids::reject_bid(state.store.as_ref(), &claim, bid_id).await?,
    ))
}
