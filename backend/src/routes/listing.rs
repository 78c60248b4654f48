use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    Extension,
};
use ulid::Ulid;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{
    errors::HandlerError,
    models::{
        auth::Claim,
        bid::{Bid, PlaceBidRequest},
        listing::{CreateListingRequest, Listing, UpdateListingRequest, VerifyListingRequest},
    },
    services::{bids, listings},
    state::AppState,
};

/// Routes that need a caller.
pub fn router() -> OpenApiRouter<Arc<AppState>> {
    OpenApiRouter::new()
        .routes(routes!(seller_get_owned_listings, seller_create_listing))
        .routes(routes!(seller_update_listing))
        .routes(routes!(seller_publish_listing))
        .routes(routes!(seller_request_verification))
        .routes(routes!(assayer_verify_listing))
        .routes(routes!(seller_cancel_listing))
        .routes(routes!(seller_mark_sold))
        .routes(routes!(get_listing_bids, buyer_place_bid))
}

/// Anonymous browsing.
pub fn public_router() -> OpenApiRouter<Arc<AppState>> {
    OpenApiRouter::new()
        .routes(routes!(get_open_listings))
        .routes(routes!(get_listing))
}

/// Get all open listings.
#[utoipa::path(
    get,
    path = "/v1/market/listing",
    tag = "Market",
    responses(
        (status = OK, description = "Active and verified listings", body = Vec<Listing>),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
)]
async fn get_open_listings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Listing>>, HandlerError> {
    Ok(Json(listings::open_listings(state.store.as_ref()).await?))
}

/// Get a listing by listingId.
#[utoipa::path(
    get,
    path = "/v1/market/listing/{listingId}",
    tag = "Market",
    params(
        ("listingId" = String, Path, description = "Listing ID to get", format = Ulid),
    ),
    responses(
        (status = OK, description = "Returns specified listing", body = Listing),
        (status = NOT_FOUND, description = "Listing not found", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
)]
async fn get_listing(
    State(state): State<Arc<AppState>>,
    Path(listing_id): Path<Ulid>,
) -> Result<Json<Listing>, HandlerError> {
    Ok(Json(
        listings::get_listing(state.store.as_ref(), listing_id).await?,
    ))
}

/// Get all of the caller's listings.
#[utoipa::path(
    get,
    path = "/v1/listing",
    tag = "Listing",
    responses(
        (status = OK, description = "Returns all seller listings", body = Vec<Listing>),
        (status = FORBIDDEN, description = "Missing or invalid token", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
    security(
        ("http-jwt" = []),
    ),
)]
async fn seller_get_owned_listings(
    Extension(claim): Extension<Claim>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Listing>>, HandlerError> {
    Ok(Json(
        listings::listings_by_seller(state.store.as_ref(), &claim.id).await?,
    ))
}

/// Create a listing.
#[utoipa::path(
    post,
    path = "/v1/listing",
    tag = "Listing",
    request_body = CreateListingRequest,
    responses(
        (status = OK, description = "Listing created", body = Listing),
        (status = BAD_REQUEST, description = "Non-positive quantity or price", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
    security(
        ("http-jwt" = []),
    ),
)]
async fn seller_create_listing(
    Extension(claim): Extension<Claim>,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateListingRequest>,
) -> Result<Json<Listing>, HandlerError> {
    Ok(Json(
        listings::create_listing(state.store.as_ref(), &claim, payload).await?,
    ))
}

/// Update quantity, price or description of a listing.
#[utoipa::path(
    post,
    path = "/v1/listing/{listingId}",
    tag = "Listing",
    params(
        ("listingId" = String, Path, description = "Listing ID to update", format = Ulid),
    ),
    request_body = UpdateListingRequest,
    responses(
        (status = OK, description = "Update listing success", body = Listing),
        (status = BAD_REQUEST, description = "Bad update request", body = HandlerError),
        (status = FORBIDDEN, description = "Not the seller", body = HandlerError),
        (status = CONFLICT, description = "Listing frozen or changed concurrently", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
    security(
        ("http-jwt" = []),
    ),
)]
async fn seller_update_listing(
    Extension(claim): Extension<Claim>,
    State(state): State<Arc<AppState>>,
    Path(listing_id): Path<Ulid>,
    Json(payload): Json<UpdateListingRequest>,
) -> Result<Json<Listing>, HandlerError> {
    Ok(Json(
        listings::update_listing(state.store.as_ref(), &claim, listing_id, payload).await?,
    ))
}

/// Publish a draft listing.
#[utoipa::path(
    post,
    path = "/v1/listing/{listingId}/publish",
    tag = "Listing",
    params(
        ("listingId" = String, Path, description = "Listing ID to publish", format = Ulid),
    ),
    responses(
        (status = OK, description = "Listing published", body = Listing),
        (status = FORBIDDEN, description = "Not the seller", body = HandlerError),
        (status = NOT_FOUND, description = "Listing not found", body = HandlerError),
        (status = CONFLICT, description = "Listing is not a draft", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
    security(
        ("http-jwt" = []),
    ),
)]
async fn seller_publish_listing(
    Extension(claim): Extension<Claim>,
    State(state): State<Arc<AppState>>,
    Path(listing_id): Path<Ulid>,
) -> Result<Json<Listing>, HandlerError> {
    Ok(Json(
        listings::publish_listing(state.store.as_ref(), &claim, listing_id).await?,
    ))
}

/// Ask for a quality assay of an active listing.
#[utoipa::path(
    post,
    path = "/v1/listing/{listingId}/request-verification",
    tag = "Listing",
    params(
        ("listingId" = String, Path, description = "Listing ID to verify", format = Ulid),
    ),
    responses(
        (status = OK, description = "Verification requested", body = Listing),
        (status = FORBIDDEN, description = "Not the seller", body = HandlerError),
        (status = NOT_FOUND, description = "Listing not found", body = HandlerError),
        (status = CONFLICT, description = "Listing is not active", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
    security(
        ("http-jwt" = []),
    ),
)]
async fn seller_request_verification(
    Extension(claim): Extension<Claim>,
    State(state): State<Arc<AppState>>,
    Path(listing_id): Path<Ulid>,
) -> Result<Json<Listing>, HandlerError> {
    Ok(Json(
        listings::request_verification(state.store.as_ref(), &claim, listing_id).await?,
    ))
}

/// Grade a listing awaiting verification.
#[utoipa::path(
    post,
    path = "/v1/listing/{listingId}/verify",
    tag = "Listing",
    params(
        ("listingId" = String, Path, description = "Listing ID to grade", format = Ulid),
    ),
    request_body = VerifyListingRequest,
    responses(
        (status = OK, description = "Listing verified", body = Listing),
        (status = FORBIDDEN, description = "Not an assayer", body = HandlerError),
        (status = NOT_FOUND, description = "Listing not found", body = HandlerError),
        (status = CONFLICT, description = "Listing is not pending verification", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
    security(
        ("http-jwt" = []),
    ),
)]
async fn assayer_verify_listing(
    Extension(claim): Extension<Claim>,
    State(state): State<Arc<AppState>>,
    Path(listing_id): Path<Ulid>,
    Json(payload): Json<VerifyListingRequest>,
) -> Result<Json<Listing>, HandlerError> {
    Ok(Json(
        listings::verify_listing(state.store.as_ref(), &claim, listing_id, payload.grade).await?,
    ))
}

/// Cancel a listing.
#[utoipa::path(
    post,
    path = "/v1/listing/{listingId}/cancel",
    tag = "Listing",
    params(
        ("listingId" = String, Path, description = "Listing ID to cancel", format = Ulid),
    ),
    responses(
        (status = OK, description = "Listing cancelled", body = Listing),
        (status = FORBIDDEN, description = "Not the seller", body = HandlerError),
        (status = NOT_FOUND, description = "Listing not found", body = HandlerError),
        (status = CONFLICT, description = "Listing closed or has an accepted bid", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
    security(
        ("http-jwt" = []),
    ),
)]
async fn seller_cancel_listing(
    Extension(claim): Extension<Claim>,
    State(state): State<Arc<AppState>>,
    Path(listing_id): Path<Ulid>,
) -> Result<Json<Listing>, HandlerError> {
    Ok(Json(
        listings::cancel_listing(state.store.as_ref(), &claim, listing_id).await?,
    ))
}

/// Mark a listing sold outside of a bid.
#[utoipa::path(
    post,
    path = "/v1/listing/{listingId}/sold",
    tag = "Listing",
    params(
        ("listingId" = String, Path, description = "Listing ID to mark sold", format = Ulid),
    ),
    responses(
        (status = OK, description = "Listing sold", body = Listing),
        (status = FORBIDDEN, description = "Not the seller", body = HandlerError),
        (status = NOT_FOUND, description = "Listing not found", body = HandlerError),
        (status = CONFLICT, description = "Listing already sold or cancelled", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
    security(
        ("http-jwt" = []),
    ),
)]
async fn seller_mark_sold(
    Extension(claim): Extension<Claim>,
    State(state): State<Arc<AppState>>,
    Path(listing_id): Path<Ulid>,
) -> Result<Json<Listing>, HandlerError> {
    Ok(Json(
        listings::seller_mark_sold(state.store.as_ref(), &claim, listing_id).await?,
    ))
}

/// Get bids placed on a listing, newest first.
#[utoipa::path(
    get,
    path = "/v1/listing/{listingId}/bid",
    tag = "Bid",
    params(
        ("listingId" = String, Path, description = "Listing ID", format = Ulid),
    ),
    responses(
        (status = OK, description = "Bids on the listing", body = Vec<Bid>),
        (status = NOT_FOUND, description = "Listing not found", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
    security(
        ("http-jwt" = []),
    ),
)]
async fn get_listing_bids(
    State(state): State<Arc<AppState>>,
    Path(listing_id): Path<Ulid>,
) -> Result<Json<Vec<Bid>>, HandlerError> {
    Ok(Json(
        bids::bids_for_listing(state.store.as_ref(), listing_id).await?,
    ))
}

/// Place a bid on a listing.
#[utoipa::path(
    post,
    path = "/v1/listing/{listingId}/bid",
    tag = "Bid",
    params(
        ("listingId" = String, Path, description = "Listing ID to bid on", format = Ulid),
    ),
    request_body = PlaceBidRequest,
    responses(
        (status = OK, description = "Bid placed", body = Bid),
        (status = BAD_REQUEST, description = "Bad price or quantity", body = HandlerError),
        (status = FORBIDDEN, description = "Bidding on own listing", body = HandlerError),
        (status = NOT_FOUND, description = "Listing not found", body = HandlerError),
        (status = CONFLICT, description = "Listing not open for bidding", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
    security(
        ("http-jwt" = []),
    ),
)]
async fn buyer_place_bid(
    Extension(claim): Extension<Claim>,
    State(state): State<Arc<AppState>>,
    Path(listing_id): Path<Ulid>,
    Json(payload): Json<PlaceBidRequest>,
) -> Result<Json<Bid>, HandlerError> {
    Ok(Json(
        bids::create_bid(state.store.as_ref(), &claim, listing_id, payload).await?,
    ))
}
