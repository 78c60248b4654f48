use axum::http::StatusCode;
use lambda_http::{tower::ServiceExt, Error};

use crate::{
    create_service,
    errors::ErrorResponse,
    models::{
        bid::{Bid, BidStatus},
        listing::{Listing, ListingStatus},
        transaction::{Transaction, TransactionStatus},
    },
    tests::{bid_request, build_request, buyer, farmer, listing_request, parse_resp, quintals, sign, test_state},
};

#[tokio::test]
async fn test_health_check() -> Result<(), Error> {
    let (state, _) = test_state()?;
    let service = create_service(state).await?;

    let request = build_request::<()>("GET", "/v1/health", None, None)?;
    let response = service.oneshot(request).await?;

    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_openapi_document() -> Result<(), Error> {
    let (state, _) = test_state()?;
    let service = create_service(state).await?;

    let request = build_request::<()>("GET", "/v1/openapi.json", None, None)?;
    let response = service.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let doc: serde_json::Value = parse_resp(response).await?;
    assert!(doc["paths"]["/v1/bid/{bidId}/accept"].is_object());
    assert!(doc["paths"]["/v1/market/listing"].is_object());
    Ok(())
}

#[tokio::test]
async fn test_protected_routes_need_token() -> Result<(), Error> {
    let (state, _) = test_state()?;
    let service = create_service(state).await?;

    let request = build_request("POST", "/v1/listing", None, Some(listing_request(10)))?;
    let response = service.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let request = build_request::<()>("GET", "/v1/transaction", Some("not-a-jwt"), None)?;
    let response = service.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: ErrorResponse = parse_resp(response).await?;
    assert_eq!(body.status, 403);
    Ok(())
}

#[tokio::test]
async fn test_bid_to_transaction_flow() -> Result<(), Error> {
    let (state, _) = test_state()?;
    let service = create_service(state.clone()).await?;
    let seller_token = sign(&state, &farmer())?;
    let buyer_token = sign(&state, &buyer())?;

    let request = build_request(
        "POST",
        "/v1/listing",
        Some(&seller_token),
        Some(listing_request(100)),
    )?;
    let response = service.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let listing: Listing = parse_resp(response).await?;
    assert_eq!(listing.status, ListingStatus::Active);

    let request = build_request(
        "POST",
        &format!("/v1/listing/{}/bid", listing.id),
        Some(&buyer_token),
        Some(bid_request(2400, 100)),
    )?;
    let response = service.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let bid: Bid = parse_resp(response).await?;
    assert_eq!(bid.status, BidStatus::Pending);

    // Buyers cannot accept their own bid.
    let request = build_request::<()>(
        "POST",
        &format!("/v1/bid/{}/accept", bid.id),
        Some(&buyer_token),
        None,
    )?;
    let response = service.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let request = build_request::<()>(
        "POST",
        &format!("/v1/bid/{}/accept", bid.id),
        Some(&seller_token),
        None,
    )?;
    let response = service.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let transaction: Transaction = parse_resp(response).await?;
    assert_eq!(transaction.status, TransactionStatus::Pending);
    assert_eq!(transaction.total_amount, quintals(240_000));

    let request = build_request::<()>(
        "GET",
        &format!("/v1/market/listing/{}", listing.id),
        None,
        None,
    )?;
    let response = service.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let listing: Listing = parse_resp(response).await?;
    assert_eq!(listing.status, ListingStatus::Sold);
    assert_eq!(listing.accepted_bid_id, Some(bid.id));

    let request = build_request::<()>(
        "GET",
        &format!("/v1/transaction/{}", transaction.id),
        Some(&buyer_token),
        None,
    )?;
    let response = service.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);

    // A second acceptance loses against the recorded one.
    let request = build_request::<()>(
        "POST",
        &format!("/v1/bid/{}/accept", bid.id),
        Some(&seller_token),
        None,
    )?;
    let response = service.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn test_bad_bid_is_bad_request() -> Result<(), Error> {
    let (state, store) = test_state()?;
    let service = create_service(state.clone()).await?;
    let listing = crate::tests::seed_listing(&store, 10).await;
    let token = sign(&state, &buyer())?;

    let request = build_request(
        "POST",
        &format!("/v1/listing/{}/bid", listing.id),
        Some(&token),
        Some(bid_request(2400, 11)),
    )?;
    let response = service.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = parse_resp(response).await?;
    assert_eq!(body.status, 400);
    assert_eq!(body.inner_status, None);

    let request = build_request(
        "POST",
        &format!("/v1/listing/{}/bid", ulid::Ulid::new()),
        Some(&token),
        Some(bid_request(2400, 1)),
    )?;
    let response = service.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}
