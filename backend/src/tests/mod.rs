mod api;
mod settlement;
mod transaction;

use std::sync::Arc;

use axum::{body::Body, http::Request, response::Response};
use lambda_http::Error;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    constants::JWT_AUDIENCE,
    models::{
        auth::Claim,
        bid::{Bid, PlaceBidRequest},
        listing::{CreateListingRequest, Listing},
        user::UserRole,
    },
    services::{bids, listings},
    state::AppState,
    store::MemoryStore,
};

const TEST_JWT_SECRET: &str = "YWdyaS1tYXJrZXQtdGVzdC1zaWduaW5nLWtleS0wMTIzNDU2Nzg5";

fn test_state() -> Result<(Arc<AppState>, Arc<MemoryStore>), Error> {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::with_store(store.clone(), TEST_JWT_SECRET)?;
    Ok((Arc::new(state), store))
}

fn claim(id: &str, role: UserRole) -> Claim {
    let now = chrono::Utc::now().timestamp() as u64;
    Claim {
        id: id.to_string(),
        role,
        aud: JWT_AUDIENCE.to_string(),
        exp: now + 3600,
        iat: now,
    }
}

fn farmer() -> Claim {
    claim("farmer_ramesh", UserRole::Farmer)
}

fn buyer() -> Claim {
    claim("buyer_anita", UserRole::Buyer)
}

fn trader() -> Claim {
    claim("trader_vikram", UserRole::Trader)
}

fn sign(state: &AppState, claim: &Claim) -> Result<String, Error> {
    Ok(jsonwebtoken::encode(&state.jwt.2, claim, &state.jwt.0)?)
}

fn quintals(n: i64) -> Decimal {
    Decimal::from(n)
}

fn listing_request(quantity: i64) -> CreateListingRequest {
    CreateListingRequest {
        crop_category_id: "cereals".to_string(),
        crop_variety_id: "wheat-sharbati".to_string(),
        description: Some("Sun dried, cleaned".to_string()),
        quantity_quintals: quintals(quantity),
        expected_price_per_quintal: quintals(2200),
        quality_grade: None,
        pickup_district: "Sehore".to_string(),
        pickup_state: "Madhya Pradesh".to_string(),
        harvest_date: None,
        draft: false,
    }
}

fn bid_request(price: i64, quantity: i64) -> PlaceBidRequest {
    PlaceBidRequest {
        price_per_quintal: quintals(price),
        quantity_quintals: quintals(quantity),
        message: None,
    }
}

async fn seed_listing(store: &MemoryStore, quantity: i64) -> Listing {
    listings::create_listing(store, &farmer(), listing_request(quantity))
        .await
        .unwrap()
}

async fn seed_bid(store: &MemoryStore, listing: &Listing, bidder: &Claim, quantity: i64) -> Bid {
    bids::create_bid(store, bidder, listing.id, bid_request(2250, quantity))
        .await
        .unwrap()
}

async fn parse_resp<T: DeserializeOwned>(resp: Response<Body>) -> Result<T, Error> {
    let data = axum::body::to_bytes(resp.into_body(), usize::MAX).await?;
    let res: T = serde_json::from_slice(&data)?;

    Ok(res)
}

fn build_request<T: Serialize>(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<T>,
) -> Result<Request<Body>, Error> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let req = match body {
        Some(v) => {
            let content = serde_json::to_string(&v)?;
            builder
                .header("Content-Type", "application/json")
                .body(Body::new(content))
        }
        None => builder.body(Body::empty()),
    }?;
    Ok(req)
}
