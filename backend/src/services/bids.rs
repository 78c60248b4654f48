use lambda_http::tracing;
use ulid::Ulid;

use crate::{
    errors::HandlerError,
    models::{
        auth::Claim,
        bid::{Bid, PlaceBidRequest},
        listing::require_positive,
    },
    store::MarketStore,
    utils::now_millis,
};

use super::listings::get_listing;

pub async fn get_bid(store: &dyn MarketStore, id: Ulid) -> Result<Bid, HandlerError> {
    store
        .get_bid(id)
        .await?
        .ok_or_else(|| HandlerError::not_found(format!("bid {}", id)))
}

pub async fn create_bid(
    store: &dyn MarketStore,
    caller: &Claim,
    listing_id: Ulid,
    req: PlaceBidRequest,
) -> Result<Bid, HandlerError> {
    require_positive("price", req.price_per_quintal)?;
    require_positive("quantity", req.quantity_quintals)?;

    let listing = get_listing(store, listing_id).await?;
    if !listing.status.is_biddable() {
        return Err(HandlerError::ListingNotBiddable(listing.id, listing.status));
    }
    if listing.seller_id == caller.id {
        return Err(HandlerError::Forbidden(
            "sellers cannot bid on their own listing".to_string(),
        ));
    }
    if req.quantity_quintals > listing.quantity_quintals {
        return Err(HandlerError::InvalidInput(format!(
            "quantity must be between 0 and {} quintals",
            listing.quantity_quintals
        )));
    }

    let bid = Bid::new_from_request(listing_id, caller.id.clone(), req, now_millis());
    store.insert_bid(&bid).await?;

    tracing::info!(
        "Bidder {} placed bid {} on listing {}: {} x {}",
        caller.id,
        bid.id,
        listing_id,
        bid.quantity_quintals,
        bid.bid_price_per_quintal
    );
    Ok(bid)
}

pub async fn reject_bid(
    store: &dyn MarketStore,
    caller: &Claim,
    bid_id: Ulid,
) -> Result<Bid, HandlerError> {
    let bid = get_bid(store, bid_id).await?;
    let listing = get_listing(store, bid.listing_id).await?;
    if listing.seller_id != caller.id {
        return Err(HandlerError::Forbidden(
            "only the listing's seller can reject its bids".to_string(),
        ));
    }

    let rejected = bid.reject(now_millis())?;
    store.replace_bid(&rejected).await?;

    tracing::info!("Bid {} on listing {} rejected", bid_id, listing.id);
    Ok(rejected)
}

pub async fn bids_for_listing(
    store: &dyn MarketStore,
    listing_id: Ulid,
) -> Result<Vec<Bid>, HandlerError> {
    get_listing(store, listing_id).await?;
    store.bids_for_listing(listing_id).await
}

/// Moves every pending bid whose validity ended before `now` to expired.
/// Bids that change concurrently are skipped and picked up by the next sweep.
pub async fn expire_stale_bids(
    store: &dyn MarketStore,
    now: u64,
) -> Result<Vec<Ulid>, HandlerError> {
    let mut expired = Vec::new();
    for bid in store.pending_bids().await? {
        if !bid.is_expired_at(now) {
            continue;
        }
        let next = bid.expire(now)?;
        match store.replace_bid(&next).await {
            Ok(()) => expired.push(bid.id),
            Err(HandlerError::ConcurrencyConflict(msg)) => {
                tracing::warn!("Skipping bid {} during expiry sweep: {}", bid.id, msg);
            }
            Err(e) => return Err(e),
        }
    }

    tracing::info!("Expiry sweep moved {} bids to expired", expired.len());
    Ok(expired)
}
