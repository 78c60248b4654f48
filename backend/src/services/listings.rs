use lambda_http::tracing;
use ulid::Ulid;

use crate::{
    errors::HandlerError,
    models::{
        auth::Claim,
        listing::{
            require_positive, CreateListingRequest, Listing, ListingStatus, QualityGrade,
            UpdateListingRequest,
        },
    },
    store::MarketStore,
    utils::now_millis,
};

pub async fn get_listing(store: &dyn MarketStore, id: Ulid) -> Result<Listing, HandlerError> {
    store
        .get_listing(id)
        .await?
        .ok_or_else(|| HandlerError::not_found(format!("listing {}", id)))
}

/// Loads a listing the caller owns.
async fn owned_listing(
    store: &dyn MarketStore,
    caller: &Claim,
    id: Ulid,
) -> Result<Listing, HandlerError> {
    let listing = get_listing(store, id).await?;
    if listing.seller_id != caller.id {
        return Err(HandlerError::Forbidden(format!(
            "listing {} belongs to another seller",
            id
        )));
    }
    Ok(listing)
}

pub async fn create_listing(
    store: &dyn MarketStore,
    caller: &Claim,
    req: CreateListingRequest,
) -> Result<Listing, HandlerError> {
    require_positive("quantity", req.quantity_quintals)?;
    require_positive("price", req.expected_price_per_quintal)?;
    if req.crop_category_id.is_empty() || req.crop_variety_id.is_empty() {
        return Err(HandlerError::InvalidInput(
            "crop category and variety are required".to_string(),
        ));
    }

    let listing = Listing::new_from_request(caller.id.clone(), req, now_millis());
    store.insert_listing(&listing).await?;

    tracing::info!(
        "Seller {} created listing {} ({})",
        caller.id,
        listing.id,
        listing.status
    );
    Ok(listing)
}

pub async fn listings_by_seller(
    store: &dyn MarketStore,
    seller_id: &str,
) -> Result<Vec<Listing>, HandlerError> {
    store.listings_by_seller(seller_id).await
}

/// Listings buyers can currently bid on.
pub async fn open_listings(store: &dyn MarketStore) -> Result<Vec<Listing>, HandlerError> {
    store
        .listings_by_status(&[ListingStatus::Active, ListingStatus::Verified])
        .await
}

async fn move_listing(
    store: &dyn MarketStore,
    caller: &Claim,
    id: Ulid,
    next: ListingStatus,
) -> Result<Listing, HandlerError> {
    let listing = owned_listing(store, caller, id).await?;
    let updated = listing.transition(next, now_millis())?;
    store.replace_listing(&updated).await?;

    tracing::info!("Listing {}: {} -> {}", id, listing.status, updated.status);
    Ok(updated)
}

pub async fn publish_listing(
    store: &dyn MarketStore,
    caller: &Claim,
    id: Ulid,
) -> Result<Listing, HandlerError> {
    move_listing(store, caller, id, ListingStatus::Active).await
}

pub async fn request_verification(
    store: &dyn MarketStore,
    caller: &Claim,
    id: Ulid,
) -> Result<Listing, HandlerError> {
    move_listing(store, caller, id, ListingStatus::PendingVerification).await
}

pub async fn verify_listing(
    store: &dyn MarketStore,
    caller: &Claim,
    id: Ulid,
    grade: QualityGrade,
) -> Result<Listing, HandlerError> {
    if !caller.role.can_assay() {
        return Err(HandlerError::Forbidden(format!(
            "role {} cannot verify listings",
            caller.role
        )));
    }

    let listing = get_listing(store, id).await?;
    let updated = listing.verify(grade, &caller.id, now_millis())?;
    store.replace_listing(&updated).await?;

    tracing::info!("Assayer {} verified listing {} as {:?}", caller.id, id, grade);
    Ok(updated)
}

pub async fn update_listing(
    store: &dyn MarketStore,
    caller: &Claim,
    id: Ulid,
    req: UpdateListingRequest,
) -> Result<Listing, HandlerError> {
    let listing = owned_listing(store, caller, id).await?;
    let updated = listing.apply_update(req, now_millis())?;
    store.replace_listing(&updated).await?;

    tracing::info!("Listing {} updated to version {}", id, updated.version);
    Ok(updated)
}

pub async fn cancel_listing(
    store: &dyn MarketStore,
    caller: &Claim,
    id: Ulid,
) -> Result<Listing, HandlerError> {
    let listing = owned_listing(store, caller, id).await?;
    let updated = listing.cancel(now_millis())?;
    store.replace_listing(&updated).await?;

    tracing::info!("Listing {} cancelled", id);
    Ok(updated)
}

/// Marks a listing sold. Fails once the listing is sold or cancelled.
pub async fn mark_sold(store: &dyn MarketStore, id: Ulid) -> Result<Listing, HandlerError> {
    let listing = get_listing(store, id).await?;
    let updated = listing.mark_sold(now_millis())?;
    store.replace_listing(&updated).await?;

    tracing::info!("Listing {} marked sold", id);
    Ok(updated)
}

/// `mark_sold` on behalf of the owning seller.
pub async fn seller_mark_sold(
    store: &dyn MarketStore,
    caller: &Claim,
    id: Ulid,
) -> Result<Listing, HandlerError> {
    owned_listing(store, caller, id).await?;
    mark_sold(store, id).await
}
