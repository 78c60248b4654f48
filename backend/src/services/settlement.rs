use lambda_http::tracing;
use ulid::Ulid;

use crate::{
    errors::HandlerError,
    models::{auth::Claim, transaction::Transaction},
    store::MarketStore,
    utils::now_millis,
};

use super::{bids::get_bid, listings::get_listing};

/// Accepts a pending bid and creates its transaction.
///
/// The accepted bid, the listing (recording the accepted bid, and sold when
/// the bid covers the whole quantity) and the new pending transaction are
/// committed in one atomic write guarded by the versions read here. If
/// another acceptance on the same listing got there first, this fails with
/// `ConcurrencyConflict` and nothing is written.
pub async fn accept_bid_and_settle(
    store: &dyn MarketStore,
    caller: &Claim,
    bid_id: Ulid,
) -> Result<Transaction, HandlerError> {
    let bid = get_bid(store, bid_id).await?;
    let listing = get_listing(store, bid.listing_id).await?;
    if listing.seller_id != caller.id {
        return Err(HandlerError::Forbidden(
            "only the listing's seller can accept its bids".to_string(),
        ));
    }

    let now = now_millis();
    let accepted = bid.accept(now)?;
    let settled_listing = listing.record_acceptance(&accepted, now)?;
    let transaction = Transaction::from_accepted_bid(&listing, &accepted, now);

    if let Err(e) = store
        .settle(&accepted, &settled_listing, &transaction)
        .await
    {
        if let HandlerError::ConcurrencyConflict(_) = &e {
            tracing::warn!("Acceptance of bid {} lost a race: {}", bid_id, e);
        }
        return Err(e);
    }

    tracing::info!(
        "Bid {} accepted: transaction {} for {} on listing {} ({})",
        bid_id,
        transaction.id,
        transaction.total_amount,
        listing.id,
        settled_listing.status
    );
    Ok(transaction)
}
