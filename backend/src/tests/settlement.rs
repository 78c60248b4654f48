use std::sync::Arc;

use crate::{
    errors::HandlerError,
    models::{
        bid::BidStatus,
        listing::{ListingStatus, UpdateListingRequest},
        transaction::TransactionStatus,
    },
    services::{bids, listings, settlement},
    store::{MarketStore, MemoryStore},
    tests::{bid_request, buyer, farmer, quintals, seed_bid, seed_listing, trader},
};

#[tokio::test]
async fn test_accept_full_quantity_sells_listing() {
    let store = MemoryStore::new();
    let listing = seed_listing(&store, 100).await;
    let bid = seed_bid(&store, &listing, &buyer(), 100).await;

    let transaction = settlement::accept_bid_and_settle(&store, &farmer(), bid.id)
        .await
        .unwrap();

    assert_eq!(transaction.status, TransactionStatus::Pending);
    assert_eq!(transaction.listing_id, listing.id);
    assert_eq!(transaction.bid_id, Some(bid.id));
    assert_eq!(transaction.buyer_id, buyer().id);
    assert_eq!(transaction.seller_id, farmer().id);
    assert_eq!(transaction.price_per_quintal, quintals(2250));
    assert_eq!(transaction.quantity_quintals, quintals(100));
    assert_eq!(transaction.total_amount, quintals(225_000));

    let bid = bids::get_bid(&store, bid.id).await.unwrap();
    assert_eq!(bid.status, BidStatus::Accepted);

    let listing = listings::get_listing(&store, listing.id).await.unwrap();
    assert_eq!(listing.status, ListingStatus::Sold);
    assert_eq!(listing.accepted_bid_id, Some(bid.id));

    let stored = store.get_transaction(transaction.id).await.unwrap();
    assert_eq!(stored, Some(transaction));
}

#[tokio::test]
async fn test_partial_acceptance_blocks_further_acceptance() {
    let store = MemoryStore::new();
    let listing = seed_listing(&store, 100).await;
    let first = seed_bid(&store, &listing, &buyer(), 40).await;
    let second = seed_bid(&store, &listing, &trader(), 30).await;

    let transaction = settlement::accept_bid_and_settle(&store, &farmer(), first.id)
        .await
        .unwrap();
    assert_eq!(transaction.total_amount, quintals(90_000));

    let stored = listings::get_listing(&store, listing.id).await.unwrap();
    assert_eq!(stored.status, ListingStatus::Active);
    assert_eq!(stored.accepted_bid_id, Some(first.id));
    assert_eq!(stored.quantity_quintals, quintals(100));

    let err = settlement::accept_bid_and_settle(&store, &farmer(), second.id)
        .await
        .unwrap_err();
    assert!(matches!(err, HandlerError::ConcurrencyConflict(_)));

    let second = bids::get_bid(&store, second.id).await.unwrap();
    assert_eq!(second.status, BidStatus::Pending);
    assert_eq!(store.transactions_for_user(&farmer().id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_accept_twice_fails() {
    let store = MemoryStore::new();
    let listing = seed_listing(&store, 100).await;
    let bid = seed_bid(&store, &listing, &buyer(), 100).await;

    settlement::accept_bid_and_settle(&store, &farmer(), bid.id)
        .await
        .unwrap();
    let err = settlement::accept_bid_and_settle(&store, &farmer(), bid.id)
        .await
        .unwrap_err();
    assert!(matches!(err, HandlerError::InvalidTransition(_)));
}

#[tokio::test]
async fn test_only_seller_can_accept() {
    let store = MemoryStore::new();
    let listing = seed_listing(&store, 100).await;
    let bid = seed_bid(&store, &listing, &buyer(), 100).await;

    for caller in [buyer(), trader()] {
        let err = settlement::accept_bid_and_settle(&store, &caller, bid.id)
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::Forbidden(_)));
    }

    let bid = bids::get_bid(&store, bid.id).await.unwrap();
    assert_eq!(bid.status, BidStatus::Pending);
}

#[tokio::test]
async fn test_accept_missing_bid() {
    let store = MemoryStore::new();

    let err = settlement::accept_bid_and_settle(&store, &farmer(), ulid::Ulid::new())
        .await
        .unwrap_err();
    assert!(matches!(err, HandlerError::NotFound(_)));
}

#[tokio::test]
async fn test_failed_settlement_writes_nothing() {
    let store = MemoryStore::new();
    let listing = seed_listing(&store, 100).await;
    let bid = seed_bid(&store, &listing, &buyer(), 100).await;

    store.fail_next_settle();
    let err = settlement::accept_bid_and_settle(&store, &farmer(), bid.id)
        .await
        .unwrap_err();
    assert!(matches!(err, HandlerError::HandlerError(_, _)));

    assert_eq!(bids::get_bid(&store, bid.id).await.unwrap(), bid);
    assert_eq!(
        listings::get_listing(&store, listing.id).await.unwrap(),
        listing
    );
    assert!(store.transactions_for_user(&buyer().id).await.unwrap().is_empty());

    // The failure was transient, so a retry goes through.
    settlement::accept_bid_and_settle(&store, &farmer(), bid.id)
        .await
        .unwrap();
    let listing = listings::get_listing(&store, listing.id).await.unwrap();
    assert_eq!(listing.status, ListingStatus::Sold);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_acceptances_settle_once() {
    let store = Arc::new(MemoryStore::new());
    let listing = seed_listing(&store, 100).await;
    let mut bid_ids = Vec::new();
    for bidder in [buyer(), trader()] {
        let bid = bids::create_bid(store.as_ref(), &bidder, listing.id, bid_request(2300, 100))
            .await
            .unwrap();
        bid_ids.push(bid.id);
    }

    let handles: Vec<_> = bid_ids
        .iter()
        .map(|&bid_id| {
            let store = store.clone();
            tokio::spawn(async move {
                settlement::accept_bid_and_settle(store.as_ref(), &farmer(), bid_id).await
            })
        })
        .collect();

    let mut settled = Vec::new();
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(transaction) => settled.push(transaction),
            Err(HandlerError::ConcurrencyConflict(_)) => conflicts += 1,
            Err(e) => panic!("unexpected error: {:?}", e),
        }
    }
    assert_eq!(settled.len(), 1);
    assert_eq!(conflicts, 1);

    let winner = settled[0].bid_id.unwrap();
    let listing = listings::get_listing(store.as_ref(), listing.id).await.unwrap();
    assert_eq!(listing.status, ListingStatus::Sold);
    assert_eq!(listing.accepted_bid_id, Some(winner));

    for bid_id in bid_ids {
        let bid = bids::get_bid(store.as_ref(), bid_id).await.unwrap();
        let expected = if bid_id == winner {
            BidStatus::Accepted
        } else {
            BidStatus::Pending
        };
        assert_eq!(bid.status, expected);
    }
    assert_eq!(
        store.transactions_for_user(&farmer().id).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_accept_bid_above_edited_quantity() {
    let store = MemoryStore::new();
    let listing = seed_listing(&store, 100).await;
    let large = seed_bid(&store, &listing, &buyer(), 100).await;
    let fitting = seed_bid(&store, &listing, &trader(), 50).await;

    listings::update_listing(
        &store,
        &farmer(),
        listing.id,
        UpdateListingRequest {
            quantity_quintals: Some(quintals(50)),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let err = settlement::accept_bid_and_settle(&store, &farmer(), large.id)
        .await
        .unwrap_err();
    assert!(matches!(err, HandlerError::InvalidInput(_)));

    let large = bids::get_bid(&store, large.id).await.unwrap();
    assert_eq!(large.status, BidStatus::Pending);
    let stored = listings::get_listing(&store, listing.id).await.unwrap();
    assert_eq!(stored.status, ListingStatus::Active);
    assert_eq!(stored.accepted_bid_id, None);
    assert!(store.transactions_for_user(&farmer().id).await.unwrap().is_empty());

    let transaction = settlement::accept_bid_and_settle(&store, &farmer(), fitting.id)
        .await
        .unwrap();
    assert_eq!(transaction.quantity_quintals, quintals(50));
    let stored = listings::get_listing(&store, listing.id).await.unwrap();
    assert_eq!(stored.status, ListingStatus::Sold);
}

#[tokio::test]
async fn test_accept_while_under_verification() {
    let store = MemoryStore::new();
    let listing = seed_listing(&store, 100).await;
    let bid = seed_bid(&store, &listing, &buyer(), 100).await;

    listings::request_verification(&store, &farmer(), listing.id)
        .await
        .unwrap();

    let err = settlement::accept_bid_and_settle(&store, &farmer(), bid.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HandlerError::ListingNotBiddable(_, ListingStatus::PendingVerification)
    ));

    let bid = bids::get_bid(&store, bid.id).await.unwrap();
    assert_eq!(bid.status, BidStatus::Pending);
}
