use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use axum::http::StatusCode;
use tokio::sync::Mutex;
use ulid::Ulid;

use crate::{
    errors::HandlerError,
    models::{
        bid::{Bid, BidStatus},
        listing::{Listing, ListingStatus},
        transaction::Transaction,
    },
};

use super::{expected_version, newest_first, MarketStore};

#[derive(Default)]
struct Tables {
    listings: HashMap<Ulid, Listing>,
    bids: HashMap<Ulid, Bid>,
    transactions: HashMap<Ulid, Transaction>,
}

/// Process-local store. One lock guards all three tables, so a settlement
/// commits as a unit.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_next_settle: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `settle` call fail after its preconditions passed but
    /// before anything is written.
    #[cfg(test)]
    pub fn fail_next_settle(&self) {
        self.fail_next_settle.store(true, Ordering::SeqCst);
    }
}

fn check_insert<T>(table: &HashMap<Ulid, T>, id: Ulid, kind: &str) -> Result<(), HandlerError> {
    if table.contains_key(&id) {
        return Err(HandlerError::ConcurrencyConflict(format!(
            "{} {} already exists",
            kind, id
        )));
    }
    Ok(())
}

fn check_version(
    stored: Option<u64>,
    next: u64,
    kind: &str,
    id: Ulid,
) -> Result<(), HandlerError> {
    match stored {
        Some(v) if v == expected_version(next) => Ok(()),
        _ => Err(HandlerError::ConcurrencyConflict(format!(
            "{} {} changed since it was read",
            kind, id
        ))),
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn get_listing(&self, id: Ulid) -> Result<Option<Listing>, HandlerError> {
        Ok(self.tables.lock().await.listings.get(&id).cloned())
    }

    async fn insert_listing(&self, listing: &Listing) -> Result<(), HandlerError> {
        let mut tables = self.tables.lock().await;
        check_insert(&tables.listings, listing.id, "listing")?;
        tables.listings.insert(listing.id, listing.clone());
        Ok(())
    }

    async fn replace_listing(&self, listing: &Listing) -> Result<(), HandlerError> {
        let mut tables = self.tables.lock().await;
        let stored = tables.listings.get(&listing.id).map(|l| l.version);
        check_version(stored, listing.version, "listing", listing.id)?;
        tables.listings.insert(listing.id, listing.clone());
        Ok(())
    }

    async fn listings_by_seller(&self, seller_id: &str) -> Result<Vec<Listing>, HandlerError> {
        let tables = self.tables.lock().await;
        let mut listings: Vec<Listing> = tables
            .listings
            .values()
            .filter(|l| l.seller_id == seller_id)
            .cloned()
            .collect();
        newest_first(&mut listings, |l| l.id);
        Ok(listings)
    }

    async fn listings_by_status(
        &self,
        statuses: &[ListingStatus],
    ) -> Result<Vec<Listing>, HandlerError> {
        let tables = self.tables.lock().await;
        let mut listings: Vec<Listing> = tables
            .listings
            .values()
            .filter(|l| statuses.contains(&l.status))
            .cloned()
            .collect();
        newest_first(&mut listings, |l| l.id);
        Ok(listings)
    }

    async fn get_bid(&self, id: Ulid) -> Result<Option<Bid>, HandlerError> {
        Ok(self.tables.lock().await.bids.get(&id).cloned())
    }

    async fn insert_bid(&self, bid: &Bid) -> Result<(), HandlerError> {
        let mut tables = self.tables.lock().await;
        check_insert(&tables.bids, bid.id, "bid")?;
        tables.bids.insert(bid.id, bid.clone());
        Ok(())
    }

    async fn replace_bid(&self, bid: &Bid) -> Result<(), HandlerError> {
        let mut tables = self.tables.lock().await;
        let stored = tables.bids.get(&bid.id).map(|b| b.version);
        check_version(stored, bid.version, "bid", bid.id)?;
        tables.bids.insert(bid.id, bid.clone());
        Ok(())
    }

    async fn bids_for_listing(&self, listing_id: Ulid) -> Result<Vec<Bid>, HandlerError> {
        let tables = self.tables.lock().await;
        let mut bids: Vec<Bid> = tables
            .bids
            .values()
            .filter(|b| b.listing_id == listing_id)
            .cloned()
            .collect();
        newest_first(&mut bids, |b| b.id);
        Ok(bids)
    }

    async fn pending_bids(&self) -> Result<Vec<Bid>, HandlerError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .bids
            .values()
            .filter(|b| b.status == BidStatus::Pending)
            .cloned()
            .collect())
    }

    async fn get_transaction(&self, id: Ulid) -> Result<Option<Transaction>, HandlerError> {
        Ok(self.tables.lock().await.transactions.get(&id).cloned())
    }

    async fn replace_transaction(&self, transaction: &Transaction) -> Result<(), HandlerError> {
        let mut tables = self.tables.lock().await;
        let stored = tables.transactions.get(&transaction.id).map(|t| t.version);
        check_version(stored, transaction.version, "transaction", transaction.id)?;
        tables
            .transactions
            .insert(transaction.id, transaction.clone());
        Ok(())
    }

    async fn transactions_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Transaction>, HandlerError> {
        let tables = self.tables.lock().await;
        let mut transactions: Vec<Transaction> = tables
            .transactions
            .values()
            .filter(|t| t.is_party(user_id))
            .cloned()
            .collect();
        newest_first(&mut transactions, |t| t.id);
        Ok(transactions)
    }

    async fn settle(
        &self,
        bid: &Bid,
        listing: &Listing,
        transaction: &Transaction,
    ) -> Result<(), HandlerError> {
        let mut tables = self.tables.lock().await;

        let stored_bid = tables.bids.get(&bid.id).map(|b| b.version);
        check_version(stored_bid, bid.version, "bid", bid.id)?;
        let stored_listing = tables.listings.get(&listing.id).map(|l| l.version);
        check_version(stored_listing, listing.version, "listing", listing.id)?;
        check_insert(&tables.transactions, transaction.id, "transaction")?;

        if self.fail_next_settle.swap(false, Ordering::SeqCst) {
            return Err(HandlerError::HandlerError(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("injected failure writing transaction {}", transaction.id),
            ));
        }

        tables.bids.insert(bid.id, bid.clone());
        tables.listings.insert(listing.id, listing.clone());
        tables
            .transactions
            .insert(transaction.id, transaction.clone());
        Ok(())
    }
}
