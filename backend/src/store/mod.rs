//! Persistence seam for listings, bids and transactions.
//!
//! Every record carries a `version`. Writes through [`MarketStore`] are
//! compare-and-swap: a replacement record at version `n` only lands if the
//! stored copy is still at `n - 1`, otherwise the write fails with
//! [`HandlerError::ConcurrencyConflict`].

use async_trait::async_trait;
use ulid::Ulid;

use crate::{
    errors::HandlerError,
    models::{
        bid::Bid,
        listing::{Listing, ListingStatus},
        transaction::Transaction,
    },
};

mod dynamo;
mod memory;

pub use dynamo::DynamoStore;
pub use memory::MemoryStore;

#[async_trait]
pub trait MarketStore: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    async fn get_listing(&self, id: Ulid) -> Result<Option<Listing>, HandlerError>;
    /// Inserts a listing that must not exist yet.
    async fn insert_listing(&self, listing: &Listing) -> Result<(), HandlerError>;
    async fn replace_listing(&self, listing: &Listing) -> Result<(), HandlerError>;
    async fn listings_by_seller(&self, seller_id: &str) -> Result<Vec<Listing>, HandlerError>;
    async fn listings_by_status(
        &self,
        statuses: &[ListingStatus],
    ) -> Result<Vec<Listing>, HandlerError>;

    async fn get_bid(&self, id: Ulid) -> Result<Option<Bid>, HandlerError>;
    async fn insert_bid(&self, bid: &Bid) -> Result<(), HandlerError>;
    async fn replace_bid(&self, bid: &Bid) -> Result<(), HandlerError>;
    async fn bids_for_listing(&self, listing_id: Ulid) -> Result<Vec<Bid>, HandlerError>;
    async fn pending_bids(&self) -> Result<Vec<Bid>, HandlerError>;

    async fn get_transaction(&self, id: Ulid) -> Result<Option<Transaction>, HandlerError>;
    async fn replace_transaction(&self, transaction: &Transaction) -> Result<(), HandlerError>;
    /// Transactions where the user is buyer or seller, newest first.
    async fn transactions_for_user(&self, user_id: &str)
        -> Result<Vec<Transaction>, HandlerError>;

    /// Atomically writes the accepted bid and the updated listing (both
    /// compare-and-swap) together with the new transaction. Nothing is
    /// written unless all three preconditions hold.
    async fn settle(
        &self,
        bid: &Bid,
        listing: &Listing,
        transaction: &Transaction,
    ) -> Result<(), HandlerError>;
}

/// The stored version a replacement record expects to overwrite.
pub(crate) fn expected_version(next: u64) -> u64 {
    next.saturating_sub(1)
}

pub(crate) fn newest_first<T, F: Fn(&T) -> Ulid>(items: &mut [T], key: F) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}
