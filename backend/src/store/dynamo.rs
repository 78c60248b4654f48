use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_dynamodb::{
    error::SdkError,
    operation::transact_write_items::TransactWriteItemsError,
    types::{AttributeValue, Put, TransactWriteItem},
    Client,
};
use serde::de::DeserializeOwned;
use serde_dynamo::{from_item, from_items, to_attribute_value, to_item};
use ulid::Ulid;

use crate::{
    constants::{
        BID_LISTING_INDEX, BID_TABLE, LISTING_SELLER_INDEX, LISTING_TABLE,
        TRANSACTION_BUYER_INDEX, TRANSACTION_SELLER_INDEX, TRANSACTION_TABLE,
    },
    errors::HandlerError,
    models::{
        bid::{Bid, BidStatus},
        listing::{Listing, ListingStatus},
        transaction::Transaction,
    },
};

use super::{expected_version, newest_first, MarketStore};

type Item = HashMap<String, AttributeValue>;

/// Condition attached to a single put.
enum Guard {
    /// The key must not exist yet.
    Absent,
    /// The stored `version` must equal the given value.
    Version(u64),
}

impl Guard {
    fn for_replace(next: u64) -> Self {
        Guard::Version(expected_version(next))
    }

    fn condition(&self) -> &'static str {
        match self {
            Guard::Absent => "attribute_not_exists(id)",
            Guard::Version(_) => "#version = :expected",
        }
    }

    fn names(&self) -> Option<HashMap<String, String>> {
        match self {
            Guard::Absent => None,
            Guard::Version(_) => Some(HashMap::from([(
                "#version".to_string(),
                "version".to_string(),
            )])),
        }
    }

    fn values(&self) -> Result<Option<Item>, HandlerError> {
        match self {
            Guard::Absent => Ok(None),
            Guard::Version(v) => Ok(Some(HashMap::from([(
                ":expected".to_string(),
                to_attribute_value(*v)?,
            )]))),
        }
    }

    fn transact_put(self, table: &str, item: Item) -> Result<TransactWriteItem, HandlerError> {
        let put = Put::builder()
            .table_name(table)
            .set_item(Some(item))
            .condition_expression(self.condition())
            .set_expression_attribute_names(self.names())
            .set_expression_attribute_values(self.values()?)
            .build()?;
        Ok(TransactWriteItem::builder().put(put).build())
    }
}

pub struct DynamoStore {
    client: Client,
}

impl DynamoStore {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    async fn get<T: DeserializeOwned>(&self, table: &str, id: Ulid) -> Result<Option<T>, HandlerError> {
        let resp = self
            .client
            .get_item()
            .table_name(table)
            .key("id", AttributeValue::S(id.to_string()))
            .send()
            .await?;

        match resp.item {
            Some(item) => Ok(Some(from_item(item)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, table: &str, id: Ulid, item: Item, guard: Guard) -> Result<(), HandlerError> {
        let cmd = self
            .client
            .put_item()
            .table_name(table)
            .set_item(Some(item))
            .condition_expression(guard.condition())
            .set_expression_attribute_names(guard.names())
            .set_expression_attribute_values(guard.values()?);

        cmd.send().await.map_err(|e| {
            let conditional = e
                .as_service_error()
                .is_some_and(|se| se.is_conditional_check_failed_exception());
            if conditional {
                HandlerError::ConcurrencyConflict(format!(
                    "{} {} changed since it was read",
                    table, id
                ))
            } else {
                HandlerError::from(e)
            }
        })?;

        Ok(())
    }

    async fn query_index<T: DeserializeOwned>(
        &self,
        table: &str,
        index: &str,
        key: &str,
        value: &str,
    ) -> Result<Vec<T>, HandlerError> {
        let mut out = Vec::new();
        let mut start_key: Option<Item> = None;
        loop {
            let resp = self
                .client
                .query()
                .table_name(table)
                .index_name(index)
                .key_condition_expression("#key = :value")
                .expression_attribute_names("#key", key)
                .expression_attribute_values(":value", AttributeValue::S(value.to_string()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await?;
            let page: Vec<T> = from_items(resp.items().to_vec())?;
            out.extend(page);
            start_key = resp.last_evaluated_key;
            if start_key.is_none() {
                break;
            }
        }
        Ok(out)
    }

    async fn scan_status<T: DeserializeOwned>(
        &self,
        table: &str,
        statuses: Vec<AttributeValue>,
    ) -> Result<Vec<T>, HandlerError> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders: Vec<String> = (0..statuses.len()).map(|i| format!(":s{}", i)).collect();
        let mut eavs: Item = HashMap::new();
        for (name, value) in placeholders.iter().zip(statuses) {
            eavs.insert(name.clone(), value);
        }
        let filter = format!("#status IN ({})", placeholders.join(", "));

        let mut out = Vec::new();
        let mut start_key: Option<Item> = None;
        loop {
            let resp = self
                .client
                .scan()
                .table_name(table)
                .filter_expression(filter.as_str())
                .expression_attribute_names("#status", "status")
                .set_expression_attribute_values(Some(eavs.clone()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await?;
            let page: Vec<T> = from_items(resp.items().to_vec())?;
            out.extend(page);
            start_key = resp.last_evaluated_key;
            if start_key.is_none() {
                break;
            }
        }
        Ok(out)
    }
}

fn is_condition_cancel(e: &SdkError<TransactWriteItemsError>) -> bool {
    match e.as_service_error() {
        Some(TransactWriteItemsError::TransactionCanceledException(ex)) => ex
            .cancellation_reasons()
            .iter()
            .any(|r| r.code() == Some("ConditionalCheckFailed")),
        _ => false,
    }
}

#[async_trait]
impl MarketStore for DynamoStore {
    fn backend_tag(&self) -> &'static str {
        "dynamodb"
    }

    async fn get_listing(&self, id: Ulid) -> Result<Option<Listing>, HandlerError> {
        self.get(LISTING_TABLE, id).await
    }

    async fn insert_listing(&self, listing: &Listing) -> Result<(), HandlerError> {
        self.put(LISTING_TABLE, listing.id, to_item(listing)?, Guard::Absent)
            .await
    }

    async fn replace_listing(&self, listing: &Listing) -> Result<(), HandlerError> {
        self.put(
            LISTING_TABLE,
            listing.id,
            to_item(listing)?,
            Guard::for_replace(listing.version),
        )
        .await
    }

    async fn listings_by_seller(&self, seller_id: &str) -> Result<Vec<Listing>, HandlerError> {
        let mut listings: Vec<Listing> = self
            .query_index(LISTING_TABLE, LISTING_SELLER_INDEX, "sellerId", seller_id)
            .await?;
        newest_first(&mut listings, |l| l.id);
        Ok(listings)
    }

    async fn listings_by_status(
        &self,
        statuses: &[ListingStatus],
    ) -> Result<Vec<Listing>, HandlerError> {
        let values = statuses.iter().map(|s| AttributeValue::from(*s)).collect();
        let mut listings: Vec<Listing> = self.scan_status(LISTING_TABLE, values).await?;
        newest_first(&mut listings, |l| l.id);
        Ok(listings)
    }

    async fn get_bid(&self, id: Ulid) -> Result<Option<Bid>, HandlerError> {
        self.get(BID_TABLE, id).await
    }

    async fn insert_bid(&self, bid: &Bid) -> Result<(), HandlerError> {
        self.put(BID_TABLE, bid.id, to_item(bid)?, Guard::Absent).await
    }

    async fn replace_bid(&self, bid: &Bid) -> Result<(), HandlerError> {
        self.put(BID_TABLE, bid.id, to_item(bid)?, Guard::for_replace(bid.version))
            .await
    }

    async fn bids_for_listing(&self, listing_id: Ulid) -> Result<Vec<Bid>, HandlerError> {
        let mut bids: Vec<Bid> = self
            .query_index(
                BID_TABLE,
                BID_LISTING_INDEX,
                "listingId",
                &listing_id.to_string(),
            )
            .await?;
        newest_first(&mut bids, |b| b.id);
        Ok(bids)
    }

    async fn pending_bids(&self) -> Result<Vec<Bid>, HandlerError> {
        self.scan_status(BID_TABLE, vec![BidStatus::Pending.into()])
            .await
    }

    async fn get_transaction(&self, id: Ulid) -> Result<Option<Transaction>, HandlerError> {
        self.get(TRANSACTION_TABLE, id).await
    }

    async fn replace_transaction(&self, transaction: &Transaction) -> Result<(), HandlerError> {
        self.put(
            TRANSACTION_TABLE,
            transaction.id,
            to_item(transaction)?,
            Guard::for_replace(transaction.version),
        )
        .await
    }

    async fn transactions_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Transaction>, HandlerError> {
        let mut transactions: Vec<Transaction> = self
            .query_index(TRANSACTION_TABLE, TRANSACTION_BUYER_INDEX, "buyerId", user_id)
            .await?;
        let as_seller: Vec<Transaction> = self
            .query_index(TRANSACTION_TABLE, TRANSACTION_SELLER_INDEX, "sellerId", user_id)
            .await?;
        for t in as_seller {
            if !transactions.iter().any(|existing| existing.id == t.id) {
                transactions.push(t);
            }
        }
        newest_first(&mut transactions, |t| t.id);
        Ok(transactions)
    }

    async fn settle(
        &self,
        bid: &Bid,
        listing: &Listing,
        transaction: &Transaction,
    ) -> Result<(), HandlerError> {
        let bid_put = Guard::for_replace(bid.version).transact_put(BID_TABLE, to_item(bid)?)?;
        let listing_put =
            Guard::for_replace(listing.version).transact_put(LISTING_TABLE, to_item(listing)?)?;
        let transaction_put = Guard::Absent.transact_put(TRANSACTION_TABLE, to_item(transaction)?)?;

        self.client
            .transact_write_items()
            .transact_items(bid_put)
            .transact_items(listing_put)
            .transact_items(transaction_put)
            .send()
            .await
            .map_err(|e| {
                if is_condition_cancel(&e) {
                    HandlerError::ConcurrencyConflict(format!(
                        "listing {} or bid {} changed during acceptance",
                        listing.id, bid.id
                    ))
                } else {
                    HandlerError::from(e)
                }
            })?;

        Ok(())
    }
}
