use core::fmt;

use aws_sdk_dynamodb::types::AttributeValue;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ulid::Ulid;
use utoipa::ToSchema;

use crate::{constants::BID_VALIDITY, errors::HandlerError};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BidStatus {
    Pending,
    Accepted,
    Rejected,
    Expired,
}

impl From<BidStatus> for AttributeValue {
    fn from(value: BidStatus) -> Self {
        AttributeValue::S(value.to_string())
    }
}

impl Default for BidStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for BidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let out = match *self {
            BidStatus::Pending => "pending",
            BidStatus::Accepted => "accepted",
            BidStatus::Rejected => "rejected",
            BidStatus::Expired => "expired",
        };
        write!(f, "{}", out)
    }
}

#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    /// Ulid, hash key
    pub id: Ulid,
    /// Target listing.
    pub listing_id: Ulid,
    /// Bidder's user id
    pub bidder_id: String,
    /// Offered price per quintal.
    pub bid_price_per_quintal: Decimal,
    /// Requested quantity, in quintals.
    pub quantity_quintals: Decimal,
    /// Note to the seller.
    pub message: Option<String>,
    pub status: BidStatus,
    /// Unix timestamp after which the bid can no longer be accepted.
    pub valid_until: u64,
    /// Create time, in unix timestamp
    pub create_at: u64,
    /// Last update time, in unix timestamp
    pub update_at: u64,
    /// Optimistic concurrency counter, bumped on every write.
    pub version: u64,
}

impl Bid {
    pub fn new_from_request(
        listing_id: Ulid,
        bidder_id: String,
        req: PlaceBidRequest,
        now: u64,
    ) -> Self {
        Self {
            id: Ulid::new(),
            listing_id,
            bidder_id,
            bid_price_per_quintal: req.price_per_quintal,
            quantity_quintals: req.quantity_quintals,
            message: req.message.filter(|m| !m.trim().is_empty()),
            status: BidStatus::Pending,
            valid_until: now + BID_VALIDITY.num_milliseconds() as u64,
            create_at: now,
            update_at: now,
            version: 0,
        }
    }

    pub fn is_expired_at(&self, now: u64) -> bool {
        now > self.valid_until
    }

    fn settle_as(&self, next: BidStatus, now: u64) -> Result<Self, HandlerError> {
        if self.status != BidStatus::Pending {
            return Err(HandlerError::InvalidTransition(format!(
                "bid {} is {}, cannot become {}",
                self.id, self.status, next
            )));
        }
        Ok(Self {
            status: next,
            update_at: now,
            version: self.version + 1,
            ..self.clone()
        })
    }

    /// Pending -> accepted. An expired bid is refused even if no sweep has
    /// marked it yet.
    pub fn accept(&self, now: u64) -> Result<Self, HandlerError> {
        if self.status == BidStatus::Pending && self.is_expired_at(now) {
            return Err(HandlerError::InvalidTransition(format!(
                "bid {} expired at {}",
                self.id, self.valid_until
            )));
        }
        self.settle_as(BidStatus::Accepted, now)
    }

    pub fn reject(&self, now: u64) -> Result<Self, HandlerError> {
        self.settle_as(BidStatus::Rejected, now)
    }

    pub fn expire(&self, now: u64) -> Result<Self, HandlerError> {
        if !self.is_expired_at(now) {
            return Err(HandlerError::InvalidTransition(format!(
                "bid {} is valid until {}",
                self.id, self.valid_until
            )));
        }
        self.settle_as(BidStatus::Expired, now)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaceBidRequest {
    /// Offered price per quintal, > 0
    pub price_per_quintal: Decimal,
    /// Quantity in quintals, > 0 and <= listing quantity
    pub quantity_quintals: Decimal,
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpireBidsResponse {
    /// Bids moved to expired by this sweep.
    pub expired: Vec<Ulid>,
}
