use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ulid::Ulid;
use utoipa::ToSchema;

use crate::errors::HandlerError;

use super::{bid::Bid, listing::Listing};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
}

impl Default for TransactionStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let out = match *self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Processing => "processing",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Refunded => "refunded",
        };
        write!(f, "{}", out)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Upi,
    Neft,
    Rtgs,
    Wallet,
    Escrow,
}

#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Ulid, hash key
    pub id: Ulid,
    pub listing_id: Ulid,
    /// None for direct purchases made without a bid.
    pub bid_id: Option<Ulid>,
    pub buyer_id: String,
    pub seller_id: String,
    pub price_per_quintal: Decimal,
    pub quantity_quintals: Decimal,
    /// Always price_per_quintal * quantity_quintals.
    pub total_amount: Decimal,
    pub status: TransactionStatus,
    pub payment_method: Option<PaymentMethod>,
    /// Booking id issued by the logistics service.
    pub logistics_id: Option<String>,
    pub delivery_confirmed: bool,
    /// Delivery confirmation unix timestamp
    pub delivery_confirmed_at: Option<u64>,
    /// Create time, in unix timestamp
    pub create_at: u64,
    /// Last update time, in unix timestamp
    pub update_at: u64,
    /// Optimistic concurrency counter, bumped on every write.
    pub version: u64,
}

impl Transaction {
    pub fn from_accepted_bid(listing: &Listing, bid: &Bid, now: u64) -> Self {
        Self {
            id: Ulid::new(),
            listing_id: listing.id,
            bid_id: Some(bid.id),
            buyer_id: bid.bidder_id.clone(),
            seller_id: listing.seller_id.clone(),
            price_per_quintal: bid.bid_price_per_quintal,
            quantity_quintals: bid.quantity_quintals,
            total_amount: bid.bid_price_per_quintal * bid.quantity_quintals,
            status: TransactionStatus::Pending,
            create_at: now,
            update_at: now,
            ..Default::default()
        }
    }

    pub fn is_party(&self, user_id: &str) -> bool {
        self.buyer_id == user_id || self.seller_id == user_id
    }

    fn bumped(&self, now: u64) -> Self {
        Self {
            update_at: now,
            version: self.version + 1,
            ..self.clone()
        }
    }

    fn invalid(&self, what: &str) -> HandlerError {
        HandlerError::InvalidTransition(format!(
            "transaction {} is {}, cannot {}",
            self.id, self.status, what
        ))
    }

    /// Pending -> processing, remembering how the buyer paid.
    pub fn record_payment(&self, method: PaymentMethod, now: u64) -> Result<Self, HandlerError> {
        if self.status != TransactionStatus::Pending {
            return Err(self.invalid("record a payment"));
        }
        let mut updated = self.bumped(now);
        updated.status = TransactionStatus::Processing;
        updated.payment_method = Some(method);
        Ok(updated)
    }

    /// Status reported back by the payment processor.
    pub fn advance(&self, next: TransactionStatus, now: u64) -> Result<Self, HandlerError> {
        use TransactionStatus::*;
        let allowed = matches!(
            (self.status, next),
            (Processing, Completed) | (Processing, Failed) | (Completed, Refunded) | (Failed, Pending)
        );
        if !allowed {
            return Err(self.invalid(&format!("become {}", next)));
        }
        let mut updated = self.bumped(now);
        updated.status = next;
        Ok(updated)
    }

    pub fn attach_logistics(&self, logistics_id: String, now: u64) -> Result<Self, HandlerError> {
        if matches!(
            self.status,
            TransactionStatus::Failed | TransactionStatus::Refunded
        ) {
            return Err(self.invalid("book logistics"));
        }
        if logistics_id.trim().is_empty() {
            return Err(HandlerError::InvalidInput(
                "logistics id must not be empty".to_string(),
            ));
        }
        let mut updated = self.bumped(now);
        updated.logistics_id = Some(logistics_id);
        Ok(updated)
    }

    pub fn confirm_delivery(&self, now: u64) -> Result<Self, HandlerError> {
        if self.delivery_confirmed {
            return Err(HandlerError::InvalidTransition(format!(
                "delivery of transaction {} already confirmed",
                self.id
            )));
        }
        if !matches!(
            self.status,
            TransactionStatus::Processing | TransactionStatus::Completed
        ) {
            return Err(self.invalid("confirm delivery"));
        }
        let mut updated = self.bumped(now);
        updated.delivery_confirmed = true;
        updated.delivery_confirmed_at = Some(now);
        Ok(updated)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentRequest {
    pub method: PaymentMethod,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTransactionStatusRequest {
    pub status: TransactionStatus,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttachLogisticsRequest {
    pub logistics_id: String,
}
