use core::fmt;

use aws_sdk_dynamodb::types::AttributeValue;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ulid::Ulid;
use utoipa::ToSchema;

use crate::errors::HandlerError;

use super::bid::Bid;

/// Listing Status Enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Draft,
    Active,
    PendingVerification,
    Verified,
    Sold,
    Cancelled,
}

impl ListingStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ListingStatus::Sold | ListingStatus::Cancelled)
    }

    pub fn is_biddable(self) -> bool {
        matches!(self, ListingStatus::Active | ListingStatus::Verified)
    }

    fn can_move_to(self, next: ListingStatus) -> bool {
        use ListingStatus::*;
        match (self, next) {
            (Draft, Active) | (Active, PendingVerification) | (PendingVerification, Verified) => {
                true
            }
            (Draft | Active | Verified, Sold | Cancelled) => true,
            _ => false,
        }
    }
}

impl From<ListingStatus> for AttributeValue {
    fn from(value: ListingStatus) -> Self {
        AttributeValue::S(value.to_string())
    }
}

impl Default for ListingStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let out = match *self {
            ListingStatus::Draft => "draft",
            ListingStatus::Active => "active",
            ListingStatus::PendingVerification => "pending_verification",
            ListingStatus::Verified => "verified",
            ListingStatus::Sold => "sold",
            ListingStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", out)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum QualityGrade {
    Premium,
    Standard,
    Basic,
}

#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    /// Ulid, hash key
    pub id: Ulid,
    /// Seller's user id
    pub seller_id: String,
    /// Crop category id
    pub crop_category_id: String,
    /// Crop variety id
    pub crop_variety_id: String,
    /// Free text description
    pub description: Option<String>,
    /// Quantity on offer, in quintals. Frozen once a bid is accepted.
    pub quantity_quintals: Decimal,
    /// Asking price per quintal
    pub expected_price_per_quintal: Decimal,
    /// Listing status, see enum def.
    pub status: ListingStatus,
    /// Grade assigned by an assayer.
    pub quality_grade: Option<QualityGrade>,
    /// Assayer who verified the listing.
    pub quality_verified_by: Option<String>,
    /// Verification unix timestamp.
    pub quality_verified_at: Option<u64>,
    pub pickup_district: String,
    pub pickup_state: String,
    /// Harvest unix timestamp
    pub harvest_date: Option<u64>,
    /// The single bid accepted against this listing, if any.
    pub accepted_bid_id: Option<Ulid>,
    /// Create time, in unix timestamp
    pub create_at: u64,
    /// Last update time, in unix timestamp
    pub update_at: u64,
    /// Optimistic concurrency counter, bumped on every write.
    pub version: u64,
}

impl Listing {
    pub fn new_from_request(seller_id: String, req: CreateListingRequest, now: u64) -> Self {
        Self {
            id: Ulid::new(),
            seller_id,
            crop_category_id: req.crop_category_id,
            crop_variety_id: req.crop_variety_id,
            description: req.description,
            quantity_quintals: req.quantity_quintals,
            expected_price_per_quintal: req.expected_price_per_quintal,
            status: if req.draft {
                ListingStatus::Draft
            } else {
                ListingStatus::Active
            },
            quality_grade: req.quality_grade,
            pickup_district: req.pickup_district,
            pickup_state: req.pickup_state,
            harvest_date: req.harvest_date,
            create_at: now,
            update_at: now,
            ..Default::default()
        }
    }

    /// Copy of this listing as the next version.
    fn bumped(&self, now: u64) -> Self {
        Self {
            update_at: now,
            version: self.version + 1,
            ..self.clone()
        }
    }

    pub fn transition(&self, next: ListingStatus, now: u64) -> Result<Self, HandlerError> {
        if !self.status.can_move_to(next) {
            return Err(HandlerError::InvalidTransition(format!(
                "listing {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        let mut updated = self.bumped(now);
        updated.status = next;
        Ok(updated)
    }

    pub fn mark_sold(&self, now: u64) -> Result<Self, HandlerError> {
        self.transition(ListingStatus::Sold, now)
    }

    pub fn cancel(&self, now: u64) -> Result<Self, HandlerError> {
        if let Some(bid_id) = self.accepted_bid_id {
            return Err(HandlerError::InvalidTransition(format!(
                "listing {} has accepted bid {}",
                self.id, bid_id
            )));
        }
        self.transition(ListingStatus::Cancelled, now)
    }

    pub fn verify(&self, grade: QualityGrade, assayer_id: &str, now: u64) -> Result<Self, HandlerError> {
        let mut updated = self.transition(ListingStatus::Verified, now)?;
        updated.quality_grade = Some(grade);
        updated.quality_verified_by = Some(assayer_id.to_string());
        updated.quality_verified_at = Some(now);
        Ok(updated)
    }

    pub fn apply_update(&self, req: UpdateListingRequest, now: u64) -> Result<Self, HandlerError> {
        if req == UpdateListingRequest::default() {
            return Err(HandlerError::InvalidInput(
                "Must have at least 1 field to update.".to_string(),
            ));
        }
        if self.status.is_terminal() || self.status == ListingStatus::PendingVerification {
            return Err(HandlerError::InvalidTransition(format!(
                "listing {} cannot be edited while {}",
                self.id, self.status
            )));
        }
        if self.accepted_bid_id.is_some() {
            return Err(HandlerError::InvalidTransition(format!(
                "listing {} is frozen by an accepted bid",
                self.id
            )));
        }

        let mut updated = self.bumped(now);
        if let Some(quantity) = req.quantity_quintals {
            require_positive("quantity", quantity)?;
            updated.quantity_quintals = quantity;
        }
        if let Some(price) = req.expected_price_per_quintal {
            require_positive("price", price)?;
            updated.expected_price_per_quintal = price;
        }
        if let Some(description) = req.description {
            updated.description = Some(description);
        }
        Ok(updated)
    }

    /// Records `bid` as this listing's accepted bid, selling the listing when
    /// the bid covers the full quantity. The bid may not exceed the quantity
    /// currently on offer. Partial acceptance leaves the status
    /// alone but still blocks any further acceptance.
    pub fn record_acceptance(&self, bid: &Bid, now: u64) -> Result<Self, HandlerError> {
        if let Some(existing) = self.accepted_bid_id {
            return Err(HandlerError::ConcurrencyConflict(format!(
                "listing {} already accepted bid {}",
                self.id, existing
            )));
        }
        if self.status.is_terminal() {
            return Err(HandlerError::InvalidTransition(format!(
                "listing {} is already {}",
                self.id, self.status
            )));
        }
        if !self.status.is_biddable() {
            return Err(HandlerError::ListingNotBiddable(self.id, self.status));
        }
        // The listing quantity may have been edited down since the bid was placed.
        if bid.quantity_quintals > self.quantity_quintals {
            return Err(HandlerError::InvalidInput(format!(
                "bid {} wants {} quintals, listing {} has {}",
                bid.id, bid.quantity_quintals, self.id, self.quantity_quintals
            )));
        }

        let mut updated = if bid.quantity_quintals >= self.quantity_quintals {
            self.mark_sold(now)?
        } else {
            self.bumped(now)
        };
        updated.accepted_bid_id = Some(bid.id);
        Ok(updated)
    }
}

pub fn require_positive(field: &str, value: Decimal) -> Result<(), HandlerError> {
    if value <= Decimal::ZERO {
        return Err(HandlerError::InvalidInput(format!(
            "{} must be positive, got {}",
            field, value
        )));
    }
    Ok(())
}

#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateListingRequest {
    pub crop_category_id: String,
    pub crop_variety_id: String,
    pub description: Option<String>,
    /// Quantity in quintals, > 0
    pub quantity_quintals: Decimal,
    /// Asking price per quintal, > 0
    pub expected_price_per_quintal: Decimal,
    pub quality_grade: Option<QualityGrade>,
    pub pickup_district: String,
    pub pickup_state: String,
    pub harvest_date: Option<u64>,
    /// Keep the listing as a draft instead of publishing it.
    #[serde(default)]
    pub draft: bool,
}

#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateListingRequest {
    pub quantity_quintals: Option<Decimal>,
    pub expected_price_per_quintal: Option<Decimal>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyListingRequest {
    pub grade: QualityGrade,
}
