use chrono::{Duration, TimeDelta};

pub const LISTING_TABLE: &str = "AgriListing";
pub const BID_TABLE: &str = "AgriBid";
pub const TRANSACTION_TABLE: &str = "AgriTransaction";

pub const LISTING_SELLER_INDEX: &str = "sellerId-index";
pub const BID_LISTING_INDEX: &str = "listingId-index";
pub const TRANSACTION_BUYER_INDEX: &str = "buyerId-index";
pub const TRANSACTION_SELLER_INDEX: &str = "sellerId-index";

/// Audience every accepted JWT must carry.
pub const JWT_AUDIENCE: &str = "agri-market-rs";

/// How long a freshly placed bid stays acceptable.
pub const BID_VALIDITY: TimeDelta = Duration::days(2);
