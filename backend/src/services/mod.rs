//! The bid-to-transaction workflow. Every operation takes the store and the
//! caller explicitly.

pub mod bids;
pub mod listings;
pub mod settlement;
pub mod transactions;
