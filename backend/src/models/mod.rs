pub mod auth;
pub mod bid;
pub mod listing;
pub mod transaction;
pub mod user;
