use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role carried in the caller's token, issued by the identity provider.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Farmer,
    Fpo,
    Trader,
    Buyer,
    Assayer,
    Logistics,
    Admin,
}

impl UserRole {
    /// Roles allowed to grade listings.
    pub fn can_assay(self) -> bool {
        matches!(self, UserRole::Assayer | UserRole::Admin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let out = match *self {
            UserRole::Farmer => "farmer",
            UserRole::Fpo => "fpo",
            UserRole::Trader => "trader",
            UserRole::Buyer => "buyer",
            UserRole::Assayer => "assayer",
            UserRole::Logistics => "logistics",
            UserRole::Admin => "admin",
        };
        write!(f, "{}", out)
    }
}
