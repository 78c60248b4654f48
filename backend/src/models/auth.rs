use serde::{Deserialize, Serialize};

use super::user::UserRole;

/// Decoded bearer token. Every workflow operation takes the caller explicitly
/// instead of reading a session.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Claim {
    /// User ID
    pub id: String,
    /// Role of the user.
    pub role: UserRole,
    /// Audience
    pub aud: String,
    /// Expire Time
    pub exp: u64,
    /// Issue Time
    pub iat: u64,
}

impl Claim {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}
