use serde::{Deserialize, Serialize};

/// JWT payload identifying an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    #[serde(rename = "sub")]
    pub subject: i64, // user ID
    pub email: String,
    #[serde(rename = "iat")]
    pub issued_at: i64, // unix timestamp
    #[serde(rename = "exp")]
    pub expires_at: i64, // unix timestamp
}
