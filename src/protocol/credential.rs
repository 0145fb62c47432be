//! Access key issued by the ELS and used to sign API requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Unix timestamp of `0001-01-01T00:00:00Z`, which the service sends for
/// keys that never expire.
const ZERO_EXPIRY_TIMESTAMP: i64 = -62_135_596_800;

/// Access key bound to an ELS user.
///
/// The public `id` appears in the `Authorization` header of every signed
/// request; the private `secret` is only ever used as HMAC key material.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Public part of the access key.
    #[serde(rename = "accessKeyId", default)]
    pub id: String,

    /// Private part of the access key.
    #[serde(rename = "secretAccessKey", default)]
    pub secret: String,

    /// When the key stops being usable. `None` means it never expires.
    #[serde(
        rename = "expiryDt",
        default,
        deserialize_with = "deserialize_expiry"
    )]
    pub expiry: Option<DateTime<Utc>>,

    /// Email address of the user the key was issued for.
    #[serde(rename = "emailAddress", default)]
    pub owner: String,
}

impl Credential {
    /// Create a credential from its parts.
    pub fn new(
        id: impl Into<String>,
        secret: impl Into<String>,
        expiry: Option<DateTime<Utc>>,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
            expiry,
            owner: owner.into(),
        }
    }

    /// True if both halves of the key are present.
    pub fn can_sign(&self) -> bool {
        !self.id.is_empty() && !self.secret.is_empty()
    }

    /// True if the key never expires, or expires strictly more than
    /// `horizon` after `now`.
    pub fn valid_until(&self, now: DateTime<Utc>, horizon: chrono::Duration) -> bool {
        match self.expiry {
            None => true,
            Some(expiry) => expiry - now > horizon,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .field("expiry", &self.expiry)
            .field("owner", &self.owner)
            .finish()
    }
}

fn deserialize_expiry<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let expiry = Option::<DateTime<Utc>>::deserialize(deserializer)?;
    Ok(expiry.filter(|t| t.timestamp() != ZERO_EXPIRY_TIMESTAMP))
}
