use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Lifecycle;

/// Tutor/veterinarian identity. The primary key is the opaque id issued by
/// the external identity provider (ex: `auth0|xxx`).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub bio: Option<String>,
    pub address_street: Option<String>,
    pub address_city: Option<String>,
    pub address_state: Option<String>,
    pub address_zip: Option<String>,
    pub is_vet: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_deleted_at(self.deleted_at)
    }
}

/// Directory entry used by the notification runs. Only ever built for
/// profiles with a usable (non-empty) email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct TutorContact {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertProfileRequest {
    pub name: String,
    pub bio: Option<String>,
    pub address: Option<Address>,
    #[serde(default)]
    pub is_vet: bool,
}

/// Public summary used by vet search and the pet access list.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct VetSummary {
    pub id: String,
    pub name: String,
    pub email: String,
}
