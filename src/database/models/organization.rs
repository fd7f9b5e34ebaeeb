use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Name of the organization that collects zones registered without an owner.
pub const HEADLESS_ORG_NAME: &str = "Unclaimed Networks";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub owner_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == Some(user_id)
    }
}

#[derive(Debug, Clone)]
pub struct NewOrganization {
    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OrganizationChanges {
    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,
}
