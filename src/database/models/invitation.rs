use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Invitation {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub email_to_invite: String,
    pub invited_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Invitation {
    /// True when `email` is the address this invitation was sent to.
    pub fn is_addressed_to(&self, email: &str) -> bool {
        normalize_email(email) == self.email_to_invite
    }
}

#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub organization_id: Uuid,
    pub email_to_invite: String,
    pub invited_by: Uuid,
}

/// Invitation addresses are stored trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
