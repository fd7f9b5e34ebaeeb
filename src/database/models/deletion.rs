use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Audit entry written when an admin or a pending invitation is removed.
/// Records are append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DeletionRecord {
    pub id: Uuid,
    pub organization_id: Option<Uuid>,
    pub deleter_id: Option<Uuid>,
    pub deleted_user_id: Option<Uuid>,
    pub deleted_invite_id: Option<Uuid>,
    pub deleted_invite_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum NewDeletionRecord {
    Admin {
        organization_id: Uuid,
        deleter_id: Uuid,
        deleted_user_id: Uuid,
    },
    Invitation {
        organization_id: Uuid,
        deleter_id: Uuid,
        invite_id: Uuid,
        invite_email: String,
    },
}

impl NewDeletionRecord {
    pub fn into_record(self) -> DeletionRecord {
        let (organization_id, deleter_id, deleted_user_id, deleted_invite_id, deleted_invite_email) =
            match self {
                NewDeletionRecord::Admin {
                    organization_id,
                    deleter_id,
                    deleted_user_id,
                } => (organization_id, deleter_id, Some(deleted_user_id), None, None),
                NewDeletionRecord::Invitation {
                    organization_id,
                    deleter_id,
                    invite_id,
                    invite_email,
                } => (organization_id, deleter_id, None, Some(invite_id), Some(invite_email)),
            };

        DeletionRecord {
            id: Uuid::new_v4(),
            organization_id: Some(organization_id),
            deleter_id: Some(deleter_id),
            deleted_user_id,
            deleted_invite_id,
            deleted_invite_email,
            created_at: Utc::now(),
        }
    }
}
