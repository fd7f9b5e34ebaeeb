use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// What the management page shows for each zone of an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ZoneSummary {
    pub id: Uuid,
    pub name: String,
    /// A zone can be removed only while no devices or facilities are registered in it.
    pub is_deletable: bool,
}
