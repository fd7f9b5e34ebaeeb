use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FeedListing {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub posted_date: DateTime<Utc>,
}
