use async_trait::async_trait;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{
    DeletionRecord, FeedListing, Invitation, NewDeletionRecord, NewInvitation, NewOrganization,
    Organization, OrganizationChanges, Subscription, User, ZoneSummary,
};

/// Persistence seam used by every handler.
///
/// `PgRepository` is the production implementation; `MemoryRepository` backs the
/// integration tests and local demos. Each call is one immediate write or read;
/// handlers never hold a transaction across calls.
#[async_trait]
pub trait Repository: Send + Sync {
    // Users
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError>;
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        is_superuser: bool,
    ) -> Result<User, DatabaseError>;

    // Organizations
    async fn get_organization(&self, id: Uuid) -> Result<Option<Organization>, DatabaseError>;
    async fn find_organization_by_name(&self, name: &str) -> Result<Option<Organization>, DatabaseError>;
    /// Organizations the user is a member of, ordered by name.
    async fn organizations_for_user(&self, user_id: Uuid) -> Result<Vec<Organization>, DatabaseError>;
    async fn list_organizations(&self) -> Result<Vec<Organization>, DatabaseError>;
    /// Insert a new organization owned by `owner_id`; the owner becomes a member.
    async fn create_organization(
        &self,
        new: NewOrganization,
        owner_id: Uuid,
    ) -> Result<Organization, DatabaseError>;
    /// Update name/description/url; an organization without an owner adopts `owner_id`.
    async fn update_organization(
        &self,
        id: Uuid,
        changes: OrganizationChanges,
        owner_id: Uuid,
    ) -> Result<Organization, DatabaseError>;
    async fn delete_organization(&self, id: Uuid) -> Result<(), DatabaseError>;

    // Membership
    async fn is_member(&self, organization_id: Uuid, user_id: Uuid) -> Result<bool, DatabaseError>;
    async fn organization_members(&self, organization_id: Uuid) -> Result<Vec<User>, DatabaseError>;
    /// Idempotent.
    async fn add_member(&self, organization_id: Uuid, user_id: Uuid) -> Result<(), DatabaseError>;
    async fn remove_member(&self, organization_id: Uuid, user_id: Uuid) -> Result<(), DatabaseError>;

    // Zones
    async fn zones_for_organization(&self, organization_id: Uuid) -> Result<Vec<ZoneSummary>, DatabaseError>;
    async fn zone_count(&self, organization_id: Uuid) -> Result<i64, DatabaseError>;

    // Invitations
    async fn get_invitation(&self, id: Uuid) -> Result<Option<Invitation>, DatabaseError>;
    async fn create_invitation(&self, new: NewInvitation) -> Result<Invitation, DatabaseError>;
    async fn delete_invitation(&self, id: Uuid) -> Result<(), DatabaseError>;
    async fn invitations_for_email(&self, email: &str) -> Result<Vec<Invitation>, DatabaseError>;
    async fn invitations_for_organization(&self, organization_id: Uuid) -> Result<Vec<Invitation>, DatabaseError>;

    // Audit
    async fn create_deletion_record(&self, new: NewDeletionRecord) -> Result<DeletionRecord, DatabaseError>;
    async fn deletion_records_for_organization(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<DeletionRecord>, DatabaseError>;

    // Content
    async fn create_subscription(&self, email: &str, ip: &str) -> Result<Subscription, DatabaseError>;
    async fn latest_feed(&self, limit: i64) -> Result<Vec<FeedListing>, DatabaseError>;
}
