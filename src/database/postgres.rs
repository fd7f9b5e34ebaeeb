use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{
    normalize_email, DeletionRecord, FeedListing, Invitation, NewDeletionRecord, NewInvitation,
    NewOrganization, Organization, OrganizationChanges, Subscription, User, ZoneSummary,
};
use super::repository::Repository;

const ORGANIZATION_COLUMNS: &str =
    "o.id, o.name, o.description, o.url, o.owner_id, o.created_at, o.updated_at";

/// PostgreSQL-backed repository
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, is_superuser, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, is_superuser, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_user(
        &self,
        username: &str,
        email: &str,
        is_superuser: bool,
    ) -> Result<User, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, is_superuser)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, is_superuser, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(normalize_email(email))
        .bind(is_superuser)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_organization(&self, id: Uuid) -> Result<Option<Organization>, DatabaseError> {
        let sql = format!("SELECT {ORGANIZATION_COLUMNS} FROM organizations o WHERE o.id = $1");
        let org = sqlx::query_as::<_, Organization>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(org)
    }

    async fn find_organization_by_name(&self, name: &str) -> Result<Option<Organization>, DatabaseError> {
        let sql = format!(
            "SELECT {ORGANIZATION_COLUMNS} FROM organizations o WHERE o.name = $1 ORDER BY o.created_at LIMIT 1"
        );
        let org = sqlx::query_as::<_, Organization>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(org)
    }

    async fn organizations_for_user(&self, user_id: Uuid) -> Result<Vec<Organization>, DatabaseError> {
        let sql = format!(
            r#"
            SELECT {ORGANIZATION_COLUMNS}
            FROM organizations o
            JOIN organization_members m ON m.organization_id = o.id
            WHERE m.user_id = $1
            ORDER BY o.name, o.created_at
            "#
        );
        let orgs = sqlx::query_as::<_, Organization>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(orgs)
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>, DatabaseError> {
        let sql = format!("SELECT {ORGANIZATION_COLUMNS} FROM organizations o ORDER BY o.name, o.created_at");
        let orgs = sqlx::query_as::<_, Organization>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(orgs)
    }

    async fn create_organization(
        &self,
        new: NewOrganization,
        owner_id: Uuid,
    ) -> Result<Organization, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let org = sqlx::query_as::<_, Organization>(
            r#"
            INSERT INTO organizations (id, name, description, url, owner_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, description, url, owner_id, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.url)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO organization_members (organization_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(org.id)
        .bind(owner_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(org)
    }

    async fn update_organization(
        &self,
        id: Uuid,
        changes: OrganizationChanges,
        owner_id: Uuid,
    ) -> Result<Organization, DatabaseError> {
        let org = sqlx::query_as::<_, Organization>(
            r#"
            UPDATE organizations
            SET name = $2,
                description = $3,
                url = $4,
                owner_id = COALESCE(owner_id, $5),
                updated_at = $6
            WHERE id = $1
            RETURNING id, name, description, url, owner_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(&changes.url)
        .bind(owner_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        org.ok_or_else(|| DatabaseError::NotFound(format!("organization {id}")))
    }

    async fn delete_organization(&self, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    DatabaseError::Constraint(format!("organization {id} still owns zones"))
                }
                other => DatabaseError::Sqlx(other),
            })?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("organization {id}")));
        }
        Ok(())
    }

    async fn is_member(&self, organization_id: Uuid, user_id: Uuid) -> Result<bool, DatabaseError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM organization_members WHERE organization_id = $1 AND user_id = $2)",
        )
        .bind(organization_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn organization_members(&self, organization_id: Uuid) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.username, u.email, u.is_superuser, u.created_at
            FROM users u
            JOIN organization_members m ON m.user_id = u.id
            WHERE m.organization_id = $1
            ORDER BY u.username
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn add_member(&self, organization_id: Uuid, user_id: Uuid) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO organization_members (organization_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(organization_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_member(&self, organization_id: Uuid, user_id: Uuid) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM organization_members WHERE organization_id = $1 AND user_id = $2")
            .bind(organization_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn zones_for_organization(&self, organization_id: Uuid) -> Result<Vec<ZoneSummary>, DatabaseError> {
        let zones = sqlx::query_as::<_, ZoneSummary>(
            r#"
            SELECT z.id,
                   z.name,
                   NOT (EXISTS (SELECT 1 FROM zone_devices d WHERE d.zone_id = z.id)
                        OR EXISTS (SELECT 1 FROM zone_facilities f WHERE f.zone_id = z.id)) AS is_deletable
            FROM zones z
            WHERE z.organization_id = $1
            ORDER BY z.name
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(zones)
    }

    async fn zone_count(&self, organization_id: Uuid) -> Result<i64, DatabaseError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM zones WHERE organization_id = $1")
            .bind(organization_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn get_invitation(&self, id: Uuid) -> Result<Option<Invitation>, DatabaseError> {
        let invite = sqlx::query_as::<_, Invitation>(
            r#"
            SELECT id, organization_id, email_to_invite, invited_by, created_at
            FROM organization_invitations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(invite)
    }

    async fn create_invitation(&self, new: NewInvitation) -> Result<Invitation, DatabaseError> {
        let invite = sqlx::query_as::<_, Invitation>(
            r#"
            INSERT INTO organization_invitations (id, organization_id, email_to_invite, invited_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id, organization_id, email_to_invite, invited_by, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.organization_id)
        .bind(normalize_email(&new.email_to_invite))
        .bind(new.invited_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => DatabaseError::Constraint(format!(
                "{} is already invited to organization {}",
                new.email_to_invite, new.organization_id
            )),
            other => DatabaseError::Sqlx(other),
        })?;
        Ok(invite)
    }

    async fn delete_invitation(&self, id: Uuid) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM organization_invitations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn invitations_for_email(&self, email: &str) -> Result<Vec<Invitation>, DatabaseError> {
        let invites = sqlx::query_as::<_, Invitation>(
            r#"
            SELECT id, organization_id, email_to_invite, invited_by, created_at
            FROM organization_invitations
            WHERE email_to_invite = $1
            ORDER BY created_at
            "#,
        )
        .bind(normalize_email(email))
        .fetch_all(&self.pool)
        .await?;
        Ok(invites)
    }

    async fn invitations_for_organization(&self, organization_id: Uuid) -> Result<Vec<Invitation>, DatabaseError> {
        let invites = sqlx::query_as::<_, Invitation>(
            r#"
            SELECT id, organization_id, email_to_invite, invited_by, created_at
            FROM organization_invitations
            WHERE organization_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(invites)
    }

    async fn create_deletion_record(&self, new: NewDeletionRecord) -> Result<DeletionRecord, DatabaseError> {
        let record = new.into_record();
        let saved = sqlx::query_as::<_, DeletionRecord>(
            r#"
            INSERT INTO deletion_records
                (id, organization_id, deleter_id, deleted_user_id, deleted_invite_id, deleted_invite_email, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, organization_id, deleter_id, deleted_user_id, deleted_invite_id, deleted_invite_email, created_at
            "#,
        )
        .bind(record.id)
        .bind(record.organization_id)
        .bind(record.deleter_id)
        .bind(record.deleted_user_id)
        .bind(record.deleted_invite_id)
        .bind(&record.deleted_invite_email)
        .bind(record.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }

    async fn deletion_records_for_organization(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<DeletionRecord>, DatabaseError> {
        let records = sqlx::query_as::<_, DeletionRecord>(
            r#"
            SELECT id, organization_id, deleter_id, deleted_user_id, deleted_invite_id, deleted_invite_email, created_at
            FROM deletion_records
            WHERE organization_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn create_subscription(&self, email: &str, ip: &str) -> Result<Subscription, DatabaseError> {
        let sub = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (id, email, ip)
            VALUES ($1, $2, $3)
            RETURNING id, email, ip, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(ip)
        .fetch_one(&self.pool)
        .await?;
        Ok(sub)
    }

    async fn latest_feed(&self, limit: i64) -> Result<Vec<FeedListing>, DatabaseError> {
        let feed = sqlx::query_as::<_, FeedListing>(
            "SELECT id, title, url, posted_date FROM feed_listings ORDER BY posted_date DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(feed)
    }
}
