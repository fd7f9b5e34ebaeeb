use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{
    normalize_email, DeletionRecord, FeedListing, Invitation, NewDeletionRecord, NewInvitation,
    NewOrganization, Organization, OrganizationChanges, Subscription, User, ZoneSummary,
};
use super::repository::Repository;

#[derive(Debug, Clone)]
struct Zone {
    id: Uuid,
    organization_id: Uuid,
    name: String,
    dependents: u32,
}

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    organizations: HashMap<Uuid, Organization>,
    members: BTreeSet<(Uuid, Uuid)>,
    zones: Vec<Zone>,
    invitations: HashMap<Uuid, Invitation>,
    deletions: Vec<DeletionRecord>,
    subscriptions: Vec<Subscription>,
    feed: Vec<FeedListing>,
}

/// In-process repository for tests and local demos.
#[derive(Default)]
pub struct MemoryRepository {
    state: RwLock<MemoryState>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a zone under an organization. `dependents` counts the devices
    /// and facilities registered in it.
    pub async fn add_zone(&self, organization_id: Uuid, name: &str, dependents: u32) -> Uuid {
        let id = Uuid::new_v4();
        self.state.write().await.zones.push(Zone {
            id,
            organization_id,
            name: name.to_string(),
            dependents,
        });
        id
    }

    pub async fn add_feed_listing(&self, title: &str, url: &str, posted_date: DateTime<Utc>) -> Uuid {
        let id = Uuid::new_v4();
        self.state.write().await.feed.push(FeedListing {
            id,
            title: title.to_string(),
            url: url.to_string(),
            posted_date,
        });
        id
    }

    pub async fn invitation_count(&self) -> usize {
        self.state.read().await.invitations.len()
    }

    pub async fn subscriptions(&self) -> Vec<Subscription> {
        self.state.read().await.subscriptions.clone()
    }
}

fn sorted_organizations<'a>(orgs: impl Iterator<Item = &'a Organization>) -> Vec<Organization> {
    let mut orgs: Vec<Organization> = orgs.cloned().collect();
    orgs.sort_by(|a, b| a.name.cmp(&b.name).then(a.created_at.cmp(&b.created_at)));
    orgs
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn create_user(
        &self,
        username: &str,
        email: &str,
        is_superuser: bool,
    ) -> Result<User, DatabaseError> {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: normalize_email(email),
            is_superuser,
            created_at: Utc::now(),
        };
        self.state.write().await.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_organization(&self, id: Uuid) -> Result<Option<Organization>, DatabaseError> {
        Ok(self.state.read().await.organizations.get(&id).cloned())
    }

    async fn find_organization_by_name(&self, name: &str) -> Result<Option<Organization>, DatabaseError> {
        let state = self.state.read().await;
        Ok(sorted_organizations(state.organizations.values().filter(|o| o.name == name))
            .into_iter()
            .next())
    }

    async fn organizations_for_user(&self, user_id: Uuid) -> Result<Vec<Organization>, DatabaseError> {
        let state = self.state.read().await;
        Ok(sorted_organizations(
            state
                .organizations
                .values()
                .filter(|o| state.members.contains(&(o.id, user_id))),
        ))
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>, DatabaseError> {
        let state = self.state.read().await;
        Ok(sorted_organizations(state.organizations.values()))
    }

    async fn create_organization(
        &self,
        new: NewOrganization,
        owner_id: Uuid,
    ) -> Result<Organization, DatabaseError> {
        let now = Utc::now();
        let org = Organization {
            id: Uuid::new_v4(),
            name: new.name,
            description: new.description,
            url: new.url,
            owner_id: Some(owner_id),
            created_at: now,
            updated_at: now,
        };
        let mut state = self.state.write().await;
        state.organizations.insert(org.id, org.clone());
        state.members.insert((org.id, owner_id));
        Ok(org)
    }

    async fn update_organization(
        &self,
        id: Uuid,
        changes: OrganizationChanges,
        owner_id: Uuid,
    ) -> Result<Organization, DatabaseError> {
        let mut state = self.state.write().await;
        let org = state
            .organizations
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::NotFound(format!("organization {id}")))?;
        org.name = changes.name;
        org.description = changes.description;
        org.url = changes.url;
        org.owner_id = org.owner_id.or(Some(owner_id));
        org.updated_at = Utc::now();
        Ok(org.clone())
    }

    async fn delete_organization(&self, id: Uuid) -> Result<(), DatabaseError> {
        let mut state = self.state.write().await;
        if state.zones.iter().any(|z| z.organization_id == id) {
            // Mirrors the RESTRICT foreign key on zones.
            return Err(DatabaseError::Constraint(format!("organization {id} still owns zones")));
        }
        if state.organizations.remove(&id).is_none() {
            return Err(DatabaseError::NotFound(format!("organization {id}")));
        }
        state.members.retain(|(org_id, _)| *org_id != id);
        state.invitations.retain(|_, invite| invite.organization_id != id);
        for record in state.deletions.iter_mut() {
            if record.organization_id == Some(id) {
                record.organization_id = None;
            }
        }
        Ok(())
    }

    async fn is_member(&self, organization_id: Uuid, user_id: Uuid) -> Result<bool, DatabaseError> {
        Ok(self.state.read().await.members.contains(&(organization_id, user_id)))
    }

    async fn organization_members(&self, organization_id: Uuid) -> Result<Vec<User>, DatabaseError> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state
            .members
            .iter()
            .filter(|(org_id, _)| *org_id == organization_id)
            .filter_map(|(_, user_id)| state.users.get(user_id).cloned())
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn add_member(&self, organization_id: Uuid, user_id: Uuid) -> Result<(), DatabaseError> {
        self.state.write().await.members.insert((organization_id, user_id));
        Ok(())
    }

    async fn remove_member(&self, organization_id: Uuid, user_id: Uuid) -> Result<(), DatabaseError> {
        self.state.write().await.members.remove(&(organization_id, user_id));
        Ok(())
    }

    async fn zones_for_organization(&self, organization_id: Uuid) -> Result<Vec<ZoneSummary>, DatabaseError> {
        let state = self.state.read().await;
        let mut zones: Vec<ZoneSummary> = state
            .zones
            .iter()
            .filter(|z| z.organization_id == organization_id)
            .map(|z| ZoneSummary {
                id: z.id,
                name: z.name.clone(),
                is_deletable: z.dependents == 0,
            })
            .collect();
        zones.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(zones)
    }

    async fn zone_count(&self, organization_id: Uuid) -> Result<i64, DatabaseError> {
        let state = self.state.read().await;
        Ok(state.zones.iter().filter(|z| z.organization_id == organization_id).count() as i64)
    }

    async fn get_invitation(&self, id: Uuid) -> Result<Option<Invitation>, DatabaseError> {
        Ok(self.state.read().await.invitations.get(&id).cloned())
    }

    async fn create_invitation(&self, new: NewInvitation) -> Result<Invitation, DatabaseError> {
        let invite = Invitation {
            id: Uuid::new_v4(),
            organization_id: new.organization_id,
            email_to_invite: normalize_email(&new.email_to_invite),
            invited_by: Some(new.invited_by),
            created_at: Utc::now(),
        };

        let mut state = self.state.write().await;
        let duplicate = state.invitations.values().any(|i| {
            i.organization_id == invite.organization_id && i.email_to_invite == invite.email_to_invite
        });
        if duplicate {
            return Err(DatabaseError::Constraint(format!(
                "{} is already invited to organization {}",
                invite.email_to_invite, invite.organization_id
            )));
        }
        state.invitations.insert(invite.id, invite.clone());
        Ok(invite)
    }

    async fn delete_invitation(&self, id: Uuid) -> Result<(), DatabaseError> {
        self.state.write().await.invitations.remove(&id);
        Ok(())
    }

    async fn invitations_for_email(&self, email: &str) -> Result<Vec<Invitation>, DatabaseError> {
        let email = normalize_email(email);
        let state = self.state.read().await;
        let mut invites: Vec<Invitation> = state
            .invitations
            .values()
            .filter(|i| i.email_to_invite == email)
            .cloned()
            .collect();
        invites.sort_by_key(|i| i.created_at);
        Ok(invites)
    }

    async fn invitations_for_organization(&self, organization_id: Uuid) -> Result<Vec<Invitation>, DatabaseError> {
        let state = self.state.read().await;
        let mut invites: Vec<Invitation> = state
            .invitations
            .values()
            .filter(|i| i.organization_id == organization_id)
            .cloned()
            .collect();
        invites.sort_by_key(|i| i.created_at);
        Ok(invites)
    }

    async fn create_deletion_record(&self, new: NewDeletionRecord) -> Result<DeletionRecord, DatabaseError> {
        let record = new.into_record();
        self.state.write().await.deletions.push(record.clone());
        Ok(record)
    }

    async fn deletion_records_for_organization(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<DeletionRecord>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state
            .deletions
            .iter()
            .filter(|r| r.organization_id == Some(organization_id))
            .cloned()
            .collect())
    }

    async fn create_subscription(&self, email: &str, ip: &str) -> Result<Subscription, DatabaseError> {
        let sub = Subscription {
            id: Uuid::new_v4(),
            email: email.to_string(),
            ip: ip.to_string(),
            created_at: Utc::now(),
        };
        self.state.write().await.subscriptions.push(sub.clone());
        Ok(sub)
    }

    async fn latest_feed(&self, limit: i64) -> Result<Vec<FeedListing>, DatabaseError> {
        let state = self.state.read().await;
        let mut feed = state.feed.clone();
        feed.sort_by(|a, b| b.posted_date.cmp(&a.posted_date));
        feed.truncate(limit.max(0) as usize);
        Ok(feed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn owner_becomes_member_on_create() {
        let repo = MemoryRepository::new();
        let owner = repo.create_user("owner", "owner@example.org", false).await.unwrap();
        let org = repo
            .create_organization(
                NewOrganization {
                    name: "Learning Lab".into(),
                    description: None,
                    url: None,
                },
                owner.id,
            )
            .await
            .unwrap();

        assert!(repo.is_member(org.id, owner.id).await.unwrap());
        assert!(org.is_owned_by(owner.id));
    }

    #[tokio::test]
    async fn update_keeps_existing_owner() {
        let repo = MemoryRepository::new();
        let owner = repo.create_user("owner", "owner@example.org", false).await.unwrap();
        let editor = repo.create_user("editor", "editor@example.org", false).await.unwrap();
        let org = repo
            .create_organization(
                NewOrganization {
                    name: "Before".into(),
                    description: None,
                    url: None,
                },
                owner.id,
            )
            .await
            .unwrap();

        let updated = repo
            .update_organization(
                org.id,
                OrganizationChanges {
                    name: "After".into(),
                    description: Some("renamed".into()),
                    url: None,
                },
                editor.id,
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "After");
        assert_eq!(updated.owner_id, Some(owner.id));
    }

    #[tokio::test]
    async fn zone_deletability_follows_dependents() {
        let repo = MemoryRepository::new();
        let owner = repo.create_user("owner", "owner@example.org", false).await.unwrap();
        let org = repo
            .create_organization(
                NewOrganization {
                    name: "Zones".into(),
                    description: None,
                    url: None,
                },
                owner.id,
            )
            .await
            .unwrap();
        repo.add_zone(org.id, "empty", 0).await;
        repo.add_zone(org.id, "busy", 3).await;

        let zones = repo.zones_for_organization(org.id).await.unwrap();
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].name, "busy");
        assert!(!zones[0].is_deletable);
        assert!(zones[1].is_deletable);
        assert!(repo.delete_organization(org.id).await.is_err());
    }

    #[tokio::test]
    async fn latest_feed_is_newest_first_and_limited() {
        let repo = MemoryRepository::new();
        let now = Utc::now();
        for day in 0..7 {
            repo.add_feed_listing(&format!("post {day}"), "https://example.org", now - Duration::days(day))
                .await;
        }
        let feed = repo.latest_feed(5).await.unwrap();
        assert_eq!(feed.len(), 5);
        assert_eq!(feed[0].title, "post 0");
        assert_eq!(feed[4].title, "post 4");
    }
}
