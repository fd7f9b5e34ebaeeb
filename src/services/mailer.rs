use async_trait::async_trait;
use serde::Serialize;

use crate::config;
use crate::database::models::{Invitation, Organization, User};

/// Notification sent to an invited address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvitationEmail {
    pub to: String,
    pub subject: String,
    pub organization_name: String,
    pub invited_by: String,
    pub accept_url: String,
}

impl InvitationEmail {
    pub fn new(invitation: &Invitation, organization: &Organization, inviter: &User) -> Self {
        let base_url = config::config().site.base_url.trim_end_matches('/').to_string();
        Self {
            to: invitation.email_to_invite.clone(),
            subject: format!("You have been invited to administer {}", organization.name),
            organization_name: organization.name.clone(),
            invited_by: inviter.username.clone(),
            accept_url: format!("{}/org_invite_action/{}", base_url, invitation.id),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid recipient address: {0}")]
    InvalidRecipient(String),
    #[error("Mail transport failed: {0}")]
    Transport(String),
}

/// Invitation dispatch seam. Delivery itself is handled elsewhere.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_invitation(&self, email: &InvitationEmail) -> Result<(), MailError>;
}

/// Writes invitations to the log instead of delivering them.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_invitation(&self, email: &InvitationEmail) -> Result<(), MailError> {
        if !email.to.contains('@') {
            return Err(MailError::InvalidRecipient(email.to.clone()));
        }
        tracing::info!(
            to = %email.to,
            organization = %email.organization_name,
            invited_by = %email.invited_by,
            "Invitation email: {} ({})",
            email.subject,
            email.accept_url
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[tokio::test]
    async fn builds_accept_link_from_invitation() {
        let now = Utc::now();
        let org = Organization {
            id: Uuid::new_v4(),
            name: "Riverside".into(),
            description: None,
            url: None,
            owner_id: None,
            created_at: now,
            updated_at: now,
        };
        let inviter = User {
            id: Uuid::new_v4(),
            username: "ada".into(),
            email: "ada@example.org".into(),
            is_superuser: false,
            created_at: now,
        };
        let invitation = Invitation {
            id: Uuid::new_v4(),
            organization_id: org.id,
            email_to_invite: "grace@example.org".into(),
            invited_by: Some(inviter.id),
            created_at: now,
        };

        let email = InvitationEmail::new(&invitation, &org, &inviter);
        assert_eq!(email.to, "grace@example.org");
        assert!(email.accept_url.ends_with(&format!("/org_invite_action/{}", invitation.id)));
        assert!(LogMailer.send_invitation(&email).await.is_ok());
    }
}
