//! Submitted form data and its validation.
//!
//! A form that fails validation is sent back to the page with its data and
//! per-field errors so the user can correct it.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;
use uuid::Uuid;

use crate::database::models::{normalize_email, NewOrganization, Organization};
use crate::database::{DatabaseError, Repository};

pub const ORGANIZATION_NAME_MAX: usize = 100;

static EMAIL_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

/// Field name to error message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("The submitted form has errors")]
    Invalid(FieldErrors),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// A form as handed to a page: the data to prefill plus any errors.
#[derive(Debug, Clone, Serialize)]
pub struct FormState<T: Serialize> {
    pub data: T,
    pub errors: FieldErrors,
}

impl<T: Serialize> FormState<T> {
    pub fn blank(data: T) -> Self {
        Self {
            data,
            errors: FieldErrors::default(),
        }
    }

    pub fn with_errors(data: T, errors: FieldErrors) -> Self {
        Self { data, errors }
    }
}

pub fn valid_email(email: &str) -> bool {
    EMAIL_RE.as_ref().is_some_and(|re| re.is_match(email))
}

// ---------------------------------------------------------------------------
// Invitations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitationForm {
    #[serde(default)]
    pub email_to_invite: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default, skip_deserializing)]
    pub invited_by: Option<Uuid>,
}

/// A validated invitation, ready to be sent and stored.
#[derive(Debug, Clone)]
pub struct ValidInvitation {
    pub organization: Organization,
    pub email_to_invite: String,
}

impl InvitationForm {
    /// Empty form attached to an organization on the management page.
    pub fn blank(organization_id: Uuid, invited_by: Uuid) -> Self {
        Self {
            email_to_invite: String::new(),
            organization: organization_id.to_string(),
            invited_by: Some(invited_by),
        }
    }

    /// The organization this submission targets, if the field holds an id.
    pub fn organization_id(&self) -> Option<Uuid> {
        Uuid::parse_str(self.organization.trim()).ok()
    }

    pub async fn validate(&self, repo: &dyn Repository) -> Result<ValidInvitation, FormError> {
        let mut errors = FieldErrors::default();

        let email = normalize_email(&self.email_to_invite);
        if email.is_empty() {
            errors.add("email_to_invite", "This field is required.");
        } else if !valid_email(&email) {
            errors.add("email_to_invite", "Enter a valid email address.");
        }

        let organization = match self.organization_id() {
            Some(id) => repo.get_organization(id).await?,
            None => None,
        };
        let Some(organization) = organization else {
            errors.add("organization", "Select a valid organization.");
            return Err(FormError::Invalid(errors));
        };

        if errors.is_empty() {
            let pending = repo.invitations_for_organization(organization.id).await?;
            if pending.iter().any(|invite| invite.email_to_invite == email) {
                errors.add("email_to_invite", already_invited(&email, &organization.name));
            }
        }

        if errors.is_empty() {
            let members = repo.organization_members(organization.id).await?;
            if members.iter().any(|user| normalize_email(&user.email) == email) {
                errors.add(
                    "email_to_invite",
                    format!("{} is already an admin of {}.", email, organization.name),
                );
            }
        }

        if !errors.is_empty() {
            return Err(FormError::Invalid(errors));
        }

        Ok(ValidInvitation {
            organization,
            email_to_invite: email,
        })
    }
}

pub fn already_invited(email: &str, organization_name: &str) -> String {
    format!("{email} has already been invited to {organization_name}.")
}

// ---------------------------------------------------------------------------
// Organizations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
}

impl OrganizationForm {
    pub fn from_organization(org: &Organization) -> Self {
        Self {
            name: org.name.clone(),
            description: org.description.clone().unwrap_or_default(),
            url: org.url.clone().unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> Result<NewOrganization, FieldErrors> {
        let mut errors = FieldErrors::default();

        let name = self.name.trim();
        if name.is_empty() {
            errors.add("name", "This field is required.");
        } else if name.chars().count() > ORGANIZATION_NAME_MAX {
            errors.add(
                "name",
                format!("Ensure this value has at most {ORGANIZATION_NAME_MAX} characters."),
            );
        }

        let url = self.url.trim();
        if !url.is_empty() {
            let usable = Url::parse(url)
                .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
                .unwrap_or(false);
            if !usable {
                errors.add("url", "Enter a valid URL.");
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let optional = |value: &str| {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        };

        Ok(NewOrganization {
            name: name.to_string(),
            description: optional(&self.description),
            url: optional(url),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryRepository;

    async fn repo_with_org() -> (MemoryRepository, Organization) {
        let repo = MemoryRepository::new();
        let owner = repo.create_user("owner", "owner@example.org", false).await.unwrap();
        let org = repo
            .create_organization(
                NewOrganization {
                    name: "Hillside".into(),
                    description: None,
                    url: None,
                },
                owner.id,
            )
            .await
            .unwrap();
        (repo, org)
    }

    fn invite(email: &str, org: &str) -> InvitationForm {
        InvitationForm {
            email_to_invite: email.into(),
            organization: org.into(),
            invited_by: None,
        }
    }

    #[test]
    fn email_pattern() {
        assert!(valid_email("a@example.com"));
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-domain@"));
    }

    #[tokio::test]
    async fn valid_invitation_is_normalized() {
        let (repo, org) = repo_with_org().await;
        let valid = invite("  New.Admin@Example.org ", &org.id.to_string())
            .validate(&repo)
            .await
            .unwrap();
        assert_eq!(valid.email_to_invite, "new.admin@example.org");
        assert_eq!(valid.organization.id, org.id);
    }

    #[tokio::test]
    async fn rejects_bad_email_and_unknown_organization() {
        let (repo, org) = repo_with_org().await;

        match invite("nope", &org.id.to_string()).validate(&repo).await {
            Err(FormError::Invalid(errors)) => {
                assert_eq!(errors.get("email_to_invite"), Some("Enter a valid email address."))
            }
            other => panic!("expected invalid form, got {other:?}"),
        }

        match invite("a@example.org", &Uuid::new_v4().to_string()).validate(&repo).await {
            Err(FormError::Invalid(errors)) => assert!(errors.get("organization").is_some()),
            other => panic!("expected invalid form, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejects_existing_member_and_duplicate_invite() {
        let (repo, org) = repo_with_org().await;

        let member = invite("OWNER@example.org", &org.id.to_string()).validate(&repo).await;
        assert!(matches!(member, Err(FormError::Invalid(_))));

        let owner = repo.find_user_by_username("owner").await.unwrap().unwrap();
        repo.create_invitation(crate::database::models::NewInvitation {
            organization_id: org.id,
            email_to_invite: "pending@example.org".into(),
            invited_by: owner.id,
        })
        .await
        .unwrap();
        let duplicate = invite("pending@example.org", &org.id.to_string()).validate(&repo).await;
        assert!(matches!(duplicate, Err(FormError::Invalid(_))));
    }

    #[test]
    fn organization_form_rules() {
        let ok = OrganizationForm {
            name: " Lakeside ".into(),
            description: "".into(),
            url: "https://lakeside.example.org".into(),
        }
        .validate()
        .unwrap();
        assert_eq!(ok.name, "Lakeside");
        assert_eq!(ok.description, None);

        let errors = OrganizationForm {
            name: "x".repeat(ORGANIZATION_NAME_MAX + 1),
            description: String::new(),
            url: "javascript:alert(1)".into(),
        }
        .validate()
        .unwrap_err();
        assert!(errors.get("name").is_some());
        assert!(errors.get("url").is_some());

        assert!(OrganizationForm::default().validate().is_err());
    }
}
