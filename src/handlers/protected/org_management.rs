// handlers/protected/org_management.rs - GET/POST /org_management[/:org_id] handler
//
// Lists every organization the user administers, each with its members,
// pending invitations, zones and an invitation form. POST submits one of
// those forms.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Form,
};
use serde::Serialize;
use uuid::Uuid;

use super::ORG_MANAGEMENT_PATH;
use crate::app::AppState;
use crate::database::models::{
    Invitation, NewInvitation, Organization, User, ZoneSummary, HEADLESS_ORG_NAME,
};
use crate::database::DatabaseError;
use crate::error::ApiError;
use crate::forms::{already_invited, FieldErrors, FormError, FormState, InvitationForm};
use crate::handlers::parse_id;
use crate::middleware::{CurrentUser, Flash, Page};
use crate::services::InvitationEmail;

const TEMPLATE: &str = "central/org_management.html";

#[derive(Debug, Serialize)]
struct OrganizationEntry {
    #[serde(flatten)]
    organization: Organization,
    owner: Option<User>,
    is_owner: bool,
    members: Vec<User>,
    invitations: Vec<Invitation>,
    zones: Vec<ZoneSummary>,
    form: FormState<InvitationForm>,
}

#[derive(Debug, Serialize)]
struct PendingInvitation {
    #[serde(flatten)]
    invitation: Invitation,
    organization_name: String,
}

#[derive(Debug, Serialize)]
struct OrgManagementContext {
    title: &'static str,
    organizations: Vec<OrganizationEntry>,
    #[serde(rename = "HEADLESS_ORG_NAME")]
    headless_org_name: &'static str,
    invitations: Vec<PendingInvitation>,
    focus_org_id: Option<Uuid>,
}

/// A submitted invitation form that failed validation.
struct RejectedForm {
    form: InvitationForm,
    errors: FieldErrors,
}

pub async fn org_management(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    flash: Flash,
) -> Result<Page, ApiError> {
    render(&state, &user, None, None, flash).await
}

pub async fn org_management_focus(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(org_id): Path<String>,
    flash: Flash,
) -> Result<Page, ApiError> {
    let focus = parse_id(&org_id, "Organization")?;
    render(&state, &user, Some(focus), None, flash).await
}

pub async fn org_management_submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    flash: Flash,
    Form(form): Form<InvitationForm>,
) -> Result<Response, ApiError> {
    submit_invitation(&state, &user, None, flash, form).await
}

pub async fn org_management_focus_submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(org_id): Path<String>,
    flash: Flash,
    Form(form): Form<InvitationForm>,
) -> Result<Response, ApiError> {
    let focus = parse_id(&org_id, "Organization")?;
    submit_invitation(&state, &user, Some(focus), flash, form).await
}

async fn submit_invitation(
    state: &AppState,
    user: &User,
    focus_org_id: Option<Uuid>,
    mut flash: Flash,
    form: InvitationForm,
) -> Result<Response, ApiError> {
    let valid = match form.validate(state.repo.as_ref()).await {
        Ok(valid) => valid,
        Err(FormError::Invalid(errors)) => {
            tracing::debug!("Invitation form from '{}' rejected: {:?}", user.username, errors);
            let rejected = RejectedForm { form, errors };
            let page = render(state, user, focus_org_id, Some(rejected), flash).await?;
            return Ok(page.into_response());
        }
        Err(FormError::Database(e)) => return Err(e.into()),
    };

    if !state.repo.is_member(valid.organization.id, user.id).await? {
        tracing::warn!(
            "User '{}' tried to invite '{}' to '{}' without being a member",
            user.username,
            valid.email_to_invite,
            valid.organization.name
        );
        return Err(ApiError::forbidden(
            "You are not allowed to invite admins to this organization.",
        ));
    }

    let invitation = match state
        .repo
        .create_invitation(NewInvitation {
            organization_id: valid.organization.id,
            email_to_invite: valid.email_to_invite.clone(),
            invited_by: user.id,
        })
        .await
    {
        Ok(invitation) => invitation,
        // Lost a race with an identical submission
        Err(DatabaseError::Constraint(_)) => {
            let mut errors = FieldErrors::default();
            errors.add(
                "email_to_invite",
                already_invited(&valid.email_to_invite, &valid.organization.name),
            );
            let rejected = RejectedForm { form, errors };
            let page = render(state, user, focus_org_id, Some(rejected), flash).await?;
            return Ok(page.into_response());
        }
        Err(e) => return Err(e.into()),
    };
    notify_invitee(state, user, &invitation, &valid.organization).await?;

    flash.success(format!(
        "An invitation has been sent to {} to join {}.",
        invitation.email_to_invite, valid.organization.name
    ));
    Ok(flash.redirect(ORG_MANAGEMENT_PATH))
}

/// Email the invitee. A failed notification leaves no invitation behind.
async fn notify_invitee(
    state: &AppState,
    user: &User,
    invitation: &Invitation,
    organization: &Organization,
) -> Result<(), ApiError> {
    let email = InvitationEmail::new(invitation, organization, user);
    if let Err(e) = state.mailer.send_invitation(&email).await {
        state.repo.delete_invitation(invitation.id).await?;
        return Err(e.into());
    }

    tracing::info!(
        "User '{}' invited '{}' to '{}'",
        user.username,
        invitation.email_to_invite,
        organization.name
    );
    Ok(())
}

async fn render(
    state: &AppState,
    user: &User,
    focus_org_id: Option<Uuid>,
    rejected: Option<RejectedForm>,
    flash: Flash,
) -> Result<Page, ApiError> {
    let repo = state.repo.as_ref();

    let mut organizations = repo.organizations_for_user(user.id).await?;
    if user.is_superuser {
        if let Some(headless) = repo.find_organization_by_name(HEADLESS_ORG_NAME).await? {
            if !organizations.iter().any(|org| org.id == headless.id) {
                organizations.push(headless);
            }
        }
    }

    let mut entries = Vec::with_capacity(organizations.len());
    for organization in organizations {
        let members = repo.organization_members(organization.id).await?;
        let owner = match organization.owner_id {
            Some(owner_id) => match members.iter().find(|m| m.id == owner_id) {
                Some(owner) => Some(owner.clone()),
                None => repo.get_user(owner_id).await?,
            },
            None => None,
        };

        let form = match &rejected {
            Some(rejected) if rejected.form.organization_id() == Some(organization.id) => {
                let mut data = rejected.form.clone();
                data.invited_by = Some(user.id);
                FormState::with_errors(data, rejected.errors.clone())
            }
            _ => FormState::blank(InvitationForm::blank(organization.id, user.id)),
        };

        entries.push(OrganizationEntry {
            is_owner: organization.is_owned_by(user.id),
            invitations: repo.invitations_for_organization(organization.id).await?,
            zones: repo.zones_for_organization(organization.id).await?,
            owner,
            members,
            form,
            organization,
        });
    }

    let mut invitations = Vec::new();
    for invitation in repo.invitations_for_email(&user.email).await? {
        let organization_name = repo
            .get_organization(invitation.organization_id)
            .await?
            .map(|org| org.name)
            .unwrap_or_default();
        invitations.push(PendingInvitation {
            invitation,
            organization_name,
        });
    }

    let context = OrgManagementContext {
        title: "Account administration",
        organizations: entries,
        headless_org_name: HEADLESS_ORG_NAME,
        invitations,
        focus_org_id,
    };
    Ok(Page::new(TEMPLATE, context).with_flash(flash))
}
