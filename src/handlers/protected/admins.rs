// handlers/protected/admins.rs - POST /delete_admin/:org_id/:user_id and
// POST /delete_invite/:org_id/:invite_id handlers
//
// Both removals leave a deletion record behind for auditing.

use axum::{
    extract::{Path, State},
    response::Response,
};

use super::ORG_MANAGEMENT_PATH;
use crate::app::AppState;
use crate::auth::require_authorized_admin;
use crate::database::models::NewDeletionRecord;
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::middleware::{CurrentUser, Flash};

pub async fn delete_admin(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((org_id, user_id)): Path<(String, String)>,
    mut flash: Flash,
) -> Result<Response, ApiError> {
    let org_id = parse_id(&org_id, "Organization")?;
    let organization = require_authorized_admin(state.repo.as_ref(), &user, org_id).await?;

    let admin_id = parse_id(&user_id, "Admin")?;
    let admin = state
        .repo
        .organization_members(organization.id)
        .await?
        .into_iter()
        .find(|member| member.id == admin_id)
        .ok_or_else(|| ApiError::not_found(format!("{} has no admin {admin_id}", organization.name)))?;

    if organization.is_owned_by(admin.id) {
        tracing::warn!("User '{}' tried to remove the owner of '{}'", user.username, organization.name);
        return Err(ApiError::forbidden("The owner of an organization cannot be removed."));
    }
    if admin.id == user.id {
        tracing::warn!("User '{}' tried to remove themselves from '{}'", user.username, organization.name);
        return Err(ApiError::forbidden(
            "Your personal views are your own, but in this case you are not allowed to delete yourself.",
        ));
    }

    state
        .repo
        .create_deletion_record(NewDeletionRecord::Admin {
            organization_id: organization.id,
            deleter_id: user.id,
            deleted_user_id: admin.id,
        })
        .await?;
    state.repo.remove_member(organization.id, admin.id).await?;

    tracing::info!(
        "User '{}' removed admin '{}' from '{}'",
        user.username,
        admin.username,
        organization.name
    );
    flash.success(format!(
        "You have successfully removed {} as an administrator for {}.",
        admin.username, organization.name
    ));
    Ok(flash.redirect(ORG_MANAGEMENT_PATH))
}

pub async fn delete_invite(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((org_id, invite_id)): Path<(String, String)>,
    mut flash: Flash,
) -> Result<Response, ApiError> {
    let org_id = parse_id(&org_id, "Organization")?;
    let organization = require_authorized_admin(state.repo.as_ref(), &user, org_id).await?;

    let invite_id = parse_id(&invite_id, "Invitation")?;
    let invitation = state
        .repo
        .get_invitation(invite_id)
        .await?
        .filter(|invite| invite.organization_id == organization.id)
        .ok_or_else(|| ApiError::not_found(format!("Invitation {invite_id} not found")))?;

    state
        .repo
        .create_deletion_record(NewDeletionRecord::Invitation {
            organization_id: organization.id,
            deleter_id: user.id,
            invite_id: invitation.id,
            invite_email: invitation.email_to_invite.clone(),
        })
        .await?;
    state.repo.delete_invitation(invitation.id).await?;

    tracing::info!(
        "User '{}' revoked the invitation for '{}' to '{}'",
        user.username,
        invitation.email_to_invite,
        organization.name
    );
    flash.success(format!(
        "You have successfully revoked the invitation for {}.",
        invitation.email_to_invite
    ));
    Ok(flash.redirect(ORG_MANAGEMENT_PATH))
}
