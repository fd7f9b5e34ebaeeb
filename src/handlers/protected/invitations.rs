// handlers/protected/invitations.rs - GET/POST /org_invite_action/:invite_id handler

use axum::{
    extract::{Path, State},
    response::Response,
    Form,
};
use serde::Deserialize;

use super::ORG_MANAGEMENT_PATH;
use crate::app::AppState;
use crate::database::models::{Invitation, Organization, User};
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::middleware::{CurrentUser, Flash};

/// The invitation page posts one of two submit buttons.
#[derive(Debug, Default, Deserialize)]
pub struct InviteAction {
    #[serde(default)]
    pub join: Option<String>,
    #[serde(default)]
    pub decline: Option<String>,
}

impl InviteAction {
    fn is_join(&self) -> bool {
        self.join.as_deref().is_some_and(|v| !v.is_empty())
    }

    fn is_decline(&self) -> bool {
        self.decline.as_deref().is_some_and(|v| !v.is_empty())
    }
}

/// GET only checks that the invitation is addressed to the user.
pub async fn org_invite_action(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(invite_id): Path<String>,
    flash: Flash,
) -> Result<Response, ApiError> {
    load_own_invitation(&state, &user, &invite_id).await?;
    Ok(flash.redirect(ORG_MANAGEMENT_PATH))
}

/// POST joins or declines; either way the invitation is used up.
pub async fn org_invite_action_submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(invite_id): Path<String>,
    mut flash: Flash,
    Form(action): Form<InviteAction>,
) -> Result<Response, ApiError> {
    let (invitation, organization) = load_own_invitation(&state, &user, &invite_id).await?;

    if action.is_join() {
        state.repo.add_member(organization.id, user.id).await?;
        tracing::info!("User '{}' joined '{}' as an admin", user.username, organization.name);
        flash.success(format!("You have joined {} as an admin.", organization.name));
    }
    if action.is_decline() {
        tracing::info!("User '{}' declined to join '{}'", user.username, organization.name);
        flash.warning(format!("You have declined to join {} as an admin.", organization.name));
    }

    state.repo.delete_invitation(invitation.id).await?;
    Ok(flash.redirect(ORG_MANAGEMENT_PATH))
}

async fn load_own_invitation(
    state: &AppState,
    user: &User,
    invite_id: &str,
) -> Result<(Invitation, Organization), ApiError> {
    let invite_id = parse_id(invite_id, "Invitation")?;
    let invitation = state
        .repo
        .get_invitation(invite_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Invitation {invite_id} not found")))?;

    if !invitation.is_addressed_to(&user.email) {
        tracing::warn!(
            "User '{}' tried to act on invitation {} addressed to someone else",
            user.username,
            invitation.id
        );
        return Err(ApiError::forbidden("This invitation was not sent to you."));
    }

    let organization = state
        .repo
        .get_organization(invitation.organization_id)
        .await?
        .ok_or_else(|| ApiError::not_found("The invited organization no longer exists"))?;

    Ok((invitation, organization))
}
