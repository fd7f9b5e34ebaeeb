// handlers/protected/organizations.rs - GET/POST /organization_form/:org_id and
// POST /delete_organization/:org_id handlers

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Form,
};
use serde::Serialize;
use uuid::Uuid;

use super::ORG_MANAGEMENT_PATH;
use crate::app::AppState;
use crate::auth::require_authorized_admin;
use crate::database::models::{Organization, OrganizationChanges, User};
use crate::error::ApiError;
use crate::forms::{FormState, OrganizationForm};
use crate::handlers::parse_id;
use crate::middleware::{CurrentUser, Flash, Page};

const TEMPLATE: &str = "central/organization_form.html";
const NEW: &str = "new";

#[derive(Debug, Serialize)]
struct OrganizationFormContext {
    org_id: String,
    organization: Option<Organization>,
    form: FormState<OrganizationForm>,
}

/// `None` for the `new` form, otherwise the organization after the admin guard.
async fn load_target(
    state: &AppState,
    user: &User,
    org_id: &str,
) -> Result<Option<Organization>, ApiError> {
    if org_id == NEW {
        return Ok(None);
    }
    let org_id = parse_id(org_id, "Organization")?;
    require_authorized_admin(state.repo.as_ref(), user, org_id)
        .await
        .map(Some)
}

pub async fn organization_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(org_id): Path<String>,
    flash: Flash,
) -> Result<Page, ApiError> {
    let organization = load_target(&state, &user, &org_id).await?;
    let data = organization
        .as_ref()
        .map(OrganizationForm::from_organization)
        .unwrap_or_default();

    let context = OrganizationFormContext {
        org_id,
        organization,
        form: FormState::blank(data),
    };
    Ok(Page::new(TEMPLATE, context).with_flash(flash))
}

pub async fn organization_form_submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(org_id): Path<String>,
    flash: Flash,
    Form(form): Form<OrganizationForm>,
) -> Result<Response, ApiError> {
    let organization = load_target(&state, &user, &org_id).await?;

    let fields = match form.validate() {
        Ok(fields) => fields,
        Err(errors) => {
            let context = OrganizationFormContext {
                org_id,
                organization,
                form: FormState::with_errors(form, errors),
            };
            return Ok(Page::new(TEMPLATE, context).with_flash(flash).into_response());
        }
    };

    let saved = match organization {
        None => {
            let created = state.repo.create_organization(fields, user.id).await?;
            tracing::info!("User '{}' created organization '{}' ({})", user.username, created.name, created.id);
            created
        }
        Some(existing) => {
            let changes = OrganizationChanges {
                name: fields.name,
                description: fields.description,
                url: fields.url,
            };
            let updated = state.repo.update_organization(existing.id, changes, user.id).await?;
            tracing::info!("User '{}' updated organization '{}' ({})", user.username, updated.name, updated.id);
            updated
        }
    };
    state.repo.add_member(saved.id, user.id).await?;

    let target = if org_id == NEW {
        zone_form_path(saved.id)
    } else {
        ORG_MANAGEMENT_PATH.to_string()
    };
    Ok(flash.redirect(&target))
}

pub async fn delete_organization(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(org_id): Path<String>,
    mut flash: Flash,
) -> Result<Response, ApiError> {
    let org_id = parse_id(&org_id, "Organization")?;
    let organization = require_authorized_admin(state.repo.as_ref(), &user, org_id).await?;

    let zones = state.repo.zone_count(organization.id).await?;
    if zones > 0 {
        tracing::info!(
            "Refused to delete '{}' for '{}': {} zone(s) attached",
            organization.name,
            user.username,
            zones
        );
        flash.error(format!(
            "You cannot delete '{}' because it has {} zone(s) affiliated with it.",
            organization.name, zones
        ));
        return Ok(flash.redirect(ORG_MANAGEMENT_PATH));
    }

    state.repo.delete_organization(organization.id).await?;
    tracing::info!("User '{}' deleted organization '{}' ({})", user.username, organization.name, organization.id);
    flash.success(format!("You have successfully deleted {}.", organization.name));
    Ok(flash.redirect(ORG_MANAGEMENT_PATH))
}

/// New organizations go straight on to registering their first zone.
fn zone_form_path(org_id: Uuid) -> String {
    format!("/zone_form/{org_id}/new")
}
