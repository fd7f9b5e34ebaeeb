use uuid::Uuid;

use crate::database::models::{Organization, User};
use crate::database::Repository;
use crate::error::ApiError;

/// Load `org_id` and check that `user` may administer it: members and
/// superusers pass, everyone else gets a 403. Unknown organizations are 404.
pub async fn require_authorized_admin(
    repo: &dyn Repository,
    user: &User,
    org_id: Uuid,
) -> Result<Organization, ApiError> {
    let org = repo
        .get_organization(org_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Organization {org_id} not found")))?;

    if user.is_superuser || repo.is_member(org.id, user.id).await? {
        return Ok(org);
    }

    tracing::warn!(
        "User '{}' denied admin access to organization '{}' ({})",
        user.username,
        org.name,
        org.id
    );
    Err(ApiError::forbidden(
        "You are not authorized to administer this organization.",
    ))
}
