// handlers/protected/mod.rs - Protected handlers (login required)
//
// Every handler here takes `CurrentUser`; anonymous requests are rejected
// with 401 and redirected to the login page by the access middleware.
// Handlers acting on one organization run `require_authorized_admin` first.
pub mod admins;
pub mod invitations;
pub mod org_management;
pub mod organizations;

pub use admins::{delete_admin, delete_invite};
pub use invitations::{org_invite_action, org_invite_action_submit};
pub use org_management::{
    org_management, org_management_focus, org_management_focus_submit, org_management_submit,
};
pub use organizations::{delete_organization, organization_form, organization_form_submit};

/// Where every admin action lands when it is done.
pub const ORG_MANAGEMENT_PATH: &str = "/org_management";
