pub mod deletion;
pub mod feed;
pub mod invitation;
pub mod organization;
pub mod subscription;
pub mod user;
pub mod zone;

pub use deletion::{DeletionRecord, NewDeletionRecord};
pub use feed::FeedListing;
pub use invitation::{normalize_email, Invitation, NewInvitation};
pub use organization::{NewOrganization, Organization, OrganizationChanges, HEADLESS_ORG_NAME};
pub use subscription::Subscription;
pub use user::User;
pub use zone::ZoneSummary;
