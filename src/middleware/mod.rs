pub mod access;
pub mod auth;
pub mod flash;
pub mod response;

pub use access::access_denied_middleware;
pub use auth::{session_middleware, CurrentUser};
pub use flash::{Flash, Level, Message};
pub use response::Page;
