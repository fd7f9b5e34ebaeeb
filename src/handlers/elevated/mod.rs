// handlers/elevated/mod.rs - Elevated handlers (superuser required)
//
// Remote administration of distributed servers. Non-superusers get 403.
pub mod crypto_login;

pub use crypto_login::crypto_login;
