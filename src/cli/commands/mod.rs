pub mod migrate;
pub mod org;
pub mod user;
