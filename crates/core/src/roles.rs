//! Well-known JWT role name constants.
//!
//! These are account roles carried in access tokens, unrelated to the
//! performance roles (vocals, guitar, ...) that members claim on songs.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_MEMBER: &str = "member";
