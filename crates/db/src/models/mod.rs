//! Row models and DTOs.
//!
//! Each submodule contains `FromRow` entity structs matching database rows,
//! plus the create DTOs and read-side views built from them.

pub mod participation;
pub mod permission;
pub mod song;
pub mod song_topic;
pub mod user;
