pub mod admin;
pub mod songs;
