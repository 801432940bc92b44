//! Repository structs. Each owns the SQL for one area of the schema.

pub mod permission_repo;
pub mod role_ledger_repo;
pub mod song_repo;
pub mod topic_claim_repo;
pub mod user_repo;

pub use permission_repo::PermissionRepo;
pub use role_ledger_repo::RoleLedgerRepo;
pub use song_repo::SongRepo;
pub use topic_claim_repo::TopicClaimRepo;
pub use user_repo::UserRepo;
