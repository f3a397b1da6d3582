//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument. Ownership filtering is
//! expressed in SQL; callers normally reach these through
//! [`crate::store::PgConversationStore`].

pub mod conversation_repo;
pub mod generated_image_repo;
pub mod message_repo;
pub mod user_profile_repo;

pub use conversation_repo::ConversationRepo;
pub use generated_image_repo::GeneratedImageRepo;
pub use message_repo::MessageRepo;
pub use user_profile_repo::UserProfileRepo;
