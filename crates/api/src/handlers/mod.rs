//! Request handlers.
//!
//! Handlers authenticate through [`crate::middleware::auth::AuthUser`],
//! bind the identity to the store with an owner scope and map errors via
//! [`crate::error::AppError`].

pub mod conversations;
pub mod generation;
pub mod profile;
