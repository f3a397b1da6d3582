//! Domain logic shared by the Muse chat backend.
//!
//! Nothing in this crate performs I/O: it holds the error type, id
//! aliases, the image/text intent classifier, image request validation,
//! profile field rules and the chat message vocabulary used by the
//! persistence and HTTP layers.

pub mod chat;
pub mod error;
pub mod image_request;
pub mod intent;
pub mod profile;
pub mod types;
