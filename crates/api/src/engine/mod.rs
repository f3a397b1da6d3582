//! Request orchestration that spans several collaborators.

pub mod chat;
