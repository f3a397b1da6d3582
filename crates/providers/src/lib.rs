//! Outbound generation providers.
//!
//! Provides the asynchronous job model and REST client for the
//! Replicate-style image service, the [`bridge::JobBridge`] that turns a
//! submitted job into a single synchronous result, and the
//! OpenAI-compatible client used for text replies and as the secondary
//! image provider.

pub mod bridge;
pub mod generator;
pub mod job;
pub mod openai;
pub mod replicate;
