//! Authentication primitives.
//!
//! - [`jwt`] -- validation of the access tokens issued by the external
//!   auth service, plus token minting for tooling and tests.

pub mod jwt;
