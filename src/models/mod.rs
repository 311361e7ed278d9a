//! Data models for the reviewer service.
//!
//! Field names follow the public JSON contract of the service.

mod pull_request;
mod team;

pub use pull_request::*;
pub use team::*;
