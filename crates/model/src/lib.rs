//! An abstraction layer for different LLMs.
//!
//! This crate establishes an unified protocol for the agents to talk to
//! various supported LLMs, so that the same agent code runs on top of any
//! provider that can turn a list of role-tagged messages into text.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to. Retrying, timeouts
//! and other transport policies belong to the implementors as well.

#![deny(missing_docs)]

mod error;
mod message;
mod provider;
mod request;
mod response;

pub use error::*;
pub use message::*;
pub use provider::*;
pub use request::*;
pub use response::*;
