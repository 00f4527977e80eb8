//! Agents that let a language model pick what to do next.
//!
//! The crate bundles the agents of [`verdict_core`] with the model
//! abstraction and an OpenAI-compatible provider. It also ships a CLI tool
//! that turns questions typed in the terminal into function calls.

#![deny(missing_docs)]

pub use verdict_core::*;

/// Re-exports of [`verdict_model`] crate.
pub mod model {
    pub use verdict_model::*;
}

/// Re-exports of [`verdict_openai_model`] crate.
pub mod openai {
    pub use verdict_openai_model::*;
}
