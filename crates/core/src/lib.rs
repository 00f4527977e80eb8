//! Agents that turn free-form model replies into decisions.
//!
//! The crate covers:
//!
//! - generating a JSON schema of callable functions ([`schema`]);
//! - pulling a JSON object out of a noisy reply ([`json`]);
//! - letting the model pick a function and its parameters
//!   ([`FunctionCaller`]), without ever running it;
//! - answering a question with a web search in five stages
//!   ([`OnlineAgent`]);
//! - a few smaller agents built on the same pieces.
//!
//! Every agent keeps a [`ChatHistory`] of what it exchanged with the model.
//! Failures of a single call surface as `None` and a `tracing` warning, or
//! as an [`Error`] from the `try_` variants; only building an agent with a
//! missing piece of configuration is meant to stop the caller.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

#[macro_use]
mod options;

mod agent;
pub mod collaborator;
mod error;
pub mod function;
mod function_caller;
mod history;
pub mod json;
mod model_client;
mod online;
pub mod prompt;
mod readers;
pub mod schema;
mod vision;

pub use agent::{Agent, AgentBuilder, AgentType};
pub use error::{CollaboratorError, Error, Result};
pub use function::{Function, FunctionRef, FunctionRegistry, NoParameters};
pub use function_caller::{Dispatch, FunctionCaller, FunctionCallerBuilder};
pub use history::ChatHistory;
pub use online::{
    ATTRIBUTION_PREFIX, CONTENT_NOT_AVAILABLE, OnlineAgent, OnlineAgentBuilder,
    PipelineStage, PipelineState,
};
pub use options::DEFAULT_TEMPERATURE;
pub use readers::{
    DataExtractor, DataExtractorBuilder, Document, DocumentReader,
    DocumentReaderBuilder, WEBSITE_NOT_READ, WebsiteReader,
    WebsiteReaderBuilder,
};
pub use vision::{DetectionTarget, ObjectDetector, ObjectDetectorBuilder};
