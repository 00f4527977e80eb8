//! Error types shared by every agent in this crate.

use thiserror::Error;
use verdict_model::ModelProviderError;

/// The error type for agent construction and agent calls.
///
/// Only [`Error::MissingConfiguration`] is meant to stop the caller: it is
/// returned by the `build` methods. Every other variant describes a failure
/// of a single call, and the non-`try_` operations turn them into a logged
/// warning and `None`, so a conversation can go on.
#[derive(Debug, Error)]
pub enum Error {
    /// A builder is missing something it needs, or a prompt table lacks an
    /// entry.
    #[error("missing configuration: {0}")]
    MissingConfiguration(String),

    /// The model reply has no parsable JSON object, or the object misses a
    /// required field.
    #[error("malformed model output: {0}")]
    MalformedModelOutput(String),

    /// The model picked a function that is not registered.
    #[error("unknown function selected: {0}")]
    UnknownFunctionSelected(String),

    /// A search or page-reading collaborator failed.
    #[error("collaborator failure: {0}")]
    CollaboratorFailure(#[from] CollaboratorError),

    /// The model provider failed to produce a reply.
    #[error("model error: {0}")]
    Model(Box<dyn ModelProviderError>),

    /// The caller passed arguments the operation cannot work with.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Serializing a prompt payload failed.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// An error reported by an external collaborator (search engine, page
/// reader).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CollaboratorError {
    message: String,
}

impl CollaboratorError {
    /// Creates an error with the given message.
    #[inline]
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}
