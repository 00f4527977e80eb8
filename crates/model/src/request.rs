use serde::{Deserialize, Serialize};

use crate::Message;

/// A request to be sent to the model provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelRequest {
    /// The input messages, in conversation order.
    pub messages: Vec<Message>,
    /// The format the reply is expected in.
    pub format: ResponseFormat,
    /// Sampling temperature. `None` leaves it to the provider.
    pub temperature: Option<f32>,
}

impl ModelRequest {
    /// Creates a plain text request with the provider's default temperature.
    #[inline]
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            format: ResponseFormat::Text,
            temperature: None,
        }
    }
}

/// A hint on the format of the reply.
///
/// Providers that support constrained decoding should honor `Json`; the
/// others may ignore it, the callers never trust the reply to be valid JSON
/// anyway.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// Free-form text.
    #[default]
    Text,
    /// A single JSON object.
    Json,
}
