use serde::{Deserialize, Serialize};
use verdict_model::ErrorKind;

/// The events in a preset response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetEvent {
    #[serde(rename = "message_delta")]
    MessageDelta(String),
}

/// The preset response for one model call.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Events in this response.
    pub events: Vec<PresetEvent>,
    /// If set, the request fails with this kind of error instead of
    /// replaying the events.
    #[serde(default, skip)]
    pub failure: Option<ErrorKind>,
}

impl PresetResponse {
    /// Creates a `PresetResponse` with the specified events.
    #[inline]
    pub fn with_events(events: impl Into<Vec<PresetEvent>>) -> Self {
        Self {
            events: events.into(),
            failure: None,
        }
    }

    /// Creates a `PresetResponse` that streams `text` in word-sized deltas.
    pub fn with_text(text: &str) -> Self {
        let events = text
            .split_inclusive(' ')
            .map(|word| PresetEvent::MessageDelta(word.to_owned()))
            .collect::<Vec<_>>();
        Self::with_events(events)
    }

    /// Creates a `PresetResponse` whose request always fails.
    #[inline]
    pub fn failure(kind: ErrorKind) -> Self {
        Self {
            events: vec![],
            failure: Some(kind),
        }
    }

    /// Returns the full text this response streams.
    pub fn text(&self) -> String {
        self.events
            .iter()
            .map(|event| match event {
                PresetEvent::MessageDelta(delta) => delta.as_str(),
            })
            .collect()
    }
}
