use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// The author of a message.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions that frame the whole conversation.
    System,
    /// Input from the user (or from an agent speaking on the user's behalf).
    User,
    /// A reply from the model.
    Assistant,
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A complete, role-tagged message.
///
/// Messages are immutable once constructed. The serialized form is the
/// common chat wire shape:
///
/// ```json
/// {"role": "user", "content": "Hi", "images": ["..."]}
/// ```
///
/// where `images` is omitted when the message carries none.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    images: Option<Vec<String>>,
}

impl Message {
    /// Creates a message with the given role and content.
    #[inline]
    pub fn new<S: Into<String>>(role: Role, content: S) -> Self {
        Self {
            role,
            content: content.into(),
            images: None,
        }
    }

    /// Creates a system message.
    #[inline]
    pub fn system<S: Into<String>>(content: S) -> Self {
        Self::new(Role::System, content)
    }

    /// Creates a user message.
    #[inline]
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant message.
    #[inline]
    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Attaches images (URLs or base64 encoded data) in order.
    ///
    /// Only meaningful for multimodal models.
    #[inline]
    pub fn with_images<I, S>(mut self, images: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.images = Some(images.into_iter().map(Into::into).collect());
        self
    }

    /// Returns the role of this message.
    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the text content of this message.
    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns the attached image references, if any.
    #[inline]
    pub fn images(&self) -> Option<&[String]> {
        self.images.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_wire_shape() {
        let msg = Message::user("What is in this picture?")
            .with_images(["cat.png"]);
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "role": "user",
                "content": "What is in this picture?",
                "images": ["cat.png"]
            })
        );

        let msg = Message::assistant("A cat.");
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({ "role": "assistant", "content": "A cat." })
        );
    }

    #[test]
    fn test_deserialize_without_images() {
        let value = json!({ "role": "system", "content": "Be brief." });
        let msg: Message = serde_json::from_value(value).unwrap();
        assert_eq!(msg.role(), Role::System);
        assert_eq!(msg.content(), "Be brief.");
        assert!(msg.images().is_none());
    }
}
