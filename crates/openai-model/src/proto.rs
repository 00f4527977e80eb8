use serde::{Deserialize, Serialize};
use verdict_model::{ModelRequest, ResponseFormat, Role};

use crate::OpenAIConfig;

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ChatCompletion {
    pub id: Option<String>,
    pub choices: Vec<Choice>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct Choice {
    pub message: ReplyMessage,
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ReplyMessage {
    pub content: Option<String>,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ImageUrl {
    url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Message {
    role: Role,
    content: Content,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
struct JsonObjectFormat {
    r#type: &'static str,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<JsonObjectFormat>,
    stream: bool,
}

// -----------
// Conversions
// -----------

#[inline]
pub fn create_request(
    req: &ModelRequest,
    config: &OpenAIConfig,
) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: config.model.clone(),
        messages: req.messages.iter().map(create_message).collect(),
        temperature: req.temperature,
        response_format: match req.format {
            ResponseFormat::Text => None,
            ResponseFormat::Json => Some(JsonObjectFormat {
                r#type: "json_object",
            }),
        },
        stream: false,
    }
}

fn create_message(msg: &verdict_model::Message) -> Message {
    let content = match msg.images() {
        None | Some([]) => Content::Text(msg.content().to_owned()),
        Some(images) => {
            let mut parts = Vec::with_capacity(images.len() + 1);
            parts.push(ContentPart::Text {
                text: msg.content().to_owned(),
            });
            parts.extend(images.iter().map(|image| ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: image_url(image),
                },
            }));
            Content::Parts(parts)
        }
    };
    Message {
        role: msg.role(),
        content,
    }
}

/// URLs are passed through, anything else is taken as base64 image data.
fn image_url(image: &str) -> String {
    if image.starts_with("http://")
        || image.starts_with("https://")
        || image.starts_with("data:")
    {
        image.to_owned()
    } else {
        format!("data:{};base64,{image}", mime::IMAGE_PNG)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use verdict_model::Message as ModelMessage;

    use super::*;
    use crate::OpenAIConfigBuilder;

    #[test]
    fn test_create_request() {
        let mut request = ModelRequest::new(vec![
            ModelMessage::system("You are a helpful assistant."),
            ModelMessage::user("Hello"),
        ]);
        request.format = ResponseFormat::Json;
        request.temperature = Some(0.5);
        let config = OpenAIConfigBuilder::with_api_key("xxx")
            .with_model("custom")
            .build();
        let expected = ChatCompletionRequest {
            model: "custom".to_owned(),
            messages: vec![
                Message {
                    role: Role::System,
                    content: Content::Text(
                        "You are a helpful assistant.".to_owned(),
                    ),
                },
                Message {
                    role: Role::User,
                    content: Content::Text("Hello".to_owned()),
                },
            ],
            temperature: Some(0.5),
            response_format: Some(JsonObjectFormat {
                r#type: "json_object",
            }),
            stream: false,
        };
        assert_eq!(create_request(&request, &config), expected);
    }

    #[test]
    fn test_image_parts() {
        let request = ModelRequest::new(vec![
            ModelMessage::user("What is this?")
                .with_images(["https://a.b/cat.png", "iVBORw0KGgo="]),
        ]);
        let config = OpenAIConfigBuilder::with_api_key("xxx")
            .with_model("vision")
            .build();
        let body =
            serde_json::to_value(create_request(&request, &config)).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "vision",
                "messages": [{
                    "role": "user",
                    "content": [
                        { "type": "text", "text": "What is this?" },
                        {
                            "type": "image_url",
                            "image_url": { "url": "https://a.b/cat.png" }
                        },
                        {
                            "type": "image_url",
                            "image_url": {
                                "url": "data:image/png;base64,iVBORw0KGgo="
                            }
                        }
                    ]
                }],
                "stream": false
            })
        );
    }

    #[test]
    fn test_parse_completion() {
        let completion: ChatCompletion = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "{\"url\": \"https://a.b\"}"
                },
                "finish_reason": "stop"
            }],
            "usage": { "total_tokens": 12 }
        }))
        .unwrap();
        let choice = &completion.choices[0];
        assert_eq!(
            choice.message.content.as_deref(),
            Some(r#"{"url": "https://a.b"}"#)
        );
        assert_eq!(choice.finish_reason.as_deref(), Some("stop"));
    }
}
