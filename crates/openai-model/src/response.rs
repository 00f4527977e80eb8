use std::pin::Pin;
use std::task::{Context, Poll};

use verdict_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
};

use crate::Error;
use crate::proto::ChatCompletion;

/// A complete chat completion, replayed as one delta and a completion
/// event.
pub struct OpenAIResponse {
    content: Option<String>,
    finish_reason: Option<ModelFinishReason>,
}

impl OpenAIResponse {
    pub fn from_completion(completion: ChatCompletion) -> Result<Self, Error> {
        trace!("got completion {:?}", completion.id);
        let Some(choice) = completion.choices.into_iter().next() else {
            return Err(Error::new("reply has no choices", ErrorKind::Other));
        };
        let finish_reason = match choice.finish_reason.as_deref() {
            Some("content_filter") => {
                return Err(Error::new(
                    "reply was blocked by the content filter",
                    ErrorKind::Moderated,
                ));
            }
            Some("length") => ModelFinishReason::Length,
            Some(other) => {
                if other != "stop" {
                    debug!("unknown finish reason: {other}");
                }
                ModelFinishReason::Stop
            }
            None => ModelFinishReason::Stop,
        };
        Ok(Self {
            content: Some(choice.message.content.unwrap_or_default()),
            finish_reason: Some(finish_reason),
        })
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();
        if let Some(content) = this.content.take() {
            return Poll::Ready(Ok(Some(ModelResponseEvent::MessageDelta(
                content,
            ))));
        }
        let event =
            this.finish_reason.take().map(ModelResponseEvent::Completed);
        Poll::Ready(Ok(event))
    }
}
