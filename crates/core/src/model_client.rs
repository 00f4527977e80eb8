use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;

use tracing::Instrument;
use verdict_model::{
    Message, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent, ResponseFormat,
};

use crate::error::{Error, Result};
use crate::history::ChatHistory;

type SendRequestResult =
    std::result::Result<ModelClientResponse, Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type HandlerFn =
    Arc<dyn Fn(ModelRequest) -> BoxedSendRequestFuture + Send + Sync>;

/// A wrapper around a model provider that provides a type-erased interface
/// for the agents.
///
/// Clones share the same provider.
#[derive(Clone)]
pub(crate) struct ModelClient {
    handler_fn: HandlerFn,
}

impl ModelClient {
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // Erase `P` so that agents don't need a generic parameter.
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    let resp_or_err = fut.await;
                    handle_response::<P>(resp_or_err).await
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self { handler_fn }
    }

    /// Sends a request and waits for the complete reply.
    #[inline]
    pub async fn send_request(&self, req: ModelRequest) -> SendRequestResult {
        (self.handler_fn)(req).await
    }

    /// Sends `prompts` and records the exchange in `history`.
    ///
    /// The last prompt is the user message of the exchange. Nothing is
    /// recorded if the model call fails.
    pub async fn exchange(
        &self,
        history: &mut ChatHistory,
        prompts: Vec<Message>,
        format: ResponseFormat,
        temperature: f32,
    ) -> Result<String> {
        let user = prompts.last().cloned().ok_or_else(|| {
            Error::InvalidInput("no messages to send".to_owned())
        })?;
        let req = ModelRequest {
            messages: prompts,
            format,
            temperature: Some(temperature),
        };
        let resp = self.send_request(req).await.map_err(Error::Model)?;
        debug!("model finished: {:?}", resp.finish_reason);
        history.record(user, Message::assistant(resp.transcript.clone()));
        Ok(resp.transcript)
    }
}

/// A completely received response from the model client.
#[derive(Clone, Debug)]
pub(crate) struct ModelClientResponse {
    pub transcript: String,
    /// The reason the model finished generating.
    pub finish_reason: Option<ModelFinishReason>,
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: std::result::Result<P::Response, P::Error>,
) -> SendRequestResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            error!("got an error: {err:?}");
            return Err(Box::new(err));
        }
    };

    let mut transcript = String::new();
    let mut finish_reason = None;

    trace!("start receiving events");

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(event) => event,
            Err(err) => {
                error!("got an error: {err:?}");
                return Err(Box::new(err));
            }
        };

        let Some(event) = event else {
            break;
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(msg) => {
                transcript.push_str(&msg);
            }
            ModelResponseEvent::Completed(reason) => {
                if reason == ModelFinishReason::Length {
                    warn!("model reply was cut off by the token limit");
                }
                finish_reason = Some(reason);
            }
        }
    }

    trace!("finished a request");

    Ok(ModelClientResponse {
        transcript,
        finish_reason,
    })
}

#[cfg(test)]
mod tests {
    use verdict_model::{ErrorKind, Role};
    use verdict_test_model::{PresetEvent, PresetResponse, TestModelProvider};

    use super::*;

    #[tokio::test]
    async fn test_send_request() {
        let model_provider = TestModelProvider::default();
        for _ in 0..3 {
            model_provider.add_response(PresetResponse::with_events([
                PresetEvent::MessageDelta("How ".to_owned()),
                PresetEvent::MessageDelta("are ".to_owned()),
                PresetEvent::MessageDelta("you?".to_owned()),
            ]));
        }

        let model_client = ModelClient::new(model_provider);

        for _ in 0..3 {
            let resp = model_client
                .send_request(ModelRequest::new(vec![Message::user("Hi")]))
                .await
                .unwrap();
            assert_eq!(resp.transcript, "How are you?");
            assert_eq!(resp.finish_reason, Some(ModelFinishReason::Stop));
        }
    }

    #[tokio::test]
    async fn test_error_handling() {
        let model_provider = TestModelProvider::default();
        let model_client = ModelClient::new(model_provider);
        let resp_or_err = model_client
            .send_request(ModelRequest::new(vec![Message::user("Hi")]))
            .await;
        assert_eq!(resp_or_err.err().unwrap().kind(), ErrorKind::Other);
    }

    #[tokio::test]
    async fn test_exchange_records_history() {
        let model_provider = TestModelProvider::with_replies(["Hello!"]);
        model_provider.add_response(PresetResponse::failure(
            ErrorKind::RateLimitExceeded,
        ));
        let model_client = ModelClient::new(model_provider.clone());
        let mut history = ChatHistory::default();

        let prompts = vec![Message::system("sys"), Message::user("Hi")];
        let reply = model_client
            .exchange(&mut history, prompts, ResponseFormat::Json, 0.2)
            .await
            .unwrap();
        assert_eq!(reply, "Hello!");
        let roles: Vec<_> = history.iter().map(Message::role).collect();
        assert_eq!(roles, [Role::User, Role::Assistant]);

        let req = &model_provider.requests()[0];
        assert_eq!(req.format, ResponseFormat::Json);
        assert_eq!(req.temperature, Some(0.2));

        let err = model_client
            .exchange(
                &mut history,
                vec![Message::user("Again")],
                ResponseFormat::Text,
                0.8,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Model(_)));
        assert_eq!(history.len(), 2);
    }
}
