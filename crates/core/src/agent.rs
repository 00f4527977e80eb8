mod builder;
#[cfg(test)]
mod tests;

use std::fmt::{self, Display};

use verdict_model::{Message, ResponseFormat};

use crate::error::Result;
use crate::history::ChatHistory;
use crate::model_client::ModelClient;
use crate::prompt::{PromptBuilder, PromptKey};
pub use builder::AgentBuilder;

/// The premade roles an [`Agent`] can take.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AgentType {
    /// Breaks a goal into steps.
    Planner,
    /// Summarizes text.
    Summarizer,
    /// Answers anything.
    GenericResponder,
    /// Judges whether an answer satisfies a request.
    Validator,
}

impl AgentType {
    pub(crate) fn prompt_key(self) -> PromptKey {
        match self {
            AgentType::Planner => PromptKey::Planner,
            AgentType::Summarizer => PromptKey::Summarizer,
            AgentType::GenericResponder => PromptKey::GenericResponder,
            AgentType::Validator => PromptKey::Validator,
        }
    }
}

impl Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.prompt_key(), f)
    }
}

/// A general-purpose agent with a fixed system prompt.
///
/// The system prompt is either one of the premade [`AgentType`] prompts or
/// a custom one. Each successful call appends the user message and the
/// reply to [`history`](Agent::history). Calls take `&mut self`; wrap the
/// agent in a lock to share it.
pub struct Agent {
    model_client: ModelClient,
    system_prompt: Message,
    temperature: f32,
    format: ResponseFormat,
    history: ChatHistory,
}

impl Agent {
    /// Returns the rendered system prompt.
    #[inline]
    pub fn system_prompt(&self) -> &Message {
        &self.system_prompt
    }

    /// Returns the exchanges made so far.
    #[inline]
    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    /// Returns the system prompt followed by `question` as a user message.
    pub fn prompt(&self, question: &str) -> Vec<Message> {
        PromptBuilder::with_system(self.system_prompt.clone())
            .user(Message::user(question))
    }

    /// Asks the model, optionally continuing an earlier conversation.
    ///
    /// Returns `None` and logs a warning if the model call fails.
    pub async fn ask(
        &mut self,
        prompt: &str,
        history: Option<&[Message]>,
    ) -> Option<String> {
        self.try_ask(prompt, history)
            .await
            .inspect_err(|err| warn!("agent got no reply: {err}"))
            .ok()
    }

    /// Like [`ask`](Self::ask), but returns the error.
    #[inline]
    pub async fn try_ask(
        &mut self,
        prompt: &str,
        history: Option<&[Message]>,
    ) -> Result<String> {
        self.send(Message::user(prompt), history).await
    }

    /// Asks the model about images. Requires a multimodal model.
    ///
    /// Each image is a URL or base64 encoded image data.
    pub async fn ask_with_images<I, S>(
        &mut self,
        prompt: &str,
        images: I,
        history: Option<&[Message]>,
    ) -> Option<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let user = Message::user(prompt).with_images(images);
        self.send(user, history)
            .await
            .inspect_err(|err| warn!("agent got no reply: {err}"))
            .ok()
    }

    /// Returns an agent with the same configuration and an empty history.
    pub(crate) fn fresh(&self) -> Agent {
        Agent {
            model_client: self.model_client.clone(),
            system_prompt: self.system_prompt.clone(),
            temperature: self.temperature,
            format: self.format,
            history: ChatHistory::default(),
        }
    }

    async fn send(
        &mut self,
        user: Message,
        history: Option<&[Message]>,
    ) -> Result<String> {
        let prompts = PromptBuilder::with_system(self.system_prompt.clone())
            .history(history)
            .user(user);
        self.model_client
            .exchange(&mut self.history, prompts, self.format, self.temperature)
            .await
    }
}
