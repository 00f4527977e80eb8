//! Object detection with a vision model.

use std::sync::Arc;

use verdict_model::{Message, ModelProvider, ResponseFormat};

use crate::error::{Error, Result};
use crate::history::ChatHistory;
use crate::model_client::ModelClient;
use crate::options::AgentOptions;
use crate::prompt::{PromptBuilder, PromptKey, PromptTable, system_message};

const DEFAULT_TEMPERATURE: f32 = 0.3;

/// What the caller is interested in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DetectionTarget {
    /// Only these objects.
    Objects(Vec<String>),
    /// Whatever matches a free-form description.
    Criteria(String),
}

impl DetectionTarget {
    /// Creates a target from optional arguments, exactly one of which must
    /// be given.
    pub fn new(
        objects: Option<Vec<String>>,
        criteria: Option<String>,
    ) -> Result<Self> {
        match (objects, criteria) {
            (Some(objects), None) => Ok(DetectionTarget::Objects(objects)),
            (None, Some(criteria)) => Ok(DetectionTarget::Criteria(criteria)),
            (Some(_), Some(_)) => Err(Error::InvalidInput(
                "give either an object list or detection criteria, not both"
                    .to_owned(),
            )),
            (None, None) => Err(Error::InvalidInput(
                "give an object list or detection criteria".to_owned(),
            )),
        }
    }

    fn describe(&self) -> String {
        match self {
            DetectionTarget::Objects(objects) => format!(
                "I'm INTERESTED in the following OBJECTS: {}",
                objects.join(", ")
            ),
            DetectionTarget::Criteria(criteria) => {
                format!("I'm INTERESTED in the following: {criteria}")
            }
        }
    }
}

/// Finds objects in images.
///
/// A multimodal model describes everything it sees, then a text model keeps
/// the objects matching the [`DetectionTarget`] and replies with a JSON
/// object. Both exchanges are recorded in [`history`](Self::history).
pub struct ObjectDetector {
    vision_client: ModelClient,
    text_client: ModelClient,
    detector_prompt: Message,
    filterer_prompt: Message,
    vision_temperature: f32,
    text_temperature: f32,
    history: ChatHistory,
}

impl ObjectDetector {
    /// Returns the exchanges made so far.
    #[inline]
    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    /// Detects the objects in `images` that match `target`.
    pub async fn detect<I, S>(
        &mut self,
        images: I,
        target: &DetectionTarget,
    ) -> Option<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.try_detect(images, target)
            .await
            .inspect_err(|err| warn!("object detection failed: {err}"))
            .ok()
    }

    /// Like [`detect`](Self::detect), but returns the error.
    pub async fn try_detect<I, S>(
        &mut self,
        images: I,
        target: &DetectionTarget,
    ) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let images: Vec<String> = images.into_iter().map(Into::into).collect();
        if images.is_empty() {
            return Err(Error::InvalidInput("no images given".to_owned()));
        }

        let prompts = PromptBuilder::with_system(self.detector_prompt.clone())
            .user(
                Message::user("Detect all objects in this image")
                    .with_images(images),
            );
        let description = self
            .vision_client
            .exchange(
                &mut self.history,
                prompts,
                ResponseFormat::Text,
                self.vision_temperature,
            )
            .await?;

        let filter = format!(
            "Image Description: {description}\n\n{}\n\
             Only return the objects that fit my interests",
            target.describe()
        );
        let prompts = PromptBuilder::with_system(self.filterer_prompt.clone())
            .user(Message::user(filter));
        self.text_client
            .exchange(
                &mut self.history,
                prompts,
                ResponseFormat::Json,
                self.text_temperature,
            )
            .await
    }
}

/// [`ObjectDetector`] builder.
pub struct ObjectDetectorBuilder {
    vision_client: ModelClient,
    text_client: ModelClient,
    vision_temperature: f32,
    text_temperature: f32,
    options: AgentOptions,
}

impl ObjectDetectorBuilder {
    /// Creates a new builder with a multimodal model for looking at the
    /// images and a text model for filtering.
    #[inline]
    pub fn with_model_providers<V, T>(vision: V, text: T) -> Self
    where
        V: ModelProvider + 'static,
        T: ModelProvider + 'static,
    {
        Self {
            vision_client: ModelClient::new(vision),
            text_client: ModelClient::new(text),
            vision_temperature: DEFAULT_TEMPERATURE,
            text_temperature: DEFAULT_TEMPERATURE,
            options: AgentOptions::default(),
        }
    }

    /// Sets the temperature of the vision model. Defaults to `0.3`.
    #[inline]
    pub fn with_vision_temperature(mut self, temperature: f32) -> Self {
        self.vision_temperature = temperature;
        self
    }

    /// Sets the temperature of the text model. Defaults to `0.3`.
    #[inline]
    pub fn with_text_temperature(mut self, temperature: f32) -> Self {
        self.text_temperature = temperature;
        self
    }

    /// Uses a prompt table other than the built-in one.
    #[inline]
    pub fn with_prompt_table(mut self, table: PromptTable) -> Self {
        self.options.prompt_table = Some(Arc::new(table));
        self
    }

    /// Builds the agent.
    pub fn build(self) -> Result<ObjectDetector> {
        let detector = self.options.template(PromptKey::ObjectDetector)?;
        let filterer = self.options.template(PromptKey::ObjectFilterer)?;
        Ok(ObjectDetector {
            vision_client: self.vision_client,
            text_client: self.text_client,
            detector_prompt: system_message(&detector, "", &[]),
            filterer_prompt: system_message(&filterer, "", &[]),
            vision_temperature: self.vision_temperature,
            text_temperature: self.text_temperature,
            history: ChatHistory::default(),
        })
    }
}
