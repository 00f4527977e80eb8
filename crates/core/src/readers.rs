//! Agents that answer from content handed to them.

use serde_json::{Map, Value};
use verdict_model::{Message, ModelProvider, ResponseFormat};

use crate::collaborator::PageReader;
use crate::error::{Error, Result};
use crate::history::ChatHistory;
use crate::json::parse_json_object;
use crate::model_client::ModelClient;
use crate::options::AgentOptions;
use crate::prompt::{PromptBuilder, PromptKey, render, system_message};

/// Stands in for the website content when it could not be read.
pub const WEBSITE_NOT_READ: &str = "Website could not be read";

/// Answers questions about one website.
pub struct WebsiteReader {
    model_client: ModelClient,
    page_reader: Box<dyn PageReader>,
    template: String,
    additional_instructions: String,
    temperature: f32,
    history: ChatHistory,
}

impl WebsiteReader {
    /// Returns the exchanges made so far.
    #[inline]
    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    /// Reads `url` and answers `question` from its content.
    ///
    /// A page that cannot be read is not an error; the model is told so.
    pub async fn ask(
        &mut self,
        question: &str,
        url: &str,
        history: Option<&[Message]>,
    ) -> Option<String> {
        self.try_ask(question, url, history)
            .await
            .inspect_err(|err| warn!("website reader got no reply: {err}"))
            .ok()
    }

    /// Like [`ask`](Self::ask), but returns the error.
    pub async fn try_ask(
        &mut self,
        question: &str,
        url: &str,
        history: Option<&[Message]>,
    ) -> Result<String> {
        let content = match self.page_reader.read(url).await {
            Ok(Some(content)) => content,
            Ok(None) => {
                warn!("could not read {url}");
                WEBSITE_NOT_READ.to_owned()
            }
            Err(err) => {
                warn!("could not read {url}: {err}");
                WEBSITE_NOT_READ.to_owned()
            }
        };
        let system = system_message(
            &self.template,
            &self.additional_instructions,
            &[("url", url), ("content", &content)],
        );
        let prompts = PromptBuilder::with_system(system)
            .history(history)
            .user(Message::user(question));
        self.model_client
            .exchange(
                &mut self.history,
                prompts,
                ResponseFormat::Text,
                self.temperature,
            )
            .await
    }
}

/// [`WebsiteReader`] builder.
pub struct WebsiteReaderBuilder {
    model_client: ModelClient,
    page_reader: Option<Box<dyn PageReader>>,
    options: AgentOptions,
}

impl WebsiteReaderBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            page_reader: None,
            options: AgentOptions::default(),
        }
    }

    /// Sets the page reader.
    #[inline]
    pub fn with_page_reader<R: PageReader + 'static>(
        mut self,
        page_reader: R,
    ) -> Self {
        self.page_reader = Some(Box::new(page_reader));
        self
    }

    /// Builds the agent.
    pub fn build(self) -> Result<WebsiteReader> {
        let page_reader = self.page_reader.ok_or_else(|| {
            Error::MissingConfiguration(
                "a website reader needs a page reader".to_owned(),
            )
        })?;
        Ok(WebsiteReader {
            model_client: self.model_client,
            page_reader,
            template: self.options.system_template(PromptKey::WebsiteReader)?,
            additional_instructions: self.options.additional_instructions,
            temperature: self.options.temperature,
            history: ChatHistory::default(),
        })
    }
}

impl_agent_options!(WebsiteReaderBuilder);
impl_custom_system_prompt!(WebsiteReaderBuilder);

const EXTRACTION_TEMPLATE: &str = "\
Extract information from the following content:
{content}

Extract the following data:
{data}";

/// Pulls named data points out of a piece of content.
pub struct DataExtractor {
    model_client: ModelClient,
    system_prompt: Message,
    format: ResponseFormat,
    temperature: f32,
    history: ChatHistory,
}

impl DataExtractor {
    /// Returns the exchanges made so far.
    #[inline]
    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    /// Returns the messages [`ask`](Self::ask) would send.
    pub fn prompt(&self, content: &str, data_points: &[&str]) -> Vec<Message> {
        let user = render(
            EXTRACTION_TEMPLATE,
            &[("content", content), ("data", &data_points.join(", "))],
        );
        PromptBuilder::with_system(self.system_prompt.clone())
            .user(Message::user(user))
    }

    /// Extracts `data_points` from `content`, e.g. `["name", "age"]`.
    pub async fn ask(
        &mut self,
        content: &str,
        data_points: &[&str],
    ) -> Option<String> {
        self.try_ask(content, data_points)
            .await
            .inspect_err(|err| warn!("data extractor got no reply: {err}"))
            .ok()
    }

    /// Like [`ask`](Self::ask), but returns the error.
    pub async fn try_ask(
        &mut self,
        content: &str,
        data_points: &[&str],
    ) -> Result<String> {
        let prompts = self.prompt(content, data_points);
        self.model_client
            .exchange(&mut self.history, prompts, self.format, self.temperature)
            .await
    }

    /// Extracts `data_points` and parses the reply as a JSON object.
    ///
    /// Meant for extractors built with
    /// [`with_json_reply`](DataExtractorBuilder::with_json_reply).
    pub async fn ask_json(
        &mut self,
        content: &str,
        data_points: &[&str],
    ) -> Option<Map<String, Value>> {
        let reply = self.ask(content, data_points).await?;
        parse_json_object(&reply)
    }
}

/// [`DataExtractor`] builder.
pub struct DataExtractorBuilder {
    model_client: ModelClient,
    reply_as_json: bool,
    options: AgentOptions,
}

impl DataExtractorBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            reply_as_json: false,
            options: AgentOptions::default(),
        }
    }

    /// Asks for a JSON object keyed by data point instead of text.
    #[inline]
    pub fn with_json_reply(mut self, reply_as_json: bool) -> Self {
        self.reply_as_json = reply_as_json;
        self
    }

    /// Builds the agent.
    pub fn build(self) -> Result<DataExtractor> {
        let (key, format) = if self.reply_as_json {
            (PromptKey::DataExtractorJson, ResponseFormat::Json)
        } else {
            (PromptKey::DataExtractor, ResponseFormat::Text)
        };
        let template = self.options.template(key)?;
        Ok(DataExtractor {
            model_client: self.model_client,
            system_prompt: system_message(
                &template,
                &self.options.additional_instructions,
                &[],
            ),
            format,
            temperature: self.options.temperature,
            history: ChatHistory::default(),
        })
    }
}

impl_agent_options!(DataExtractorBuilder);

/// A document whose text has already been extracted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    /// Name shown to the model, usually the file name.
    pub name: String,
    /// Plain text content.
    pub text: String,
}

impl Document {
    /// Creates a document.
    #[inline]
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Answers questions about a set of documents.
///
/// The documents go into the system prompt of every call, so large
/// documents make every call expensive.
pub struct DocumentReader {
    model_client: ModelClient,
    template: String,
    additional_instructions: String,
    temperature: f32,
    history: ChatHistory,
}

impl DocumentReader {
    /// Returns the exchanges made so far.
    #[inline]
    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    /// Returns the system prompt followed by `question`.
    pub fn prompt(
        &self,
        question: &str,
        documents: &[Document],
    ) -> Vec<Message> {
        PromptBuilder::with_system(self.system_prompt(documents))
            .user(Message::user(question))
    }

    fn system_prompt(&self, documents: &[Document]) -> Message {
        let mut contents = String::new();
        for document in documents {
            contents.push_str("Contents of document ");
            contents.push_str(&document.name);
            contents.push_str(" :\n");
            contents.push_str(&document.text);
            contents.push_str("\n\n");
        }
        system_message(
            &self.template,
            &self.additional_instructions,
            &[("documents", &contents)],
        )
    }

    /// Answers `question` from `documents`.
    pub async fn ask(
        &mut self,
        question: &str,
        documents: &[Document],
        history: Option<&[Message]>,
    ) -> Option<String> {
        self.try_ask(question, documents, history)
            .await
            .inspect_err(|err| warn!("document reader got no reply: {err}"))
            .ok()
    }

    /// Like [`ask`](Self::ask), but returns the error.
    pub async fn try_ask(
        &mut self,
        question: &str,
        documents: &[Document],
        history: Option<&[Message]>,
    ) -> Result<String> {
        let prompts = PromptBuilder::with_system(self.system_prompt(documents))
            .history(history)
            .user(Message::user(question));
        self.model_client
            .exchange(
                &mut self.history,
                prompts,
                ResponseFormat::Text,
                self.temperature,
            )
            .await
    }
}

/// [`DocumentReader`] builder.
pub struct DocumentReaderBuilder {
    model_client: ModelClient,
    options: AgentOptions,
}

impl DocumentReaderBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            options: AgentOptions::default(),
        }
    }

    /// Builds the agent.
    pub fn build(self) -> Result<DocumentReader> {
        Ok(DocumentReader {
            model_client: self.model_client,
            template: self.options.system_template(PromptKey::DocumentReader)?,
            additional_instructions: self.options.additional_instructions,
            temperature: self.options.temperature,
            history: ChatHistory::default(),
        })
    }
}

impl_agent_options!(DocumentReaderBuilder);
impl_custom_system_prompt!(DocumentReaderBuilder);
