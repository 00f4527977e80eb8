//! Answering questions with the help of a web search.

use std::fmt::{self, Display};

use serde::Serialize;
use serde_json::Value;
use verdict_model::{Message, ModelProvider, ResponseFormat};

use crate::agent::{Agent, AgentBuilder, AgentType};
use crate::collaborator::{PageReader, SearchCandidate, Searcher};
use crate::error::{Error, Result};
use crate::history::ChatHistory;
use crate::json::try_parse_json_object;
use crate::model_client::ModelClient;
use crate::options::AgentOptions;
use crate::prompt::{PromptBuilder, PromptKey, render, system_message};

/// Stands in for the page content when the page could not be read.
pub const CONTENT_NOT_AVAILABLE: &str = "content not available";

/// The phrase every synthesized answer is asked to start with.
pub const ATTRIBUTION_PREFIX: &str = "Based on information from the internet, ";

const SYNTHESIS_TEMPLATE: &str = "\
Please read the following information:

Information about Website {url}:
{content}

Answer the following question based on the above information:
{question}

Start your answer with \"{attribution}\"";

/// The steps of [`OnlineAgent::run`], in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    /// The model turns the question into a search query.
    QueryFormulation,
    /// The searcher runs the query.
    Retrieval,
    /// The model picks one of the results.
    Selection,
    /// The page reader fetches the picked page.
    Fetch,
    /// A responder answers the question from the page.
    Synthesis,
}

impl Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::QueryFormulation => write!(f, "query formulation"),
            PipelineStage::Retrieval => write!(f, "retrieval"),
            PipelineStage::Selection => write!(f, "selection"),
            PipelineStage::Fetch => write!(f, "fetch"),
            PipelineStage::Synthesis => write!(f, "synthesis"),
        }
    }
}

/// Everything one pipeline run produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PipelineState {
    /// The search query written by the model.
    pub query: String,
    /// The search results, as returned by the searcher.
    pub candidates: Vec<SearchCandidate>,
    /// The URL picked by the model.
    pub chosen_url: String,
    /// The page content, `None` if the page could not be read.
    pub fetched_content: Option<String>,
    /// The answer of the responder.
    pub final_answer: String,
}

/// An agent that answers questions from the web.
///
/// A question goes through five stages, strictly one after another:
///
/// 1. the model writes a search query for the question;
/// 2. the [`Searcher`] runs it;
/// 3. the model picks the most promising result;
/// 4. the [`PageReader`] fetches that page;
/// 5. a generic responder answers the question from the page content.
///
/// The run stops with no answer if the model does not produce a query in
/// stage 1, if the search fails, or if the model does not pick a URL in
/// stage 3. A page that cannot be read does not stop the run: the responder
/// is told that the content is not available.
///
/// Every exchange with the model is recorded in [`history`] as a user
/// message followed by the reply. Calls take `&mut self`; wrap the agent in
/// a lock to share it.
///
/// [`history`]: OnlineAgent::history
pub struct OnlineAgent {
    model_client: ModelClient,
    searcher: Box<dyn Searcher>,
    page_reader: Box<dyn PageReader>,
    system_prompt: Message,
    url_picker_template: String,
    responder: Agent,
    temperature: f32,
    history: ChatHistory,
}

impl OnlineAgent {
    /// Returns the exchanges made so far.
    #[inline]
    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    /// Answers `question`, optionally continuing an earlier conversation.
    ///
    /// Returns `None` and logs a warning if the run stopped early.
    pub async fn search(
        &mut self,
        question: &str,
        history: Option<&[Message]>,
    ) -> Option<String> {
        self.try_search(question, history)
            .await
            .inspect_err(|err| warn!("online search failed: {err}"))
            .ok()
    }

    /// Like [`search`](Self::search), but returns the reason of a failure.
    #[inline]
    pub async fn try_search(
        &mut self,
        question: &str,
        history: Option<&[Message]>,
    ) -> Result<String> {
        let state = self.run(question, history).await?;
        Ok(state.final_answer)
    }

    /// Runs the whole pipeline and returns every intermediate result.
    pub async fn run(
        &mut self,
        question: &str,
        history: Option<&[Message]>,
    ) -> Result<PipelineState> {
        let query = self.formulate_query(question).await?;

        debug!("{}: searching for {query:?}", PipelineStage::Retrieval);
        let candidates = self.searcher.search(&query).await?;
        debug!("got {} search results", candidates.len());

        let chosen_url = self.select_url(question, &candidates, history).await?;

        debug!("{}: reading {chosen_url}", PipelineStage::Fetch);
        let fetched_content = match self.page_reader.read(&chosen_url).await {
            Ok(Some(content)) => Some(content),
            Ok(None) => {
                warn!("could not read {chosen_url}");
                None
            }
            Err(err) => {
                warn!("could not read {chosen_url}: {err}");
                None
            }
        };

        let final_answer = self
            .synthesize(
                question,
                &chosen_url,
                fetched_content.as_deref().unwrap_or(CONTENT_NOT_AVAILABLE),
                history,
            )
            .await?;

        Ok(PipelineState {
            query,
            candidates,
            chosen_url,
            fetched_content,
            final_answer,
        })
    }

    async fn formulate_query(&mut self, question: &str) -> Result<String> {
        debug!("{}", PipelineStage::QueryFormulation);
        let prompts = PromptBuilder::with_system(self.system_prompt.clone())
            .user(Message::user(question));
        let reply = self
            .model_client
            .exchange(
                &mut self.history,
                prompts,
                ResponseFormat::Json,
                self.temperature,
            )
            .await?;
        required_string(&reply, "search_query")
    }

    async fn select_url(
        &mut self,
        question: &str,
        candidates: &[SearchCandidate],
        history: Option<&[Message]>,
    ) -> Result<String> {
        debug!("{}", PipelineStage::Selection);
        let urls = serde_json::to_string(candidates)?;
        // No system message: the instructions follow the history as a user
        // message.
        let picker = render(
            &self.url_picker_template,
            &[("question", question), ("urls", &urls)],
        );
        let prompts = PromptBuilder::new()
            .history(history)
            .user(Message::user(picker.trim()));
        let reply = self
            .model_client
            .exchange(
                &mut self.history,
                prompts,
                ResponseFormat::Json,
                self.temperature,
            )
            .await?;
        required_string(&reply, "url")
    }

    async fn synthesize(
        &mut self,
        question: &str,
        url: &str,
        content: &str,
        history: Option<&[Message]>,
    ) -> Result<String> {
        debug!("{}", PipelineStage::Synthesis);
        let prompt = render(
            SYNTHESIS_TEMPLATE,
            &[
                ("url", url),
                ("content", content),
                ("question", question),
                ("attribution", ATTRIBUTION_PREFIX),
            ],
        );
        let mut responder = self.responder.fresh();
        let answer = responder.try_ask(&prompt, history).await?;
        self.history
            .record(Message::user(prompt), Message::assistant(answer.clone()));
        Ok(answer)
    }
}

/// Reads a non-empty string field from a JSON reply.
fn required_string(reply: &str, field: &str) -> Result<String> {
    let mut object = try_parse_json_object(reply)?;
    match object.remove(field) {
        Some(Value::String(value)) if !value.trim().is_empty() => Ok(value),
        Some(other) => Err(Error::MalformedModelOutput(format!(
            "`{field}` should be a non-empty string, got {other}"
        ))),
        None => Err(Error::MalformedModelOutput(format!(
            "reply has no `{field}` field"
        ))),
    }
}

/// [`OnlineAgent`] builder.
pub struct OnlineAgentBuilder {
    model_client: ModelClient,
    searcher: Option<Box<dyn Searcher>>,
    page_reader: Option<Box<dyn PageReader>>,
    options: AgentOptions,
}

impl OnlineAgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            searcher: None,
            page_reader: None,
            options: AgentOptions::default(),
        }
    }

    /// Sets the search engine.
    #[inline]
    pub fn with_searcher<S: Searcher + 'static>(mut self, searcher: S) -> Self {
        self.searcher = Some(Box::new(searcher));
        self
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
    ///
    /// Fails if the searcher or the page reader is missing, or if the prompt
    /// table lacks one of the prompts the pipeline uses.
    pub fn build(self) -> Result<OnlineAgent> {
        let Self {
            model_client,
            searcher,
            page_reader,
            options,
        } = self;
        let searcher = searcher.ok_or_else(|| {
            Error::MissingConfiguration(
                "an online agent needs a searcher".to_owned(),
            )
        })?;
        let page_reader = page_reader.ok_or_else(|| {
            Error::MissingConfiguration(
                "an online agent needs a page reader".to_owned(),
            )
        })?;

        let system_prompt = system_message(
            &options.template(PromptKey::OnlineSearcher)?,
            &options.additional_instructions,
            &[],
        );
        let url_picker_template = options.template(PromptKey::UrlPicker)?;

        let mut responder =
            AgentBuilder::with_model_client(model_client.clone())
                .with_agent_type(AgentType::GenericResponder)
                .with_temperature(options.temperature);
        if let Some(table) = &options.prompt_table {
            responder.options.prompt_table = Some(table.clone());
        }
        let responder = responder.build()?;

        Ok(OnlineAgent {
            model_client,
            searcher,
            page_reader,
            system_prompt,
            url_picker_template,
            responder,
            temperature: options.temperature,
            history: ChatHistory::default(),
        })
    }
}

impl_agent_options!(OnlineAgentBuilder);
