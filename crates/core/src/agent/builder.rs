use verdict_model::{ModelProvider, ResponseFormat};

use super::{Agent, AgentType};
use crate::error::{Error, Result};
use crate::history::ChatHistory;
use crate::model_client::ModelClient;
use crate::options::AgentOptions;
use crate::prompt::system_message;

/// [`Agent`] builder.
pub struct AgentBuilder {
    pub(crate) model_client: ModelClient,
    pub(crate) agent_type: Option<AgentType>,
    pub(crate) options: AgentOptions,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self::with_model_client(ModelClient::new(provider))
    }

    #[inline]
    pub(crate) fn with_model_client(model_client: ModelClient) -> Self {
        Self {
            model_client,
            agent_type: None,
            options: AgentOptions::default(),
        }
    }

    /// Uses the premade system prompt of `agent_type`.
    ///
    /// A custom system prompt takes precedence over this.
    #[inline]
    pub fn with_agent_type(mut self, agent_type: AgentType) -> Self {
        self.agent_type = Some(agent_type);
        self
    }

    /// Sets the reply format. Defaults to plain text.
    #[inline]
    pub fn with_format(mut self, format: ResponseFormat) -> Self {
        self.options.format = format;
        self
    }

    /// Builds the agent.
    ///
    /// Fails if neither an agent type nor a custom system prompt was given.
    pub fn build(self) -> Result<Agent> {
        let Self {
            model_client,
            agent_type,
            options,
        } = self;

        let template = match (&options.custom_system_prompt, agent_type) {
            (Some(custom), _) => custom.clone(),
            (None, Some(agent_type)) => {
                options.template(agent_type.prompt_key())?
            }
            (None, None) => {
                return Err(Error::MissingConfiguration(
                    "an agent needs an agent type or a custom system prompt"
                        .to_owned(),
                ));
            }
        };
        let system_prompt =
            system_message(&template, &options.additional_instructions, &[]);

        Ok(Agent {
            model_client,
            system_prompt,
            temperature: options.temperature,
            format: options.format,
            history: ChatHistory::default(),
        })
    }
}

impl_agent_options!(AgentBuilder);
impl_custom_system_prompt!(AgentBuilder);
