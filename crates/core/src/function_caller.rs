//! Choosing a function with a model.

use serde_json::{Map, Value};
use verdict_model::{Message, ModelProvider, ResponseFormat};

use crate::error::{Error, Result};
use crate::function::{FunctionRef, FunctionRegistry};
use crate::history::ChatHistory;
use crate::json::try_parse_json_object;
use crate::model_client::ModelClient;
use crate::options::AgentOptions;
use crate::prompt::{PromptBuilder, PromptKey, system_message};
use crate::schema::{DescriptionMatching, FunctionSchema};

/// A function selected by the model, ready to be invoked by the caller.
#[derive(Clone, Debug)]
pub struct Dispatch {
    /// The selected function. Always a member of the caller's registry.
    pub function: FunctionRef,
    /// The parameters chosen by the model, not validated against the
    /// function's input type.
    pub parameters: Map<String, Value>,
    /// The exact messages sent to the model.
    pub prompts: Vec<Message>,
    /// The unprocessed model reply.
    pub raw_response: String,
}

impl Dispatch {
    /// Invokes the selected function with the selected parameters.
    #[inline]
    pub fn invoke(&self) -> Result<Value> {
        self.function.invoke(&self.parameters)
    }
}

/// An agent that asks the model to pick one of the registered functions and
/// its parameters.
///
/// The agent never runs the function. It only checks that the reply names
/// a registered function and carries a parameter object; turning the
/// parameters into arguments and calling the function is up to the caller,
/// see [`Dispatch::invoke`].
///
/// Every call takes `&mut self` to record the exchange in [`history`], so
/// sharing one instance between tasks requires external locking.
///
/// [`history`]: FunctionCaller::history
pub struct FunctionCaller {
    model_client: ModelClient,
    registry: FunctionRegistry,
    schema: FunctionSchema,
    system_prompt: Message,
    temperature: f32,
    history: ChatHistory,
}

impl FunctionCaller {
    /// Returns the schema embedded in the system prompt.
    #[inline]
    pub fn schema(&self) -> &FunctionSchema {
        &self.schema
    }

    /// Returns the registry the model chooses from.
    #[inline]
    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Returns the exchanges made so far.
    #[inline]
    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    /// Returns the messages [`get_function`](Self::get_function) would send
    /// for `question`, for callers that talk to a model themselves.
    pub fn prompt(
        &self,
        question: &str,
        history: Option<&[Message]>,
    ) -> Vec<Message> {
        PromptBuilder::with_system(self.system_prompt.clone())
            .history(history)
            .user(Message::user(question))
    }

    /// Asks the model which function answers `question`.
    ///
    /// Returns `None` and logs a warning if the model call fails or the
    /// reply is not a valid selection.
    pub async fn get_function(
        &mut self,
        question: &str,
        history: Option<&[Message]>,
    ) -> Option<Dispatch> {
        self.try_get_function(question, history)
            .await
            .inspect_err(|err| warn!("no function selected: {err}"))
            .ok()
    }

    /// Like [`get_function`](Self::get_function), but returns the reason
    /// of a failure.
    ///
    /// The question and the reply are recorded whenever the model replied,
    /// including when the reply is then rejected.
    pub async fn try_get_function(
        &mut self,
        question: &str,
        history: Option<&[Message]>,
    ) -> Result<Dispatch> {
        let prompts = self.prompt(question, history);
        let raw_response = self
            .model_client
            .exchange(
                &mut self.history,
                prompts.clone(),
                ResponseFormat::Json,
                self.temperature,
            )
            .await?;

        let mut reply = try_parse_json_object(&raw_response)?;
        let name = match reply.remove("function") {
            Some(Value::String(name)) => name,
            Some(other) => {
                return Err(Error::MalformedModelOutput(format!(
                    "`function` should be a string, got {other}"
                )));
            }
            None => {
                return Err(Error::MalformedModelOutput(
                    "reply has no `function` field".to_owned(),
                ));
            }
        };
        let parameters = match reply.remove("parameters") {
            Some(Value::Object(parameters)) => parameters,
            Some(Value::Null) => Map::new(),
            Some(other) => {
                return Err(Error::MalformedModelOutput(format!(
                    "`parameters` should be an object, got {other}"
                )));
            }
            None => {
                return Err(Error::MalformedModelOutput(
                    "reply has no `parameters` field".to_owned(),
                ));
            }
        };
        let Some(function) = self.registry.get(&name).cloned() else {
            return Err(Error::UnknownFunctionSelected(name));
        };

        debug!("model selected `{name}`");
        Ok(Dispatch {
            function,
            parameters,
            prompts,
            raw_response,
        })
    }
}

/// [`FunctionCaller`] builder.
pub struct FunctionCallerBuilder {
    model_client: ModelClient,
    registry: Option<FunctionRegistry>,
    matching: DescriptionMatching,
    options: AgentOptions,
}

impl FunctionCallerBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            registry: None,
            matching: DescriptionMatching::default(),
            options: AgentOptions::default(),
        }
    }

    /// Sets the functions the model may choose from.
    #[inline]
    pub fn with_registry(mut self, registry: FunctionRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets how parameter descriptions are taken from doc comments.
    #[inline]
    pub fn with_description_matching(
        mut self,
        matching: DescriptionMatching,
    ) -> Self {
        self.matching = matching;
        self
    }

    /// Builds the agent.
    ///
    /// Fails if no registry was given or the system prompt is missing from
    /// the prompt table.
    pub fn build(self) -> Result<FunctionCaller> {
        let Self {
            model_client,
            registry,
            matching,
            options,
        } = self;
        let registry = registry.ok_or_else(|| {
            Error::MissingConfiguration(
                "a function caller needs a function registry".to_owned(),
            )
        })?;

        let schema = registry.schema(matching);
        let template = options.system_template(PromptKey::FunctionCaller)?;
        let system_prompt = system_message(
            &template,
            &options.additional_instructions,
            &[("schema", &schema.to_string())],
        );

        Ok(FunctionCaller {
            model_client,
            registry,
            schema,
            system_prompt,
            temperature: options.temperature,
            history: ChatHistory::default(),
        })
    }
}

impl_agent_options!(FunctionCallerBuilder);
impl_custom_system_prompt!(FunctionCallerBuilder);

#[cfg(test)]
mod tests {
    use serde_json::json;
    use verdict_model::{ErrorKind, Role};
    use verdict_test_model::{PresetResponse, TestModelProvider};

    use super::*;
    use crate::function::tests::arithmetic;

    fn function_caller(model_provider: &TestModelProvider) -> FunctionCaller {
        FunctionCallerBuilder::with_model_provider(model_provider.clone())
            .with_registry(arithmetic())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_function() {
        let model_provider = TestModelProvider::with_replies([
            r#"{"function": "multiply", "parameters": {"a": 4, "b": 5}}"#,
        ]);
        let mut caller = function_caller(&model_provider);

        let dispatch = caller
            .get_function("What is 4 times 5?", None)
            .await
            .unwrap();
        assert_eq!(dispatch.function.name(), "multiply");
        assert_eq!(
            Value::Object(dispatch.parameters.clone()),
            json!({ "a": 4, "b": 5 })
        );
        assert_eq!(dispatch.invoke().unwrap(), json!(20));
        assert_eq!(dispatch.prompts.len(), 2);
        assert_eq!(dispatch.prompts[0].role(), Role::System);
        let multiply = r#""multiply":{"description":"Multiplies two numbers.""#;
        assert!(dispatch.prompts[0].content().contains(multiply));

        let req = &model_provider.requests()[0];
        assert_eq!(req.format, ResponseFormat::Json);
        assert_eq!(req.temperature, Some(0.8));
        assert_eq!(req.messages, dispatch.prompts);
    }

    #[tokio::test]
    async fn test_rejected_replies() {
        let replies = [
            r#"{"parameters": {"a": 4, "b": 5}}"#,
            r#"{"function": "multiply"}"#,
            r#"{"function": "divide", "parameters": {"a": 4, "b": 5}}"#,
            "I would multiply the numbers.",
        ];
        let model_provider = TestModelProvider::with_replies(replies);
        let mut caller = function_caller(&model_provider);

        let err = caller.try_get_function("4 * 5?", None).await.unwrap_err();
        assert!(matches!(err, Error::MalformedModelOutput(_)));
        let err = caller.try_get_function("4 * 5?", None).await.unwrap_err();
        assert!(matches!(err, Error::MalformedModelOutput(_)));
        let err = caller.try_get_function("4 / 5?", None).await.unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownFunctionSelected(name) if name == "divide"
        ));
        assert!(caller.get_function("4 * 5?", None).await.is_none());

        // Every reply was recorded even though none was accepted.
        assert_eq!(caller.history().len(), replies.len() * 2);
        assert_eq!(caller.history().messages()[7].content(), replies[3]);
    }

    #[tokio::test]
    async fn test_model_failure() {
        let model_provider = TestModelProvider::default();
        model_provider.add_response(PresetResponse::failure(
            ErrorKind::Moderated,
        ));
        let mut caller = function_caller(&model_provider);

        let err = caller.try_get_function("Hi", None).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Model(err) if err.kind() == ErrorKind::Moderated
        ));
        assert!(caller.history().is_empty());
    }

    #[tokio::test]
    async fn test_history_ordering() {
        let model_provider = TestModelProvider::with_replies([
            r#"{"function": "add", "parameters": {"a": 1, "b": 2}}"#,
            r#"Sure: {"function": "add", "parameters": {"a": 3, "b": 3}}"#,
        ]);
        let mut caller = function_caller(&model_provider);
        caller.get_function("1 + 2?", None).await.unwrap();

        let earlier = [
            Message::user("Let's do some maths."),
            Message::assistant("Okay."),
            Message::user("1 + 2?"),
        ];
        let dispatch = caller
            .get_function("Now double 3.", Some(&earlier))
            .await
            .unwrap();
        assert_eq!(dispatch.prompts.len(), 5);
        assert_eq!(dispatch.prompts[1..4], earlier);

        let messages = caller.history().messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[2], Message::user("Now double 3."));
        assert_eq!(messages[3].role(), Role::Assistant);
        assert_eq!(messages[3].content(), dispatch.raw_response);
    }

    #[tokio::test]
    async fn test_custom_system_prompt() {
        let model_provider = TestModelProvider::default();
        let caller = FunctionCallerBuilder::with_model_provider(model_provider)
            .with_registry(arithmetic())
            .with_custom_system_prompt(
                "Pick one of {schema}. {additional_instructions}",
            )
            .with_additional_instructions("Prefer add.")
            .build()
            .unwrap();
        let prompts = caller.prompt("1 + 1?", None);
        assert!(prompts[0].content().starts_with(r#"Pick one of {"add":"#));
        assert!(prompts[0].content().ends_with("Prefer add."));
    }

    #[test]
    fn test_missing_registry() {
        let result = FunctionCallerBuilder::with_model_provider(
            TestModelProvider::default(),
        )
        .build();
        assert!(matches!(result, Err(Error::MissingConfiguration(_))));
    }
}
