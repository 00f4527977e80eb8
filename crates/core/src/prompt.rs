//! Prompt templates and message sequence construction.

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::path::Path;
use std::sync::LazyLock;

use serde::Deserialize;
use verdict_model::Message;

use crate::error::{Error, Result};

static BUILTIN_PROMPTS: LazyLock<PromptTable> = LazyLock::new(|| {
    PromptTable::from_toml_str(include_str!("./prompts.toml"))
        .expect("built-in prompt table should be valid")
});

/// Names of the prompts an agent may look up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PromptKey {
    /// Plain assistant, also used to synthesize online answers.
    GenericResponder,
    /// Breaks a goal into steps.
    Planner,
    /// Summarizes text.
    Summarizer,
    /// Judges whether an answer satisfies a request.
    Validator,
    /// Picks a function from a schema.
    FunctionCaller,
    /// Writes a search query for a question.
    OnlineSearcher,
    /// Picks one search result.
    UrlPicker,
    /// Answers from a single website.
    WebsiteReader,
    /// Extracts data points as text.
    DataExtractor,
    /// Extracts data points as a JSON object.
    DataExtractorJson,
    /// Answers from supplied documents.
    DocumentReader,
    /// Describes the objects in images.
    ObjectDetector,
    /// Filters described objects by the user's interests.
    ObjectFilterer,
}

impl PromptKey {
    /// Returns the table name of this prompt.
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptKey::GenericResponder => "GenericResponder",
            PromptKey::Planner => "Planner",
            PromptKey::Summarizer => "Summarizer",
            PromptKey::Validator => "Validator",
            PromptKey::FunctionCaller => "FunctionCaller",
            PromptKey::OnlineSearcher => "OnlineSearcher",
            PromptKey::UrlPicker => "UrlPicker",
            PromptKey::WebsiteReader => "WebsiteReader",
            PromptKey::DataExtractor => "DataExtractor",
            PromptKey::DataExtractorJson => "DataExtractorJson",
            PromptKey::DocumentReader => "DocumentReader",
            PromptKey::ObjectDetector => "ObjectDetector",
            PromptKey::ObjectFilterer => "ObjectFilterer",
        }
    }
}

impl Display for PromptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Deserialize)]
struct PromptEntry {
    prompt: String,
}

/// An immutable table of prompt templates.
///
/// The table is loaded once, either from the built-in TOML file or from a
/// caller-supplied one, and only supports lookups afterwards. Each entry is
/// a TOML table with a `prompt` string:
///
/// ```toml
/// [GenericResponder]
/// prompt = "You are a helpful assistant. {additional_instructions}"
/// ```
#[derive(Clone, Debug)]
pub struct PromptTable {
    entries: HashMap<String, PromptEntry>,
}

impl PromptTable {
    /// Returns the built-in table.
    #[inline]
    pub fn builtin() -> &'static PromptTable {
        &BUILTIN_PROMPTS
    }

    /// Parses a table from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let entries = toml::from_str(text).map_err(|err| {
            Error::MissingConfiguration(format!("invalid prompt table: {err}"))
        })?;
        Ok(Self { entries })
    }

    /// Reads and parses a table from a TOML file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            Error::MissingConfiguration(format!(
                "cannot read prompt table {}: {err}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&text)
    }

    /// Looks up the template for `key`.
    pub fn get(&self, key: PromptKey) -> Result<&str> {
        self.entries
            .get(key.as_str())
            .map(|entry| entry.prompt.as_str())
            .ok_or_else(|| {
                Error::MissingConfiguration(format!(
                    "prompt table has no `{key}` entry"
                ))
            })
    }
}

/// Fills `{name}` placeholders of `template` in a single pass.
///
/// Only the names in `vars` are substituted; other braces, such as those of
/// a JSON example in the template, are left untouched. Substituted values
/// are never scanned again.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(idx) = rest.find('{') {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx + 1..];
        let hit = vars.iter().find(|(name, _)| {
            tail.strip_prefix(name)
                .is_some_and(|after| after.starts_with('}'))
        });
        match hit {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Builds the message sequence for one model call.
///
/// The order is always: the system message (if any), the supplied history,
/// then the new user message.
#[derive(Clone, Debug, Default)]
pub struct PromptBuilder {
    messages: Vec<Message>,
}

impl PromptBuilder {
    /// Starts a sequence without a system message.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a sequence with the given system message.
    #[inline]
    pub fn with_system(system: Message) -> Self {
        Self {
            messages: vec![system],
        }
    }

    /// Appends prior conversation messages, if any.
    #[inline]
    pub fn history(mut self, history: Option<&[Message]>) -> Self {
        if let Some(history) = history {
            self.messages.extend_from_slice(history);
        }
        self
    }

    /// Appends the user message and returns the finished sequence.
    #[inline]
    pub fn user(mut self, user: Message) -> Vec<Message> {
        self.messages.push(user);
        self.messages
    }
}

/// Renders a system template with the extra instructions and any other
/// placeholder values.
pub(crate) fn system_message(
    template: &str,
    additional_instructions: &str,
    vars: &[(&str, &str)],
) -> Message {
    let mut all_vars = Vec::with_capacity(vars.len() + 1);
    all_vars.push(("additional_instructions", additional_instructions));
    all_vars.extend_from_slice(vars);
    Message::system(render(template, &all_vars).trim())
}

#[cfg(test)]
mod tests {
    use verdict_model::Role;

    use super::*;

    #[test]
    fn test_builtin_table_has_every_key() {
        let table = PromptTable::builtin();
        for key in [
            PromptKey::GenericResponder,
            PromptKey::Planner,
            PromptKey::Summarizer,
            PromptKey::Validator,
            PromptKey::FunctionCaller,
            PromptKey::OnlineSearcher,
            PromptKey::UrlPicker,
            PromptKey::WebsiteReader,
            PromptKey::DataExtractor,
            PromptKey::DataExtractorJson,
            PromptKey::DocumentReader,
            PromptKey::ObjectDetector,
            PromptKey::ObjectFilterer,
        ] {
            assert!(table.get(key).is_ok(), "missing {key}");
        }
        let function_caller = table.get(PromptKey::FunctionCaller).unwrap();
        assert!(function_caller.contains("{schema}"));
    }

    #[test]
    fn test_custom_table() {
        let table = PromptTable::from_toml_str(
            r#"
            [GenericResponder]
            prompt = "Be terse."
            "#,
        )
        .unwrap();
        assert_eq!(
            table.get(PromptKey::GenericResponder).unwrap(),
            "Be terse."
        );
        let err = table.get(PromptKey::UrlPicker).unwrap_err();
        assert!(matches!(err, Error::MissingConfiguration(_)));

        let err =
            PromptTable::from_toml_str("[Broken\nprompt = 1").unwrap_err();
        assert!(matches!(err, Error::MissingConfiguration(_)));
        let err =
            PromptTable::from_path("/nonexistent/prompts.toml").unwrap_err();
        assert!(matches!(err, Error::MissingConfiguration(_)));
    }

    #[test]
    fn test_render() {
        let template = r#"Q: {question} {"url": "<url>"} {unknown} {question}"#;
        let rendered = render(template, &[("question", "why {question}?")]);
        assert_eq!(
            rendered,
            r#"Q: why {question}? {"url": "<url>"} {unknown} why {question}?"#
        );
        assert_eq!(render("trailing {", &[("a", "b")]), "trailing {");
    }

    #[test]
    fn test_prompt_builder_order() {
        let history = [Message::user("Hi"), Message::assistant("Hello!")];
        let prompts = PromptBuilder::with_system(Message::system("sys"))
            .history(Some(&history))
            .user(Message::user("How are you?"));
        let roles: Vec<_> = prompts.iter().map(Message::role).collect();
        assert_eq!(
            roles,
            [Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(prompts[3].content(), "How are you?");

        let prompts =
            PromptBuilder::new().history(None).user(Message::user("x"));
        assert_eq!(prompts.len(), 1);
    }

    #[test]
    fn test_system_message() {
        let msg = system_message(
            "Schema: {schema}\n{additional_instructions}\n",
            "Be nice.",
            &[("schema", "{}")],
        );
        assert_eq!(msg.role(), Role::System);
        assert_eq!(msg.content(), "Schema: {}\nBe nice.");
    }
}
