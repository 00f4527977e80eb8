use std::sync::Arc;

use verdict_model::ResponseFormat;

use crate::error::Result;
use crate::prompt::{PromptKey, PromptTable};

/// Sampling temperature used when a builder is not given one.
pub const DEFAULT_TEMPERATURE: f32 = 0.8;

/// Settings every agent builder accepts.
#[derive(Clone, Debug)]
pub(crate) struct AgentOptions {
    pub temperature: f32,
    pub format: ResponseFormat,
    pub additional_instructions: String,
    pub custom_system_prompt: Option<String>,
    pub prompt_table: Option<Arc<PromptTable>>,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            format: ResponseFormat::Text,
            additional_instructions: String::new(),
            custom_system_prompt: None,
            prompt_table: None,
        }
    }
}

impl AgentOptions {
    #[inline]
    pub fn prompt_table(&self) -> &PromptTable {
        self.prompt_table
            .as_deref()
            .unwrap_or_else(|| PromptTable::builtin())
    }

    /// Returns the custom system prompt if set, otherwise the table entry.
    pub fn system_template(&self, key: PromptKey) -> Result<String> {
        match &self.custom_system_prompt {
            Some(custom) => Ok(custom.clone()),
            None => self.template(key),
        }
    }

    /// Looks up a table entry, ignoring the custom system prompt.
    #[inline]
    pub fn template(&self, key: PromptKey) -> Result<String> {
        self.prompt_table().get(key).map(str::to_owned)
    }
}

/// Implements the option setters shared by agent builders.
macro_rules! impl_agent_options {
    ($builder:ty) => {
        impl $builder {
            /// Sets the sampling temperature. Defaults to `0.8`.
            #[inline]
            pub fn with_temperature(mut self, temperature: f32) -> Self {
                self.options.temperature = temperature;
                self
            }

            /// Appends instructions to the built-in system prompt.
            #[inline]
            pub fn with_additional_instructions<S: Into<String>>(
                mut self,
                instructions: S,
            ) -> Self {
                self.options.additional_instructions = instructions.into();
                self
            }

            /// Uses a prompt table other than the built-in one.
            #[inline]
            pub fn with_prompt_table(
                mut self,
                table: $crate::prompt::PromptTable,
            ) -> Self {
                self.options.prompt_table = Some(::std::sync::Arc::new(table));
                self
            }
        }
    };
}

/// Implements `with_custom_system_prompt` for builders that allow it.
macro_rules! impl_custom_system_prompt {
    ($builder:ty) => {
        impl $builder {
            /// Replaces the built-in system prompt entirely.
            ///
            /// The same placeholders as the built-in prompt are filled in.
            #[inline]
            pub fn with_custom_system_prompt<S: Into<String>>(
                mut self,
                prompt: S,
            ) -> Self {
                self.options.custom_system_prompt = Some(prompt.into());
                self
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_template() {
        let mut options = AgentOptions::default();
        let builtin = options.system_template(PromptKey::Planner).unwrap();
        assert!(builtin.contains("{additional_instructions}"));

        options.custom_system_prompt = Some("Only plan.".to_owned());
        assert_eq!(
            options.system_template(PromptKey::Planner).unwrap(),
            "Only plan."
        );
        assert_eq!(options.template(PromptKey::Planner).unwrap(), builtin);
    }

    #[test]
    fn test_custom_table() {
        let table =
            PromptTable::from_toml_str("[Planner]\nprompt = \"Plan.\"")
                .unwrap();
        let options = AgentOptions {
            prompt_table: Some(Arc::new(table)),
            ..Default::default()
        };
        assert_eq!(options.template(PromptKey::Planner).unwrap(), "Plan.");
        assert!(options.template(PromptKey::Summarizer).is_err());
    }
}
