use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PromptLayerError;

/// Function name a template calls to end the dialogue.
pub const DEFAULT_END_SENTINEL: &str = "end_conversation";

/// Settings for one conversation loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Template to run on every call.
    pub template_name: String,
    /// Observability labels attached to every run.
    pub tags: Vec<String>,
    /// Reserved `function_call` name that ends the conversation.
    pub end_sentinel: String,
    /// Maximum completed exchanges before the loop stops.
    pub max_turns: Option<usize>,
    /// Dispatch multiple tool calls of one message concurrently.
    pub parallel_tool_calls: bool,
    /// Passed through unchanged as the `user_context` input variable.
    pub user_context: Option<Map<String, Value>>,
    /// Additional input variables the template expects.
    pub input_variables: Map<String, Value>,
    pub prompt_version: Option<u32>,
    pub prompt_release_label: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            template_name: String::new(),
            tags: Vec::new(),
            end_sentinel: DEFAULT_END_SENTINEL.to_string(),
            max_turns: None,
            parallel_tool_calls: false,
            user_context: None,
            input_variables: Map::new(),
            prompt_version: None,
            prompt_release_label: None,
            metadata: HashMap::new(),
        }
    }
}

impl ConversationConfig {
    pub fn new(template_name: impl Into<String>) -> Self {
        Self {
            template_name: template_name.into(),
            ..Self::default()
        }
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    pub fn end_sentinel(mut self, name: impl Into<String>) -> Self {
        self.end_sentinel = name.into();
        self
    }

    pub fn parallel_tool_calls(mut self, enable: bool) -> Self {
        self.parallel_tool_calls = enable;
        self
    }

    pub fn user_context(mut self, context: Map<String, Value>) -> Self {
        self.user_context = Some(context);
        self
    }

    pub fn input_variable(mut self, key: impl Into<String>, value: Value) -> Self {
        self.input_variables.insert(key.into(), value);
        self
    }

    pub fn validate(&self) -> Result<(), PromptLayerError> {
        if self.template_name.trim().is_empty() {
            return Err(PromptLayerError::Config(
                "template_name must not be empty".to_string(),
            ));
        }
        if self.end_sentinel.trim().is_empty() {
            return Err(PromptLayerError::Config(
                "end_sentinel must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, PromptLayerError> {
        let config: Self =
            toml::from_str(raw).map_err(|err| PromptLayerError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, PromptLayerError> {
        let config: Self =
            serde_yaml::from_str(raw).map_err(|err| PromptLayerError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a `.toml`, `.yaml` or `.yml` file.
    pub fn load(path: &Path) -> Result<Self, PromptLayerError> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            PromptLayerError::Config(format!("cannot read {}: {err}", path.display()))
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&raw),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&raw),
            _ => Err(PromptLayerError::Config(format!(
                "unsupported config format: {}",
                path.display()
            ))),
        }
    }
}
