use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::PromptLayerError;

/// Request payload for a template run.
///
/// `prompt_name` addresses the template and is not part of the JSON body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunRequest {
    #[serde(skip)]
    pub prompt_name: String,
    pub input_variables: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_release_label: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_parameter_overrides: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl RunRequest {
    pub fn new(prompt_name: impl Into<String>) -> Self {
        Self {
            prompt_name: prompt_name.into(),
            ..Self::default()
        }
    }

    /// Sets one input variable from any serializable value.
    pub fn input(
        mut self,
        key: impl Into<String>,
        value: impl Serialize,
    ) -> Result<Self, PromptLayerError> {
        self.input_variables
            .insert(key.into(), serde_json::to_value(value)?);
        Ok(self)
    }

    /// Sets one input variable from an already-built JSON value.
    pub fn input_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.input_variables.insert(key.into(), value);
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn prompt_version(mut self, version: u32) -> Self {
        self.prompt_version = Some(version);
        self
    }

    pub fn prompt_release_label(mut self, label: impl Into<String>) -> Self {
        self.prompt_release_label = Some(label.into());
        self
    }

    pub fn group_id(mut self, group_id: u64) -> Self {
        self.group_id = Some(group_id);
        self
    }

    pub fn model_parameter_overrides(mut self, overrides: Value) -> Self {
        self.model_parameter_overrides = Some(overrides);
        self
    }

    /// Overrides the provider and model configured on the template.
    pub fn provider_model(mut self, provider: impl Into<String>, model: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self.model = Some(model.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn body_omits_name_and_empty_fields() {
        let request = RunRequest::new("grok-test")
            .input("topic", "prompt engineering")
            .expect("input");
        let body = serde_json::to_value(&request).expect("serialize");
        assert_eq!(
            body,
            json!({"input_variables": {"topic": "prompt engineering"}})
        );
    }

    #[test]
    fn optional_fields_are_sent_when_set() {
        let request = RunRequest::new("support")
            .tags(["support", "multi-turn"])
            .metadata("user_id", "user_123")
            .prompt_release_label("prod")
            .provider_model("openai", "gpt-4o");
        let body = serde_json::to_value(&request).expect("serialize");
        assert_eq!(body["tags"], json!(["support", "multi-turn"]));
        assert_eq!(body["metadata"]["user_id"], "user_123");
        assert_eq!(body["prompt_release_label"], "prod");
        assert_eq!(body["provider"], "openai");
        assert_eq!(body["model"], "gpt-4o");
        assert!(body.get("prompt_version").is_none());
    }
}
