use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    chat::{Message, Role},
    error::PromptLayerError,
};

/// Result of a template run.
///
/// Every field is optional at parse time; [`RunResponse::last_message`]
/// is the single place the message path is validated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunResponse {
    /// Opaque identifier issued by the service for correlation/audit.
    #[serde(default, deserialize_with = "id_as_string")]
    pub request_id: Option<String>,
    /// Provider response exactly as returned by the model vendor.
    #[serde(default)]
    pub raw_response: Option<Value>,
    #[serde(default)]
    pub prompt_blueprint: Option<PromptBlueprint>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptBlueprint {
    #[serde(default)]
    pub prompt_template: Option<PromptTemplate>,
}

/// Compiled template; `messages` ends with the newly generated turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptTemplate {
    #[serde(default)]
    pub messages: Option<Vec<Value>>,
}

impl RunResponse {
    /// Messages of the compiled template, if the response carries any.
    pub fn messages(&self) -> Option<&[Value]> {
        self.prompt_blueprint
            .as_ref()?
            .prompt_template
            .as_ref()?
            .messages
            .as_deref()
    }

    /// The generated assistant turn.
    ///
    /// Anything other than an assistant message in last position is a
    /// format error.
    pub fn last_message(&self) -> Result<Message, PromptLayerError> {
        let messages = self.messages().ok_or_else(|| {
            PromptLayerError::malformed(
                "missing prompt_blueprint.prompt_template.messages",
                self.raw_summary(),
            )
        })?;
        let last = messages.last().ok_or_else(|| {
            PromptLayerError::malformed("prompt template returned no messages", self.raw_summary())
        })?;
        let message: Message = serde_json::from_value(last.clone()).map_err(|err| {
            PromptLayerError::malformed(format!("invalid last message: {err}"), last.to_string())
        })?;
        if message.role != Role::Assistant {
            return Err(PromptLayerError::malformed(
                format!("last message has role {}, expected assistant", message.role),
                last.to_string(),
            ));
        }
        Ok(message)
    }

    /// `choices[0].message.content` of an OpenAI-shaped raw response.
    pub fn raw_text(&self) -> Option<&str> {
        self.raw_response
            .as_ref()?
            .pointer("/choices/0/message/content")?
            .as_str()
    }

    fn raw_summary(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn id_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(id)) => Some(id),
        Some(other) => Some(other.to_string()),
    })
}
