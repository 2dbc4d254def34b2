use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod api;
pub mod conversation;
pub mod session;

pub const MESSAGE_ROUTE: &str = "/api/v0/message";
pub const SUGGESTIONS_ROUTE: &str = "/api/v0/suggestions";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    #[serde(default)]
    pub reply: String,
    #[serde(default)]
    pub intent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default)]
    pub session_id: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<String>,
}

impl From<Vec<String>> for SuggestionsResponse {
    fn from(suggestions: Vec<String>) -> Self {
        Self { suggestions }
    }
}

/// A quick-reply button as carried in fulfillment payloads.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Button {
    #[serde(default, alias = "text")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl Button {
    pub fn new(title: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            payload: Some(payload.into()),
        }
    }

    /// What selecting the button sends: its payload, else its title.
    pub fn utterance(&self) -> &str {
        self.payload
            .as_deref()
            .filter(|payload| !payload.trim().is_empty())
            .unwrap_or(&self.title)
    }
}
