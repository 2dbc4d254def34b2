use std::any::Any;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use nlu::{Message, QueryResult};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::intents::Fulfillment;
use crate::routes::AppState;

pub const SECRET_HEADER: &str = "x-webhook-secret";

const FORBIDDEN_TEXT: &str = "Forbidden";
const INTERNAL_ERROR_TEXT: &str = "Internal webhook error.";

/// The part of a fulfillment call the responder looks at.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    #[serde(default)]
    pub query_result: Option<QueryResult>,
    #[serde(default)]
    pub session: Option<String>,
}

impl WebhookRequest {
    pub fn intent(&self) -> &str {
        self.query_result
            .as_ref()
            .map(QueryResult::intent_name)
            .unwrap_or_default()
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub fulfillment_text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fulfillment_messages: Vec<Message>,
}

impl WebhookResponse {
    fn text_only(text: &str) -> Self {
        Self {
            fulfillment_text: text.to_owned(),
            fulfillment_messages: Vec::new(),
        }
    }
}

impl From<&Fulfillment> for WebhookResponse {
    fn from(fulfillment: &Fulfillment) -> Self {
        let mut messages = vec![Message::text([fulfillment.text.clone()])];
        if !fulfillment.buttons.is_empty() {
            messages.push(Message::payload(json!({ "buttons": fulfillment.buttons })));
        }

        Self {
            fulfillment_text: fulfillment.text.clone(),
            fulfillment_messages: messages,
        }
    }
}

fn authorized(expected: Option<&str>, headers: &HeaderMap) -> bool {
    let Some(expected) = expected else {
        return true;
    };

    headers
        .get(SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|given| given == expected)
}

pub async fn fulfill(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    if !authorized(state.webhook_secret.as_deref(), &headers) {
        tracing::warn!("webhook call rejected, bad or missing secret");
        return (
            StatusCode::FORBIDDEN,
            Json(WebhookResponse::text_only(FORBIDDEN_TEXT)),
        )
            .into_response();
    }

    let request = serde_json::from_slice::<WebhookRequest>(&body).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "malformed webhook body, answering with the fallback");
        WebhookRequest::default()
    });

    let intent = request.intent();
    tracing::info!(
        intent,
        session = request.session.as_deref().unwrap_or_default(),
        "webhook fulfillment"
    );

    Json(WebhookResponse::from(state.intents.respond(intent))).into_response()
}

/// Keeps the conversation going when the handler panics.
pub fn internal_error_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(detail, "webhook handler panicked");

    Json(WebhookResponse::text_only(INTERNAL_ERROR_TEXT)).into_response()
}
