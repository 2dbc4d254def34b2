use std::time::Duration;

pub use crate::dialogflow::detect_intent::{
    DetectIntentResponse, Intent, Message, QueryResult, Reply, TextMessage,
};
pub use crate::dialogflow::payload::{flatten_fields, FieldValue};
pub use crate::dialogflow::{unescape_private_key, Auth, Client, Config, ConfigError, NluError};

mod dialogflow;

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Sends `text` to the agent under `session_id` and normalizes the answer.
///
/// A response without a `queryResult` is an empty reply, not an error.
pub async fn exchange(client: &Client, session_id: &str, text: &str) -> Result<Reply, NluError> {
    let response = client.detect_intent(session_id, text).await?;

    Ok(response.query_result.unwrap_or_default().reply())
}
