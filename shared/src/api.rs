use std::fmt::{Debug, Display};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::{ChatReply, ChatRequest, ErrorBody, MESSAGE_ROUTE, SUGGESTIONS_ROUTE};

/// Calls the widget makes against the proxy server.
#[async_trait(?Send)]
pub trait ChatApi {
    type Error: Display + Debug;

    async fn send_message(&self, body: ChatRequest) -> Result<ChatReply, Self::Error>;

    async fn fetch_suggestions(&self) -> Result<Vec<String>, Self::Error>;
}

/// Raw JSON transport. `Ok(Err(body))` is a non-200 answer from the server.
#[async_trait(?Send)]
pub trait ClientTransport {
    type Error: std::error::Error + 'static;

    async fn send_request(
        &self,
        method: &str,
        route: &str,
        body: Option<Value>,
    ) -> Result<Result<Value, Value>, Self::Error>;
}

#[derive(Error, Debug)]
pub enum ClientError<TransportError>
where
    TransportError: std::error::Error + 'static,
{
    #[error(transparent)]
    Transport(TransportError),
    #[error("could not decode response: {0}")]
    Deserialization(serde_json::Error),
    #[error("could not encode request: {0}")]
    Serialization(serde_json::Error),
    #[error("server rejected request: {}", .0.error)]
    Api(ErrorBody),
}

async fn call<T, R>(
    transport: &T,
    method: &str,
    route: &str,
    body: Option<Value>,
) -> Result<R, ClientError<T::Error>>
where
    T: ClientTransport + ?Sized,
    R: DeserializeOwned,
{
    let resp = transport
        .send_request(method, route, body)
        .await
        .map_err(ClientError::Transport)?;

    match resp {
        Ok(resp) => serde_json::from_value(resp).map_err(ClientError::Deserialization),
        Err(resp) => {
            let resp = serde_json::from_value(resp).map_err(ClientError::Deserialization)?;
            Err(ClientError::Api(resp))
        }
    }
}

#[async_trait(?Send)]
impl<Transport> ChatApi for Transport
where
    Transport: ClientTransport,
{
    type Error = ClientError<Transport::Error>;

    async fn send_message(&self, body: ChatRequest) -> Result<ChatReply, Self::Error> {
        let body = serde_json::to_value(body).map_err(ClientError::Serialization)?;

        call(self, "post", MESSAGE_ROUTE, Some(body)).await
    }

    async fn fetch_suggestions(&self) -> Result<Vec<String>, Self::Error> {
        let resp: Value = call(self, "get", SUGGESTIONS_ROUTE, None).await?;

        Ok(parse_suggestions(&resp))
    }
}

/// Accepts a bare array of labels or `{suggestions: [...]}`; anything else is
/// an empty list. Non-string entries are skipped.
pub fn parse_suggestions(body: &Value) -> Vec<String> {
    let list = match body {
        Value::Array(items) => Some(items),
        Value::Object(_) => body.get("suggestions").and_then(Value::as_array),
        _ => None,
    };

    list.map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect()
    })
    .unwrap_or_default()
}
