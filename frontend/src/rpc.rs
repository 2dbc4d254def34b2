use gloo_net::http::{Method, Request};
use serde_json::Value;
use shared::api::{parse_suggestions, ClientTransport};

/// Talks to the proxy under `base`; an empty base means same origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Client {
    base: String,
}

impl Client {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_owned(),
        }
    }

    fn url(&self, route: &str) -> String {
        if route.contains("://") {
            route.to_owned()
        } else {
            format!("{}{}", self.base, route)
        }
    }

    /// Loads suggestion labels from an arbitrary URL.
    pub async fn fetch_suggestions_from(&self, url: &str) -> Result<Vec<String>, gloo_net::Error> {
        match self.send_request("get", url, None).await? {
            Ok(body) => Ok(parse_suggestions(&body)),
            Err(body) => {
                tracing::warn!(%url, %body, "suggestion source answered with an error");
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait::async_trait(?Send)]
impl ClientTransport for Client {
    type Error = gloo_net::Error;

    async fn send_request(
        &self,
        method: &str,
        route: &str,
        body: Option<Value>,
    ) -> Result<Result<Value, Value>, Self::Error> {
        let method = match method.to_lowercase().as_str() {
            "post" => Method::POST,
            "put" => Method::PUT,
            "delete" => Method::DELETE,
            _ => Method::GET,
        };

        let req = Request::new(&self.url(route)).method(method);
        let req = match body {
            Some(body) => req.json(&body)?,
            None => req,
        };

        let resp = req.send().await?;
        let json = resp.json().await?;

        if resp.ok() {
            Ok(Ok(json))
        } else {
            Ok(Err(json))
        }
    }
}
