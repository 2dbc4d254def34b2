use std::fmt;

use jsonwebtoken::EncodingKey;
use miette::Diagnostic;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::{APP_USER_AGENT, REQUEST_TIMEOUT};

use self::auth::ServiceAccount;
use self::detect_intent::{DetectIntentRequest, DetectIntentResponse};

pub(crate) mod auth;
pub(crate) mod detect_intent;
pub(crate) mod payload;

const DEFAULT_API_BASE: &str = "https://dialogflow.googleapis.com";
const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_LANGUAGE_CODE: &str = "en-US";

/// Credentials or settings that make an outbound call impossible.
#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    #[diagnostic(code(nlu::config::missing))]
    Missing(&'static str),

    #[error("DF_PRIVATE_KEY is not a PEM encoded RSA private key")]
    #[diagnostic(
        code(nlu::config::private_key),
        help("paste the service account key including its BEGIN/END PRIVATE KEY lines; escaped \\n sequences are accepted")
    )]
    InvalidPrivateKey,

    #[error("could not build http client")]
    #[diagnostic(code(nlu::config::http_client))]
    HttpClient(#[source] reqwest::Error),
}

/// Failures talking to the token endpoint or the Dialogflow API.
#[derive(Error, Diagnostic, Debug)]
pub enum NluError {
    #[error("could not sign the service account assertion")]
    #[diagnostic(code(nlu::token::sign))]
    Sign(#[source] jsonwebtoken::errors::Error),

    #[error("access token is not a valid header value")]
    #[diagnostic(code(nlu::token::header))]
    InvalidToken,

    #[error("invalid endpoint url {0}")]
    #[diagnostic(code(nlu::url))]
    Url(String),

    #[error("request to {url} failed")]
    #[diagnostic(code(nlu::request))]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered {status}: {message}")]
    #[diagnostic(code(nlu::status))]
    Status {
        url: String,
        status: u16,
        message: String,
    },

    #[error("could not decode response from {url}")]
    #[diagnostic(code(nlu::decode))]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Clone)]
pub struct Config {
    client_email: String,
    signing_key: EncodingKey,
    project_id: String,
    language_code: String,
    api_base: String,
    token_url: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("client_email", &self.client_email)
            .field("project_id", &self.project_id)
            .field("language_code", &self.language_code)
            .field("api_base", &self.api_base)
            .field("token_url", &self.token_url)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source, validating the signing
    /// key before anything is sent.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let present = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let client_email = present("DF_CLIENT_EMAIL").ok_or(ConfigError::Missing("DF_CLIENT_EMAIL"))?;
        let raw_key = present("DF_PRIVATE_KEY").ok_or(ConfigError::Missing("DF_PRIVATE_KEY"))?;
        let project_id = present("DF_PROJECT_ID")
            .or_else(|| present("REACT_APP_PROJECT_ID"))
            .ok_or(ConfigError::Missing("DF_PROJECT_ID"))?;

        let signing_key = parse_private_key(&raw_key)?;

        Ok(Self {
            client_email: client_email.trim().to_owned(),
            signing_key,
            project_id: project_id.trim().to_owned(),
            language_code: present("DF_LANGUAGE_CODE")
                .unwrap_or_else(|| DEFAULT_LANGUAGE_CODE.to_owned()),
            api_base: present("DF_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_owned()),
            token_url: present("DF_TOKEN_URL").unwrap_or_else(|| DEFAULT_TOKEN_URL.to_owned()),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn client(&self) -> Result<Client, ConfigError> {
        Ok(Client {
            http: http_client()?,
            api_base: self.api_base.clone(),
            project_id: self.project_id.clone(),
            language_code: self.language_code.clone(),
            auth: Auth::ServiceAccount(ServiceAccount {
                client_email: self.client_email.clone(),
                signing_key: self.signing_key.clone(),
                token_url: self.token_url.clone(),
            }),
        })
    }
}

/// Turns the env-var form of a PEM key (`\n` escapes) back into real lines.
pub fn unescape_private_key(raw: &str) -> String {
    let key = if raw.contains("\\n") {
        raw.replace("\\n", "\n")
    } else {
        raw.to_owned()
    };

    key.trim().to_owned()
}

fn parse_private_key(raw: &str) -> Result<EncodingKey, ConfigError> {
    let key = unescape_private_key(raw);
    if !key.contains("BEGIN PRIVATE KEY") {
        return Err(ConfigError::InvalidPrivateKey);
    }

    EncodingKey::from_rsa_pem(key.as_bytes()).map_err(|_| ConfigError::InvalidPrivateKey)
}

fn http_client() -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .user_agent(APP_USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(ConfigError::HttpClient)
}

#[derive(Debug, Clone)]
pub enum Auth {
    ServiceAccount(ServiceAccount),
    /// A token issued out of band, e.g. by `gcloud auth print-access-token`.
    Bearer(String),
}

#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    api_base: String,
    project_id: String,
    language_code: String,
    auth: Auth,
}

impl Client {
    pub fn with_bearer(
        api_base: impl Into<String>,
        project_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            http: http_client()?,
            api_base: api_base.into(),
            project_id: project_id.into(),
            language_code: DEFAULT_LANGUAGE_CODE.to_owned(),
            auth: Auth::Bearer(token.into()),
        })
    }

    pub async fn detect_intent(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<DetectIntentResponse, NluError> {
        let url = self.session_url(session_id)?;
        let authorization = self.authorization().await?;
        let request = DetectIntentRequest::new(text, &self.language_code);

        tracing::debug!(%url, session = session_id, "detecting intent");

        let response = self
            .http
            .post(url.clone())
            .header(AUTHORIZATION, authorization)
            .json(&request)
            .send()
            .await
            .map_err(|source| NluError::Request {
                url: url.to_string(),
                source,
            })?;

        read_json(response, url.as_str()).await
    }

    fn session_url(&self, session_id: &str) -> Result<Url, NluError> {
        let invalid = || NluError::Url(self.api_base.clone());
        let action = format!("{session_id}:detectIntent");

        let mut url = Url::parse(&self.api_base).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend([
                "v2",
                "projects",
                self.project_id.as_str(),
                "agent",
                "sessions",
                action.as_str(),
            ]);

        Ok(url)
    }

    async fn authorization(&self) -> Result<HeaderValue, NluError> {
        let token = match &self.auth {
            Auth::ServiceAccount(account) => account.access_token(&self.http).await?,
            Auth::Bearer(token) => token.clone(),
        };

        let mut value =
            HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| NluError::InvalidToken)?;
        value.set_sensitive(true);

        Ok(value)
    }
}

pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    url: &str,
) -> Result<T, NluError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(NluError::Status {
            url: url.to_owned(),
            status: status.as_u16(),
            message: upstream_message(&body),
        });
    }

    response.json::<T>().await.map_err(|source| NluError::Decode {
        url: url.to_owned(),
        source,
    })
}

/// Google APIs answer `{error: {message}}`, the token endpoint
/// `{error, error_description}`.
fn upstream_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    parsed
        .as_ref()
        .and_then(|v| {
            v["error"]["message"]
                .as_str()
                .or_else(|| v["error_description"].as_str())
                .or_else(|| v["error"].as_str())
        })
        .map(str::to_owned)
        .unwrap_or_else(|| body.trim().to_owned())
}
