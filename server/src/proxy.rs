use std::sync::Arc;

use async_trait::async_trait;
use miette::Diagnostic;
use nlu::{DetectIntentResponse, NluError};
use shared::ChatReply;
use thiserror::Error;

/// The outbound half of the proxy: one `detectIntent` call per exchange.
#[async_trait]
pub trait IntentDetector: Send + Sync {
    async fn detect_intent(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<DetectIntentResponse, NluError>;
}

#[async_trait]
impl IntentDetector for nlu::Client {
    async fn detect_intent(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<DetectIntentResponse, NluError> {
        nlu::Client::detect_intent(self, session_id, text).await
    }
}

#[derive(Error, Diagnostic, Debug)]
pub enum ProxyError {
    #[error("utterance is empty")]
    #[diagnostic(code(server::proxy::validation))]
    Validation,

    #[error("NLU client is not configured: {0}")]
    #[diagnostic(
        code(server::proxy::configuration),
        help("set DF_CLIENT_EMAIL, DF_PRIVATE_KEY and DF_PROJECT_ID")
    )]
    Configuration(String),

    #[error(transparent)]
    #[diagnostic(code(server::proxy::upstream))]
    Upstream(#[from] NluError),
}

enum Backend {
    Ready(Arc<dyn IntentDetector>),
    Misconfigured(String),
}

pub struct ProxyAdapter {
    backend: Backend,
}

impl ProxyAdapter {
    pub fn new(detector: Arc<dyn IntentDetector>) -> Self {
        Self {
            backend: Backend::Ready(detector),
        }
    }

    /// An adapter that answers every exchange with a configuration error.
    pub fn misconfigured(reason: impl Into<String>) -> Self {
        Self {
            backend: Backend::Misconfigured(reason.into()),
        }
    }

    pub fn from_config(config: Result<nlu::Config, nlu::ConfigError>) -> Self {
        match config.and_then(|config| {
            let client = config.client()?;
            tracing::info!(project = config.project_id(), "NLU client configured");
            Ok(client)
        }) {
            Ok(client) => Self::new(Arc::new(client)),
            Err(err) => {
                tracing::warn!(error = %err, "NLU client unavailable, proxy calls will fail");
                Self::misconfigured(err.to_string())
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self.backend, Backend::Ready(_))
    }

    pub async fn exchange(
        &self,
        utterance: &str,
        session_id: Option<String>,
    ) -> Result<ChatReply, ProxyError> {
        let text = utterance.trim();
        if text.is_empty() {
            return Err(ProxyError::Validation);
        }

        let detector = match &self.backend {
            Backend::Ready(detector) => detector,
            Backend::Misconfigured(reason) => {
                return Err(ProxyError::Configuration(reason.clone()))
            }
        };

        let session_id = session_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(shared::session::new_session_id);

        let response = detector.detect_intent(&session_id, text).await?;
        let reply = response.query_result.unwrap_or_default().reply();

        tracing::info!(intent = %reply.intent, session = %session_id, "exchange complete");

        Ok(ChatReply {
            reply: reply.text,
            intent: reply.intent,
            payload: reply.payload,
            session_id,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use nlu::{Intent, Message, QueryResult};
    use serde_json::json;

    use super::*;

    /// Records every call and answers with a canned response.
    #[derive(Default)]
    pub(crate) struct StubDetector {
        pub calls: Mutex<Vec<(String, String)>>,
        pub response: Option<DetectIntentResponse>,
        pub fail: bool,
    }

    impl StubDetector {
        pub fn answering(query_result: QueryResult) -> Self {
            Self {
                response: Some(DetectIntentResponse {
                    response_id: Some("resp-1".into()),
                    query_result: Some(query_result),
                }),
                ..Default::default()
            }
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl IntentDetector for StubDetector {
        async fn detect_intent(
            &self,
            session_id: &str,
            text: &str,
        ) -> Result<DetectIntentResponse, NluError> {
            self.calls
                .lock()
                .unwrap()
                .push((session_id.to_owned(), text.to_owned()));

            if self.fail {
                return Err(NluError::InvalidToken);
            }

            Ok(self.response.clone().unwrap_or_default())
        }
    }

    pub(crate) fn services_result() -> QueryResult {
        QueryResult {
            query_text: Some("What services do you offer?".into()),
            fulfillment_text: Some("legacy".into()),
            fulfillment_messages: vec![
                Message::text(["We offer...".to_owned()]),
                Message::payload(json!({ "buttons": [{ "title": "AI / ML Solutions" }] })),
            ],
            intent: Some(Intent {
                display_name: Some("company_services".into()),
            }),
        }
    }

    #[tokio::test]
    async fn normalizes_the_reply() {
        let detector = Arc::new(StubDetector::answering(services_result()));
        let adapter = ProxyAdapter::new(detector.clone());

        let reply = adapter
            .exchange("  What services do you offer?  ", Some("abc".into()))
            .await
            .unwrap();

        assert_eq!(reply.reply, "We offer...");
        assert_eq!(reply.intent, "company_services");
        assert_eq!(
            reply.payload,
            Some(json!({ "buttons": [{ "title": "AI / ML Solutions" }] }))
        );
        assert_eq!(reply.session_id, "abc");
        assert_eq!(
            detector.calls.lock().unwrap()[0],
            ("abc".to_owned(), "What services do you offer?".to_owned())
        );
    }

    #[tokio::test]
    async fn blank_utterance_never_reaches_the_detector() {
        let detector = Arc::new(StubDetector::answering(services_result()));
        let adapter = ProxyAdapter::new(detector.clone());

        let err = adapter.exchange(" \t\n", None).await.unwrap_err();

        assert!(matches!(err, ProxyError::Validation));
        assert_eq!(detector.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_session_is_generated() {
        let detector = Arc::new(StubDetector::answering(services_result()));
        let adapter = ProxyAdapter::new(detector.clone());

        let first = adapter.exchange("hi", None).await.unwrap();
        let second = adapter.exchange("hi", Some("   ".into())).await.unwrap();

        assert!(uuid::Uuid::parse_str(&first.session_id).is_ok());
        assert!(uuid::Uuid::parse_str(&second.session_id).is_ok());
        assert_ne!(first.session_id, second.session_id);
    }

    #[tokio::test]
    async fn missing_query_result_is_an_empty_reply() {
        let detector = Arc::new(StubDetector::default());
        let adapter = ProxyAdapter::new(detector);

        let reply = adapter.exchange("hi", Some("s".into())).await.unwrap();

        assert_eq!(reply.reply, "");
        assert_eq!(reply.intent, "");
        assert_eq!(reply.payload, None);
    }

    #[tokio::test]
    async fn misconfigured_adapter_fails_before_calling_out() {
        let adapter = ProxyAdapter::misconfigured("missing DF_PRIVATE_KEY");

        let err = adapter.exchange("hi", None).await.unwrap_err();

        assert!(!adapter.is_configured());
        assert!(matches!(err, ProxyError::Configuration(ref reason) if reason.contains("DF_PRIVATE_KEY")));
    }

    #[tokio::test]
    async fn validation_runs_before_the_configuration_check() {
        let adapter = ProxyAdapter::misconfigured("missing DF_PRIVATE_KEY");

        let err = adapter.exchange("", None).await.unwrap_err();

        assert!(matches!(err, ProxyError::Validation));
    }

    #[tokio::test]
    async fn upstream_failures_are_wrapped() {
        let adapter = ProxyAdapter::new(Arc::new(StubDetector::failing()));

        let err = adapter.exchange("hi", None).await.unwrap_err();

        assert!(matches!(err, ProxyError::Upstream(NluError::InvalidToken)));
    }

    #[test]
    fn config_errors_make_a_misconfigured_adapter() {
        let adapter = ProxyAdapter::from_config(Err(nlu::ConfigError::Missing("DF_CLIENT_EMAIL")));

        assert!(!adapter.is_configured());
    }
}
