use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use shared::{ChatReply, ChatRequest, SuggestionsResponse};

use crate::error::ApiError;
use crate::routes::AppState;

pub async fn send_message(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ChatReply>, ApiError> {
    // Any content type is accepted.
    let body: ChatRequest = serde_json::from_slice(&body)
        .map_err(|err| ApiError::BadRequest(format!("Invalid JSON body: {err}")))?;

    let reply = state.proxy.exchange(&body.text, body.session_id).await?;

    Ok(Json(reply))
}

pub async fn suggestions(State(state): State<AppState>) -> Json<SuggestionsResponse> {
    Json(SuggestionsResponse::from(state.suggestions.as_ref().clone()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use shared::{MESSAGE_ROUTE, SUGGESTIONS_ROUTE};
    use tower::ServiceExt;

    use super::*;
    use crate::intents::IntentTable;
    use crate::proxy::tests::{services_result, StubDetector};
    use crate::proxy::ProxyAdapter;
    use crate::routes::{app, NETLIFY_ROUTE};

    fn router(proxy: ProxyAdapter) -> Router {
        app(
            AppState {
                proxy: Arc::new(proxy),
                intents: Arc::new(IntentTable::builtin()),
                webhook_secret: None,
                suggestions: Arc::new(vec!["Pricing".into(), "Contact support".into()]),
            },
            None,
        )
    }

    async fn post_json(router: Router, route: &str, body: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(
                Request::post(route)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_owned()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn message_is_proxied_and_session_echoed() {
        let detector = Arc::new(StubDetector::answering(services_result()));
        let router = router(ProxyAdapter::new(detector.clone()));

        let (status, body) = post_json(
            router,
            MESSAGE_ROUTE,
            r#"{"text":"What services do you offer?","sessionId":"abc"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "reply": "We offer...",
                "intent": "company_services",
                "payload": { "buttons": [{ "title": "AI / ML Solutions" }] },
                "sessionId": "abc"
            })
        );
        assert_eq!(detector.call_count(), 1);
    }

    #[tokio::test]
    async fn netlify_alias_reaches_the_same_handler() {
        let detector = Arc::new(StubDetector::answering(services_result()));
        let router = router(ProxyAdapter::new(detector));

        let (status, body) = post_json(router, NETLIFY_ROUTE, r#"{"text":"hi"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert!(uuid::Uuid::parse_str(body["sessionId"].as_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn empty_text_is_a_bad_request() {
        let detector = Arc::new(StubDetector::answering(services_result()));
        let router = router(ProxyAdapter::new(detector.clone()));

        let (status, body) = post_json(router, MESSAGE_ROUTE, r#"{"text":"   "}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Missing \"text\" in request body" }));
        assert_eq!(detector.call_count(), 0);
    }

    #[tokio::test]
    async fn invalid_json_is_a_bad_request() {
        let (status, body) = post_json(
            router(ProxyAdapter::misconfigured("unused")),
            MESSAGE_ROUTE,
            "{ nope",
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn body_is_accepted_without_a_json_content_type() {
        let detector = Arc::new(StubDetector::answering(services_result()));
        let response = router(ProxyAdapter::new(detector.clone()))
            .oneshot(
                Request::post(NETLIFY_ROUTE)
                    .body(Body::from(r#"{"text":"hi","sessionId":"abc"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["reply"], "We offer...");
        assert_eq!(body["sessionId"], "abc");
        assert_eq!(detector.call_count(), 1);
    }

    #[tokio::test]
    async fn missing_credentials_answer_with_the_generic_message() {
        let (status, body) = post_json(
            router(ProxyAdapter::misconfigured("missing DF_PRIVATE_KEY")),
            MESSAGE_ROUTE,
            r#"{"text":"hi"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({ "error": "Server misconfigured: missing Dialogflow credentials" })
        );
    }

    #[tokio::test]
    async fn upstream_failure_is_a_server_error() {
        let (status, body) = post_json(
            router(ProxyAdapter::new(Arc::new(StubDetector::failing()))),
            MESSAGE_ROUTE,
            r#"{"text":"hi"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Failed to reach the language service" }));
    }

    #[tokio::test]
    async fn suggestions_come_from_configuration() {
        let response = router(ProxyAdapter::misconfigured("unused"))
            .oneshot(
                Request::get(SUGGESTIONS_ROUTE)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "suggestions": ["Pricing", "Contact support"] }));
    }
}
