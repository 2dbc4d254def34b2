use std::path::Path;
use std::sync::Arc;

use axum::handler::Handler;
use axum::http::Method;
use axum::routing::{get, post, MethodRouter};
use axum::Router;
use shared::{MESSAGE_ROUTE, SUGGESTIONS_ROUTE};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::intents::IntentTable;
use crate::proxy::ProxyAdapter;
use crate::{rpc, webhook};

pub const WEBHOOK_ROUTE: &str = "/webhook";
/// Where the widget used to reach the serverless proxy.
pub const NETLIFY_ROUTE: &str = "/.netlify/functions/dialogflow";

#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<ProxyAdapter>,
    pub intents: Arc<IntentTable>,
    pub webhook_secret: Option<Arc<str>>,
    pub suggestions: Arc<Vec<String>>,
}

pub fn app(state: AppState, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route(MESSAGE_ROUTE, post(rpc::send_message))
        .route(NETLIFY_ROUTE, post(rpc::send_message))
        .route(SUGGESTIONS_ROUTE, get(rpc::suggestions))
        .route(WEBHOOK_ROUTE, webhook_route(webhook::fulfill))
        .with_state(state);

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router.layer(TraceLayer::new_for_http()).layer(cors)
}

/// A panicking fulfillment still answers 200 with the internal-error text.
fn webhook_route<H, T>(handler: H) -> MethodRouter<AppState>
where
    H: Handler<T, AppState>,
    T: 'static,
{
    post(handler).layer(CatchPanicLayer::custom(webhook::internal_error_response))
}
