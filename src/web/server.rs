use std::sync::Arc;
use axum::{
    Router,
    extract::{Query, Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::get,
};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{info, warn, error};

use crate::config::Config;
use crate::error::PersonaError;
use crate::persona::{PersonaResolver, PersonalityRequest};

/// HTTP front of the personality lookup
pub struct WebServer {
    resolver: Arc<PersonaResolver>,
    config: Arc<Config>,
}

#[derive(Clone)]
struct AppState {
    resolver: Arc<PersonaResolver>,
}

impl WebServer {
    pub fn new(resolver: Arc<PersonaResolver>, config: Arc<Config>) -> Self {
        Self { resolver, config }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let addr = format!("{}:{}", self.config.listen.address, self.config.listen.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("🌐 Listening on http://{}", addr);

        axum::serve(listener, router(self.resolver.clone())).await?;
        Ok(())
    }
}

/// Routes plus the CORS headers every response carries
pub fn router(resolver: Arc<PersonaResolver>) -> Router {
    let state = AppState { resolver };

    Router::new()
        .route(
            "/get-personality",
            get(get_personality).fallback(not_found),
        )
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn(method_gate))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, PUT, DELETE"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
}

/// OPTIONS on any path is a browser pre-flight: 204, no body.
/// HEAD is not GET here, even though axum's `get` would answer it.
async fn method_gate(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return StatusCode::NO_CONTENT.into_response();
    }
    if request.method() == Method::HEAD {
        return not_found().await.into_response();
    }
    next.run(request).await
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}

/// GET /get-personality?name=..&sub1=..&sub2=..&sub3=..
async fn get_personality(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let params = PersonalityRequest::from_pairs(pairs);
    match state.resolver.resolve(&params).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => {
            match &e {
                PersonaError::GradeLookup(cause) | PersonaError::TraitLookup(cause) => {
                    error!("{} ({})", e.public_message(), cause);
                }
                _ => warn!("Rejected personality request: {}", e),
            }
            e.into_response()
        }
    }
}
