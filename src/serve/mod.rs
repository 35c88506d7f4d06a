/// Local emulator of the API's HTTP surface
///
/// `GET /source` runs the configured handler the way the API integration would;
/// every other path is served from the static directory.
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, Method, StatusCode, Uri},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::path::Path;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::handler::HandlerVariant;
use crate::scenario::api_gateway::SOURCE_PATH;

async fn invoke_handler(
    State(variant): State<HandlerVariant>,
    method: Method,
    uri: Uri,
) -> impl IntoResponse {
    let event = serde_json::json!({
        "httpMethod": method.as_str(),
        "path": uri.path(),
    });
    let response = variant.invoke(&event);
    debug!("{} handler answered {}", variant, response.status_code);

    let status = StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::BAD_GATEWAY);
    (status, [(header::CONTENT_TYPE, "application/json")], response.body)
}

/// Router mirroring the declared route table
pub fn router(variant: HandlerVariant, static_dir: &Path) -> Router {
    Router::new()
        .route(SOURCE_PATH, get(invoke_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(variant)
}

/// Serve until the process is interrupted
pub async fn serve(addr: SocketAddr, variant: HandlerVariant, static_dir: &Path) -> Result<()> {
    if !static_dir.is_dir() {
        anyhow::bail!("Static directory not found: {}", static_dir.display());
    }

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(
        "Serving {} handler on http://{}{} and {} on /",
        variant,
        listener.local_addr()?,
        SOURCE_PATH,
        static_dir.display()
    );

    axum::serve(listener, router(variant, static_dir))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("Local API server failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{hello::HelloBody, joke::JokeBody, HELLO_MESSAGE, JOKES};

    async fn spawn(variant: HandlerVariant, static_dir: &Path) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(variant, static_dir);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn test_source_route_runs_handler() {
        let dir = tempfile::tempdir().unwrap();
        let addr = spawn(HandlerVariant::Hello, dir.path()).await;

        let response = reqwest::get(format!("http://{}/source", addr)).await.unwrap();
        assert_eq!(response.status(), 200);

        let body: HelloBody = response.json().await.unwrap();
        assert_eq!(body.message, HELLO_MESSAGE);
    }

    #[tokio::test]
    async fn test_joke_variant() {
        let dir = tempfile::tempdir().unwrap();
        let addr = spawn(HandlerVariant::Joke, dir.path()).await;

        let body: JokeBody = reqwest::get(format!("http://{}/source", addr))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(JOKES.contains(&body.joke.as_str()));
    }

    #[tokio::test]
    async fn test_root_serves_static_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>static</h1>").unwrap();
        let addr = spawn(HandlerVariant::Hello, dir.path()).await;

        let response = reqwest::get(format!("http://{}/", addr)).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "<h1>static</h1>");

        let missing = reqwest::get(format!("http://{}/nope.txt", addr)).await.unwrap();
        assert_eq!(missing.status(), 404);
    }

    #[tokio::test]
    async fn test_missing_static_dir_rejected() {
        let err = serve(
            "127.0.0.1:0".parse().unwrap(),
            HandlerVariant::Hello,
            Path::new("/definitely/not/here"),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Static directory not found"));
    }
}
