/// Post-deploy check of the API's routes
use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::handler::hello::HelloBody;
use crate::handler::joke::JokeBody;
use crate::handler::{HandlerVariant, HELLO_MESSAGE, JOKES};
use crate::utils::polling::PollingConfig;

/// `<base>/source`, tolerating a base URL with or without a trailing slash
pub fn source_url(base: &str) -> Result<Url> {
    let mut base = Url::parse(base).with_context(|| format!("Invalid API url: {}", base))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("source").context("Failed to build /source url")
}

/// Identify which handler produced `body`, rejecting anything else
pub fn identify_body(body: &str) -> Result<HandlerVariant> {
    if let Ok(hello) = serde_json::from_str::<HelloBody>(body) {
        if hello.message == HELLO_MESSAGE {
            return Ok(HandlerVariant::Hello);
        }
    }
    if let Ok(joke) = serde_json::from_str::<JokeBody>(body) {
        if JOKES.contains(&joke.joke.as_str())
            && chrono::DateTime::parse_from_rfc3339(&joke.timestamp).is_ok()
        {
            return Ok(HandlerVariant::Joke);
        }
    }
    anyhow::bail!("Unexpected response body: {}", body)
}

/// Poll `GET <base>/source` until it answers 200 and check the body
pub async fn check(base: &str, polling: &PollingConfig) -> Result<HandlerVariant> {
    let url = source_url(base)?;
    let client = Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("Failed to create HTTP client")?;

    let body = polling
        .poll(|| async {
            match client.get(url.clone()).send().await {
                Ok(response) if response.status() == StatusCode::OK => response
                    .text()
                    .await
                    .map(Some)
                    .context("Failed to read response body"),
                Ok(response) => {
                    debug!("{} answered {}", url, response.status());
                    Ok(None)
                }
                Err(e) => {
                    debug!("{} not reachable yet: {}", url, e);
                    Ok(None)
                }
            }
        })
        .await?;

    identify_body(&body)
}

/// Poll `GET <base>` until the static route answers with a success status
pub async fn check_static(base: &str, polling: &PollingConfig) -> Result<()> {
    let url = Url::parse(base).with_context(|| format!("Invalid API url: {}", base))?;
    let client = Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("Failed to create HTTP client")?;

    polling
        .poll_until(|| async {
            match client.get(url.clone()).send().await {
                Ok(response) => Ok(response.status().is_success()),
                Err(e) => {
                    debug!("{} not reachable yet: {}", url, e);
                    Ok(false)
                }
            }
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serve::router;
    use tokio::net::TcpListener;

    #[test]
    fn test_source_url_joins() {
        assert_eq!(
            source_url("https://abc.execute-api.us-east-1.amazonaws.com/stage/")
                .unwrap()
                .as_str(),
            "https://abc.execute-api.us-east-1.amazonaws.com/stage/source"
        );
        assert_eq!(
            source_url("https://abc.execute-api.us-east-1.amazonaws.com/stage")
                .unwrap()
                .as_str(),
            "https://abc.execute-api.us-east-1.amazonaws.com/stage/source"
        );
        assert!(source_url("not a url").is_err());
    }

    #[test]
    fn test_identify_body() {
        let hello = crate::handler::hello::handle();
        assert_eq!(identify_body(&hello.body).unwrap(), HandlerVariant::Hello);

        let joke = crate::handler::joke::handle();
        assert_eq!(identify_body(&joke.body).unwrap(), HandlerVariant::Joke);

        assert!(identify_body(r#"{"message":"something else"}"#).is_err());
        assert!(identify_body(r#"{"joke":"not on the list","timestamp":"2024-01-01T00:00:00Z"}"#).is_err());
    }

    #[tokio::test]
    async fn test_check_against_local_emulator() {
        let dir = tempfile::tempdir().unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(HandlerVariant::Joke, dir.path());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let polling = PollingConfig::new(
            Duration::from_secs(5),
            Duration::from_millis(50),
            "Waiting for local API",
        );
        let variant = check(&format!("http://{}/", addr), &polling).await.unwrap();
        assert_eq!(variant, HandlerVariant::Joke);
    }

    #[tokio::test]
    async fn test_check_static_root() {
        let dir = tempfile::tempdir().unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(HandlerVariant::Hello, dir.path());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let polling = PollingConfig::new(
            Duration::from_millis(300),
            Duration::from_millis(50),
            "Waiting for static root",
        );
        let base = format!("http://{}/", addr);

        // Nothing to serve yet
        assert!(check_static(&base, &polling).await.is_err());

        std::fs::write(dir.path().join("index.html"), "<h1>hi</h1>").unwrap();
        check_static(&base, &polling).await.unwrap();
    }

    #[tokio::test]
    async fn test_check_times_out_on_dead_endpoint() {
        // Reserve a port, then free it so nothing is listening
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let polling = PollingConfig::new(
            Duration::from_millis(200),
            Duration::from_millis(50),
            "Waiting for dead API",
        );

        let result = check(&format!("http://{}", addr), &polling).await;
        assert!(result.unwrap_err().to_string().contains("Timeout"));
    }
}
