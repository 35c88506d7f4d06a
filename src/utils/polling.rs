/// Polling until a condition holds or a deadline passes
use anyhow::Result;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Configuration for polling operations
pub struct PollingConfig {
    pub timeout: Duration,
    pub interval: Duration,
    pub description: String,
}

impl PollingConfig {
    pub fn new(timeout: Duration, interval: Duration, description: impl Into<String>) -> Self {
        Self {
            timeout,
            interval,
            description: description.into(),
        }
    }

    pub fn from_secs(timeout_secs: u64, interval_secs: u64, description: impl Into<String>) -> Self {
        Self::new(
            Duration::from_secs(timeout_secs),
            Duration::from_secs(interval_secs),
            description,
        )
    }

    /// Poll until condition is met or timeout
    ///
    /// The condition returns:
    /// - Ok(Some(T)) when met (returns T)
    /// - Ok(None) when not yet met (keeps polling)
    /// - Err(e) on a fatal error (stops polling)
    pub async fn poll<F, Fut, T>(&self, condition: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        info!("{}...", self.description);

        let start = Instant::now();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            if let Some(value) = condition().await? {
                info!("✓ {} ({} attempts)", self.description, attempts);
                return Ok(value);
            }

            if start.elapsed() > self.timeout {
                anyhow::bail!(
                    "Timeout after {} seconds ({} attempts): {}",
                    self.timeout.as_secs(),
                    attempts,
                    self.description
                );
            }

            debug!("{}: attempt {} not ready", self.description, attempts);
            tokio::time::sleep(self.interval).await;
        }
    }

    /// Poll until condition returns Ok(true) or timeout
    pub async fn poll_until<F, Fut>(&self, condition: F) -> Result<()>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        self.poll(|| async { Ok(condition().await?.then_some(())) })
            .await
    }
}
