//! Timeout enforcement.
//!
//! Every phase of a hop runs under a ceiling: dial (inside the connector),
//! TLS handshake, and one overall deadline that covers the exchange and the
//! optional body drain. Elapsed ceilings become [`TransportError::Timeout`].

use std::future::Future;
use std::time::Duration;

use tokio::time::{self, Instant};

use crate::error::TransportError;

/// Run `fut` under a fixed ceiling.
pub async fn with_timeout<F, T>(phase: &'static str, limit: Duration, fut: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout { phase, after: limit }),
    }
}

/// A deadline shared by several sequential steps of one hop.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    /// Deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    /// Run `fut`, failing with the full budget in the error if the deadline hits.
    pub async fn run<F, T>(&self, phase: &'static str, fut: F) -> Result<T, TransportError>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        match time::timeout_at(self.at, fut).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                phase,
                after: self.budget,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ceiling_maps_to_timeout_error() {
        let err = with_timeout("tls handshake", Duration::from_millis(10), async {
            time::sleep(Duration::from_secs(5)).await;
            Ok::<_, TransportError>(())
        })
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            TransportError::Timeout { phase: "tls handshake", .. }
        ));
    }

    #[tokio::test]
    async fn inner_errors_pass_through() {
        let result: Result<(), _> = with_timeout("request", Duration::from_secs(1), async {
            Err(TransportError::Timeout {
                phase: "inner",
                after: Duration::ZERO,
            })
        })
        .await;
        assert!(matches!(result, Err(TransportError::Timeout { phase: "inner", .. })));
    }

    #[tokio::test]
    async fn deadline_is_shared_across_steps() {
        let deadline = Deadline::after(Duration::from_millis(50));
        deadline
            .run("first", async {
                time::sleep(Duration::from_millis(30)).await;
                Ok::<_, TransportError>(())
            })
            .await
            .unwrap();

        assert!(deadline.remaining() <= Duration::from_millis(20));
        let err = deadline
            .run("second", async {
                time::sleep(Duration::from_millis(40)).await;
                Ok::<_, TransportError>(())
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TransportError::Timeout { phase: "second", after } if after == Duration::from_millis(50)
        ));
    }
}
