//! Policy for side effects that must never fail the enclosing operation

use std::future::Future;

use uuid::Uuid;

use crate::external::AdapterError;

/// Runs non-critical adapter calls: failures are logged and become `None`
#[derive(Debug, Clone, Copy, Default)]
pub struct BestEffort;

impl BestEffort {
    pub async fn run<T, F>(&self, effect: &'static str, subject: Uuid, future: F) -> Option<T>
    where
        F: Future<Output = Result<T, AdapterError>>,
    {
        match future.await {
            Ok(value) => Some(value),
            Err(AdapterError::Unconfigured(service)) => {
                tracing::debug!(effect, %subject, service, "Skipped effect, service not configured");
                None
            }
            Err(error) => {
                tracing::warn!(effect, %subject, %error, "Non-critical effect failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn success_passes_value_through() {
        let value = BestEffort
            .run("test", Uuid::nil(), async { Ok::<_, AdapterError>(7) })
            .await;
        assert_eq!(value, Some(7));
    }

    #[tokio::test]
    async fn failure_is_absorbed() {
        let value: Option<u8> = BestEffort
            .run("test", Uuid::nil(), async {
                Err(AdapterError::transport("ledger", "connection refused"))
            })
            .await;
        assert_eq!(value, None);
    }
}
