use crate::dto::HealthRes;
use odyssey_core::DocumentStore;

/// Health checks shared by the REST server and the CLI.
///
/// Reports whether the process is up and whether the document store answers a ping.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    /// Creates a new instance of HealthService.
    pub fn new() -> Self {
        Self
    }

    /// Pings the store and reports the result.
    ///
    /// # Arguments
    /// * `store` - The document store handle shared by the services.
    ///
    /// # Returns
    /// A `HealthRes` with `ok` set to `false` if the store did not answer. The store error is
    /// logged, not returned.
    pub async fn check_health(store: &dyn DocumentStore) -> HealthRes {
        match store.ping().await {
            Ok(()) => HealthRes {
                ok: true,
                message: "Odyssey is alive".into(),
            },
            Err(e) => {
                tracing::error!("health check ping failed: {e}");
                HealthRes {
                    ok: false,
                    message: "Document store unavailable".into(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use odyssey_core::store::MemoryStore;

    #[tokio::test]
    async fn memory_store_is_healthy() {
        let res = HealthService::check_health(&MemoryStore::new()).await;
        assert!(res.ok);
        assert_eq!(res.message, "Odyssey is alive");
    }
}
