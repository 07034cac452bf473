//! Lazily-created, authenticated client handles.
//!
//! A [`ClientFactory`] turns credentials into a connected [`CoziApi`], the
//! same way a provider turns an API key into a client. A [`ClientHandle`]
//! caches the first successful connection for the lifetime of its owner (the
//! process-scoped server, or one hosted session).

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::api::CoziClient;
use crate::client::{CoziApi, CoziError};
use crate::config::{Config, Credentials};

/// Factory for authenticated client handles.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Create a client and authenticate it with `credentials`.
    async fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn CoziApi>, CoziError>;
}

/// Connects [`CoziClient`]s to the REST API.
#[derive(Debug, Clone)]
pub struct RestClientFactory {
    config: Config,
}

impl RestClientFactory {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ClientFactory for RestClientFactory {
    async fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn CoziApi>, CoziError> {
        let client = CoziClient::authenticate(
            credentials,
            &self.config.base_url,
            self.config.transport.clone(),
        )
        .await?;
        Ok(Arc::new(client))
    }
}

/// Single-slot cache of an authenticated client.
///
/// Concurrent first callers wait on one initialization. A failed
/// initialization leaves the slot empty, so a later call tries again.
/// Once filled, the slot is never invalidated and only serves callers
/// presenting the credentials it was connected with.
pub struct ClientHandle {
    factory: Arc<dyn ClientFactory>,
    slot: OnceCell<(Credentials, Arc<dyn CoziApi>)>,
}

impl ClientHandle {
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            factory,
            slot: OnceCell::new(),
        }
    }

    /// Return the cached client, connecting with `credentials` on first use.
    pub async fn get(&self, credentials: &Credentials) -> Result<Arc<dyn CoziApi>, CoziError> {
        let (connected_as, client) = self
            .slot
            .get_or_try_init(|| async {
                tracing::info!("Connecting Cozi client for {}", credentials.username());
                let client = self.factory.connect(credentials).await?;
                Ok::<_, CoziError>((credentials.clone(), client))
            })
            .await?;

        if connected_as != credentials {
            tracing::warn!(
                "Rejecting credentials for {}: handle is connected as {}",
                credentials.username(),
                connected_as.username()
            );
            return Err(CoziError::Authentication(
                "credentials differ from the ones this session connected with".to_string(),
            ));
        }
        Ok(Arc::clone(client))
    }

    pub fn is_connected(&self) -> bool {
        self.slot.initialized()
    }
}

impl std::fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientHandle")
            .field("connected", &self.is_connected())
            .finish()
    }
}
