//! Lazily provisioned, memoized index handles.

use super::{IndexProvider, IndexSpec, Metric, VectorIndex};
use crate::config::IndexSettings;
use crate::error::{Result, VidragError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

/// Hands out index handles, creating missing indexes on first access.
///
/// The list/create check runs at most once per index name for the lifetime
/// of the gateway. Concurrent first accesses to the same name are serialized.
pub struct IndexGateway {
    provider: Arc<dyn IndexProvider>,
    dimension: usize,
    metric: Metric,
    cloud: String,
    region: String,
    handles: Mutex<HashMap<String, Arc<dyn VectorIndex>>>,
}

impl IndexGateway {
    /// Create a gateway that provisions indexes with the given parameters.
    pub fn new(
        provider: Arc<dyn IndexProvider>,
        dimension: usize,
        metric: Metric,
        cloud: &str,
        region: &str,
    ) -> Self {
        Self {
            provider,
            dimension,
            metric,
            cloud: cloud.to_string(),
            region: region.to_string(),
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Create a gateway from index settings.
    pub fn from_settings(provider: Arc<dyn IndexProvider>, settings: &IndexSettings) -> Self {
        Self::new(
            provider,
            settings.dimension,
            settings.metric,
            &settings.cloud,
            &settings.region,
        )
    }

    /// Return the handle for `name`, creating the index if it does not exist.
    #[instrument(skip(self))]
    pub async fn get_or_create_index(&self, name: &str) -> Result<Arc<dyn VectorIndex>> {
        let mut handles = self.handles.lock().await;
        if let Some(handle) = handles.get(name) {
            return Ok(handle.clone());
        }

        let existing = self.provider.list_indexes().await.map_err(provisioning)?;

        if existing.iter().any(|n| n == name) {
            debug!("Reusing existing index '{}'", name);
        } else {
            info!(
                "Creating index '{}' ({} dims, {}), there are no videos in it yet",
                name, self.dimension, self.metric
            );
            let spec = IndexSpec {
                name: name.to_string(),
                dimension: self.dimension,
                metric: self.metric,
                cloud: self.cloud.clone(),
                region: self.region.clone(),
            };
            self.provider.create_index(&spec).await.map_err(provisioning)?;
        }

        let handle = self.provider.open_index(name).await.map_err(provisioning)?;
        handles.insert(name.to_string(), handle.clone());
        Ok(handle)
    }
}

fn provisioning(e: VidragError) -> VidragError {
    match e {
        VidragError::IndexProvisioning(_) => e,
        other => VidragError::IndexProvisioning(other.to_string()),
    }
}
