//! Collection -> region lookup through the global catalog

use crate::auth::Authenticator;
use crate::client::{check_status, decode, join_segments, Operation};
use crate::error::{Error, Result};
use crate::models::{Collection, DataEnvelope};
use crate::region::Region;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Finds and remembers which region hosts a collection.
///
/// A collection never moves once created, so entries are never invalidated.
pub struct LocationResolver {
    auth: Arc<Authenticator>,
    catalog_url: String,
    cache: Mutex<HashMap<String, Region>>,
}

impl LocationResolver {
    pub fn new(auth: Arc<Authenticator>, catalog_url: impl Into<String>) -> Self {
        Self {
            auth,
            catalog_url: catalog_url.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, collection_id: &str) -> Option<Region> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(collection_id)
            .copied()
    }

    /// Record a known location, e.g. one returned by a create or list call
    pub fn remember(&self, collection_id: impl Into<String>, region: Region) {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(collection_id.into())
            .or_insert(region);
    }

    /// Region hosting `collection_id`; only a cache miss hits the network
    pub async fn resolve(&self, collection_id: &str) -> Result<Region> {
        if let Some(region) = self.cached(collection_id) {
            tracing::debug!(collection_id, %region, "location cache hit");
            return Ok(region);
        }

        tracing::debug!(collection_id, "location cache miss, querying global catalog");
        let url = join_segments(&self.catalog_url, &[collection_id])?;
        let response = self.auth.execute(|http| http.get(&url)).await?;
        let envelope: DataEnvelope<Collection> =
            decode(check_status(response, Operation::Read).await?).await?;

        let location = envelope.data.location.ok_or_else(|| {
            Error::UnknownRegion(format!("no location reported for collection {}", collection_id))
        })?;
        let region: Region = location.parse()?;

        self.remember(collection_id, region);
        Ok(region)
    }
}
