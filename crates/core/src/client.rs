//! Catalog client for BYOC collections and tiles
//!
//! Every collection- or tile-scoped call first resolves the region hosting
//! the collection, then talks to that region's endpoint.

use crate::auth::Authenticator;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::location::LocationResolver;
use crate::models::{Collection, DataEnvelope, NewCollection, NewTile, Page, PageEnvelope, Tile};
use crate::pager::TilePager;
use crate::region::{EndpointRegistry, Region};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// What kind of call produced a response; only creates map 4xx to validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    Read,
    Create,
}

/// Authenticated, region-aware BYOC client
pub struct CatalogClient {
    auth: Arc<Authenticator>,
    resolver: LocationResolver,
    endpoints: EndpointRegistry,
    catalog_url: String,
    page_delay: Duration,
}

impl CatalogClient {
    /// Authenticate and build a client
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("byoc/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::HttpClient(e.to_string()))?;
        Self::with_http_client(http, config).await
    }

    /// Authenticate using a caller-provided HTTP client
    pub async fn with_http_client(http: Client, config: ClientConfig) -> Result<Self> {
        let auth = Arc::new(Authenticator::new(http, &config).await?);
        let resolver = LocationResolver::new(Arc::clone(&auth), config.catalog_url.clone());

        Ok(Self {
            auth,
            resolver,
            endpoints: config.endpoints,
            catalog_url: config.catalog_url,
            page_delay: config.page_delay,
        })
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.auth
    }

    /// Region hosting a collection
    pub async fn resolve(&self, collection_id: &str) -> Result<Region> {
        self.resolver.resolve(collection_id).await
    }

    /// All collections visible to the client, across regions
    pub async fn list_collections(&self) -> Result<Vec<Collection>> {
        let url = self.catalog_url.clone();
        let collections: Vec<Collection> = self.get(&url).await?;

        for collection in &collections {
            if let Some(Ok(region)) = collection.location.as_deref().map(str::parse::<Region>) {
                self.resolver.remember(collection.id.clone(), region);
            }
        }
        Ok(collections)
    }

    /// Create a collection in `region`
    pub async fn create_collection(
        &self,
        region: Region,
        collection: &NewCollection,
    ) -> Result<Collection> {
        let url = join_segments(self.endpoints.base_url(region)?, &["collections"])?;
        let response = self
            .auth
            .execute(|http| http.post(&url).json(collection))
            .await?;
        let created: DataEnvelope<Collection> =
            decode(check_status(response, Operation::Create).await?).await?;

        tracing::debug!(collection_id = %created.data.id, %region, "collection created");
        self.resolver.remember(created.data.id.clone(), region);
        Ok(created.data)
    }

    pub async fn get_collection(&self, collection_id: &str) -> Result<Collection> {
        let url = self.collection_url(collection_id, &[]).await?;
        self.get(&url).await
    }

    /// Delete a collection; [`Error::NotFound`] when it is already gone
    pub async fn delete_collection(&self, collection_id: &str) -> Result<()> {
        let url = self.collection_url(collection_id, &[]).await?;
        self.delete(&url).await
    }

    /// Register a tile of a collection for ingestion
    pub async fn create_tile(&self, collection_id: &str, tile: &NewTile) -> Result<Tile> {
        let url = self.collection_url(collection_id, &["tiles"]).await?;
        let response = self.auth.execute(|http| http.post(&url).json(tile)).await?;
        let created: DataEnvelope<Tile> =
            decode(check_status(response, Operation::Create).await?).await?;
        Ok(created.data)
    }

    pub async fn get_tile(&self, collection_id: &str, tile_id: &str) -> Result<Tile> {
        let url = self.collection_url(collection_id, &["tiles", tile_id]).await?;
        self.get(&url).await
    }

    pub async fn delete_tile(&self, collection_id: &str, tile_id: &str) -> Result<()> {
        let url = self.collection_url(collection_id, &["tiles", tile_id]).await?;
        self.delete(&url).await
    }

    /// Lazily page through the tiles of a collection.
    ///
    /// The region is resolved here, once; pages are fetched only as the
    /// returned pager is pulled.
    pub async fn list_tiles(&self, collection_id: &str) -> Result<TilePager<'_>> {
        let url = self.collection_url(collection_id, &["tiles"]).await?;
        Ok(TilePager::new(self, url, self.page_delay))
    }

    /// Fetch one page of tiles from an absolute URL
    pub async fn fetch_page(&self, url: &str) -> Result<Page> {
        let response = self.auth.execute(|http| http.get(url)).await?;
        let envelope: PageEnvelope<Tile> =
            decode(check_status(response, Operation::Read).await?).await?;
        Ok(envelope.into())
    }

    /// `{region_base}/collections/{collection_id}/{rest..}`
    async fn collection_url(&self, collection_id: &str, rest: &[&str]) -> Result<String> {
        let region = self.resolver.resolve(collection_id).await?;
        let mut segments = vec!["collections", collection_id];
        segments.extend_from_slice(rest);
        join_segments(self.endpoints.base_url(region)?, &segments)
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.auth.execute(|http| http.get(url)).await?;
        let envelope: DataEnvelope<T> =
            decode(check_status(response, Operation::Read).await?).await?;
        Ok(envelope.data)
    }

    async fn delete(&self, url: &str) -> Result<()> {
        let response = self.auth.execute(|http| http.delete(url)).await?;
        check_status(response, Operation::Read).await?;
        Ok(())
    }
}

/// Append percent-encoded path segments to `base`, so ids containing `/`,
/// `?` or `#` stay a single segment
pub(crate) fn join_segments(base: &str, segments: &[&str]) -> Result<String> {
    let mut url = Url::parse(base)
        .map_err(|e| Error::InvalidInput(format!("Invalid URL '{}': {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| Error::InvalidInput(format!("URL '{}' cannot take a path", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.into())
}

/// Pass 2xx responses through, turn anything else into a typed error
pub(crate) async fn check_status(response: Response, operation: Operation) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(classify(status.as_u16(), url, body, operation))
}

fn classify(status: u16, url: String, body: String, operation: Operation) -> Error {
    match status {
        401 => Error::ExpiredToken,
        404 => Error::NotFound(url),
        400..=499 if operation == Operation::Create => Error::Validation { status, body },
        _ => Error::Upstream { status, body },
    }
}

/// Decode a JSON body, reporting malformed payloads as [`Error::Json`]
pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_read(status: u16) -> Error {
        classify(status, "http://x/collections/c1".to_string(), "body".to_string(), Operation::Read)
    }

    #[test]
    fn test_classify_not_found() {
        assert!(matches!(classify_read(404), Error::NotFound(ref url) if url.ends_with("/c1")));
    }

    #[test]
    fn test_classify_unauthorized() {
        assert!(matches!(classify_read(401), Error::ExpiredToken));
    }

    #[test]
    fn test_classify_client_error_on_read_is_upstream() {
        assert!(matches!(
            classify_read(400),
            Error::Upstream { status: 400, .. }
        ));
    }

    #[test]
    fn test_classify_client_error_on_create_is_validation() {
        let err = classify(
            422,
            "http://x/collections".to_string(),
            "s3Bucket is required".to_string(),
            Operation::Create,
        );
        assert!(matches!(
            err,
            Error::Validation { status: 422, ref body } if body == "s3Bucket is required"
        ));
    }

    #[test]
    fn test_classify_server_error_on_create_is_upstream() {
        let err = classify(502, String::new(), String::new(), Operation::Create);
        assert!(matches!(err, Error::Upstream { status: 502, .. }));
    }

    #[test]
    fn test_join_segments_encodes_ids() {
        let url = join_segments(
            "https://services.sentinel-hub.com/api/v1/byoc",
            &["collections", "a/b?c#d", "tiles", "t 1"],
        )
        .unwrap();
        assert_eq!(
            url,
            "https://services.sentinel-hub.com/api/v1/byoc/collections/a%2Fb%3Fc%23d/tiles/t%201"
        );
    }

    #[test]
    fn test_join_segments_keeps_plain_ids() {
        let url = join_segments("http://127.0.0.1:8080/eu/api/v1/byoc/", &["collections", "c1"]).unwrap();
        assert_eq!(url, "http://127.0.0.1:8080/eu/api/v1/byoc/collections/c1");
    }

    #[test]
    fn test_join_segments_rejects_bad_base() {
        assert!(matches!(
            join_segments("not a url", &["collections"]),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_classify_not_found_on_create() {
        let err = classify(404, "u".to_string(), String::new(), Operation::Create);
        assert!(err.is_not_found());
    }
}
