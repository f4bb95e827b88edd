//! Resource representations exchanged with the collection API

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A bucket-backed collection of tiles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_bucket: Option<String>,
    /// Region identifier of the deployment hosting the collection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_data: Option<Value>,
    /// Fields this client does not model, kept so they survive re-serialization
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One ingested asset of a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensing_time: Option<String>,
    /// Ingestion status, e.g. `INGESTED`, `FAILED`, `WAITING`. Not interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_data: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Tile {
    pub fn has_status(&self, status: &str) -> bool {
        self.status.as_deref() == Some(status)
    }
}

/// Payload of a collection create request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCollection {
    pub name: String,
    pub s3_bucket: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NewCollection {
    pub fn new(name: impl Into<String>, s3_bucket: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            s3_bucket: s3_bucket.into(),
            extra: Map::new(),
        }
    }
}

/// Payload of a tile create request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTile {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensing_time: Option<String>,
}

impl NewTile {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            sensing_time: None,
        }
    }

    pub fn sensing_time(mut self, sensing_time: impl Into<String>) -> Self {
        self.sensing_time = Some(sensing_time.into());
        self
    }
}

/// `{ "data": ... }` wrapper of single-resource and plain list responses
#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    pub data: T,
}

/// `{ "data": [...], "links": { "next": ... } }` wrapper of paginated responses
#[derive(Debug, Deserialize)]
pub(crate) struct PageEnvelope<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub links: Links,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Links {
    #[serde(default)]
    pub next: Option<String>,
}

/// One fetched page of tiles
#[derive(Debug, Clone)]
pub struct Page {
    pub items: Vec<Tile>,
    pub next_cursor: Option<String>,
}

impl From<PageEnvelope<Tile>> for Page {
    fn from(envelope: PageEnvelope<Tile>) -> Self {
        Self {
            items: envelope.data,
            next_cursor: envelope.links.next.filter(|next| !next.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collection_keeps_unknown_fields() {
        let body = json!({
            "id": "c1",
            "name": "Imagery",
            "s3Bucket": "my-bucket",
            "location": "aws-eu-central-1",
            "additionalData": {"bands": {"B1": {}}},
            "userId": "u-42",
        });

        let collection: Collection = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(collection.s3_bucket.as_deref(), Some("my-bucket"));
        assert_eq!(collection.extra["userId"], json!("u-42"));
        assert_eq!(serde_json::to_value(&collection).unwrap(), body);
    }

    #[test]
    fn test_tile_status() {
        let tile: Tile = serde_json::from_value(json!({
            "id": "t1",
            "path": "tiles/t1/(BAND).tif",
            "status": "FAILED",
            "additionalData": {"failedIngestionCause": "no such key"},
        }))
        .unwrap();

        assert!(tile.has_status("FAILED"));
        assert!(!tile.has_status("INGESTED"));
        assert_eq!(tile.sensing_time, None);
    }

    #[test]
    fn test_new_tile_omits_missing_sensing_time() {
        let body = serde_json::to_value(NewTile::new("a/b.tif")).unwrap();
        assert_eq!(body, json!({"path": "a/b.tif"}));

        let body =
            serde_json::to_value(NewTile::new("a/b.tif").sensing_time("2020-01-01T00:00:00Z"))
                .unwrap();
        assert_eq!(body["sensingTime"], json!("2020-01-01T00:00:00Z"));
    }

    #[test]
    fn test_new_collection_body() {
        let body = serde_json::to_value(NewCollection::new("name", "bucket")).unwrap();
        assert_eq!(body, json!({"name": "name", "s3Bucket": "bucket"}));
    }

    #[test]
    fn test_page_without_links_is_last() {
        let envelope: PageEnvelope<Tile> =
            serde_json::from_value(json!({"data": [{"id": "t1"}]})).unwrap();
        let page = Page::from(envelope);
        assert_eq!(page.items.len(), 1);
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn test_page_with_next_link() {
        let envelope: PageEnvelope<Tile> = serde_json::from_value(json!({
            "data": [],
            "links": {"next": "https://example.com/tiles?viewtoken=2", "previous": null},
        }))
        .unwrap();
        assert_eq!(
            Page::from(envelope).next_cursor.as_deref(),
            Some("https://example.com/tiles?viewtoken=2")
        );
    }
}
