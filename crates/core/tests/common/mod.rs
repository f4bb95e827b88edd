//! Shared wiremock fixtures for byoc-core integration tests

#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use byoc_core::{ClientConfig, Credentials, EndpointRegistry, Region};
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CLIENT_ID: &str = "client-1";
pub const TOKEN_PATH: &str = "/oauth/token";
pub const CATALOG_PATH: &str = "/api/v1/byoc/global";

/// Base URL of the mocked `aws-eu-central-1` deployment
pub fn eu_base(server: &MockServer) -> String {
    format!("{}/eu/api/v1/byoc", server.uri())
}

/// Base URL of the mocked `aws-us-west-2` deployment
pub fn us_base(server: &MockServer) -> String {
    format!("{}/us/api/v1/byoc", server.uri())
}

/// Client configuration pointing every URL at `server`
pub fn config(server: &MockServer, token_dir: &Path) -> ClientConfig {
    let endpoints = EndpointRegistry::empty()
        .with_endpoint(Region::AwsEuCentral1, eu_base(server))
        .with_endpoint(Region::AwsUsWest2, us_base(server));

    ClientConfig::new(Credentials::new(CLIENT_ID, "secret"))
        .expect("home directory available")
        .with_token_url(format!("{}{}", server.uri(), TOKEN_PATH))
        .with_catalog_url(format!("{}{}", server.uri(), CATALOG_PATH))
        .with_endpoints(endpoints)
        .with_timeout(Duration::from_secs(5))
        .with_page_delay(Duration::ZERO)
        .with_token_dir(token_dir)
}

pub fn token_body(access_token: &str) -> Value {
    json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": 3600,
    })
}

/// Token endpoint answering every exchange with `access_token`
pub async fn mount_token(server: &MockServer, access_token: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains(format!("client_id={}", CLIENT_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(access_token)))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Global catalog entry placing `collection_id` in `location`
pub async fn mount_location(
    server: &MockServer,
    collection_id: &str,
    location: &str,
    expected_calls: u64,
) {
    Mock::given(method("GET"))
        .and(path(format!("{}/{}", CATALOG_PATH, collection_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"id": collection_id, "name": "test", "location": location}
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

pub fn tile(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "path": format!("tiles/{}/(BAND).tif", id),
        "status": status,
    })
}
