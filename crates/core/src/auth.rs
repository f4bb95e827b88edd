//! OAuth2 client-credentials authentication
//!
//! [`Authenticator`] owns the session token. It exchanges credentials once at
//! construction, persists the result through [`TokenStore`], and runs every
//! outgoing request through [`Authenticator::execute`], which replays a
//! request exactly once with a fresh token when the service answers 401.

use crate::config::{ClientConfig, Credentials};
use crate::error::{Error, Result};
use crate::token::{Token, TokenStore};
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tokio::sync::Mutex;

pub struct Authenticator {
    http: Client,
    token_url: String,
    credentials: Credentials,
    store: TokenStore,
    timeout: Duration,
    token: Mutex<Token>,
}

impl Authenticator {
    /// Start a session: load the cached token, exchange credentials for a
    /// fresh one, and cache it if it differs.
    pub async fn new(http: Client, config: &ClientConfig) -> Result<Self> {
        let store = TokenStore::new(&config.token_dir);
        let client_id = config.credentials.client_id.as_str();

        match store.load(client_id)? {
            Some(cached) if !cached.is_expired() => {
                tracing::debug!(client_id, "cached token still valid, exchanging anyway")
            }
            Some(_) => tracing::debug!(client_id, "cached token expired"),
            None => tracing::debug!(client_id, "no cached token"),
        }

        let token = exchange_token(&http, &config.token_url, &config.credentials, config.timeout)
            .await?;
        store.save(client_id, &token)?;

        Ok(Self {
            http,
            token_url: config.token_url.clone(),
            credentials: config.credentials.clone(),
            store,
            timeout: config.timeout,
            token: Mutex::new(token),
        })
    }

    pub fn client_id(&self) -> &str {
        &self.credentials.client_id
    }

    /// Current token, refreshed first if it has expired locally
    pub async fn get_valid_token(&self) -> Result<Token> {
        let mut token = self.token.lock().await;
        if token.is_expired() {
            tracing::info!(client_id = self.client_id(), "token expired, refreshing");
            *token = self.exchange_and_persist().await?;
        }
        Ok(token.clone())
    }

    /// Replace the session token unconditionally
    pub async fn refresh(&self) -> Result<Token> {
        let mut token = self.token.lock().await;
        tracing::info!(client_id = self.client_id(), "refreshing token");
        *token = self.exchange_and_persist().await?;
        Ok(token.clone())
    }

    async fn exchange_and_persist(&self) -> Result<Token> {
        let token =
            exchange_token(&self.http, &self.token_url, &self.credentials, self.timeout).await?;
        self.store.save(self.client_id(), &token)?;
        Ok(token)
    }

    /// Send the request produced by `build` with the session bearer token.
    ///
    /// A 401 answer triggers one refresh and one replay; a second 401 is
    /// [`Error::ExpiredToken`]. Any other response is returned unclassified.
    pub async fn execute<F>(&self, build: F) -> Result<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let token = self.get_valid_token().await?;
        let response = self.send(&build, &token).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::warn!(url = %response.url(), "request rejected as unauthorized, replaying with a fresh token");
        let token = self.refresh().await?;
        let response = self.send(&build, &token).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(Error::ExpiredToken);
        }
        Ok(response)
    }

    async fn send<F>(&self, build: &F, token: &Token) -> Result<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let response = build(&self.http)
            .header("Authorization", token.bearer())
            .timeout(self.timeout)
            .send()
            .await?;
        tracing::debug!(url = %response.url(), status = response.status().as_u16(), "response");
        Ok(response)
    }
}

/// Client-credentials grant against the identity provider
async fn exchange_token(
    http: &Client,
    token_url: &str,
    credentials: &Credentials,
    timeout: Duration,
) -> Result<Token> {
    tracing::debug!(token_url, client_id = %credentials.client_id, "exchanging client credentials");

    let response = http
        .post(token_url)
        .timeout(timeout)
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
        ])
        .send()
        .await
        .map_err(|e| Error::Authentication(format!("token request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Authentication(format!(
            "token endpoint returned HTTP {}: {}",
            status.as_u16(),
            body
        )));
    }

    let body = response
        .json()
        .await
        .map_err(|e| Error::Authentication(format!("invalid token response: {}", e)))?;
    Token::from_exchange_response(body, Utc::now())
}
