//! Access tokens and their on-disk cache
//!
//! A token is kept as the raw JSON body returned by the identity provider,
//! augmented with an absolute `expires_at` timestamp, so the cache file can
//! be read by any tool that understands the provider's response format.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Seconds before the real expiry at which a token is treated as expired
const EXPIRY_BUFFER_SECS: i64 = 60;

/// OAuth2 bearer token
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
    /// Exchange response body, including `expires_at`
    pub raw: Map<String, Value>,
}

impl Token {
    /// Build a token from a token-endpoint response, stamping `expires_at`
    /// from `expires_in` relative to `now`.
    pub fn from_exchange_response(body: Value, now: DateTime<Utc>) -> Result<Self> {
        let Value::Object(mut raw) = body else {
            return Err(Error::Authentication(
                "token response is not a JSON object".to_string(),
            ));
        };

        if let Some(expires_in) = raw.get("expires_in").and_then(Value::as_f64) {
            let expires_at = Duration::try_milliseconds((expires_in * 1000.0) as i64)
                .and_then(|lifetime| now.checked_add_signed(lifetime))
                .ok_or_else(|| {
                    Error::Authentication(format!("expires_in {} out of range", expires_in))
                })?;
            raw.insert(
                "expires_at".to_string(),
                Value::from(expires_at.timestamp_millis() as f64 / 1000.0),
            );
        }

        Self::from_raw(raw).map_err(Error::Authentication)
    }

    fn from_raw(raw: Map<String, Value>) -> std::result::Result<Self, String> {
        let access_token = raw
            .get("access_token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| "missing access_token".to_string())?
            .to_string();

        let expires_at = match raw.get("expires_at") {
            None | Some(Value::Null) => None,
            Some(value) => {
                let secs = value
                    .as_f64()
                    .ok_or_else(|| "expires_at is not a number".to_string())?;
                Some(
                    Utc.timestamp_millis_opt((secs * 1000.0) as i64)
                        .single()
                        .ok_or_else(|| format!("expires_at {} out of range", secs))?,
                )
            }
        };

        Ok(Self {
            access_token,
            expires_at,
            raw,
        })
    }

    /// Expired, or within a minute of expiring. Tokens without expiry never expire.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            None => false,
            // Anything that close to the minimum date is long gone
            Some(expires_at) => expires_at
                .checked_sub_signed(Duration::seconds(EXPIRY_BUFFER_SECS))
                .map_or(true, |deadline| now >= deadline),
        }
    }

    /// Value for the `Authorization` header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

/// Per-client token files in a single directory
#[derive(Debug, Clone)]
pub struct TokenStore {
    dir: PathBuf,
}

impl TokenStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache file of one client.
    ///
    /// The client id becomes the file name, so ids that could name another
    /// directory are rejected.
    pub fn path_for(&self, client_id: &str) -> Result<PathBuf> {
        if client_id.is_empty()
            || client_id == "."
            || client_id == ".."
            || client_id.contains(['/', '\\', '\0'])
        {
            return Err(Error::InvalidInput(format!(
                "client id '{}' cannot be used as a cache file name",
                client_id
            )));
        }
        Ok(self.dir.join(format!("{}.json", client_id)))
    }

    /// Cached token of `client_id`, `None` when nothing was cached yet.
    ///
    /// A file that exists but cannot be decoded is an error; it is never
    /// discarded silently.
    pub fn load(&self, client_id: &str) -> Result<Option<Token>> {
        let path = self.path_for(client_id)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::Io(e)),
        };

        let corrupt = |reason: String| Error::CorruptCache {
            path: path.clone(),
            reason,
        };

        let raw: Map<String, Value> =
            serde_json::from_str(&content).map_err(|e| corrupt(e.to_string()))?;
        Token::from_raw(raw).map(Some).map_err(corrupt)
    }

    /// Write `token` unless the cached one already carries the same access
    /// token. Returns whether the file was written.
    pub fn save(&self, client_id: &str, token: &Token) -> Result<bool> {
        if let Some(cached) = self.load(client_id)? {
            if cached.access_token == token.access_token {
                tracing::debug!(client_id, "cached token unchanged, skipping write");
                return Ok(false);
            }
        }

        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }

        let path = self.path_for(client_id)?;
        fs::write(&path, serde_json::to_string(&token.raw)?)?;

        // Read/write for owner only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&path, perms)?;
        }

        tracing::debug!(client_id, path = %path.display(), "token cached");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exchange(access_token: &str, expires_in: u64) -> Token {
        Token::from_exchange_response(
            json!({
                "access_token": access_token,
                "token_type": "Bearer",
                "expires_in": expires_in,
            }),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_exchange_response_sets_expires_at() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let token = Token::from_exchange_response(
            json!({"access_token": "abc", "expires_in": 3600}),
            now,
        )
        .unwrap();

        assert_eq!(token.expires_at, Some(now + Duration::hours(1)));
        assert_eq!(token.raw["expires_at"], json!(1704070800.0));
        assert_eq!(token.bearer(), "Bearer abc");
    }

    #[test]
    fn test_exchange_response_with_absurd_lifetime() {
        for expires_in in [json!(1e15), json!(-1e300)] {
            let err = Token::from_exchange_response(
                json!({"access_token": "abc", "expires_in": expires_in}),
                Utc::now(),
            )
            .unwrap_err();
            assert!(matches!(err, Error::Authentication(ref msg) if msg.contains("out of range")));
        }
    }

    #[test]
    fn test_exchange_response_without_access_token() {
        let err = Token::from_exchange_response(json!({"error": "invalid_client"}), Utc::now())
            .unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));
    }

    #[test]
    fn test_expiry_buffer() {
        let now = Utc::now();
        let token = Token {
            access_token: "tok".to_string(),
            expires_at: Some(now + Duration::seconds(30)),
            raw: Map::new(),
        };
        assert!(token.is_expired_at(now));

        let fresh = Token {
            expires_at: Some(now + Duration::hours(1)),
            ..token.clone()
        };
        assert!(!fresh.is_expired_at(now));

        let forever = Token {
            expires_at: None,
            ..token
        };
        assert!(!forever.is_expired_at(now));
    }

    #[test]
    fn test_expiry_at_minimum_date() {
        let token = Token {
            access_token: "tok".to_string(),
            expires_at: Some(DateTime::<Utc>::MIN_UTC),
            raw: Map::new(),
        };
        assert!(token.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_client_id_cannot_escape_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("tokens"));

        for client_id in ["../x", "a/b", "a\\b", "..", ""] {
            assert!(matches!(
                store.path_for(client_id),
                Err(Error::InvalidInput(_))
            ));
            assert!(store.save(client_id, &exchange("tok", 3600)).is_err());
        }
        assert!(!dir.path().join("x.json").exists());
        assert_eq!(
            store.path_for("client-1").unwrap(),
            dir.path().join("tokens").join("client-1.json")
        );
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path());
        assert!(store.load("nobody").unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("nested"));
        let token = exchange("token-1", 3600);

        assert!(store.save("client", &token).unwrap());
        let loaded = store.load("client").unwrap().unwrap();

        assert_eq!(loaded.access_token.as_bytes(), token.access_token.as_bytes());
        assert_eq!(loaded.expires_at, token.expires_at);
    }

    #[test]
    fn test_save_skips_unchanged_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path());

        assert!(store.save("client", &exchange("same", 3600)).unwrap());
        assert!(!store.save("client", &exchange("same", 7200)).unwrap());
        assert!(store.save("client", &exchange("other", 3600)).unwrap());
        assert_eq!(store.load("client").unwrap().unwrap().access_token, "other");
    }

    #[test]
    fn test_malformed_file_is_corrupt_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path());
        fs::write(store.path_for("client").unwrap(), "{not json").unwrap();

        assert!(matches!(
            store.load("client"),
            Err(Error::CorruptCache { .. })
        ));
        // Saving must not paper over the corrupt file either
        assert!(store.save("client", &exchange("tok", 60)).is_err());
    }

    #[test]
    fn test_file_without_access_token_is_corrupt_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path());
        fs::write(store.path_for("client").unwrap(), r#"{"token_type": "Bearer"}"#).unwrap();

        assert!(matches!(
            store.load("client"),
            Err(Error::CorruptCache { .. })
        ));
    }
}
