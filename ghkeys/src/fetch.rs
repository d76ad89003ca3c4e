//! Public key retrieval from the GitHub `users/{username}/keys` API
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{Error, Result};

/// Public GitHub API
pub const DEFAULT_ENDPOINT: &str = "https://api.github.com";

const GITHUB_JSON: &str = "application/vnd.github+json";
const USER_AGENT: &str = concat!("ghsshare/", env!("CARGO_PKG_VERSION"));

/// One entry of the keys listing. Only `key` is used for encryption.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PublicKeyRecord {
    pub id: u64,
    pub key: String,
}

/// Which of a user's keys to encrypt for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeySelection {
    /// First listed key; a warning is logged if the user has several
    #[default]
    First,
    /// The key with this API id
    Id(u64),
}

#[derive(Debug, Clone)]
pub struct KeyFetcher {
    client: Client,
    endpoint: Url,
}

impl KeyFetcher {
    /// Build a fetcher for a GitHub-compatible API base URL, e.g.
    /// `https://api.github.com` or `https://ghe.example.com/api/v3`
    pub fn new(endpoint: &str) -> Result<Self> {
        let parsed = Url::parse(endpoint).map_err(|err| Error::InvalidEndpoint {
            endpoint: endpoint.to_owned(),
            reason: err.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(Error::InvalidEndpoint {
                endpoint: endpoint.to_owned(),
                reason: "not a base URL".to_owned(),
            });
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(Error::Client)?;

        Ok(KeyFetcher {
            client,
            endpoint: parsed,
        })
    }

    /// `{endpoint}/users/{username}/keys`, with `username` as a single
    /// percent-encoded path segment.
    ///
    /// Empty, `.` and `..` usernames are rejected: they would not survive as
    /// a segment of their own.
    pub fn keys_url(&self, username: &str) -> Result<Url> {
        if matches!(username, "" | "." | "..") {
            return Err(Error::InvalidUsername {
                username: username.to_owned(),
            });
        }

        let mut url = self.endpoint.clone();
        // `new` rejects cannot-be-a-base URLs, so this always succeeds
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["users", username, "keys"]);
        }
        Ok(url)
    }

    /// List every public key of `username`
    pub fn fetch_keys(&self, username: &str) -> Result<Vec<PublicKeyRecord>> {
        let url = self.keys_url(username)?;
        debug!(%url, "fetching public keys");

        let http_err = |source: reqwest::Error| Error::Http {
            url: url.to_string(),
            source,
        };
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, GITHUB_JSON)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(http_err)?;
        let body = response.bytes().map_err(http_err)?;

        parse_keys(&body)
    }

    /// Fetch the keys of `username` and pick one according to `selection`
    pub fn fetch_key(&self, username: &str, selection: KeySelection) -> Result<PublicKeyRecord> {
        let keys = self.fetch_keys(username)?;
        select_key(username, keys, selection)
    }
}

/// Decode a keys listing body
pub fn parse_keys(body: &[u8]) -> Result<Vec<PublicKeyRecord>> {
    Ok(serde_json::from_slice(body)?)
}

/// Pick exactly one key out of a listing
pub fn select_key(
    username: &str,
    keys: Vec<PublicKeyRecord>,
    selection: KeySelection,
) -> Result<PublicKeyRecord> {
    let no_keys = || Error::NoKeys {
        username: username.to_owned(),
    };

    let record = match selection {
        KeySelection::First => {
            let count = keys.len();
            if count > 1 {
                warn!(username, count, "user with {} keys, taking the first one", count);
            }
            keys.into_iter().next().ok_or_else(no_keys)?
        }
        KeySelection::Id(id) => {
            if keys.is_empty() {
                return Err(no_keys());
            }
            keys.into_iter()
                .find(|record| record.id == id)
                .ok_or_else(|| Error::KeyNotFound {
                    username: username.to_owned(),
                    id,
                })?
        }
    };

    debug!(username, id = record.id, "selected public key");
    Ok(record)
}
