#![forbid(unsafe_code)]
//! GitHub SSH key sharing primitives
//!
//! Fetches a user's public keys from a GitHub-compatible API, turns SSH and
//! PEM key material into RSA keys and applies RSA-OAEP (SHA-1) with URL-safe
//! base64 framing.

pub mod codec;
mod error;
pub mod fetch;
pub mod oaep;

pub use codec::{default_private_key_path, parse_private_key_pem, parse_public_key, read_private_key};
pub use error::{Error, Result};
pub use fetch::{KeyFetcher, KeySelection, PublicKeyRecord, DEFAULT_ENDPOINT};
pub use oaep::{open, seal};
pub use rsa::{RsaPrivateKey, RsaPublicKey};
