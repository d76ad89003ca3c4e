use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid API endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("building HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("fetching keys from {url}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("decoding key list")]
    Json(#[from] serde_json::Error),

    #[error("invalid username {username:?}")]
    InvalidUsername { username: String },

    #[error("no public keys found for user {username:?}")]
    NoKeys { username: String },

    #[error("user {username:?} has no key with id {id}")]
    KeyNotFound { username: String, id: u64 },

    #[error("bad public key")]
    PublicKey(#[from] ssh_key::Error),

    #[error("public key is {algorithm}, want ssh-rsa")]
    NotRsa { algorithm: String },

    #[error("read private key {}", .path.display())]
    ReadPrivateKey {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read private key")]
    Pem(#[from] pem::PemError),

    #[error("read private key: empty PEM block")]
    EmptyPem,

    #[error("unknown key type {got:?}, want \"RSA PRIVATE KEY\"")]
    WrongKeyType { got: String },

    #[error("bad private key")]
    PrivateKey(#[from] rsa::pkcs1::Error),

    #[error("could not determine the home directory for the default private key")]
    NoHomeDir,

    #[error("message is {len} bytes, at most {max} fit in one RSA-OAEP block")]
    MessageTooLong { len: usize, max: usize },

    #[error("error encrypting")]
    Encrypt(#[source] rsa::Error),

    #[error("error decrypting")]
    Decrypt(#[source] rsa::Error),

    #[error("error decoding input")]
    Base64(#[from] base64::DecodeError),
}
