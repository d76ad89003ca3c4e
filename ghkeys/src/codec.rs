//! SSH and PEM key decoding
use std::fs;
use std::path::{Path, PathBuf};

use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::{RsaPrivateKey, RsaPublicKey};
use ssh_key::PublicKey;

use crate::{Error, Result};

/// PEM label of a PKCS#1 RSA private key
pub const RSA_PRIVATE_KEY_TAG: &str = "RSA PRIVATE KEY";

/// Decode an OpenSSH public key line (`ssh-rsa AAAA... [comment]`) into an
/// RSA public key
pub fn parse_public_key(openssh: &str) -> Result<RsaPublicKey> {
    let key = PublicKey::from_openssh(openssh.trim())?;
    let rsa_key = key.key_data().rsa().ok_or_else(|| Error::NotRsa {
        algorithm: key.algorithm().to_string(),
    })?;
    Ok(RsaPublicKey::try_from(rsa_key)?)
}

/// Decode a PEM file holding a PKCS#1 `RSA PRIVATE KEY` block.
///
/// PKCS#8 (`PRIVATE KEY`) and OpenSSH (`OPENSSH PRIVATE KEY`) blocks are
/// rejected with [`Error::WrongKeyType`].
pub fn parse_private_key_pem(data: &[u8]) -> Result<RsaPrivateKey> {
    let block = pem::parse(data)?;
    if block.contents().is_empty() {
        return Err(Error::EmptyPem);
    }
    if block.tag() != RSA_PRIVATE_KEY_TAG {
        return Err(Error::WrongKeyType {
            got: block.tag().to_owned(),
        });
    }
    Ok(RsaPrivateKey::from_pkcs1_der(block.contents())?)
}

/// Read and decode the private key file at `path`
pub fn read_private_key(path: &Path) -> Result<RsaPrivateKey> {
    let data = fs::read(path).map_err(|source| Error::ReadPrivateKey {
        path: path.to_path_buf(),
        source,
    })?;
    parse_private_key_pem(&data)
}

/// `~/.ssh/id_rsa`
pub fn default_private_key_path() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".ssh").join("id_rsa"))
        .ok_or(Error::NoHomeDir)
}
