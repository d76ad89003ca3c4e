//! RSA-OAEP (SHA-1, empty label) with URL-safe base64 armor
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use rsa::rand_core::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;

use crate::{Error, Result};

/// SHA-1 output size
const HASH_LEN: usize = 20;

/// Accepts armor with or without trailing `=`
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Largest plaintext one OAEP block can carry for `key`
/// (214 bytes for a 2048-bit modulus)
pub fn max_plaintext_len(key: &RsaPublicKey) -> usize {
    key.size().saturating_sub(2 * HASH_LEN + 2)
}

pub fn encrypt(key: &RsaPublicKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let max = max_plaintext_len(key);
    if plaintext.len() > max {
        return Err(Error::MessageTooLong {
            len: plaintext.len(),
            max,
        });
    }
    key.encrypt(&mut OsRng, Oaep::new::<Sha1>(), plaintext)
        .map_err(Error::Encrypt)
}

pub fn decrypt(key: &RsaPrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>> {
    key.decrypt(Oaep::new::<Sha1>(), ciphertext)
        .map_err(Error::Decrypt)
}

/// Padded URL-safe base64, no trailing newline
pub fn encode_armor(ciphertext: &[u8]) -> String {
    URL_SAFE.encode(ciphertext)
}

/// Inverse of [`encode_armor`]; surrounding whitespace is ignored
pub fn decode_armor(armored: &[u8]) -> Result<Vec<u8>> {
    Ok(URL_SAFE_LENIENT.decode(armored.trim_ascii())?)
}

/// Encrypt `plaintext` for `key` and armor the result
pub fn seal(key: &RsaPublicKey, plaintext: &[u8]) -> Result<String> {
    encrypt(key, plaintext).map(|ciphertext| encode_armor(&ciphertext))
}

/// Dearmor and decrypt the output of [`seal`]
pub fn open(key: &RsaPrivateKey, armored: &[u8]) -> Result<Vec<u8>> {
    let ciphertext = decode_armor(armored)?;
    decrypt(key, &ciphertext)
}
