use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use xsalsa20poly1305::aead::{Aead, KeyInit};
use xsalsa20poly1305::{Key, Nonce, XSalsa20Poly1305};

const NONCE_LEN: usize = 24;

fn derive_key(secret: &str) -> Key {
    let digest = blake3::hash(secret.as_bytes());
    *Key::from_slice(digest.as_bytes())
}

/// Seals `plaintext` with a key derived from `secret`. The output is
/// base64(nonce || ciphertext) and is only readable by `decrypt` with the
/// same secret.
pub fn encrypt(plaintext: &str, secret: &str) -> Result<String> {
    let cipher = XSalsa20Poly1305::new(&derive_key(secret));

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::fill(&mut nonce_bytes[..]);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|_| anyhow!("failed to seal token"))?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(BASE64.encode(sealed))
}

pub fn decrypt(sealed: &str, secret: &str) -> Result<String> {
    let sealed = BASE64.decode(sealed)?;
    if sealed.len() <= NONCE_LEN {
        return Err(anyhow!("sealed token too short"));
    }

    let cipher = XSalsa20Poly1305::new(&derive_key(secret));
    let nonce = Nonce::from_slice(&sealed[..NONCE_LEN]);
    let plaintext = cipher
        .decrypt(nonce, &sealed[NONCE_LEN..])
        .map_err(|_| anyhow!("failed to open token"))?;

    Ok(String::from_utf8(plaintext)?)
}

/// Keyed digest of a password. The digest is what gets persisted; the raw
/// password never leaves the request scope.
pub fn hash_password(password: &str, salt: &str) -> String {
    let key = blake3::hash(salt.as_bytes());
    let digest = blake3::keyed_hash(key.as_bytes(), password.as_bytes());
    hex::encode(digest.as_bytes())
}

pub fn verify_password(password: &str, salt: &str, digest: &str) -> bool {
    hash_password(password, salt) == digest
}
