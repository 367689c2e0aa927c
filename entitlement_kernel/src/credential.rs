/// Cafe Ledger: Credential Hashing
///
/// PBKDF2-HMAC-SHA256 with a random salt. Stored digest format:
///
///   sha256i$<iterations>$<salt hex>$<digest hex>
///
/// Legacy digests (bare 64-char lowercase hex SHA-256 of the password,
/// no salt) still verify so that existing stores keep working; callers
/// upgrade them on the next successful login.
///
/// Rules:
///   - Fresh 16-byte random salt per `hash` call
///   - `hash_with_salt` is deterministic for the same inputs
///   - Malformed digests never verify

use pbkdf2::pbkdf2_hmac;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::LedgerError;

/// Scheme tag leading every salted digest.
pub const SCHEME: &str = "sha256i";

const SALT_LEN: usize = 16;
const DIGEST_LEN: usize = 32;

/// Hash a password with a fresh random salt.
pub fn hash(plaintext: &str, iterations: u32) -> Result<String, LedgerError> {
    let mut salt = [0u8; SALT_LEN];
    getrandom::fill(&mut salt)
        .map_err(|e| LedgerError::Credential(format!("salt generation failed: {}", e)))?;
    Ok(hash_with_salt(plaintext, &salt, iterations))
}

/// Deterministic core of `hash`.
pub fn hash_with_salt(plaintext: &str, salt: &[u8], iterations: u32) -> String {
    let digest = stretch(plaintext.as_bytes(), salt, iterations.max(1));
    format!(
        "{}${}${}${}",
        SCHEME,
        iterations.max(1),
        hex::encode(salt),
        hex::encode(digest)
    )
}

/// Check a password against a stored digest (salted or legacy).
pub fn verify(plaintext: &str, digest: &str) -> bool {
    if is_legacy(digest) {
        let computed = legacy_hash(plaintext);
        return computed.as_bytes().ct_eq(digest.as_bytes()).into();
    }

    let Some((iterations, salt, expected)) = parse(digest) else {
        return false;
    };
    let computed = stretch(plaintext.as_bytes(), &salt, iterations);
    computed.as_slice().ct_eq(&expected).into()
}

/// True for unsalted digests written by the previous system.
pub fn is_legacy(digest: &str) -> bool {
    digest.len() == 64
        && digest
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Unsalted SHA-256 hex digest, the format of the previous system.
pub fn legacy_hash(plaintext: &str) -> String {
    hex::encode(Sha256::digest(plaintext.as_bytes()))
}

fn stretch(password: &[u8], salt: &[u8], iterations: u32) -> [u8; DIGEST_LEN] {
    let mut out = [0u8; DIGEST_LEN];
    pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut out);
    out
}

fn parse(digest: &str) -> Option<(u32, Vec<u8>, Vec<u8>)> {
    let mut parts = digest.split('$');
    if parts.next()? != SCHEME {
        return None;
    }
    let iterations: u32 = parts.next()?.parse().ok()?;
    let salt = hex::decode(parts.next()?).ok()?;
    let expected = hex::decode(parts.next()?).ok()?;
    if parts.next().is_some() || iterations == 0 || expected.len() != DIGEST_LEN {
        return None;
    }
    Some((iterations, salt, expected))
}
