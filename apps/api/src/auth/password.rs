//! Password hashing: PBKDF2-HMAC-SHA256 with a random per-user salt.
//!
//! Stored form: `base64(salt)$base64(hash)`.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use subtle::ConstantTimeEq;

const PBKDF2_ITERATIONS: u32 = if cfg!(test) { 1_000 } else { 100_000 };
const SALT_LENGTH: usize = 16;
const HASH_LENGTH: usize = 32;

/// Well-formed hash owned by no account. Login verifies against it for unknown
/// emails so both paths cost one PBKDF2 run.
pub const UNKNOWN_ACCOUNT_HASH: &str =
    "AAAAAAAAAAAAAAAAAAAAAA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

pub fn hash_password(password: &str) -> String {
    let salt: [u8; SALT_LENGTH] = rand::random();
    let hash = derive(password, &salt);
    format!(
        "{}${}",
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(hash)
    )
}

/// Constant-time check of `password` against a stored hash. Malformed hashes never match.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_b64, hash_b64)) = stored.split_once('$') else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (
        STANDARD_NO_PAD.decode(salt_b64),
        STANDARD_NO_PAD.decode(hash_b64),
    ) else {
        return false;
    };

    let actual = derive(password, &salt);
    actual.as_slice().ct_eq(expected.as_slice()).into()
}

fn derive(password: &str, salt: &[u8]) -> [u8; HASH_LENGTH] {
    let mut out = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut out);
    out
}
