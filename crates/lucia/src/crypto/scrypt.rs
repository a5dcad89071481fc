// Versioned scrypt password hashing.
//
// Current hashes are `s2:<salt_hex>:<key_hex>`, derived with a block size
// of 16. Two-part hashes predate the version tag and verify with a block
// size of 8, so credentials hashed before the change keep working without
// a reset. Verification treats anything it cannot parse as a failed match;
// stored hashes are untrusted input and must never cause a panic.

use rand::Rng;
use subtle::ConstantTimeEq;
use unicode_normalization::UnicodeNormalization;

use lucia_core::{LuciaError, Result};

const SCRYPT_LOG_N: u8 = 14; // N = 16384
const SCRYPT_P: u32 = 1;
const SCRYPT_KEY_LEN: usize = 64;

const CURRENT_BLOCK_SIZE: u32 = 16;
const LEGACY_BLOCK_SIZE: u32 = 8;
const VERSION_TAG: &str = "s2";

/// Hash a password into the current `s2:<salt_hex>:<key_hex>` format.
///
/// The password is NFKC-normalized first so visually identical inputs
/// produce the same hash regardless of how the client composed them. The
/// salt is the hex encoding of 16 random bytes, and the derivation runs
/// over the salt string's own bytes.
pub fn hash_password(password: &str) -> Result<String> {
    let salt: [u8; 16] = rand::thread_rng().gen();
    let salt_hex = hex::encode(salt);
    let key = derive_key(password, &salt_hex, CURRENT_BLOCK_SIZE)?;
    Ok(format!("{VERSION_TAG}:{salt_hex}:{}", hex::encode(key)))
}

/// Check a password against a stored hash.
///
/// Two-part hashes take the legacy derivation, `s2`-tagged three-part
/// hashes the current one. Unknown tags, a wrong part count, or undecodable
/// hex all return false. The comparison runs in constant time over the
/// decoded key bytes.
pub fn verify_password(hashed_password: &str, password: &str) -> bool {
    let parts: Vec<&str> = hashed_password.split(':').collect();
    match parts.as_slice() {
        &[salt, key] => verify_with(password, salt, key, LEGACY_BLOCK_SIZE),
        &[tag, salt, key] if tag == VERSION_TAG => {
            verify_with(password, salt, key, CURRENT_BLOCK_SIZE)
        }
        _ => false,
    }
}

fn verify_with(password: &str, salt: &str, key_hex: &str, block_size: u32) -> bool {
    let Ok(stored_key) = hex::decode(key_hex) else {
        return false;
    };
    let Ok(derived) = derive_key(password, salt, block_size) else {
        return false;
    };
    derived.ct_eq(&stored_key[..]).into()
}

fn derive_key(password: &str, salt: &str, block_size: u32) -> Result<[u8; SCRYPT_KEY_LEN]> {
    let normalized: String = password.nfkc().collect();
    let params = scrypt::Params::new(SCRYPT_LOG_N, block_size, SCRYPT_P, SCRYPT_KEY_LEN)
        .map_err(|err| LuciaError::Database(anyhow::anyhow!("invalid scrypt parameters: {err}")))?;
    let mut key = [0u8; SCRYPT_KEY_LEN];
    scrypt::scrypt(normalized.as_bytes(), salt.as_bytes(), &params, &mut key)
        .map_err(|err| LuciaError::Database(anyhow::anyhow!("scrypt derivation failed: {err}")))?;
    Ok(key)
}
