use hex;
use sha2::{Digest, Sha256};

use crate::phone::normalize_ar_phone;

/// Customer identity in the form Meta expects for `user_data`.
///
/// Values are normalized before hashing: Meta hashes its own copy of the
/// customer data the same way, so any drift here (a stray space, an upper
/// case letter, a missing `549`) silently breaks matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedIdentity {
    pub canonical_phone: String,
    pub hashed_phone: String,
    pub hashed_first_name: String,
    pub hashed_last_name: String,
}

impl NormalizedIdentity {
    /// Normalizes and hashes the three identity fields.
    ///
    /// A missing last name hashes the empty string: the Conversions API
    /// expects `fn`, `ln` and `ph` to all be populated.
    pub fn new(first_name: &str, last_name: Option<&str>, raw_phone: &str) -> Self {
        let canonical_phone = normalize_ar_phone(raw_phone);

        Self {
            hashed_phone: sha256_hex(&canonical_phone),
            hashed_first_name: sha256_hex(&normalize_name(first_name)),
            hashed_last_name: sha256_hex(&normalize_name(last_name.unwrap_or_default())),
            canonical_phone,
        }
    }

    /// First characters of the phone hash, used to make generated dedup keys
    /// distinct per customer without exposing the number.
    pub fn phone_hash_prefix(&self, len: usize) -> &str {
        &self.hashed_phone[..len.min(self.hashed_phone.len())]
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Lowercase hex SHA-256 digest of `input`. Unsalted, so equal inputs always
/// produce equal digests.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
