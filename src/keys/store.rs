//! Concurrency-safe license key store with usage-limited validation.
//!
//! All four operations (issue, revoke, validate, list) take the store's
//! single mutex, so they are linearizable with respect to each other. In
//! particular the limit check and the usage increment in [`KeyStore::validate`]
//! happen inside one critical section -- concurrent validations of the same
//! key can never push `usage_count` past a nonzero `usage_limit`.

use std::collections::HashMap;
use std::sync::Mutex;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;
use tracing::debug;

use super::error::KeyError;

/// Prefix on every issued key id.
pub const KEY_PREFIX: &str = "NT-";

/// Visible length of the random token portion of a key id.
///
/// 24 base64url chars encode 144 bits, comfortably above the 128-bit floor
/// needed to make collisions negligible.
const TOKEN_LEN: usize = 24;

/// Lifecycle status of a license key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    /// Key is usable (subject to its usage limit).
    Active,
    /// Key has been revoked; validation always fails. Terminal.
    Revoked,
}

/// A license key record.
///
/// `usage_limit == 0` means unlimited use.
#[derive(Debug, Clone, Serialize)]
pub struct LicenseKey {
    /// Opaque random identifier, unique for the process lifetime.
    #[serde(rename = "key")]
    pub id: String,
    /// Subscription tier ("basic", "premium", ...). Free-form.
    pub subscription: String,
    /// Current status.
    pub status: KeyStatus,
    /// Issuance time.
    pub created_at: DateTime<Utc>,
    /// Number of successful validations so far. Only ever increases.
    pub usage_count: u64,
    /// Maximum validations allowed; 0 means unlimited.
    pub usage_limit: u64,
    /// Operator note.
    pub comment: String,
}

/// Result of a successful validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Validation {
    /// Subscription tier of the validated key.
    pub subscription: String,
    /// Usage count after this validation.
    pub usage_count: u64,
    /// The key's usage limit (0 = unlimited).
    pub usage_limit: u64,
}

/// Owner of all license key records.
pub struct KeyStore {
    keys: Mutex<HashMap<String, LicenseKey>>,
}

impl KeyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            keys: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a new active key and return a copy of the full record.
    pub fn issue(&self, subscription: &str, usage_limit: u64, comment: &str) -> LicenseKey {
        let mut keys = self.keys.lock().unwrap();

        // Collision probability is negligible at this entropy width; the
        // retry loop is defense-in-depth only.
        let mut id = generate_key_id();
        while keys.contains_key(&id) {
            id = generate_key_id();
        }

        let key = LicenseKey {
            id: id.clone(),
            subscription: subscription.to_string(),
            status: KeyStatus::Active,
            created_at: Utc::now(),
            usage_count: 0,
            usage_limit,
            comment: comment.to_string(),
        };
        keys.insert(id.clone(), key.clone());
        debug!("Issued key {} (limit {})", id, usage_limit);
        key
    }

    /// Revoke a key. Idempotent: revoking an already-revoked or unknown id
    /// silently succeeds.
    ///
    /// Returns `true` if a key actually transitioned to revoked, so callers
    /// can journal accurately.
    pub fn revoke(&self, id: &str) -> bool {
        let mut keys = self.keys.lock().unwrap();
        match keys.get_mut(id) {
            Some(key) if key.status == KeyStatus::Active => {
                key.status = KeyStatus::Revoked;
                debug!("Revoked key {}", id);
                true
            }
            _ => false,
        }
    }

    /// Validate a key, consuming one use on success.
    ///
    /// # Errors
    ///
    /// * [`KeyError::NotFound`] if no such key exists.
    /// * [`KeyError::Revoked`] if the key was revoked.
    /// * [`KeyError::LimitExceeded`] if a nonzero usage limit is exhausted.
    pub fn validate(&self, id: &str) -> Result<Validation, KeyError> {
        let mut keys = self.keys.lock().unwrap();
        let key = keys.get_mut(id).ok_or(KeyError::NotFound)?;

        if key.status == KeyStatus::Revoked {
            return Err(KeyError::Revoked);
        }
        if key.usage_limit > 0 && key.usage_count >= key.usage_limit {
            return Err(KeyError::LimitExceeded);
        }

        key.usage_count += 1;
        Ok(Validation {
            subscription: key.subscription.clone(),
            usage_count: key.usage_count,
            usage_limit: key.usage_limit,
        })
    }

    /// Snapshot copy of all key records, in unspecified order.
    pub fn list(&self) -> Vec<LicenseKey> {
        self.keys.lock().unwrap().values().cloned().collect()
    }

    /// Number of keys ever issued (revoked keys included).
    pub fn len(&self) -> usize {
        self.keys.lock().unwrap().len()
    }

    /// Whether no keys have been issued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for KeyStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a fresh key id: `NT-` plus 24 chars of URL-safe base64 over
/// 32 bytes from the OS CSPRNG.
fn generate_key_id() -> String {
    let mut raw = [0u8; 32];
    OsRng.fill_bytes(&mut raw);
    let encoded = URL_SAFE_NO_PAD.encode(raw);
    format!("{}{}", KEY_PREFIX, &encoded[..TOKEN_LEN])
}
