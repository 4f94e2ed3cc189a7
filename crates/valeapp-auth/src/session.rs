use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issued<T> {
    pub value: T,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Opaque bearer tokens mapped to a value until they expire or are revoked.
/// Only the SHA-256 digest of a token is kept; expired entries are dropped
/// whenever the registry is touched.
pub struct TokenRegistry<T> {
    ttl: Duration,
    entries: Mutex<HashMap<String, Issued<T>>>,
}

fn new_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn digest(token: &str) -> String {
    valeapp_core::sha256_hex(token.trim().as_bytes())
}

impl<T: Clone> TokenRegistry<T> {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Issued<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn issue(&self, value: T) -> (String, Issued<T>) {
        self.issue_at(value, Utc::now())
    }

    pub fn issue_at(&self, value: T, now: DateTime<Utc>) -> (String, Issued<T>) {
        let token = new_token();
        let issued = Issued {
            value,
            issued_at: now,
            expires_at: now + self.ttl,
        };
        let mut entries = self.lock();
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(digest(&token), issued.clone());
        (token, issued)
    }

    #[must_use]
    pub fn get(&self, token: &str) -> Option<Issued<T>> {
        self.get_at(token, Utc::now())
    }

    #[must_use]
    pub fn get_at(&self, token: &str, now: DateTime<Utc>) -> Option<Issued<T>> {
        let key = digest(token);
        let mut entries = self.lock();
        match entries.get(&key) {
            Some(e) if e.expires_at > now => Some(e.clone()),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Removes the token; returns whether it was live.
    pub fn revoke(&self, token: &str) -> bool {
        let now = Utc::now();
        self.lock()
            .remove(&digest(token))
            .is_some_and(|e| e.expires_at > now)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_url_safe_and_unique() {
        let registry = TokenRegistry::new(Duration::minutes(5));
        let (a, _) = registry.issue("ana");
        let (b, _) = registry.issue("bia");
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(registry.get(&a).map(|e| e.value), Some("ana"));
    }

    #[test]
    fn raw_tokens_are_not_stored() {
        let registry = TokenRegistry::new(Duration::minutes(5));
        let (token, _) = registry.issue(1_u8);
        assert!(!registry.lock().contains_key(&token));
    }

    #[test]
    fn expired_tokens_are_rejected_and_purged() {
        let registry = TokenRegistry::new(Duration::seconds(60));
        let start = Utc::now();
        let (token, issued) = registry.issue_at(7_u32, start);
        assert_eq!(issued.expires_at, start + Duration::seconds(60));
        assert!(registry.get_at(&token, start + Duration::seconds(59)).is_some());
        assert!(registry.get_at(&token, start + Duration::seconds(60)).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn revoked_tokens_stop_working() {
        let registry = TokenRegistry::new(Duration::minutes(5));
        let (token, _) = registry.issue("x");
        assert!(registry.revoke(&token));
        assert!(!registry.revoke(&token));
        assert!(registry.get(&token).is_none());
    }
}
