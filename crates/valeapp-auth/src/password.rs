// SPDX-License-Identifier: Apache-2.0

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

pub const HASH_SCHEME: &str = "pbkdf2-sha256";
pub const DEFAULT_PASSWORD_ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordCheck {
    /// `needs_rehash` is set for legacy plaintext values and for hashes made
    /// with fewer iterations than currently configured.
    Match { needs_rehash: bool },
    Mismatch,
}

impl PasswordCheck {
    #[must_use]
    pub fn is_match(self) -> bool {
        matches!(self, Self::Match { .. })
    }
}

/// Salted PBKDF2 storage format: `pbkdf2-sha256$<iterations>$<salt>$<hash>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasher {
    iterations: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_PASSWORD_ITERATIONS)
    }
}

struct StoredHash {
    iterations: u32,
    salt: Vec<u8>,
    hash: Vec<u8>,
}

fn parse_stored(stored: &str) -> Option<StoredHash> {
    let mut parts = stored.split('$');
    if parts.next()? != HASH_SCHEME {
        return None;
    }
    let iterations = parts.next()?.parse::<u32>().ok().filter(|n| *n > 0)?;
    let salt = B64.decode(parts.next()?).ok()?;
    let hash = B64.decode(parts.next()?).ok()?;
    if parts.next().is_some() || hash.len() != KEY_LEN {
        return None;
    }
    Some(StoredHash {
        iterations,
        salt,
        hash,
    })
}

fn derive_key(password: &str, salt: &[u8], iterations: u32) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}

/// Constant-time comparison of two short secrets.
#[must_use]
pub fn secrets_match(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[must_use]
pub fn is_hashed(stored: &str) -> bool {
    stored
        .strip_prefix(HASH_SCHEME)
        .is_some_and(|rest| rest.starts_with('$'))
}

impl PasswordHasher {
    #[must_use]
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    #[must_use]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Hashes the trimmed password with a fresh random salt.
    #[must_use]
    pub fn hash(&self, password: &str) -> String {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let key = derive_key(password.trim(), &salt, self.iterations);
        format!(
            "{HASH_SCHEME}${}${}${}",
            self.iterations,
            B64.encode(salt),
            B64.encode(key)
        )
    }

    /// Checks `submitted` against a stored value. Values not in the hash
    /// format are legacy plaintext and compare trimmed; blank stored values
    /// never match.
    #[must_use]
    pub fn verify(&self, stored: &str, submitted: &str) -> PasswordCheck {
        let stored = stored.trim();
        let submitted = submitted.trim();
        if stored.is_empty() || submitted.is_empty() {
            return PasswordCheck::Mismatch;
        }
        if is_hashed(stored) {
            let Some(parsed) = parse_stored(stored) else {
                tracing::warn!("malformed password hash in store");
                return PasswordCheck::Mismatch;
            };
            let key = derive_key(submitted, &parsed.salt, parsed.iterations);
            if bool::from(key.as_slice().ct_eq(parsed.hash.as_slice())) {
                PasswordCheck::Match {
                    needs_rehash: parsed.iterations < self.iterations,
                }
            } else {
                PasswordCheck::Mismatch
            }
        } else if secrets_match(stored, submitted) {
            PasswordCheck::Match { needs_rehash: true }
        } else {
            PasswordCheck::Mismatch
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hasher = PasswordHasher::new(1_000);
        let stored = hasher.hash("654321");
        assert!(stored.starts_with("pbkdf2-sha256$1000$"));
        assert_eq!(
            hasher.verify(&stored, " 654321 "),
            PasswordCheck::Match {
                needs_rehash: false
            }
        );
        assert_eq!(hasher.verify(&stored, "654320"), PasswordCheck::Mismatch);
    }

    #[test]
    fn salts_differ_between_hashes() {
        let hasher = PasswordHasher::new(10);
        assert_ne!(hasher.hash("123456"), hasher.hash("123456"));
    }

    #[test]
    fn legacy_plaintext_matches_trimmed_and_asks_for_rehash() {
        let hasher = PasswordHasher::new(10);
        assert_eq!(
            hasher.verify("654321 ", "654321"),
            PasswordCheck::Match { needs_rehash: true }
        );
        assert_eq!(hasher.verify("654321", "65432"), PasswordCheck::Mismatch);
        assert_eq!(hasher.verify("   ", ""), PasswordCheck::Mismatch);
    }

    #[test]
    fn weaker_hashes_ask_for_rehash() {
        let stored = PasswordHasher::new(10).hash("abc");
        assert_eq!(
            PasswordHasher::new(20).verify(&stored, "abc"),
            PasswordCheck::Match { needs_rehash: true }
        );
    }

    #[test]
    fn malformed_hash_never_matches() {
        let hasher = PasswordHasher::new(10);
        assert_eq!(
            hasher.verify("pbkdf2-sha256$0$AAAA$AAAA", "pbkdf2-sha256$0$AAAA$AAAA"),
            PasswordCheck::Mismatch
        );
    }
}
