//! Password hashing.

use once_cell::sync::OnceCell;
use thiserror::Error;

/// Hashing failure.
#[derive(Debug, Error)]
#[error("password hashing failed: {0}")]
pub struct HashError(#[from] bcrypt::BcryptError);

/// One-way salted password hashing.
///
/// Implementations are CPU bound; callers run them on the blocking pool.
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password.
    fn hash(&self, password: &str) -> Result<Vec<u8>, HashError>;

    /// Compare a plaintext candidate against a stored hash in constant time.
    ///
    /// A malformed hash never verifies.
    fn verify(&self, password: &str, hash: &[u8]) -> bool;

    /// A valid hash that no real password is expected to match.
    ///
    /// Verified against when the account does not exist, so the unknown-user
    /// path costs the same as the wrong-password path.
    fn decoy_hash(&self) -> &[u8];
}

/// bcrypt-backed [`PasswordHasher`].
#[derive(Debug)]
pub struct BcryptHasher {
    cost: u32,
    decoy: OnceCell<Vec<u8>>,
}

impl BcryptHasher {
    /// Create a hasher with the given bcrypt cost factor.
    pub fn new(cost: u32) -> Self {
        Self {
            cost,
            decoy: OnceCell::new(),
        }
    }

    /// Build the decoy hash now, so no login request pays for it.
    ///
    /// Runs one bcrypt hash at the configured cost; call it off the async runtime.
    pub fn with_decoy(self) -> Self {
        self.decoy_hash();
        self
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, password: &str) -> Result<Vec<u8>, HashError> {
        Ok(bcrypt::hash(password, self.cost)?.into_bytes())
    }

    fn verify(&self, password: &str, hash: &[u8]) -> bool {
        let Ok(hash) = std::str::from_utf8(hash) else {
            return false;
        };
        bcrypt::verify(password, hash).unwrap_or(false)
    }

    fn decoy_hash(&self) -> &[u8] {
        self.decoy.get_or_init(|| {
            let seed = nanoid::nanoid!(32);
            // The cost is validated at config load; fall back to an empty hash,
            // which never verifies, if bcrypt still refuses.
            bcrypt::hash(seed, self.cost)
                .map(String::into_bytes)
                .unwrap_or_default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hashing() {
        let hasher = BcryptHasher::new(4);
        let hash = hasher.hash("pw123").unwrap();

        assert!(hash.starts_with(b"$2"));
        assert!(hasher.verify("pw123", &hash));
        assert!(!hasher.verify("wrong", &hash));
    }

    #[test]
    fn test_hash_is_salted() {
        let hasher = BcryptHasher::new(4);
        let a = hasher.hash("same").unwrap();
        let b = hasher.hash("same").unwrap();
        assert_ne!(a, b);
        assert!(hasher.verify("same", &a));
        assert!(hasher.verify("same", &b));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        let hasher = BcryptHasher::new(4);
        assert!(!hasher.verify("pw", b"not-a-bcrypt-hash"));
        assert!(!hasher.verify("pw", &[0xff, 0xfe]));
        assert!(!hasher.verify("", b""));
    }

    #[test]
    fn test_invalid_cost_is_an_error() {
        let hasher = BcryptHasher::new(99);
        assert!(hasher.hash("pw").is_err());
    }

    #[test]
    fn test_with_decoy_builds_eagerly() {
        let lazy = BcryptHasher::new(4);
        assert!(lazy.decoy.get().is_none());

        let warmed = BcryptHasher::new(4).with_decoy();
        let built = warmed.decoy.get().cloned().unwrap();
        assert!(built.starts_with(b"$2"));
        assert_eq!(warmed.decoy_hash(), built.as_slice());
    }

    #[test]
    fn test_decoy_hash_is_stable_and_valid() {
        let hasher = BcryptHasher::new(4);
        let first = hasher.decoy_hash().to_vec();
        assert!(first.starts_with(b"$2"));
        assert_eq!(hasher.decoy_hash(), first.as_slice());
        assert!(!hasher.verify("pw123", &first));
    }
}
