//! Password hashing behind a capability trait.

/// Error raised while hashing a password.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("bcrypt: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
}

/// Adaptive password hashing capability. The hash format is opaque to the
/// rest of the service.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plain: &str) -> Result<String, HashError>;
    fn compare(&self, hash: &str, plain: &str) -> bool;
}

/// Lowest cost bcrypt accepts; only fit for test fixtures.
const WEAK_COST: u32 = 4;

/// bcrypt-backed [`PasswordHasher`].
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    /// Production-cost hasher.
    pub fn new() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Minimum-cost hasher for test fixtures. Fast, and accordingly weak.
    pub fn weak() -> Self {
        Self { cost: WEAK_COST }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plain: &str) -> Result<String, HashError> {
        Ok(bcrypt::hash(plain, self.cost)?)
    }

    fn compare(&self, hash: &str, plain: &str) -> bool {
        bcrypt::verify(plain, hash).unwrap_or(false)
    }
}
