//! PIN format validation and one-way hashing.
//!
//! PINs are fixed-length digit strings. They are stored only as Argon2id PHC
//! strings (`$argon2id$v=19$m=…,t=…,p=…$salt$hash`), so the cost parameters
//! used at provisioning travel with each hash and verification always uses
//! them, whatever the current configuration says.

use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};

use pinchat_config::PinConfig;

/// A syntactically valid PIN. The digits never appear in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Pin(String);

impl Pin {
    /// Validate `raw` as exactly `length` ASCII digits.
    pub fn parse(raw: &str, length: usize) -> Result<Self, PinFormatError> {
        if raw.len() != length {
            return Err(PinFormatError::WrongLength {
                expected: length,
                actual: raw.chars().count(),
            });
        }
        if !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PinFormatError::NonDigit);
        }
        Ok(Self(raw.to_string()))
    }

    /// Generate a random PIN of `length` digits.
    pub fn generate(length: usize) -> Self {
        use rand::Rng;
        let mut rng = rand::rng();
        let digits = (0..length)
            .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
            .collect();
        Self(digits)
    }

    /// The plaintext digits.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Pin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Pin([REDACTED])")
    }
}

/// Why a string is not a PIN.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PinFormatError {
    #[error("expected {expected} digits, got {actual} characters")]
    WrongLength { expected: usize, actual: usize },

    #[error("PIN must contain digits only")]
    NonDigit,
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("Invalid hashing parameters: {0}")]
    InvalidParams(String),

    #[error("Stored hash is malformed: {0}")]
    MalformedHash(String),

    #[error("Hashing failed: {0}")]
    HashingFailed(String),
}

/// Argon2id hasher for PINs.
pub struct PinHasher {
    argon2: Argon2<'static>,
}

impl PinHasher {
    /// Create a hasher with explicit cost parameters.
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, HashError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| HashError::InvalidParams(e.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub fn from_config(config: &PinConfig) -> Result<Self, HashError> {
        Self::new(config.memory_kib, config.iterations, config.parallelism)
    }

    /// Hash a PIN with a fresh random salt.
    pub fn hash(&self, pin: &Pin) -> Result<String, HashError> {
        use rand::Rng;
        let mut salt_bytes = [0u8; 16];
        rand::rng().fill(&mut salt_bytes[..]);
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| HashError::HashingFailed(e.to_string()))?;

        self.argon2
            .hash_password(pin.expose().as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| HashError::HashingFailed(e.to_string()))
    }

    /// Compare a PIN against a stored hash using the parameters encoded in
    /// the hash. Returns `Ok(false)` on a plain mismatch.
    pub fn verify(&self, pin: &Pin, stored_hash: &str) -> Result<bool, HashError> {
        let parsed =
            PasswordHash::new(stored_hash).map_err(|e| HashError::MalformedHash(e.to_string()))?;

        match self.argon2.verify_password(pin.expose().as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(HashError::HashingFailed(e.to_string())),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_hasher() -> PinHasher {
    // Minimum Argon2 cost keeps the test suite fast.
    PinHasher::new(8, 1, 1).unwrap()
}
