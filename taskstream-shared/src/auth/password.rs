/// Password hashing using Argon2id
///
/// One-way credential hashing with a randomized salt and configurable cost.
/// The PHC string output embeds algorithm, parameters, and salt, so
/// verification needs no side channel.
///
/// Password values are never logged; only operation outcomes are.
///
/// # Example
///
/// ```
/// use taskstream_shared::auth::password::{hash_password, verify_password, HashingConfig};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = HashingConfig::default();
/// let hash = hash_password("Secret123!", &config)?;
///
/// assert!(verify_password("Secret123!", &hash)?);
/// assert!(!verify_password("wrong_password", &hash)?);
/// # Ok(())
/// # }
/// ```

use crate::error::{AuthError, AuthResult};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};

/// Credential hashing policy
///
/// Defaults match the platform security baseline: Argon2id with 64 MB
/// memory, 3 iterations, 4 lanes, and an 8-character password minimum.
#[derive(Debug, Clone, Copy)]
pub struct HashingConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,

    /// Number of passes
    pub iterations: u32,

    /// Parallel lanes
    pub parallelism: u32,

    /// Minimum accepted password length (characters)
    pub min_password_length: usize,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: 65536, // 64 MB
            iterations: 3,
            parallelism: 4,
            min_password_length: 8,
        }
    }
}

/// Hashes a password with a fresh random salt
///
/// # Errors
///
/// - `AuthError::Validation` if the password is shorter than the configured
///   minimum
/// - `AuthError::Internal` if hashing itself fails
pub fn hash_password(password: &str, config: &HashingConfig) -> AuthResult<String> {
    if password.chars().count() < config.min_password_length {
        tracing::warn!(
            min_length = config.min_password_length,
            "Password rejected: below minimum length"
        );
        return Err(AuthError::Validation(format!(
            "Password must be at least {} characters long",
            config.min_password_length
        )));
    }

    let salt = SaltString::generate(&mut OsRng);

    let params = ParamsBuilder::new()
        .m_cost(config.memory_kib)
        .t_cost(config.iterations)
        .p_cost(config.parallelism)
        .output_len(32)
        .build()
        .map_err(|e| AuthError::Internal(format!("Invalid hashing parameters: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Internal(format!("Hash generation failed: {}", e)))?;

    tracing::debug!("Password hashed");

    Ok(password_hash.to_string())
}

/// Verifies a password against a stored hash
///
/// Returns `Ok(false)` rather than an error for empty input or a malformed
/// hash: a credential check with bad material is a failed check, and the
/// caller's generic-error policy handles the rest. Comparison is
/// constant-time inside argon2.
pub fn verify_password(password: &str, hash: &str) -> AuthResult<bool> {
    if password.is_empty() || hash.is_empty() {
        tracing::debug!("Password verification skipped: empty input");
        return Ok(false);
    }

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(e) => {
            tracing::warn!(error = %e, "Password verification failed: malformed stored hash");
            return Ok(false);
        }
    };

    // Parameters are embedded in the PHC string
    let argon2 = Argon2::default();

    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => {
            tracing::debug!("Password verified");
            Ok(true)
        }
        Err(argon2::password_hash::Error::Password) => {
            tracing::debug!("Password verification failed: mismatch");
            Ok(false)
        }
        Err(e) => Err(AuthError::Internal(format!(
            "Password verification failed: {}",
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> HashingConfig {
        // Low-cost parameters so the suite stays quick
        HashingConfig {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
            min_password_length: 8,
        }
    }

    #[test]
    fn test_hash_produces_phc_string() {
        let hash = hash_password("Secret123!", &fast_config()).expect("hash should succeed");
        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("v=19"));
    }

    #[test]
    fn test_hash_rejects_short_password() {
        let result = hash_password("short1!", &fast_config());
        assert!(matches!(result, Err(AuthError::Validation(_))));
    }

    #[test]
    fn test_min_length_is_configurable() {
        let mut config = fast_config();
        config.min_password_length = 12;
        assert!(hash_password("Secret123!", &config).is_err());

        config.min_password_length = 4;
        assert!(hash_password("Sec1!", &config).is_ok());
    }

    #[test]
    fn test_same_password_different_salts() {
        let config = fast_config();
        let hash1 = hash_password("Secret123!", &config).unwrap();
        let hash2 = hash_password("Secret123!", &config).unwrap();
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_verify_correct_password() {
        let hash = hash_password("Secret123!", &fast_config()).unwrap();
        assert!(verify_password("Secret123!", &hash).unwrap());
    }

    #[test]
    fn test_verify_wrong_password() {
        let hash = hash_password("Secret123!", &fast_config()).unwrap();
        assert!(!verify_password("Secret124!", &hash).unwrap());
    }

    #[test]
    fn test_verify_empty_password_is_false_not_error() {
        let hash = hash_password("Secret123!", &fast_config()).unwrap();
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_verify_malformed_hash_is_false_not_error() {
        assert!(!verify_password("Secret123!", "not-a-phc-string").unwrap());
        assert!(!verify_password("Secret123!", "$argon2id$garbage").unwrap());
        assert!(!verify_password("Secret123!", "").unwrap());
    }

    #[test]
    fn test_hash_verify_roundtrip_unicode() {
        let config = fast_config();
        for password in ["with spaces ok", "pass-word!@#$%", "密码パスワード123"] {
            let hash = hash_password(password, &config).unwrap();
            assert!(
                verify_password(password, &hash).unwrap(),
                "password {:?} should verify",
                password
            );
        }
    }
}
