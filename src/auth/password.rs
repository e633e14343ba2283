use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::{debug, error};

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Verify a plaintext password against a stored digest.
///
/// A digest that does not parse counts as a mismatch, not an error; empty
/// input never reaches this point (the form validator rejects it first).
pub fn verify_password(plain: &str, digest: &str) -> bool {
    let parsed = match PasswordHash::new(digest) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!(error = %e, "unparseable password digest");
            return false;
        }
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let digest = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &digest));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let password = "correct-horse-battery-staple";
        let digest = hash_password(password).expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &digest));
    }

    #[test]
    fn malformed_digest_is_a_mismatch_not_an_error() {
        assert!(!verify_password("anything", "not-a-valid-digest"));
        assert!(!verify_password("anything", ""));
    }

    #[test]
    fn digest_never_equals_plaintext() {
        let password = "longenough1";
        let digest = hash_password(password).expect("hashing should succeed");
        assert_ne!(digest, password);
    }

    #[test]
    fn repeated_hashing_salts_freshly() {
        let password = "same-input-twice";
        let first = hash_password(password).expect("hash");
        let second = hash_password(password).expect("hash");
        assert_ne!(first, second);
        assert!(verify_password(password, &first));
        assert!(verify_password(password, &second));
    }
}
