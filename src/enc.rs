use std::env;

use argonautica::{Hasher, Verifier};

use crate::error::ApiError;

fn hash_secret() -> Result<String, ApiError> {
    env::var("HASH_SECRET").map_err(|_| ApiError::Hash("HASH_SECRET is not set".to_string()))
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let secret = hash_secret()?;

    let mut hasher = Hasher::default();
    hasher
        .with_password(password)
        .with_secret_key(&secret)
        .configure_iterations(30)
        .configure_memory_size(4096)
        .configure_variant(argonautica::config::Variant::Argon2id)
        .hash()
        .map_err(|e| ApiError::Hash(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    let secret = hash_secret()?;

    let mut verifier = Verifier::default();
    verifier
        .with_hash(hash)
        .with_password(password)
        .with_secret_key(&secret)
        .verify()
        .map_err(|e| ApiError::Hash(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_roundtrip() {
        std::env::set_var("HASH_SECRET", "test-secret");
        let hash = hash_password("hunter2!").unwrap();
        assert!(verify_password("hunter2!", &hash).unwrap());
        assert!(!verify_password("hunter3!", &hash).unwrap());
    }
}
