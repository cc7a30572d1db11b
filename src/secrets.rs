//! Credential loading
//!
//! API keys are read from the environment and held in `Zeroizing<String>` so
//! they are wiped from memory on drop. A value of the form
//! `op://vault/item/field` is a 1Password reference and is resolved through
//! the `op` CLI instead of being used literally.

use std::env;
use tracing::{debug, info};
use zeroize::Zeroizing;

const OP_REFERENCE_PREFIX: &str = "op://";

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("Secret not found: none of {0} is set")]
    NotFound(String),

    #[error("1Password CLI error: {0}")]
    OnePasswordError(String),

    #[error("Secret validation failed: {0}")]
    ValidationFailed(String),
}

/// Load a required secret from the first set variable in `env_var_names`
///
/// The first name is the canonical one; later names are accepted as
/// fallbacks (e.g. `EXCHANGE_ACCESS_KEY`, then `UPBIT_ACCESS_KEY`).
pub fn load_secret(env_var_names: &[&str]) -> Result<Zeroizing<String>, SecretError> {
    load_optional_secret(env_var_names)?
        .ok_or_else(|| SecretError::NotFound(env_var_names.join(", ")))
}

/// Like [`load_secret`], but an unset secret is `Ok(None)`
pub fn load_optional_secret(
    env_var_names: &[&str],
) -> Result<Option<Zeroizing<String>>, SecretError> {
    for name in env_var_names {
        let Some(value) = load_from_env(name) else {
            continue;
        };

        if value.starts_with(OP_REFERENCE_PREFIX) {
            let secret = load_from_op_cli(&value)?;
            info!("✓ Loaded secret from 1Password CLI: {}", name);
            return Ok(Some(secret));
        }

        validate_secret(name, &value)?;
        debug!("Loaded secret from environment variable: {}", name);
        return Ok(Some(value));
    }

    Ok(None)
}

fn load_from_env(env_var_name: &str) -> Option<Zeroizing<String>> {
    env::var(env_var_name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(Zeroizing::new)
}

/// Resolve a 1Password reference
fn load_from_op_cli(reference: &str) -> Result<Zeroizing<String>, SecretError> {
    use std::process::Command;

    let output = Command::new("op")
        .arg("read")
        .arg(reference)
        .output()
        .map_err(|e| {
            SecretError::OnePasswordError(format!(
                "Failed to execute 'op' command: {}. Install 1Password CLI from https://developer.1password.com/docs/cli",
                e
            ))
        })?;

    if !output.status.success() {
        let error_msg = String::from_utf8_lossy(&output.stderr);
        return Err(SecretError::OnePasswordError(format!(
            "1Password CLI failed: {}",
            error_msg
        )));
    }

    let secret = String::from_utf8(output.stdout)
        .map_err(|e| SecretError::OnePasswordError(format!("Invalid UTF-8 from 1Password: {}", e)))?
        .trim()
        .to_string();

    if secret.is_empty() {
        return Err(SecretError::OnePasswordError(
            "1Password returned empty secret".to_string(),
        ));
    }

    Ok(Zeroizing::new(secret))
}

/// Reject values that are clearly template placeholders
fn validate_secret(name: &str, secret: &str) -> Result<(), SecretError> {
    if secret.chars().any(char::is_whitespace) {
        return Err(SecretError::ValidationFailed(format!(
            "{} contains whitespace",
            name
        )));
    }

    let placeholders = ["your_", "changeme", "placeholder", "<"];
    let secret_lower = secret.to_lowercase();
    for pattern in &placeholders {
        if secret_lower.starts_with(pattern) {
            return Err(SecretError::ValidationFailed(format!(
                "{} looks like a placeholder ({})",
                name, pattern
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_secret_first_set_name_wins() {
        env::remove_var("TEST_SECRET_PRIMARY_A");
        env::set_var("TEST_SECRET_FALLBACK_A", "fallback-value");
        let secret = load_secret(&["TEST_SECRET_PRIMARY_A", "TEST_SECRET_FALLBACK_A"]).unwrap();
        assert_eq!(secret.as_str(), "fallback-value");

        env::set_var("TEST_SECRET_PRIMARY_A", "primary-value");
        let secret = load_secret(&["TEST_SECRET_PRIMARY_A", "TEST_SECRET_FALLBACK_A"]).unwrap();
        assert_eq!(secret.as_str(), "primary-value");

        env::remove_var("TEST_SECRET_PRIMARY_A");
        env::remove_var("TEST_SECRET_FALLBACK_A");
    }

    #[test]
    fn test_load_secret_missing() {
        let result = load_secret(&["TEST_SECRET_NONEXISTENT"]);
        assert!(matches!(result, Err(SecretError::NotFound(_))));
        assert!(load_optional_secret(&["TEST_SECRET_NONEXISTENT"])
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_blank_value_is_unset() {
        env::set_var("TEST_SECRET_BLANK", "   ");
        assert!(load_optional_secret(&["TEST_SECRET_BLANK"]).unwrap().is_none());
        env::remove_var("TEST_SECRET_BLANK");
    }

    #[test]
    fn test_placeholder_rejected() {
        env::set_var("TEST_SECRET_PLACEHOLDER", "your_access_key_here");
        let result = load_secret(&["TEST_SECRET_PLACEHOLDER"]);
        assert!(matches!(result, Err(SecretError::ValidationFailed(_))));
        env::remove_var("TEST_SECRET_PLACEHOLDER");
    }

    #[test]
    fn test_validate_secret() {
        assert!(validate_secret("KEY", "abc123DEF").is_ok());
        assert!(validate_secret("KEY", "abc 123").is_err());
        assert!(validate_secret("KEY", "<secret>").is_err());
    }
}
