//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::{Config, MAX_CUTOFF_DAYS, StoreBackend};
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("unread.cutoff_days must be at most {max}, got {value}")]
    CutoffOutOfRange { value: i64, max: i64 },
    #[error("unread.max_candidates must be greater than zero")]
    ZeroCandidates,
    #[error("store.path is required for the redb backend")]
    MissingStorePath,
    #[error("store.path parent directory does not exist: {0}")]
    StorePathInvalid(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.unread.cutoff_days > MAX_CUTOFF_DAYS {
        errors.push(ValidationError::CutoffOutOfRange {
            value: config.unread.cutoff_days,
            max: MAX_CUTOFF_DAYS,
        });
    }

    if config.unread.max_candidates == 0 {
        errors.push(ValidationError::ZeroCandidates);
    }

    if config.store.backend == StoreBackend::Redb {
        if config.store.path.is_empty() {
            errors.push(ValidationError::MissingStorePath);
        } else if let Some(parent) = Path::new(&config.store.path).parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            errors.push(ValidationError::StorePathInvalid(
                parent.display().to_string(),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn huge_cutoff_days_rejected() {
        let config = Config::from_toml("[unread]\ncutoff_days = 200000000000\n").unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(matches!(
            errors[0],
            ValidationError::CutoffOutOfRange {
                value: 200_000_000_000,
                ..
            }
        ));
    }

    #[test]
    fn max_cutoff_days_accepted() {
        let mut config = Config::default();
        config.unread.cutoff_days = MAX_CUTOFF_DAYS;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn zero_candidates_rejected() {
        let mut config = Config::default();
        config.unread.max_candidates = 0;
        let errors = validate(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::ZeroCandidates));
    }

    #[test]
    fn redb_path_parent_must_exist() {
        let mut config = Config::default();
        config.store.backend = StoreBackend::Redb;
        config.store.path = "/definitely/not/here/unread.redb".to_string();
        let errors = validate(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::StorePathInvalid(_)));
    }

    #[test]
    fn redb_relative_path_is_valid() {
        let mut config = Config::default();
        config.store.backend = StoreBackend::Redb;
        config.store.path = "unread.redb".to_string();
        assert!(validate(&config).is_ok());
    }
}
