//! Configuration validation
//!
//! Every rule is evaluated; callers get the complete failure set in one
//! pass rather than fixing one field per attempt. An invalid configuration
//! is a normal outcome here, not an exception.

use std::fs;
use std::path::Path;

use crate::config::ServerConfig;
use crate::error::{ValidationFailure, ValidationRule};

/// Bounds for passive data-channel ports.
pub const MIN_PASSIVE_PORT: u16 = 1024;
pub const MAX_PASSIVE_PORT: u16 = 65535;

/// Checks `config` against every rule, in order: control port, root
/// directory, passive bounds, passive ordering. Empty on success.
pub fn validate(config: &ServerConfig) -> Vec<ValidationFailure> {
    let mut failures = Vec::new();

    if config.port == 0 {
        failures.push(ValidationFailure::new(
            ValidationRule::BadPort,
            "port must be between 1 and 65535",
        ));
    }

    if !directory_readable(&config.directory) {
        failures.push(ValidationFailure::new(
            ValidationRule::BadDirectory,
            format!(
                "root directory not found or not readable: {}",
                config.directory.display()
            ),
        ));
    }

    if config.passive_enabled {
        if config.passive_start < MIN_PASSIVE_PORT || config.passive_end < MIN_PASSIVE_PORT {
            failures.push(ValidationFailure::new(
                ValidationRule::BadPassiveRange,
                format!(
                    "passive ports must be between {} and {}",
                    MIN_PASSIVE_PORT, MAX_PASSIVE_PORT
                ),
            ));
        }
        if config.passive_start >= config.passive_end {
            failures.push(ValidationFailure::new(
                ValidationRule::InvertedPassiveRange,
                "passive range start must be below its end",
            ));
        }
    }

    failures
}

fn directory_readable(path: &Path) -> bool {
    path.is_dir() && fs::read_dir(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn valid_config(dir: &tempfile::TempDir) -> ServerConfig {
        ServerConfig {
            directory: dir.path().to_path_buf(),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn valid_config_passes_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate(&valid_config(&dir)).is_empty());
    }

    #[test]
    fn port_zero_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            port: 0,
            ..valid_config(&dir)
        };
        let failures = validate(&config);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].rule, ValidationRule::BadPort);
    }

    #[test]
    fn missing_directory_is_rejected() {
        let config = ServerConfig {
            directory: PathBuf::from("/no/such/directory"),
            ..ServerConfig::default()
        };
        let failures = validate(&config);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].rule, ValidationRule::BadDirectory);
    }

    #[test]
    fn passive_ports_below_1024_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            passive_start: 80,
            passive_end: 60000,
            ..valid_config(&dir)
        };
        let failures = validate(&config);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].rule, ValidationRule::BadPassiveRange);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            passive_start: 60010,
            passive_end: 60000,
            ..valid_config(&dir)
        };
        let failures = validate(&config);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].rule, ValidationRule::InvertedPassiveRange);
    }

    #[test]
    fn equal_bounds_count_as_inverted() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            passive_start: 60000,
            passive_end: 60000,
            ..valid_config(&dir)
        };
        let failures = validate(&config);
        assert_eq!(failures[0].rule, ValidationRule::InvertedPassiveRange);
    }

    #[test]
    fn inverted_range_reported_regardless_of_other_failures() {
        // Every other field invalid too; the inverted-range rule must still
        // surface.
        let config = ServerConfig {
            port: 0,
            directory: PathBuf::from("/no/such/directory"),
            passive_start: 500,
            passive_end: 80,
            ..ServerConfig::default()
        };
        let failures = validate(&config);
        assert!(
            failures
                .iter()
                .any(|f| f.rule == ValidationRule::InvertedPassiveRange)
        );
        assert!(failures.iter().any(|f| f.rule == ValidationRule::BadPort));
        assert!(
            failures
                .iter()
                .any(|f| f.rule == ValidationRule::BadDirectory)
        );
        assert!(
            failures
                .iter()
                .any(|f| f.rule == ValidationRule::BadPassiveRange)
        );
    }

    #[test]
    fn passive_rules_skipped_when_passive_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            passive_enabled: false,
            passive_start: 60010,
            passive_end: 60000,
            ..valid_config(&dir)
        };
        assert!(validate(&config).is_empty());
    }
}
