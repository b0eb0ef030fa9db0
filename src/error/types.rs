//! Error types
//!
//! Defines domain-specific error types for each stage of the server
//! lifecycle. Display strings are the short operator-facing messages; the
//! log stream carries the verbose causes.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Identifies which validation rule a configuration violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationRule {
    BadPort,
    BadDirectory,
    BadPassiveRange,
    InvertedPassiveRange,
}

/// A single configuration rule violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub rule: ValidationRule,
    pub message: String,
}

impl ValidationFailure {
    pub fn new(rule: ValidationRule, message: impl Into<String>) -> Self {
        Self {
            rule,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// The port or range found occupied during pre-start checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortConflict {
    Control(u16),
    Passive { start: u16, end: u16 },
}

impl fmt::Display for PortConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortConflict::Control(port) => write!(f, "port {} already in use", port),
            PortConflict::Passive { start, end } => {
                write!(f, "passive range {}-{} overlaps an in-use port", start, end)
            }
        }
    }
}

/// Errors returned by `ServerManager::start`.
#[derive(Debug)]
pub enum StartError {
    ValidationFailed(Vec<ValidationFailure>),
    PortConflict(PortConflict),
    Engine(io::Error),
}

impl fmt::Display for StartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartError::ValidationFailed(failures) => {
                write!(f, "invalid configuration: ")?;
                for (i, failure) in failures.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", failure)?;
                }
                Ok(())
            }
            StartError::PortConflict(conflict) => write!(f, "{}", conflict),
            StartError::Engine(e) => write!(f, "engine failed to start: {}", e),
        }
    }
}

impl std::error::Error for StartError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StartError::Engine(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PortConflict> for StartError {
    fn from(conflict: PortConflict) -> Self {
        StartError::PortConflict(conflict)
    }
}

/// Errors returned by `ServerManager::stop`.
///
/// A stop that merely exceeds the grace period is not an error; the manager
/// forces termination and logs a warning. Only a supervisory task that died
/// on its own is surfaced.
#[derive(Debug)]
pub enum StopError {
    SupervisorPanicked(String),
}

impl fmt::Display for StopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopError::SupervisorPanicked(msg) => {
                write!(f, "supervisory task panicked: {}", msg)
            }
        }
    }
}

impl std::error::Error for StopError {}

/// Errors from loading or saving the settings file.
#[derive(Debug)]
pub enum SettingsError {
    Load(config::ConfigError),
    Save { path: PathBuf, source: io::Error },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Load(e) => write!(f, "failed to load settings: {}", e),
            SettingsError::Save { path, source } => {
                write!(f, "failed to save settings to {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SettingsError::Load(e) => Some(e),
            SettingsError::Save { source, .. } => Some(source),
        }
    }
}

impl From<config::ConfigError> for SettingsError {
    fn from(error: config::ConfigError) -> Self {
        SettingsError::Load(error)
    }
}
