//! Resolved server configuration
//!
//! The immutable value handed to the lifecycle manager for one start
//! attempt. Construction goes through `SettingsStore` or `Default`;
//! validation lives in `server::validators`.

use std::ops::RangeInclusive;
use std::path::PathBuf;

/// Default control port.
pub const DEFAULT_PORT: u16 = 2121;
/// Default passive data-port range.
pub const DEFAULT_PASSIVE_START: u16 = 60000;
pub const DEFAULT_PASSIVE_END: u16 = 61000;

/// Text encoding used for the control channel and directory listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Gbk,
    Utf8,
}

impl TextEncoding {
    /// Maps the `encoding_idx` settings value (0 = GBK, 1 = UTF-8).
    pub fn from_index(idx: u8) -> Self {
        if idx == 1 {
            TextEncoding::Utf8
        } else {
            TextEncoding::Gbk
        }
    }

    pub fn index(self) -> u8 {
        match self {
            TextEncoding::Gbk => 0,
            TextEncoding::Utf8 => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TextEncoding::Gbk => "GBK",
            TextEncoding::Utf8 => "UTF-8",
        }
    }
}

/// One server instance's requested configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    pub directory: PathBuf,
    pub passive_enabled: bool,
    pub passive_start: u16,
    pub passive_end: u16,
    pub encoding: TextEncoding,
    pub threaded: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            directory: default_directory(),
            passive_enabled: true,
            passive_start: DEFAULT_PASSIVE_START,
            passive_end: DEFAULT_PASSIVE_END,
            encoding: TextEncoding::Gbk,
            threaded: true,
        }
    }
}

impl ServerConfig {
    /// Inclusive passive data-port range, when passive mode is on.
    pub fn passive_range(&self) -> Option<RangeInclusive<u16>> {
        self.passive_enabled
            .then(|| self.passive_start..=self.passive_end)
    }

    /// Root directory as a display string.
    pub fn directory_str(&self) -> String {
        self.directory.to_string_lossy().to_string()
    }
}

/// The working directory, matching the settings-file fallback.
pub(crate) fn default_directory() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_index_round_trips() {
        assert_eq!(TextEncoding::from_index(0), TextEncoding::Gbk);
        assert_eq!(TextEncoding::from_index(1), TextEncoding::Utf8);
        // Out-of-range indices fall back to GBK, the file-format default.
        assert_eq!(TextEncoding::from_index(7), TextEncoding::Gbk);
        assert_eq!(TextEncoding::Utf8.index(), 1);
        assert_eq!(TextEncoding::Gbk.index(), 0);
    }

    #[test]
    fn defaults_match_settings_schema() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 2121);
        assert!(config.passive_enabled);
        assert_eq!(config.passive_start, 60000);
        assert_eq!(config.passive_end, 61000);
        assert_eq!(config.encoding, TextEncoding::Gbk);
        assert!(config.threaded);
    }

    #[test]
    fn passive_range_follows_flag() {
        let mut config = ServerConfig::default();
        assert_eq!(config.passive_range(), Some(60000..=61000));
        config.passive_enabled = false;
        assert_eq!(config.passive_range(), None);
    }
}
