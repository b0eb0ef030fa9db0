//! Settings persistence
//!
//! Loads and saves the `[server]` section of the INI settings file. A
//! missing file, section, or key falls back to its default; environment
//! variables prefixed `FTPD` override file values. The store only resolves
//! settings into a `ServerConfig` — the lifecycle manager never touches the
//! file itself.

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::settings::{
    DEFAULT_PASSIVE_END, DEFAULT_PASSIVE_START, DEFAULT_PORT, ServerConfig, TextEncoding,
    default_directory,
};
use crate::error::SettingsError;

#[derive(Debug, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    server: ServerSection,
}

/// Raw `[server]` section as it appears on disk.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct ServerSection {
    port: u16,
    directory: String,
    passive: bool,
    passive_start: u16,
    passive_end: u16,
    encoding_idx: u8,
    threading_idx: u8,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            // Empty means "resolve to the working directory at load time".
            directory: String::new(),
            passive: true,
            passive_start: DEFAULT_PASSIVE_START,
            passive_end: DEFAULT_PASSIVE_END,
            encoding_idx: 0,
            threading_idx: 1,
        }
    }
}

impl ServerSection {
    fn resolve(self) -> ServerConfig {
        let directory = if self.directory.is_empty() {
            default_directory()
        } else {
            PathBuf::from(self.directory)
        };
        ServerConfig {
            port: self.port,
            directory,
            passive_enabled: self.passive,
            passive_start: self.passive_start,
            passive_end: self.passive_end,
            encoding: TextEncoding::from_index(self.encoding_idx),
            threaded: self.threading_idx != 0,
        }
    }
}

/// Reads and writes the settings file at a fixed path.
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the settings file, applying defaults and `FTPD`-prefixed
    /// environment overrides (`FTPD_SERVER__PORT`, ...).
    pub fn load(&self) -> Result<ServerConfig, SettingsError> {
        let settings = Config::builder()
            .add_source(
                File::from(self.path.as_path())
                    .format(FileFormat::Ini)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix("FTPD")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;
        let file: SettingsFile = settings.try_deserialize()?;
        Ok(file.server.resolve())
    }

    /// Writes the full `[server]` section; a later `load` round-trips every
    /// field.
    pub fn save(&self, config: &ServerConfig) -> Result<(), SettingsError> {
        let body = format!(
            "[server]\n\
             port = {}\n\
             directory = {}\n\
             passive = {}\n\
             passive_start = {}\n\
             passive_end = {}\n\
             encoding_idx = {}\n\
             threading_idx = {}\n",
            config.port,
            config.directory_str(),
            config.passive_enabled,
            config.passive_start,
            config.passive_end,
            config.encoding.index(),
            u8::from(config.threaded),
        );
        fs::write(&self.path, body).map_err(|source| SettingsError::Save {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::{Mutex, MutexGuard, OnceLock};

    fn store_in(dir: &tempfile::TempDir) -> SettingsStore {
        SettingsStore::new(dir.path().join("ftpserver.ini"))
    }

    // Environment variables are process-global, so every test that loads
    // settings holds this lock while `FTPD_*` overrides may be in play.
    fn env_lock() -> MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn missing_file_yields_defaults() {
        let _env = env_lock();
        let dir = tempfile::tempdir().unwrap();
        let config = store_in(&dir).load().unwrap();
        assert_eq!(config.port, 2121);
        assert!(config.passive_enabled);
        assert_eq!(config.passive_start, 60000);
        assert_eq!(config.passive_end, 61000);
        assert_eq!(config.encoding, TextEncoding::Gbk);
        assert!(config.threaded);
    }

    #[test]
    fn missing_keys_fall_back_individually() {
        let _env = env_lock();
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "[server]\nport = 2222\npassive = false\n").unwrap();

        let config = store.load().unwrap();
        assert_eq!(config.port, 2222);
        assert!(!config.passive_enabled);
        assert_eq!(config.passive_start, 60000);
        assert_eq!(config.encoding, TextEncoding::Gbk);
    }

    #[test]
    fn environment_overrides_file_values() {
        let _env = env_lock();
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "[server]\nport = 2222\npassive = false\n").unwrap();

        unsafe {
            std::env::set_var("FTPD_SERVER__PORT", "2323");
            std::env::set_var("FTPD_SERVER__ENCODING_IDX", "1");
        }
        let loaded = store.load();
        unsafe {
            std::env::remove_var("FTPD_SERVER__PORT");
            std::env::remove_var("FTPD_SERVER__ENCODING_IDX");
        }

        let config = loaded.unwrap();
        assert_eq!(config.port, 2323);
        assert_eq!(config.encoding, TextEncoding::Utf8);
        // File values without an override still apply.
        assert!(!config.passive_enabled);
    }

    #[test]
    fn save_then_load_round_trips_every_field() {
        let _env = env_lock();
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let config = ServerConfig {
            port: 2120,
            directory: PathBuf::from("/tmp"),
            passive_enabled: false,
            passive_start: 50000,
            passive_end: 50100,
            encoding: TextEncoding::Utf8,
            threaded: false,
        };

        store.save(&config).unwrap();
        assert_eq!(store.load().unwrap(), config);
    }

    #[test]
    fn save_to_unwritable_path_reports_the_path() {
        let store = SettingsStore::new("/nonexistent/dir/ftpserver.ini");
        let err = store.save(&ServerConfig::default()).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/dir/ftpserver.ini"));
    }
}
