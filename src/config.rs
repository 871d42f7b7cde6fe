use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub backend_url: String,
    pub tick_interval_ms: u64,
    pub status_poll_interval_ms: u64,
    pub request_timeout_secs: u64,
    pub command_timeout_secs: u64,
    pub drift_threshold_ms: u64,
    pub capture_enabled: bool,
    pub speech_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:5001".to_string(),
            tick_interval_ms: 1000,
            status_poll_interval_ms: 2000,
            request_timeout_secs: 5,
            command_timeout_secs: 45,
            drift_threshold_ms: 250,
            capture_enabled: true,
            speech_enabled: true,
        }
    }
}

impl Config {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_millis(self.status_poll_interval_ms.max(1))
    }

    /// Bound for status polls and the health probe
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Bound for start/stop/respond, which wait on slow backend work
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs.max(1))
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "sous") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("sous_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(err) => {
                log::warn!(
                    "ignoring invalid config {}: {err}",
                    self.path.display()
                );
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config {
            backend_url: "http://kitchen.local:8080".into(),
            tick_interval_ms: 500,
            status_poll_interval_ms: 1500,
            request_timeout_secs: 10,
            command_timeout_secs: 90,
            drift_threshold_ms: 100,
            capture_enabled: false,
            speech_enabled: false,
        };
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn missing_or_invalid_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        assert_eq!(store.load(), Config::default());

        fs::write(&path, b"not json").unwrap();
        assert_eq!(store.load(), Config::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, br#"{"backend_url": "http://10.0.0.2:5001"}"#).unwrap();
        let cfg = FileConfigStore::with_path(&path).load();
        assert_eq!(cfg.backend_url, "http://10.0.0.2:5001");
        assert_eq!(cfg.status_poll_interval_ms, 2000);
        assert_eq!(cfg.drift_threshold_ms, 250);
        assert_eq!(cfg.command_timeout_secs, 45);
    }

    #[test]
    fn durations_are_never_zero() {
        let cfg = Config {
            tick_interval_ms: 0,
            status_poll_interval_ms: 0,
            request_timeout_secs: 0,
            command_timeout_secs: 0,
            ..Config::default()
        };
        assert_eq!(cfg.tick_interval(), Duration::from_millis(1));
        assert_eq!(cfg.status_poll_interval(), Duration::from_millis(1));
        assert_eq!(cfg.request_timeout(), Duration::from_secs(1));
        assert_eq!(cfg.command_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn commands_wait_longer_than_polls() {
        let cfg = Config::default();
        assert!(cfg.command_timeout() > cfg.request_timeout());
    }
}
