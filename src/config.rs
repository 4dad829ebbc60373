//! Configuration management for automation-voice.
//!
//! Loads config from YAML files in standard locations. Every section has
//! defaults, so a missing or broken file never prevents the voice from loading.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Where the relay listener is reachable.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub endpoint: PathBuf,
}

impl Default for RelayConfig {
    fn default() -> Self {
        #[cfg(windows)]
        let endpoint = PathBuf::from(r"\\.\pipe\automation_voice");
        #[cfg(not(windows))]
        let endpoint = PathBuf::from("/tmp/automation-voice/relay.sock");

        Self { endpoint }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VocalizerConfig {
    /// Fixed path of the child rendering process.
    pub executable: PathBuf,
    pub poll_period_ms: u64,
    /// Capacity of the child environment block, in platform character units.
    pub env_capacity: usize,
    /// Command the `vocalizer` child pipes its words into.
    pub speech_command: Vec<String>,
    /// Directory the child is started in. Inherited when unset.
    pub working_dir: Option<PathBuf>,
}

impl VocalizerConfig {
    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.poll_period_ms.max(1))
    }
}

impl Default for VocalizerConfig {
    fn default() -> Self {
        #[cfg(windows)]
        let executable = PathBuf::from(r"C:\Program Files\Automation Voice\vocalizer.exe");
        #[cfg(not(windows))]
        let executable = PathBuf::from("/usr/local/lib/automation-voice/vocalizer");

        Self {
            executable,
            poll_period_ms: 100,
            env_capacity: 32 * 1024,
            speech_command: vec!["espeak-ng".into()],
            working_dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// When set, a timestamped log file is written here in addition to stderr.
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub relay: RelayConfig,
    pub vocalizer: VocalizerConfig,
    pub logging: LoggingConfig,
}

/// Name looked up in the working directory before the per-user and system files.
const LOCAL_CONFIG_NAME: &str = "automation-voice.yaml";

impl Config {
    /// Load the voice configuration, or defaults when none is usable.
    ///
    /// Without an explicit `path` the first existing file among
    /// [`search_paths`](Self::search_paths) is used. The voice must load even
    /// when its configuration is broken, so read and parse failures only warn.
    pub fn load(path: Option<&Path>) -> Self {
        let found = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::search_paths().into_iter().find(|p| p.is_file()),
        };
        let Some(file) = found else {
            info!("No automation-voice config found; vocalizer and relay use built-in defaults");
            return Self::default();
        };

        let parsed = std::fs::read_to_string(&file)
            .map_err(|e| e.to_string())
            .and_then(|contents| Self::from_yaml(&contents).map_err(|e| e.to_string()));
        match parsed {
            Ok(config) => {
                info!(
                    "Voice config {} (relay {}, vocalizer {})",
                    file.display(),
                    config.relay.endpoint.display(),
                    config.vocalizer.executable.display()
                );
                config
            }
            Err(e) => {
                warn!("Ignoring voice config {}: {e}", file.display());
                Self::default()
            }
        }
    }

    /// Candidate files in lookup order: the working directory (where the
    /// supervisor may place a per-run file for the child), then the user's
    /// config directory, then the system-wide file.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(3);
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd.join(LOCAL_CONFIG_NAME));
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("automation-voice").join("config.yaml"));
        }
        #[cfg(unix)]
        paths.push(PathBuf::from("/etc/automation-voice/config.yaml"));
        paths
    }

    pub fn from_yaml(contents: &str) -> Result<Self, serde_yml::Error> {
        serde_yml::from_str(contents)
    }
}
