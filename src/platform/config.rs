// Oxygen - platform/config.rs
//
// Platform directory resolution and config.toml loading with startup
// validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance. The user-facing workspace (saved scripts and
// the auto-execute folder) lives directly under the home directory.

use crate::core::model::ExecutorKind;
use crate::util::constants;
use crate::util::error::ConfigError;
use directories::{BaseDirs, ProjectDirs};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

/// Resolved platform paths for Oxygen data and configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/oxygen/ or ~/Library/Application Support/Oxygen/)
    pub config_dir: PathBuf,

    /// Data directory for application state.
    pub data_dir: PathBuf,

    /// User workspace (~/Oxygen).
    pub workspace_dir: PathBuf,

    /// Saved scripts (~/Oxygen/Scripts).
    pub scripts_dir: PathBuf,

    /// Scripts the executor runs on attach (~/Oxygen/AutoExec).
    pub autoexec_dir: PathBuf,

    /// Directory the game client writes its rotating logs to.
    pub log_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to the current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        let home = match BaseDirs::new() {
            Some(base) => base.home_dir().to_path_buf(),
            None => {
                tracing::warn!("Could not determine home directory, using current directory");
                PathBuf::from(".")
            }
        };

        let (config_dir, data_dir) = match ProjectDirs::from("", "", constants::APP_ID) {
            Some(proj_dirs) => (
                proj_dirs.config_dir().to_path_buf(),
                proj_dirs.data_dir().to_path_buf(),
            ),
            None => {
                tracing::warn!("Could not determine platform directories, using current directory");
                (PathBuf::from("."), PathBuf::from("."))
            }
        };

        let workspace_dir = home.join(constants::WORKSPACE_DIR_NAME);
        let log_dir = constants::DEFAULT_LOG_DIR_RELATIVE
            .iter()
            .fold(home.clone(), |acc, part| acc.join(part));

        let paths = Self {
            config_dir,
            data_dir,
            scripts_dir: workspace_dir.join(constants::SCRIPTS_DIR_NAME),
            autoexec_dir: workspace_dir.join(constants::AUTOEXEC_DIR_NAME),
            workspace_dir,
            log_dir,
        };

        tracing::debug!(
            config = %paths.config_dir.display(),
            workspace = %paths.workspace_dir.display(),
            logs = %paths.log_dir.display(),
            "Platform paths resolved"
        );

        paths
    }

    /// Location of config.toml.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }

    /// Create the workspace folders if they do not exist yet.
    pub fn ensure_workspace(&self) -> std::io::Result<()> {
        for dir in [&self.workspace_dir, &self.scripts_dir, &self.autoexec_dir] {
            super::fs::ensure_dir(dir)?;
        }
        Ok(())
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[executor]` section.
    pub executor: ExecutorSection,
    /// `[log_watch]` section.
    pub log_watch: LogWatchSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[executor]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ExecutorSection {
    /// Executor selected at startup: MacSploit, Opiumware, Hydrogen (or A/B/C).
    pub default: Option<String>,
    /// Host the executors listen on.
    pub host: Option<String>,
}

/// `[log_watch]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LogWatchSection {
    /// Override for the client log directory.
    pub directory: Option<String>,
    /// How often to re-resolve the newest log file (ms).
    pub rescan_interval_ms: Option<u64>,
    /// File name globs recognised as log files.
    pub include_patterns: Option<Vec<String>>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
    /// Log file path (empty = stderr only).
    pub file: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
///
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // -- Executor --
    /// Executor selected at startup.
    pub executor: ExecutorKind,
    /// Host the executors listen on.
    pub host: IpAddr,

    // -- Log watch --
    /// Override for the client log directory (`None` = platform default).
    pub log_dir: Option<PathBuf>,
    /// Rescan interval in ms.
    pub rescan_interval_ms: u64,
    /// Recognised log file name globs.
    pub log_patterns: Vec<String>,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
    /// Log file path.
    pub log_file: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            executor: ExecutorKind::default(),
            host: default_host(),
            log_dir: None,
            rescan_interval_ms: constants::DEFAULT_LOG_RESCAN_INTERVAL_MS,
            log_patterns: constants::DEFAULT_LOG_PATTERNS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            log_level: None,
            log_file: None,
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([127, 0, 0, 1])
}

/// Load and validate the config file at `config_path`.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// If the file does not exist, returns defaults with no warnings (first-run).
/// If the file is unparseable, returns defaults with a warning; the
/// application still starts but the user is informed.
pub fn load_config(config_path: &Path) -> (AppConfig, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), warnings);
    }

    let content = match std::fs::read_to_string(config_path) {
        Ok(c) => c,
        Err(source) => {
            let err = ConfigError::Io {
                path: config_path.to_path_buf(),
                source,
            };
            let msg = format!("{err}. Using defaults.");
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    let (config, mut parse_warnings) = parse_config(&content);
    if parse_warnings.is_empty() {
        tracing::info!(path = %config_path.display(), "Loaded config.toml");
    }
    warnings.append(&mut parse_warnings);
    (config, warnings)
}

/// Validate config.toml content. Separated from `load_config` so the
/// validation rules can be exercised without touching disk.
pub fn parse_config(content: &str) -> (AppConfig, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();

    let raw: RawConfig = match toml::from_str(content) {
        Ok(r) => r,
        Err(source) => {
            let err = ConfigError::TomlParse {
                path: PathBuf::from(constants::CONFIG_FILE_NAME),
                source,
            };
            let msg = format!("{err}. Using defaults.");
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    let mut config = AppConfig::default();

    // -- Executor: default --
    if let Some(ref name) = raw.executor.default {
        match name.parse::<ExecutorKind>() {
            Ok(kind) => config.executor = kind,
            Err(e) => warnings.push(format!("[executor] default: {e}. Using MacSploit.")),
        }
    }

    // -- Executor: host --
    if let Some(ref host) = raw.executor.host {
        match host.parse::<IpAddr>() {
            Ok(ip) => config.host = ip,
            Err(_) => warnings.push(format!(
                "[executor] host = \"{host}\" is not an IP address. Using {}.",
                constants::DEFAULT_EXECUTOR_HOST
            )),
        }
    }

    // -- Log watch: directory --
    if let Some(ref dir) = raw.log_watch.directory {
        if !dir.is_empty() {
            config.log_dir = Some(PathBuf::from(dir));
        }
    }

    // -- Log watch: rescan_interval_ms --
    if let Some(ms) = raw.log_watch.rescan_interval_ms {
        if (constants::MIN_LOG_RESCAN_INTERVAL_MS..=constants::MAX_LOG_RESCAN_INTERVAL_MS)
            .contains(&ms)
        {
            config.rescan_interval_ms = ms;
        } else {
            let err = ConfigError::ValueOutOfRange {
                field: "log_watch.rescan_interval_ms".to_string(),
                value: ms.to_string(),
                expected: format!(
                    "{}-{}",
                    constants::MIN_LOG_RESCAN_INTERVAL_MS,
                    constants::MAX_LOG_RESCAN_INTERVAL_MS
                ),
            };
            warnings.push(format!(
                "{err}. Using default ({}).",
                constants::DEFAULT_LOG_RESCAN_INTERVAL_MS
            ));
        }
    }

    // -- Log watch: include_patterns --
    if let Some(patterns) = raw.log_watch.include_patterns {
        let (valid, invalid): (Vec<String>, Vec<String>) = patterns
            .into_iter()
            .partition(|p| glob::Pattern::new(p).is_ok());
        for p in &invalid {
            warnings.push(format!("[log_watch] include_patterns: '{p}' is not a valid glob."));
        }
        if valid.is_empty() {
            warnings.push("[log_watch] include_patterns has no valid entries. Using default (*.log).".to_string());
        } else {
            config.log_patterns = valid;
        }
    }

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.clone());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    // -- Logging: file --
    if let Some(ref file) = raw.logging.file {
        if !file.is_empty() {
            config.log_file = Some(file.clone());
        }
    }

    if !warnings.is_empty() {
        tracing::warn!(count = warnings.len(), "Config validation produced warnings");
    }

    (config, warnings)
}
