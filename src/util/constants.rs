// Oxygen - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "Oxygen";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "Oxygen";

/// Current application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Executor endpoints
// =============================================================================

/// Loopback host every executor listens on.
pub const DEFAULT_EXECUTOR_HOST: &str = "127.0.0.1";

/// MacSploit listens on one port within this inclusive range.
pub const MACSPLOIT_PORT_START: u16 = 5553;
pub const MACSPLOIT_PORT_END: u16 = 5563;

/// Opiumware listens on one port within this inclusive range.
pub const OPIUMWARE_PORT_START: u16 = 8392;
pub const OPIUMWARE_PORT_END: u16 = 8397;

/// Hydrogen serves HTTP on a single fixed port.
pub const HYDROGEN_PORT: u16 = 6969;

/// Path of the Hydrogen execute endpoint.
pub const HYDROGEN_EXECUTE_PATH: &str = "/execute";

/// Text prepended to every Opiumware script before compression.
pub const OPIUMWARE_SCRIPT_PREFIX: &str = "OpiumwareScript ";

/// Length of the fixed MacSploit frame header.
pub const MACSPLOIT_HEADER_LEN: usize = 16;

/// Byte offset of the little-endian payload length inside the MacSploit header.
pub const MACSPLOIT_LENGTH_OFFSET: usize = 8;

// =============================================================================
// Network timeouts (every network call is bounded)
// =============================================================================

/// Connect timeout used by the status prober (ms).
pub const PROBE_TIMEOUT_MS: u64 = 500;

/// Per-port discovery connect timeout for MacSploit (ms).
pub const MACSPLOIT_DISCOVERY_TIMEOUT_MS: u64 = 500;

/// Connect and write timeout for the MacSploit delivery connection (ms).
pub const MACSPLOIT_SEND_TIMEOUT_MS: u64 = 3_000;

/// Per-port discovery connect timeout for Opiumware (ms).
/// The discovered connection is reused for delivery.
pub const OPIUMWARE_CONNECT_TIMEOUT_MS: u64 = 1_000;

/// Write timeout for the Opiumware delivery connection (ms).
pub const OPIUMWARE_WRITE_TIMEOUT_MS: u64 = 3_000;

/// Whole-request timeout for the Hydrogen HTTP POST (ms).
pub const HYDROGEN_REQUEST_TIMEOUT_MS: u64 = 5_000;

// =============================================================================
// Log watch
// =============================================================================

/// How often the watcher re-resolves the newest log file (ms).
pub const DEFAULT_LOG_RESCAN_INTERVAL_MS: u64 = 5_000;

/// Minimum user-configurable rescan interval (ms).
pub const MIN_LOG_RESCAN_INTERVAL_MS: u64 = 100;

/// Maximum user-configurable rescan interval (ms).
pub const MAX_LOG_RESCAN_INTERVAL_MS: u64 = 60_000;

/// File name patterns recognised as client log files.
pub const DEFAULT_LOG_PATTERNS: &[&str] = &["*.log"];

/// Default client log directory, relative to the user's home directory.
pub const DEFAULT_LOG_DIR_RELATIVE: &[&str] = &["Library", "Logs", "Roblox"];

/// Maximum accumulated size of a held-back (unterminated) line fragment.
///
/// A file that never writes a newline would otherwise grow the buffer without
/// bound; once exceeded the fragment is discarded with a warning.
pub const MAX_PARTIAL_LINE_BYTES: usize = 2 * 1_024 * 1_024; // 2 MiB

// =============================================================================
// Workspace layout
// =============================================================================

/// Workspace folder under the user's home directory.
pub const WORKSPACE_DIR_NAME: &str = "Oxygen";

/// Saved scripts subfolder of the workspace.
pub const SCRIPTS_DIR_NAME: &str = "Scripts";

/// Auto-execute subfolder of the workspace.
pub const AUTOEXEC_DIR_NAME: &str = "AutoExec";

/// File extensions listed in the auto-execute folder.
pub const AUTOEXEC_EXTENSIONS: &[&str] = &["lua", "txt"];

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Maximum length of a script or log line included in debug output.
pub const DEBUG_MAX_LINE_PREVIEW: usize = 200;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";
