// Oxygen - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// Every error here is local and recoverable: none of them terminate the
// process, and none of them leave the dispatcher or the log watcher in an
// inconsistent state.

use serde::ser::SerializeStruct;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all Oxygen operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum OxygenError {
    /// Script delivery to an executor failed.
    Delivery(DeliveryError),

    /// An executor name could not be resolved.
    ExecutorKind(ExecutorKindError),

    /// The log watcher could not start.
    LogWatch(LogWatchError),

    /// Auto-execute folder operation failed.
    AutoExec(AutoExecError),

    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for OxygenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivery(e) => write!(f, "Delivery error: {e}"),
            Self::ExecutorKind(e) => write!(f, "Executor error: {e}"),
            Self::LogWatch(e) => write!(f, "Log watch error: {e}"),
            Self::AutoExec(e) => write!(f, "Auto-execute error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for OxygenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Delivery(e) => Some(e),
            Self::ExecutorKind(e) => Some(e),
            Self::LogWatch(e) => Some(e),
            Self::AutoExec(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Io { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Delivery errors
// ---------------------------------------------------------------------------

/// Errors produced while delivering a script to an executor.
///
/// Details are carried as text so a `DeliveryResult` stays cheap to clone
/// and serialise; the underlying I/O error is rendered into `detail` at the
/// point of failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// Discovery exhausted the port range without a reachable executor, or
    /// (HTTP executors) the request failed at the network level.
    NoInstanceFound {
        executor: &'static str,
        first_port: u16,
        last_port: u16,
        detail: String,
    },

    /// A connection was obtained but encoding, writing, or finalising the
    /// payload failed (includes timeouts and non-2xx HTTP statuses).
    TransmissionFailed {
        executor: &'static str,
        port: u16,
        status: Option<u16>,
        detail: String,
    },
}

impl DeliveryError {
    /// Stable machine-readable name of the failure class.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::NoInstanceFound { .. } => "NoInstanceFound",
            Self::TransmissionFailed { .. } => "TransmissionFailed",
        }
    }

    /// HTTP status carried by a rejected HTTP delivery, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::TransmissionFailed { status, .. } => *status,
            Self::NoInstanceFound { .. } => None,
        }
    }
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoInstanceFound {
                executor,
                first_port,
                last_port,
                detail,
            } => {
                if first_port == last_port {
                    write!(f, "No {executor} instance found on port {first_port}")?;
                } else {
                    write!(
                        f,
                        "No {executor} instance found on ports {first_port}-{last_port}"
                    )?;
                }
                if !detail.is_empty() {
                    write!(f, ": {detail}")?;
                }
                Ok(())
            }
            Self::TransmissionFailed {
                executor,
                port,
                status,
                detail,
            } => {
                write!(f, "Sending to {executor} on port {port} failed")?;
                if let Some(code) = status {
                    write!(f, " (HTTP {code})")?;
                }
                if !detail.is_empty() {
                    write!(f, ": {detail}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for DeliveryError {}

impl serde::Serialize for DeliveryError {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("DeliveryError", 3)?;
        s.serialize_field("kind", self.kind_name())?;
        s.serialize_field("message", &self.to_string())?;
        s.serialize_field("status", &self.status())?;
        s.end()
    }
}

impl From<DeliveryError> for OxygenError {
    fn from(e: DeliveryError) -> Self {
        Self::Delivery(e)
    }
}

// ---------------------------------------------------------------------------
// Executor kind errors
// ---------------------------------------------------------------------------

/// Errors resolving an executor from user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorKindError {
    /// The name matches none of the known executors.
    Unknown(String),
}

impl fmt::Display for ExecutorKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(name) => write!(
                f,
                "Unknown executor '{name}'. Expected MacSploit, Opiumware, or Hydrogen"
            ),
        }
    }
}

impl std::error::Error for ExecutorKindError {}

impl From<ExecutorKindError> for OxygenError {
    fn from(e: ExecutorKindError) -> Self {
        Self::ExecutorKind(e)
    }
}

// ---------------------------------------------------------------------------
// Log watch errors
// ---------------------------------------------------------------------------

/// Errors starting a log watch. Errors during an active watch are never
/// surfaced through this type; they are logged and counted instead.
#[derive(Debug)]
pub enum LogWatchError {
    /// No recognised log file exists in the log directory.
    NoLogFound { directory: PathBuf },

    /// The log directory could not be listed.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for LogWatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoLogFound { directory } => {
                write!(f, "No log files found in '{}'", directory.display())
            }
            Self::Io { path, source } => {
                write!(f, "Cannot read log directory '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for LogWatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::NoLogFound { .. } => None,
        }
    }
}

impl From<LogWatchError> for OxygenError {
    fn from(e: LogWatchError) -> Self {
        Self::LogWatch(e)
    }
}

// ---------------------------------------------------------------------------
// Auto-execute errors
// ---------------------------------------------------------------------------

/// Errors related to the auto-execute folder.
#[derive(Debug)]
pub enum AutoExecError {
    /// The script name is empty or would escape the auto-execute folder.
    InvalidName { name: String },

    /// I/O error reading, writing, or removing a script.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for AutoExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidName { name } => write!(f, "Invalid auto-execute script name '{name}'"),
            Self::Io { path, source } => {
                write!(f, "Auto-execute I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for AutoExecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::InvalidName { .. } => None,
        }
    }
}

impl From<AutoExecError> for OxygenError {
    fn from(e: AutoExecError) -> Self {
        Self::AutoExec(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for OxygenError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Convenience type alias for Oxygen results.
pub type Result<T> = std::result::Result<T, OxygenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_instance_message_names_range() {
        let e = DeliveryError::NoInstanceFound {
            executor: "MacSploit",
            first_port: 5553,
            last_port: 5563,
            detail: String::new(),
        };
        assert_eq!(e.to_string(), "No MacSploit instance found on ports 5553-5563");
        assert_eq!(e.kind_name(), "NoInstanceFound");
        assert_eq!(e.status(), None);
    }

    #[test]
    fn test_transmission_failed_carries_status() {
        let e = DeliveryError::TransmissionFailed {
            executor: "Hydrogen",
            port: 6969,
            status: Some(500),
            detail: String::new(),
        };
        assert_eq!(e.status(), Some(500));
        assert!(e.to_string().contains("HTTP 500"), "got: {e}");
    }

    #[test]
    fn test_delivery_error_serialises_kind_and_status() {
        let e = DeliveryError::TransmissionFailed {
            executor: "Hydrogen",
            port: 6969,
            status: Some(503),
            detail: "busy".to_string(),
        };
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["kind"], "TransmissionFailed");
        assert_eq!(json["status"], 503);
        assert_eq!(json["message"], e.to_string());
    }

    #[test]
    fn test_delivery_error_serialises_inside_result() {
        let result: Result<DeliveryError> = Ok(DeliveryError::NoInstanceFound {
            executor: "Opiumware",
            first_port: 8392,
            last_port: 8397,
            detail: String::new(),
        });
        let json = serde_json::to_string(result.as_ref().unwrap()).unwrap();
        assert!(json.contains("\"status\":null"), "got: {json}");
    }

    #[test]
    fn test_io_error_source_chain_preserved() {
        let e: OxygenError = LogWatchError::Io {
            path: PathBuf::from("/nope"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        }
        .into();
        let source = std::error::Error::source(&e).expect("has source");
        assert!(std::error::Error::source(source).is_some());
    }
}
