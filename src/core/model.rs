// Oxygen - core/model.rs
//
// Core data model types. Pure data definitions with no I/O, no UI,
// no platform dependencies.
//
// These types are the shared vocabulary across all layers.

use crate::util::constants;
use crate::util::error::{DeliveryError, ExecutorKindError};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// =============================================================================
// Executors
// =============================================================================

/// The closed set of executors scripts can be delivered to.
///
/// Each kind owns a distinct port range and a distinct wire protocol.
/// Letters A/B/C are accepted as aliases when parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum ExecutorKind {
    /// Kind A: raw TCP with a 16-byte length header.
    #[default]
    MacSploit,
    /// Kind B: raw TCP carrying a zlib-compressed, prefixed script.
    Opiumware,
    /// Kind C: HTTP POST to a single fixed port.
    Hydrogen,
}

impl ExecutorKind {
    /// All kinds in selection order.
    pub const ALL: [ExecutorKind; 3] = [Self::MacSploit, Self::Opiumware, Self::Hydrogen];

    /// Display name, also used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::MacSploit => "MacSploit",
            Self::Opiumware => "Opiumware",
            Self::Hydrogen => "Hydrogen",
        }
    }

    /// Single-letter alias.
    pub fn letter(self) -> char {
        match self {
            Self::MacSploit => 'A',
            Self::Opiumware => 'B',
            Self::Hydrogen => 'C',
        }
    }

    /// The inclusive port range this executor listens within.
    pub fn default_ports(self) -> PortRange {
        match self {
            Self::MacSploit => PortRange {
                start: constants::MACSPLOIT_PORT_START,
                end: constants::MACSPLOIT_PORT_END,
            },
            Self::Opiumware => PortRange {
                start: constants::OPIUMWARE_PORT_START,
                end: constants::OPIUMWARE_PORT_END,
            },
            Self::Hydrogen => PortRange::single(constants::HYDROGEN_PORT),
        }
    }
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExecutorKind {
    type Err = ExecutorKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|k| {
                k.name().eq_ignore_ascii_case(wanted)
                    || (wanted.len() == 1
                        && wanted
                            .chars()
                            .next()
                            .is_some_and(|c| c.eq_ignore_ascii_case(&k.letter())))
            })
            .ok_or_else(|| ExecutorKindError::Unknown(s.to_string()))
    }
}

/// Inclusive range of TCP ports, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    /// Build a range; `None` when `start > end`.
    pub fn new(start: u16, end: u16) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// A range covering exactly one port.
    pub fn single(port: u16) -> Self {
        Self {
            start: port,
            end: port,
        }
    }

    /// Ports in ascending order. Discovery relies on this order: the lowest
    /// listening port wins.
    pub fn ports(self) -> std::ops::RangeInclusive<u16> {
        self.start..=self.end
    }

    pub fn contains(self, port: u16) -> bool {
        (self.start..=self.end).contains(&port)
    }

    pub fn port_count(self) -> usize {
        usize::from(self.end - self.start) + 1
    }

    pub fn is_single(self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

// =============================================================================
// Delivery
// =============================================================================

/// A script to deliver, plus an optional port that bypasses discovery.
///
/// `script` is arbitrary bytes and is sent verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRequest {
    pub script: Vec<u8>,
    pub explicit_port: Option<u16>,
}

impl DeliveryRequest {
    pub fn new(script: impl Into<Vec<u8>>, explicit_port: Option<u16>) -> Self {
        Self {
            script: script.into(),
            explicit_port,
        }
    }
}

/// Outcome of exactly one delivery. Never retried by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryResult {
    pub success: bool,
    /// Executor the request was routed to.
    pub kind: ExecutorKind,
    /// Port actually used; set on success even when discovery chose it.
    pub port: Option<u16>,
    pub error: Option<DeliveryError>,
}

impl DeliveryResult {
    pub fn delivered(kind: ExecutorKind, port: u16) -> Self {
        Self {
            success: true,
            kind,
            port: Some(port),
            error: None,
        }
    }

    pub fn failed(kind: ExecutorKind, error: DeliveryError) -> Self {
        let port = match &error {
            DeliveryError::TransmissionFailed { port, .. } => Some(*port),
            DeliveryError::NoInstanceFound { .. } => None,
        };
        Self {
            success: false,
            kind,
            port,
            error: Some(error),
        }
    }

    pub fn from_outcome(kind: ExecutorKind, outcome: Result<u16, DeliveryError>) -> Self {
        match outcome {
            Ok(port) => Self::delivered(kind, port),
            Err(e) => Self::failed(kind, e),
        }
    }
}

// =============================================================================
// Port status
// =============================================================================

/// Reachability of a single loopback port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PortStatus {
    Online,
    Offline,
}

impl PortStatus {
    pub fn is_online(self) -> bool {
        self == Self::Online
    }
}

/// One row of a status poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortProbe {
    pub port: u16,
    pub status: PortStatus,
}

// =============================================================================
// Log tail
// =============================================================================

/// A single non-blank line from the tailed log, trailing whitespace removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    pub text: String,
}

impl LogLine {
    /// Build a line from raw text. Returns `None` for blank lines, which are
    /// never emitted.
    pub fn from_text(raw: &str) -> Option<Self> {
        let text = raw.trim_end();
        if text.trim_start().is_empty() {
            None
        } else {
            Some(Self {
                text: text.to_string(),
            })
        }
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Messages sent from the log watcher thread to its consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogWatchEvent {
    /// The watcher switched to a (new) log file; its bulk content follows.
    Switched { path: PathBuf },
    /// One complete log line, in file order.
    Line(LogLine),
    /// The watcher thread has exited.
    Stopped,
}
