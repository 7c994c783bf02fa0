// Oxygen - app/dispatcher.rs
//
// Single entry point for script delivery. Owns the current executor
// selection and routes each request to the matching driver.
//
// The selection lives behind an RwLock so `execute`, `set_executor_kind`,
// and status polling never observe a torn value. Each request snapshots the
// kind once; changing the selection mid-delivery affects only later requests.
// No retries and no fallback between executors.

use crate::app::drivers::{ExecutorDriver, HydrogenDriver, MacSploitDriver, OpiumwareDriver};
use crate::core::model::{DeliveryRequest, DeliveryResult, ExecutorKind, PortProbe};
use crate::platform::net;
use crate::util::constants::PROBE_TIMEOUT_MS;
use crate::util::error::ExecutorKindError;
use std::net::IpAddr;
use std::sync::{mpsc, Arc, PoisonError, RwLock};
use std::time::Duration;

/// Routes deliveries to the driver of the currently selected executor.
pub struct Dispatcher {
    current: RwLock<ExecutorKind>,
    host: IpAddr,
    /// One driver per kind, indexed by `slot`.
    drivers: [Arc<dyn ExecutorDriver>; 3],
}

fn slot(kind: ExecutorKind) -> usize {
    match kind {
        ExecutorKind::MacSploit => 0,
        ExecutorKind::Opiumware => 1,
        ExecutorKind::Hydrogen => 2,
    }
}

impl Dispatcher {
    /// Dispatcher with the standard drivers on their standard ports.
    pub fn new(initial: ExecutorKind, host: IpAddr) -> Self {
        Self {
            current: RwLock::new(initial),
            host,
            drivers: [
                Arc::new(MacSploitDriver::new(
                    host,
                    ExecutorKind::MacSploit.default_ports(),
                )),
                Arc::new(OpiumwareDriver::new(
                    host,
                    ExecutorKind::Opiumware.default_ports(),
                )),
                Arc::new(HydrogenDriver::new(
                    host,
                    ExecutorKind::Hydrogen.default_ports().start,
                )),
            ],
        }
    }

    /// Replace the driver for `driver.kind()`.
    pub fn with_driver(mut self, driver: impl ExecutorDriver + 'static) -> Self {
        let idx = slot(driver.kind());
        self.drivers[idx] = Arc::new(driver);
        self
    }

    /// Currently selected executor.
    pub fn executor_kind(&self) -> ExecutorKind {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Select the executor for subsequent requests.
    pub fn set_kind(&self, kind: ExecutorKind) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if *guard != kind {
            tracing::info!(from = guard.name(), to = kind.name(), "Executor changed");
        }
        *guard = kind;
    }

    /// Select the executor by name (or letter). An unknown name leaves the
    /// current selection untouched.
    pub fn set_executor_kind(&self, name: &str) -> Result<ExecutorKind, ExecutorKindError> {
        let kind = name.parse::<ExecutorKind>().map_err(|e| {
            tracing::warn!(name, "Rejected unknown executor");
            e
        })?;
        self.set_kind(kind);
        Ok(kind)
    }

    /// Driver registered for `kind`.
    pub fn driver(&self, kind: ExecutorKind) -> &dyn ExecutorDriver {
        self.drivers[slot(kind)].as_ref()
    }

    /// Deliver `script` to the selected executor, blocking until the bounded
    /// network operations finish.
    pub fn execute(&self, script: &[u8], explicit_port: Option<u16>) -> DeliveryResult {
        let kind = self.executor_kind();
        run_delivery(kind, self.driver(kind), script, explicit_port)
    }

    /// Deliver on a background thread. The receiver yields exactly one
    /// result.
    pub fn execute_async(&self, request: DeliveryRequest) -> mpsc::Receiver<DeliveryResult> {
        let kind = self.executor_kind();
        let driver = Arc::clone(&self.drivers[slot(kind)]);
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || {
            let result = run_delivery(kind, driver.as_ref(), &request.script, request.explicit_port);
            // Receiver dropped: the caller no longer cares about the outcome.
            let _ = tx.send(result);
        });

        rx
    }

    /// Probe every port of `kind`'s range (the selected kind when `None`).
    pub fn port_statuses(&self, kind: Option<ExecutorKind>) -> Vec<PortProbe> {
        let kind = kind.unwrap_or_else(|| self.executor_kind());
        net::probe_range(
            self.host,
            self.driver(kind).ports(),
            Duration::from_millis(PROBE_TIMEOUT_MS),
        )
    }
}

fn run_delivery(
    kind: ExecutorKind,
    driver: &dyn ExecutorDriver,
    script: &[u8],
    explicit_port: Option<u16>,
) -> DeliveryResult {
    tracing::debug!(
        executor = kind.name(),
        bytes = script.len(),
        port = ?explicit_port,
        "Executing script"
    );
    let outcome = driver.deliver(script, explicit_port);
    if let Err(ref e) = outcome {
        tracing::warn!(executor = kind.name(), error = %e, "Delivery failed");
    }
    DeliveryResult::from_outcome(kind, outcome)
}
