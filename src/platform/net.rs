// Oxygen - platform/net.rs
//
// Loopback TCP reachability checks.
//
// A probe never raises: timeout, refusal, and every other connect failure all
// map to `PortStatus::Offline`. The probe socket is dropped (closed) as soon
// as the outcome is known.

use crate::core::model::{PortProbe, PortRange, PortStatus};
use std::net::{IpAddr, SocketAddr, TcpStream};
use std::time::Duration;

/// Attempt one TCP connect to `host:port` bounded by `timeout`.
pub fn probe_port(host: IpAddr, port: u16, timeout: Duration) -> PortStatus {
    match connect(host, port, timeout) {
        Ok(_stream) => PortStatus::Online,
        Err(e) => {
            tracing::trace!(%host, port, error = %e, "Probe: offline");
            PortStatus::Offline
        }
    }
}

/// Probe every port in `range`, ascending.
pub fn probe_range(host: IpAddr, range: PortRange, timeout: Duration) -> Vec<PortProbe> {
    range
        .ports()
        .map(|port| PortProbe {
            port,
            status: probe_port(host, port, timeout),
        })
        .collect()
}

/// Linear ascending scan returning the first port that accepts a
/// connection, together with the open stream.
///
/// The scan is sequential: with at most one executor normally running per
/// range it completes on the first live port.
pub fn connect_first(
    host: IpAddr,
    range: PortRange,
    timeout: Duration,
) -> Option<(u16, TcpStream)> {
    range.ports().find_map(|port| match connect(host, port, timeout) {
        Ok(stream) => {
            tracing::debug!(%host, port, "Discovery: port accepted connection");
            Some((port, stream))
        }
        Err(e) => {
            tracing::trace!(%host, port, error = %e, "Discovery: port unavailable");
            None
        }
    })
}

/// Bounded connect. A zero timeout is rejected by the OS layer and reported
/// as an error like any other failure.
pub fn connect(host: IpAddr, port: u16, timeout: Duration) -> std::io::Result<TcpStream> {
    TcpStream::connect_timeout(&SocketAddr::new(host, port), timeout)
}
