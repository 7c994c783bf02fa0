// Oxygen - app/drivers.rs
//
// Executor protocol drivers: one per executor kind, each owning its port
// range, discovery policy, timeouts, and wire format.
//
// Failure mapping:
//   - Discovery exhausts the range (or the HTTP request never reaches a
//     server)                                   -> NoInstanceFound
//   - A connection exists but encoding, writing, or finalising fails, or
//     the HTTP server answers non-2xx           -> TransmissionFailed
//
// Drivers never retry. Every network call carries a timeout.

use crate::core::model::{ExecutorKind, PortRange};
use crate::core::wire;
use crate::platform::net;
use crate::util::constants;
use crate::util::error::DeliveryError;
use crate::util::logging::preview;
use std::io::Write;
use std::net::{IpAddr, Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

/// Common contract of all executor drivers.
pub trait ExecutorDriver: Send + Sync {
    /// Executor this driver speaks to.
    fn kind(&self) -> ExecutorKind;

    /// Ports this driver discovers within (or its single fixed port).
    fn ports(&self) -> PortRange;

    /// Deliver `script`, returning the port actually used.
    ///
    /// `explicit_port` bypasses discovery.
    fn deliver(&self, script: &[u8], explicit_port: Option<u16>) -> Result<u16, DeliveryError>;
}

/// Write a whole payload then close the write side. No response is read.
fn send_and_close(stream: &mut TcpStream, payload: &[u8], timeout: Duration) -> std::io::Result<()> {
    stream.set_write_timeout(Some(timeout))?;
    stream.write_all(payload)?;
    stream.flush()?;
    stream.shutdown(Shutdown::Write)
}

fn no_instance(kind: ExecutorKind, range: PortRange, detail: impl Into<String>) -> DeliveryError {
    DeliveryError::NoInstanceFound {
        executor: kind.name(),
        first_port: range.start,
        last_port: range.end,
        detail: detail.into(),
    }
}

fn transmission(kind: ExecutorKind, port: u16, detail: impl ToString) -> DeliveryError {
    DeliveryError::TransmissionFailed {
        executor: kind.name(),
        port,
        status: None,
        detail: detail.to_string(),
    }
}

// =============================================================================
// MacSploit (kind A)
// =============================================================================

/// Raw TCP, 16-byte length header, NUL-terminated script.
///
/// Discovery probes each port (connect then close); delivery opens a fresh
/// connection to the chosen port.
#[derive(Debug, Clone)]
pub struct MacSploitDriver {
    host: IpAddr,
    ports: PortRange,
    discovery_timeout: Duration,
    send_timeout: Duration,
}

impl MacSploitDriver {
    pub fn new(host: IpAddr, ports: PortRange) -> Self {
        Self {
            host,
            ports,
            discovery_timeout: Duration::from_millis(constants::MACSPLOIT_DISCOVERY_TIMEOUT_MS),
            send_timeout: Duration::from_millis(constants::MACSPLOIT_SEND_TIMEOUT_MS),
        }
    }

    fn discover(&self) -> Option<u16> {
        self.ports
            .ports()
            .find(|&port| net::probe_port(self.host, port, self.discovery_timeout).is_online())
    }
}

impl ExecutorDriver for MacSploitDriver {
    fn kind(&self) -> ExecutorKind {
        ExecutorKind::MacSploit
    }

    fn ports(&self) -> PortRange {
        self.ports
    }

    fn deliver(&self, script: &[u8], explicit_port: Option<u16>) -> Result<u16, DeliveryError> {
        let kind = self.kind();
        let port = match explicit_port {
            Some(p) => p,
            None => self
                .discover()
                .ok_or_else(|| no_instance(kind, self.ports, ""))?,
        };

        let frame = wire::encode_macsploit(script).map_err(|e| transmission(kind, port, e))?;

        let mut stream =
            net::connect(self.host, port, self.send_timeout).map_err(|e| transmission(kind, port, e))?;
        send_and_close(&mut stream, &frame, self.send_timeout)
            .map_err(|e| transmission(kind, port, e))?;

        tracing::info!(executor = kind.name(), port, bytes = frame.len(), "Script delivered");
        Ok(port)
    }
}

// =============================================================================
// Opiumware (kind B)
// =============================================================================

/// Raw TCP carrying `zlib("OpiumwareScript " ++ script)`.
///
/// The connection opened during discovery is the one the payload is written
/// to.
#[derive(Debug, Clone)]
pub struct OpiumwareDriver {
    host: IpAddr,
    ports: PortRange,
    connect_timeout: Duration,
    write_timeout: Duration,
}

impl OpiumwareDriver {
    pub fn new(host: IpAddr, ports: PortRange) -> Self {
        Self {
            host,
            ports,
            connect_timeout: Duration::from_millis(constants::OPIUMWARE_CONNECT_TIMEOUT_MS),
            write_timeout: Duration::from_millis(constants::OPIUMWARE_WRITE_TIMEOUT_MS),
        }
    }
}

impl ExecutorDriver for OpiumwareDriver {
    fn kind(&self) -> ExecutorKind {
        ExecutorKind::Opiumware
    }

    fn ports(&self) -> PortRange {
        self.ports
    }

    fn deliver(&self, script: &[u8], explicit_port: Option<u16>) -> Result<u16, DeliveryError> {
        let kind = self.kind();
        let (port, mut stream) = match explicit_port {
            Some(p) => {
                let stream = net::connect(self.host, p, self.connect_timeout)
                    .map_err(|e| no_instance(kind, PortRange::single(p), e.to_string()))?;
                (p, stream)
            }
            None => net::connect_first(self.host, self.ports, self.connect_timeout)
                .ok_or_else(|| no_instance(kind, self.ports, ""))?,
        };

        let payload = wire::encode_opiumware(script).map_err(|e| transmission(kind, port, e))?;
        send_and_close(&mut stream, &payload, self.write_timeout)
            .map_err(|e| transmission(kind, port, e))?;

        tracing::info!(executor = kind.name(), port, bytes = payload.len(), "Script delivered");
        Ok(port)
    }
}

// =============================================================================
// Hydrogen (kind C)
// =============================================================================

/// HTTP `POST /execute` with a `text/plain` body on a single fixed port.
pub struct HydrogenDriver {
    host: IpAddr,
    port: u16,
    agent: ureq::Agent,
}

fn http_agent(timeout: Duration) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        // Loopback target: never route through an environment proxy.
        .proxy(None)
        .build();
    ureq::Agent::new_with_config(config)
}

impl HydrogenDriver {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            host,
            port,
            agent: http_agent(Duration::from_millis(constants::HYDROGEN_REQUEST_TIMEOUT_MS)),
        }
    }

    /// Replace the whole-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = http_agent(timeout);
        self
    }

    fn url(&self, port: u16) -> String {
        format!(
            "http://{}{}",
            SocketAddr::new(self.host, port),
            constants::HYDROGEN_EXECUTE_PATH
        )
    }
}

impl ExecutorDriver for HydrogenDriver {
    fn kind(&self) -> ExecutorKind {
        ExecutorKind::Hydrogen
    }

    fn ports(&self) -> PortRange {
        PortRange::single(self.port)
    }

    fn deliver(&self, script: &[u8], explicit_port: Option<u16>) -> Result<u16, DeliveryError> {
        let kind = self.kind();
        // Hydrogen only ever listens on its fixed port.
        if let Some(requested) = explicit_port.filter(|&p| p != self.port) {
            tracing::warn!(
                requested,
                port = self.port,
                "Hydrogen ignores explicit ports, using its fixed port"
            );
        }
        let port = self.port;
        let url = self.url(port);

        tracing::debug!(
            url = %url,
            script = %preview(&String::from_utf8_lossy(script)),
            "Posting script"
        );

        let response = self
            .agent
            .post(&url)
            .header("Content-Type", "text/plain")
            .send(script)
            .map_err(|e| no_instance(kind, PortRange::single(port), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::TransmissionFailed {
                executor: kind.name(),
                port,
                status: Some(status.as_u16()),
                detail: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        tracing::info!(executor = kind.name(), port, "Script delivered");
        Ok(port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read};
    use std::net::{Ipv4Addr, TcpListener};
    use std::thread;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    fn closed_port() -> u16 {
        TcpListener::bind((LOCALHOST, 0))
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    /// Accept connections and return the bytes of the first one that sends
    /// anything (discovery probes close without writing).
    fn capture_first_payload(listener: TcpListener) -> thread::JoinHandle<Vec<u8>> {
        thread::spawn(move || loop {
            let (mut conn, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            conn.read_to_end(&mut buf).unwrap();
            if !buf.is_empty() {
                return buf;
            }
        })
    }

    /// Listeners on two consecutive ports `p` and `p + 1`.
    fn adjacent_listeners() -> (TcpListener, TcpListener, u16) {
        loop {
            let low = TcpListener::bind((LOCALHOST, 0)).unwrap();
            let port = low.local_addr().unwrap().port();
            if port == u16::MAX {
                continue;
            }
            if let Ok(high) = TcpListener::bind((LOCALHOST, port + 1)) {
                return (low, high, port);
            }
        }
    }

    #[test]
    fn test_macsploit_no_listener_is_no_instance_found() {
        let driver = MacSploitDriver::new(LOCALHOST, PortRange::single(closed_port()));
        let err = driver.deliver(b"print(1)", None).unwrap_err();
        assert!(matches!(err, DeliveryError::NoInstanceFound { .. }), "got {err:?}");
    }

    #[test]
    fn test_macsploit_explicit_closed_port_is_transmission_failed() {
        let port = closed_port();
        let driver = MacSploitDriver::new(LOCALHOST, PortRange::single(1));
        let err = driver.deliver(b"print(1)", Some(port)).unwrap_err();
        assert!(
            matches!(err, DeliveryError::TransmissionFailed { port: p, .. } if p == port),
            "got {err:?}"
        );
    }

    #[test]
    fn test_macsploit_sends_framed_script() {
        let listener = TcpListener::bind((LOCALHOST, 0)).unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = capture_first_payload(listener);

        let driver = MacSploitDriver::new(LOCALHOST, PortRange::single(port));
        assert_eq!(driver.deliver(b"print(1)", None), Ok(port));

        let received = server.join().unwrap();
        assert_eq!(received, wire::encode_macsploit(b"print(1)").unwrap());
    }

    #[test]
    fn test_opiumware_sends_compressed_payload_on_discovered_connection() {
        let listener = TcpListener::bind((LOCALHOST, 0)).unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = capture_first_payload(listener);

        let driver = OpiumwareDriver::new(LOCALHOST, PortRange::single(port));
        assert_eq!(driver.deliver(b"print(2)", None), Ok(port));

        let received = server.join().unwrap();
        let mut inflated = Vec::new();
        flate2::read::ZlibDecoder::new(received.as_slice())
            .read_to_end(&mut inflated)
            .unwrap();
        assert_eq!(inflated, b"OpiumwareScript print(2)");
    }

    #[test]
    fn test_macsploit_lowest_listening_port_wins() {
        let (low, _high, port) = adjacent_listeners();
        let server = capture_first_payload(low);

        let driver = MacSploitDriver::new(LOCALHOST, PortRange::new(port, port + 1).unwrap());
        assert_eq!(driver.deliver(b"x", None), Ok(port));
        assert!(!server.join().unwrap().is_empty());
    }

    #[test]
    fn test_opiumware_lowest_listening_port_wins() {
        let (low, _high, port) = adjacent_listeners();
        let server = capture_first_payload(low);

        let driver = OpiumwareDriver::new(LOCALHOST, PortRange::new(port, port + 1).unwrap());
        assert_eq!(driver.deliver(b"x", None), Ok(port));
        assert!(!server.join().unwrap().is_empty());
    }

    #[test]
    fn test_opiumware_explicit_closed_port_is_no_instance_found() {
        let port = closed_port();
        let driver = OpiumwareDriver::new(LOCALHOST, PortRange::single(1));
        let err = driver.deliver(b"x", Some(port)).unwrap_err();
        assert!(matches!(err, DeliveryError::NoInstanceFound { .. }), "got {err:?}");
    }

    #[test]
    fn test_hydrogen_connection_refused_is_no_instance_found() {
        let driver = HydrogenDriver::new(LOCALHOST, closed_port());
        let err = driver.deliver(b"print(3)", None).unwrap_err();
        assert!(matches!(err, DeliveryError::NoInstanceFound { .. }), "got {err:?}");
    }

    #[test]
    fn test_hydrogen_unanswered_request_times_out() {
        let listener = TcpListener::bind((LOCALHOST, 0)).unwrap();
        let port = listener.local_addr().unwrap().port();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let server = thread::spawn(move || {
            // Accept and hold the connection without ever answering.
            let (_conn, _) = listener.accept().unwrap();
            let _ = release_rx.recv_timeout(Duration::from_secs(10));
        });

        let driver = HydrogenDriver::new(LOCALHOST, port).with_timeout(Duration::from_millis(300));
        let started = std::time::Instant::now();
        let err = driver.deliver(b"while true do end", None).unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, DeliveryError::NoInstanceFound { .. }), "got {err:?}");
        assert!(elapsed < Duration::from_secs(3), "took {elapsed:?}");
        release_tx.send(()).unwrap();
        server.join().unwrap();
    }

    #[test]
    fn test_hydrogen_ignores_explicit_port() {
        let listener = TcpListener::bind((LOCALHOST, 0)).unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(conn.try_clone().unwrap());
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap();
                    }
                }
            }
            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).unwrap();
            conn.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .unwrap();
        });

        let driver = HydrogenDriver::new(LOCALHOST, port);
        assert_eq!(driver.deliver(b"print(4)", Some(closed_port())), Ok(port));
        server.join().unwrap();
    }

    #[test]
    fn test_hydrogen_url_brackets_ipv6() {
        let driver = HydrogenDriver::new(IpAddr::from([0u16, 0, 0, 0, 0, 0, 0, 1]), 6969);
        assert_eq!(driver.url(6969), "http://[::1]:6969/execute");
        let driver = HydrogenDriver::new(LOCALHOST, 6969);
        assert_eq!(driver.url(6969), "http://127.0.0.1:6969/execute");
    }
}
