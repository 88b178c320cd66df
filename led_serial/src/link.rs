//! Serial link to the Arduino with retry, backoff and reconnect.
//!
//! The Arduino resets whenever the port is opened, so a fresh connection
//! waits out the boot, throws away whatever the bootloader printed, and
//! then listens briefly for the firmware's `READY` banner.
//!
//! ```text
//! send(cmd) ──► write line ──► (reply?) ──► Ok
//!                   │ error / timeout
//!                   ▼
//!             sleep backoff ──► reconnect ──► write line … (max_retries)
//!                                                   │
//!                                                   ▼
//!                                         RetriesExhausted
//! ```

use std::io::{self, Read, Write};
use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;
use thiserror::Error;

use crate::command::Command;
use crate::port::detect_arduino;

// ════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("no Arduino serial port found")]
    NoPort,
    #[error("failed to list serial ports: {0}")]
    Enumerate(#[source] serialport::Error),
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },
    #[error("serial I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("no reply within {0:?}")]
    Timeout(Duration),
    #[error("not connected")]
    NotConnected,
    #[error("giving up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<LinkError>,
    },
}

// ════════════════════════════════════════════════════════════════════════════
// Configuration
// ════════════════════════════════════════════════════════════════════════════

/// Exponential backoff between attempts.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries:      u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms:     u64,
    pub multiplier:       f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries:      3,
            initial_delay_ms: 200,
            max_delay_ms:     2_000,
            multiplier:       2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `step` (0 = first retry).
    pub fn delay(&self, step: u32) -> Duration {
        let base   = self.initial_delay_ms as f64 * self.multiplier.max(1.0).powi(step as i32);
        let capped = base.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }
}

/// Everything needed to open and drive the link.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Fixed device path; detected when absent.
    pub port:          Option<String>,
    /// Used when detection finds nothing.
    pub fallback_port: Option<String>,
    pub baud:          u32,
    pub timeout_ms:    u64,
    /// Wait after opening while the board resets.
    pub boot_delay_ms: u64,
    /// How long to listen for `READY` after the boot delay (0 = don't).
    pub ready_wait_ms: u64,
    /// Wait for one reply line per command.
    pub expect_reply:  bool,
    pub retry:         RetryPolicy,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            port:          None,
            fallback_port: Some("/dev/ttyACM0".to_string()),
            baud:          115_200,
            timeout_ms:    1_000,
            boot_delay_ms: 2_500,
            ready_wait_ms: 5_000,
            expect_reply:  false,
            retry:         RetryPolicy::default(),
        }
    }
}

impl LinkConfig {
    pub fn timeout(&self) -> Duration    { Duration::from_millis(self.timeout_ms) }
    pub fn boot_delay(&self) -> Duration { Duration::from_millis(self.boot_delay_ms) }
    pub fn ready_wait(&self) -> Duration { Duration::from_millis(self.ready_wait_ms) }
}

// ════════════════════════════════════════════════════════════════════════════
// Transport — line I/O, real port or test double
// ════════════════════════════════════════════════════════════════════════════

/// Line-oriented byte pipe to the board.
pub trait Transport: Send {
    /// Write `line` followed by `\n` and flush.
    fn write_line(&mut self, line: &str) -> io::Result<()>;
    /// Next complete line (without terminator), or `None` on timeout.
    fn read_line(&mut self, timeout: Duration) -> io::Result<Option<String>>;
    /// Discard anything received but not yet read.
    fn reset_input(&mut self) -> io::Result<()>;
}

/// Opens transports; called again on every reconnect.
pub trait Connector: Send {
    fn connect(&mut self) -> Result<Box<dyn Transport>, LinkError>;
}

// ── serialport backend ────────────────────────────────────────────────────

/// Upper bound on one blocking read so `read_line` can honour its deadline.
const READ_SLICE: Duration = Duration::from_millis(50);
const MIN_SLICE:  Duration = Duration::from_millis(1);

pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
    buf:  Vec<u8>,
}

impl SerialTransport {
    pub fn open(path: &str, baud: u32, timeout: Duration) -> Result<Self, LinkError> {
        let port = serialport::new(path, baud)
            .timeout(timeout)
            .open()
            .map_err(|source| LinkError::Open { port: path.to_string(), source })?;
        Ok(SerialTransport { port, buf: Vec::new() })
    }

    fn take_line(&mut self) -> Option<String> {
        let nl = self.buf.iter().position(|&b| b == b'\n')?;
        let raw: Vec<u8> = self.buf.drain(..=nl).collect();
        Some(String::from_utf8_lossy(&raw).trim().to_string())
    }
}

impl Transport for SerialTransport {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.port.write_all(line.as_bytes())?;
        self.port.write_all(b"\n")?;
        self.port.flush()
    }

    fn read_line(&mut self, timeout: Duration) -> io::Result<Option<String>> {
        let deadline = Instant::now() + timeout;
        let mut chunk = [0u8; 256];
        let mut polled = false;
        loop {
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() && polled {
                return Ok(None);
            }
            // a zero timeout still reads whatever the driver already holds
            polled = true;
            self.port.set_timeout(remaining.clamp(MIN_SLICE, READ_SLICE))?;
            match self.port.read(&mut chunk) {
                Ok(0)  => {}
                Ok(n)  => self.buf.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    fn reset_input(&mut self) -> io::Result<()> {
        self.buf.clear();
        self.port.clear(serialport::ClearBuffer::Input)?;
        Ok(())
    }
}

/// Detects (unless pinned) and opens the Arduino's serial port.
pub struct SerialConnector {
    config: LinkConfig,
}

impl SerialConnector {
    pub fn new(config: LinkConfig) -> Self { SerialConnector { config } }

    fn resolve_port(&self) -> Result<String, LinkError> {
        if let Some(p) = &self.config.port {
            return Ok(p.clone());
        }
        if let Some(p) = detect_arduino()? {
            return Ok(p);
        }
        self.config.fallback_port.clone().ok_or(LinkError::NoPort)
    }
}

impl Connector for SerialConnector {
    fn connect(&mut self) -> Result<Box<dyn Transport>, LinkError> {
        let path = self.resolve_port()?;
        let t = SerialTransport::open(&path, self.config.baud, self.config.timeout())?;
        tracing::info!(port = %path, baud = self.config.baud, "serial port opened");
        Ok(Box::new(t))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Link
// ════════════════════════════════════════════════════════════════════════════

/// A connection to the LED matrix that survives unplugs and resets.
pub struct Link {
    connector: Box<dyn Connector>,
    transport: Option<Box<dyn Transport>>,
    config:    LinkConfig,
    reconnects: u32,
}

impl Link {
    /// Open the real serial port described by `config`.
    pub fn open_serial(config: LinkConfig) -> Result<Self, LinkError> {
        Self::open(Box::new(SerialConnector::new(config.clone())), config)
    }

    /// Connect once and run the boot handshake.
    pub fn open(mut connector: Box<dyn Connector>, config: LinkConfig) -> Result<Self, LinkError> {
        let mut transport = connector.connect()?;
        handshake(transport.as_mut(), &config)?;
        Ok(Link { connector, transport: Some(transport), config, reconnects: 0 })
    }

    pub fn reconnects(&self) -> u32    { self.reconnects }
    pub fn config(&self) -> &LinkConfig { &self.config }

    /// Send one command, retrying with backoff and reconnecting on failure.
    ///
    /// Returns the reply line when `expect_reply` is set.
    pub fn send(&mut self, cmd: &Command) -> Result<Option<String>, LinkError> {
        let line = cmd.encode();
        let policy = self.config.retry.clone();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let err = match self.try_send(&line) {
                Ok(reply) => return Ok(reply),
                Err(e)    => e,
            };

            if attempt > policy.max_retries {
                tracing::error!(command = %line, attempts = attempt, error = %err, "send failed");
                return Err(LinkError::RetriesExhausted { attempts: attempt, last: Box::new(err) });
            }

            let delay = policy.delay(attempt - 1);
            tracing::warn!(
                command = %line,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "send failed, retrying"
            );
            thread::sleep(delay);
            self.reconnect();
        }
    }

    /// Send several commands in order, stopping at the first failure.
    pub fn send_all<'a, I>(&mut self, cmds: I) -> Result<(), LinkError>
    where
        I: IntoIterator<Item = &'a Command>,
    {
        for c in cmds {
            self.send(c)?;
        }
        Ok(())
    }

    /// Read replies that are already waiting; gives up after `poll` of silence.
    pub fn drain_replies(&mut self, poll: Duration) -> Vec<String> {
        let mut out = Vec::new();
        let Some(t) = self.transport.as_mut() else { return out };
        loop {
            match t.read_line(poll) {
                Ok(Some(line)) => {
                    if !line.is_empty() {
                        tracing::debug!("[ARDUINO] {}", line);
                        out.push(line);
                    }
                }
                Ok(None) => break,
                Err(e)   => {
                    tracing::warn!(error = %e, "reading replies failed");
                    break;
                }
            }
        }
        out
    }

    /// Clear the matrix (best effort, no retries) and drop the connection.
    pub fn close(&mut self) {
        if let Some(t) = self.transport.as_mut() {
            if let Err(e) = t.write_line(&Command::Clear.encode()) {
                tracing::debug!(error = %e, "clear on close failed");
            }
        }
        self.transport = None;
    }

    fn try_send(&mut self, line: &str) -> Result<Option<String>, LinkError> {
        let timeout = self.config.timeout();
        let expect  = self.config.expect_reply;
        let t = self.transport.as_mut().ok_or(LinkError::NotConnected)?;

        if let Err(e) = t.write_line(line) {
            self.transport = None;
            return Err(e.into());
        }
        if !expect {
            return Ok(None);
        }
        match t.read_line(timeout) {
            Ok(Some(reply)) => {
                tracing::debug!("[ARDUINO] {}", reply);
                Ok(Some(reply))
            }
            Ok(None) => Err(LinkError::Timeout(timeout)),
            Err(e)   => {
                self.transport = None;
                Err(e.into())
            }
        }
    }

    fn reconnect(&mut self) {
        self.transport = None;
        let mut t = match self.connector.connect() {
            Ok(t)  => t,
            Err(e) => {
                tracing::warn!(error = %e, "reconnect failed");
                return;
            }
        };
        if let Err(e) = handshake(t.as_mut(), &self.config) {
            tracing::warn!(error = %e, "handshake after reconnect failed");
            return;
        }
        self.reconnects += 1;
        tracing::info!(reconnects = self.reconnects, "reconnected");
        self.transport = Some(t);
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.close();
    }
}

/// Wait out the board reset and look for the `READY` banner.
fn handshake(t: &mut dyn Transport, config: &LinkConfig) -> Result<bool, LinkError> {
    if !config.boot_delay().is_zero() {
        thread::sleep(config.boot_delay());
    }
    t.reset_input()?;

    let wait = config.ready_wait();
    if wait.is_zero() {
        return Ok(false);
    }

    let deadline = Instant::now() + wait;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match t.read_line(remaining)? {
            Some(line) => {
                if !line.is_empty() {
                    tracing::debug!("[ARDUINO] {}", line);
                }
                if line.contains("READY") {
                    tracing::info!("Arduino ready");
                    return Ok(true);
                }
            }
            None => break,
        }
    }
    tracing::warn!(waited_ms = wait.as_millis() as u64, "no READY banner; continuing anyway");
    Ok(false)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// What the fake board does on the next write.
    #[derive(Clone, Copy, Debug)]
    enum Step {
        Ok,
        WriteFails,
        Silent,
    }

    #[derive(Default)]
    struct Shared {
        written:  Vec<String>,
        connects: u32,
    }

    struct FakeTransport {
        shared:  Arc<Mutex<Shared>>,
        script:  Arc<Mutex<VecDeque<Step>>>,
        pending: VecDeque<String>,
        banner:  bool,
    }

    impl Transport for FakeTransport {
        fn write_line(&mut self, line: &str) -> io::Result<()> {
            let step = self.script.lock().unwrap().pop_front().unwrap_or(Step::Ok);
            match step {
                Step::WriteFails => Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged")),
                Step::Silent     => {
                    self.shared.lock().unwrap().written.push(line.to_string());
                    Ok(())
                }
                Step::Ok         => {
                    self.shared.lock().unwrap().written.push(line.to_string());
                    self.pending.push_back(format!("OK {}", line));
                    Ok(())
                }
            }
        }

        fn read_line(&mut self, _timeout: Duration) -> io::Result<Option<String>> {
            Ok(self.pending.pop_front())
        }

        fn reset_input(&mut self) -> io::Result<()> {
            self.pending.clear();
            if self.banner {
                self.pending.push_back("READY".to_string());
            }
            Ok(())
        }
    }

    struct FakeConnector {
        shared:  Arc<Mutex<Shared>>,
        script:  Arc<Mutex<VecDeque<Step>>>,
        refuse:  u32,
        banner:  bool,
    }

    impl Connector for FakeConnector {
        fn connect(&mut self) -> Result<Box<dyn Transport>, LinkError> {
            self.shared.lock().unwrap().connects += 1;
            if self.refuse > 0 {
                self.refuse -= 1;
                return Err(LinkError::NoPort);
            }
            Ok(Box::new(FakeTransport {
                shared:  self.shared.clone(),
                script:  self.script.clone(),
                pending: VecDeque::new(),
                banner:  self.banner,
            }))
        }
    }

    fn quick_config(expect_reply: bool) -> LinkConfig {
        LinkConfig {
            boot_delay_ms: 0,
            ready_wait_ms: 10,
            timeout_ms:    10,
            expect_reply,
            retry: RetryPolicy { max_retries: 2, initial_delay_ms: 0, max_delay_ms: 0, multiplier: 2.0 },
            ..LinkConfig::default()
        }
    }

    fn link_with(script: Vec<Step>, expect_reply: bool) -> (Link, Arc<Mutex<Shared>>) {
        let shared = Arc::new(Mutex::new(Shared::default()));
        let connector = FakeConnector {
            shared: shared.clone(),
            script: Arc::new(Mutex::new(script.into())),
            refuse: 0,
            banner: true,
        };
        let link = Link::open(Box::new(connector), quick_config(expect_reply)).unwrap();
        (link, shared)
    }

    #[test]
    fn backoff_grows_and_caps() {
        let p = RetryPolicy::default();
        assert_eq!(p.delay(0), Duration::from_millis(200));
        assert_eq!(p.delay(1), Duration::from_millis(400));
        assert_eq!(p.delay(2), Duration::from_millis(800));
        assert_eq!(p.delay(5), Duration::from_millis(2_000));
    }

    #[test]
    fn handshake_consumes_ready_banner() {
        let (mut link, _) = link_with(vec![], true);
        let reply = link.send(&Command::Clear).unwrap();
        assert_eq!(reply.as_deref(), Some("OK CL"));
    }

    #[test]
    fn missing_banner_still_opens() {
        let shared = Arc::new(Mutex::new(Shared::default()));
        let connector = FakeConnector {
            shared: shared.clone(),
            script: Arc::new(Mutex::new(VecDeque::new())),
            refuse: 0,
            banner: false,
        };
        let mut link = Link::open(Box::new(connector), quick_config(true)).unwrap();
        assert!(link.transport.is_some());
        assert_eq!(link.reconnects(), 0);

        // the board stays usable without ever announcing itself
        let reply = link.send(&Command::Clear).unwrap();
        assert_eq!(reply.as_deref(), Some("OK CL"));
        let s = shared.lock().unwrap();
        assert_eq!(s.connects, 1);
        assert_eq!(s.written, vec!["CL"]);
    }

    #[test]
    fn send_without_reply() {
        let (mut link, shared) = link_with(vec![], false);
        assert_eq!(link.send(&Command::off(1, 2).unwrap()).unwrap(), None);
        assert_eq!(shared.lock().unwrap().written, vec!["12"]);
    }

    #[test]
    fn write_failure_reconnects_and_resends() {
        let (mut link, shared) = link_with(vec![Step::WriteFails], false);
        link.send(&Command::Clear).unwrap();
        let s = shared.lock().unwrap();
        assert_eq!(s.connects, 2);
        assert_eq!(s.written, vec!["CL"]);
        drop(s);
        assert_eq!(link.reconnects(), 1);
        assert!(link.transport.is_some());
    }

    #[test]
    fn silent_board_times_out_then_recovers() {
        let (mut link, shared) = link_with(vec![Step::Silent], true);
        let reply = link.send(&Command::Clear).unwrap();
        assert_eq!(reply.as_deref(), Some("OK CL"));
        assert_eq!(shared.lock().unwrap().written, vec!["CL", "CL"]);
    }

    #[test]
    fn gives_up_after_max_retries() {
        let script = vec![Step::WriteFails; 10];
        let (mut link, _) = link_with(script, false);
        match link.send(&Command::Clear) {
            Err(LinkError::RetriesExhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, LinkError::Io(_)));
            }
            other => panic!("expected RetriesExhausted, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn refused_reconnect_counts_as_attempt() {
        let shared = Arc::new(Mutex::new(Shared::default()));
        let script = Arc::new(Mutex::new(VecDeque::from(vec![Step::WriteFails])));
        let connector = FakeConnector { shared: shared.clone(), script, refuse: 0, banner: true };
        let mut link = Link::open(Box::new(connector), quick_config(false)).unwrap();
        // make the next reconnect fail once: swap in a refusing connector
        link.connector = Box::new(FakeConnector {
            shared: shared.clone(),
            script: Arc::new(Mutex::new(VecDeque::new())),
            refuse: 1,
            banner: true,
        });
        link.send(&Command::Clear).unwrap();
        // open + refused + successful reconnect
        assert_eq!(shared.lock().unwrap().connects, 3);
        assert_eq!(link.reconnects(), 1);
    }

    #[test]
    fn drain_collects_waiting_lines() {
        let (mut link, _) = link_with(vec![], false);
        link.send(&Command::Clear).unwrap();
        link.send(&Command::off(0, 0).unwrap()).unwrap();
        assert_eq!(link.drain_replies(Duration::ZERO), vec!["OK CL", "OK 00"]);
        assert!(link.drain_replies(Duration::ZERO).is_empty());
    }

    #[test]
    fn close_clears_matrix() {
        let (mut link, shared) = link_with(vec![], false);
        link.close();
        assert!(link.transport.is_none());
        assert_eq!(shared.lock().unwrap().written, vec!["CL"]);
        // dropping a closed link sends nothing more
        drop(link);
        assert_eq!(shared.lock().unwrap().written.len(), 1);
    }

    #[test]
    fn config_from_toml() {
        let cfg: LinkConfig = toml::from_str(
            "port = \"/dev/ttyUSB3\"\nbaud = 9600\n[retry]\nmax_retries = 5\n",
        ).unwrap();
        assert_eq!(cfg.port.as_deref(), Some("/dev/ttyUSB3"));
        assert_eq!(cfg.baud, 9600);
        assert_eq!(cfg.retry.max_retries, 5);
        assert_eq!(cfg.retry.initial_delay_ms, 200);
        assert_eq!(cfg.boot_delay_ms, 2_500);
    }
}
