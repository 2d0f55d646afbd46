//! # Network Connection Management
//!
//! The clock treats the wireless link as a black box: it can ask whether the
//! link is up and ask for one bounded reconnect attempt. How credentials get
//! onto the device (access point plus web form, or a preconfigured profile)
//! is the connection manager's business, not the clock's.
//!
//! [`NmcliConnection`] drives NetworkManager through its `nmcli` command
//! line tool, which is what Raspberry Pi OS ships. [`HostNetwork`] is for
//! development on a desktop where the operating system keeps the network
//! up on its own.

use std::io;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Upper bound for a state query
const STATE_QUERY_TIMEOUT: Duration = Duration::from_secs(2);
/// Extra time given to `nmcli` beyond its own `--wait`
const RECONNECT_GRACE: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Link state as reported by the connection manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

pub trait ConnectionManager {
    /// Quick state read, bounded by a short timeout.
    fn state(&self) -> ConnectionState;

    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// One blocking, bounded connection attempt. `false` means the caller
    /// should try again later.
    fn reconnect(&mut self) -> bool;
}

/// Map the `STATE` column of `nmcli -t -f STATE general`.
pub fn parse_nmcli_state(output: &str) -> ConnectionState {
    match output.trim() {
        "connected" | "connected (site only)" | "connected (local only)" => {
            ConnectionState::Connected
        }
        "connecting" => ConnectionState::Connecting,
        _ => ConnectionState::Disconnected,
    }
}

/// NetworkManager-backed connection manager.
pub struct NmcliConnection {
    profile: String,
    timeout_secs: u64,
}

impl NmcliConnection {
    pub fn new(profile: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            profile: profile.into(),
            timeout_secs,
        }
    }

    fn nmcli(args: &[&str], timeout: Duration) -> io::Result<Output> {
        run_bounded("nmcli", args, timeout)
    }
}

/// Run `program` to completion, killing it if it outlives `timeout`.
fn run_bounded(program: &str, args: &[&str], timeout: Duration) -> io::Result<Output> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let deadline = Instant::now() + timeout;
    loop {
        if child.try_wait()?.is_some() {
            return child.wait_with_output();
        }
        if Instant::now() >= deadline {
            // Exited between the checks if kill fails; reap it either way
            let _ = child.kill();
            child.wait()?;
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("{program} did not finish within {timeout:?}"),
            ));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

impl ConnectionManager for NmcliConnection {
    fn state(&self) -> ConnectionState {
        match Self::nmcli(&["-t", "-f", "STATE", "general"], STATE_QUERY_TIMEOUT) {
            Ok(output) if output.status.success() => {
                parse_nmcli_state(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => {
                debug!(status = %output.status, "nmcli state query failed");
                ConnectionState::Disconnected
            }
            Err(e) => {
                warn!(%e, "could not run nmcli");
                ConnectionState::Disconnected
            }
        }
    }

    fn reconnect(&mut self) -> bool {
        info!(profile = %self.profile, "connecting to wireless network");
        let wait = self.timeout_secs.to_string();
        let result = Self::nmcli(
            &["--wait", &wait, "connection", "up", "id", &self.profile],
            Duration::from_secs(self.timeout_secs) + RECONNECT_GRACE,
        );

        match result {
            Ok(output) if output.status.success() => {
                info!(profile = %self.profile, "connected");
                true
            }
            Ok(output) => {
                warn!(
                    profile = %self.profile,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "failed to connect"
                );
                false
            }
            Err(e) => {
                warn!(%e, "could not run nmcli");
                false
            }
        }
    }
}

/// Network owned by the host operating system; always reported as up.
#[derive(Clone, Copy, Debug, Default)]
pub struct HostNetwork;

impl ConnectionManager for HostNetwork {
    fn state(&self) -> ConnectionState {
        ConnectionState::Connected
    }

    fn reconnect(&mut self) -> bool {
        true
    }
}
