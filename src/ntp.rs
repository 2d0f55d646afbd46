//! # NTP Time Fetching
//!
//! This module performs the network round-trip that gives the clock its
//! authoritative UTC seconds. It speaks plain SNTP (RFC 4330) over UDP.
//!
//! ## Protocol
//!
//! ### Request
//! - **Size**: 48 bytes, all zero except the first
//! - **First byte**: `0x1B` (leap indicator 0, version 3, mode 3 = client)
//!
//! ### Response
//! - **Size**: at least 48 bytes
//! - **Mode**: 4 (server) or 5 (broadcast)
//! - **Leap indicator**: anything but 3 (unsynchronized server)
//! - **Stratum**: 1-15; stratum 0 is a kiss-of-death such as `RATE`
//! - **Transmit timestamp**: bytes 40-43, big-endian seconds since 1900
//!
//! NTP seconds are converted to Unix seconds by subtracting the 70 years
//! between the two epochs. Timestamps numerically below that offset are
//! read as NTP era 1 (after February 2036).
//!
//! ## Request Cadence
//!
//! The client keeps its own retry interval, separate from the clock's
//! resync interval: after a successful exchange, further fetches inside
//! the retry interval are answered from that exchange, extrapolated on the
//! monotonic clock, without touching the network. Failed exchanges don't
//! start the interval, so the next fetch tries the server again.
//!
//! ## Error Handling
//!
//! Every exchange is bounded by a timeout; all failure modes surface
//! through [`SyncError`]:
//! - **Resolution failures**: hostname doesn't resolve
//! - **Socket errors**: bind/send/receive failures
//! - **Timeouts**: server silent within the configured window
//! - **Malformed replies**: short packets, wrong mode, unsynchronized
//!   or kiss-of-death replies, zero timestamp

use std::io;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::{lookup_host, UdpSocket};
use tracing::{debug, info, warn};

use crate::config::NtpConfig;

/// Size of an SNTP packet without extensions
pub const PACKET_SIZE: usize = 48;

/// Seconds between 1900-01-01 (NTP epoch) and 1970-01-01 (Unix epoch)
pub const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

const ERA_SECONDS: u64 = 1 << 32;
/// Leap indicator value meaning "clock not synchronized"
const LEAP_ALARM: u8 = 3;
const MAX_STRATUM: u8 = 15;

/// Errors that can occur while fetching time from the network.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Server name resolved to no usable address
    #[error("no address for time server {0}")]
    NoAddress(String),

    /// Socket operation failed (resolution, bind, send, receive)
    #[error("socket IO: {0}")]
    Io(#[from] io::Error),

    /// No reply within the configured timeout
    #[error("no reply within {0:?}")]
    Timeout(Duration),

    /// Reply shorter than an SNTP header
    #[error("short reply: {0} bytes")]
    ShortResponse(usize),

    /// Reply isn't a usable server answer
    #[error("invalid reply: {0}")]
    InvalidResponse(&'static str),
}

/// Anything that can produce authoritative UTC seconds.
pub trait TimeServer {
    /// One bounded round-trip for the current UTC time in Unix seconds.
    fn fetch_utc(&mut self) -> Result<i64, SyncError>;
}

/// Build a client-mode SNTP request.
pub fn request_packet() -> [u8; PACKET_SIZE] {
    let mut packet = [0u8; PACKET_SIZE];
    packet[0] = 0x1B; // LI=0, VN=3, Mode=3 (client)
    packet
}

/// Extract Unix seconds from an SNTP reply.
pub fn parse_response(packet: &[u8]) -> Result<i64, SyncError> {
    if packet.len() < PACKET_SIZE {
        return Err(SyncError::ShortResponse(packet.len()));
    }

    let mode = packet[0] & 0b0000_0111;
    if mode != 4 && mode != 5 {
        return Err(SyncError::InvalidResponse("not a server reply"));
    }
    if packet[0] >> 6 == LEAP_ALARM {
        return Err(SyncError::InvalidResponse("server clock not synchronized"));
    }
    // Stratum 0 carries a kiss code (e.g. "RATE") instead of time
    match packet[1] {
        0 => return Err(SyncError::InvalidResponse("kiss-of-death reply")),
        stratum if stratum > MAX_STRATUM => {
            return Err(SyncError::InvalidResponse("stratum out of range"))
        }
        _ => {}
    }

    let seconds = u64::from(u32::from_be_bytes([
        packet[40], packet[41], packet[42], packet[43],
    ]));
    if seconds == 0 {
        return Err(SyncError::InvalidResponse("zero transmit timestamp"));
    }

    let unix = if seconds >= NTP_UNIX_OFFSET {
        seconds - NTP_UNIX_OFFSET
    } else {
        seconds + ERA_SECONDS - NTP_UNIX_OFFSET
    };
    Ok(unix as i64)
}

/// SNTP client with its own retry interval.
pub struct NtpClient {
    server: String,
    port: u16,
    timeout: Duration,
    retry_interval: Duration,
    runtime: tokio::runtime::Runtime,
    last_exchange: Option<(i64, Instant)>,
}

impl NtpClient {
    pub fn new(config: &NtpConfig) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_io()
            .enable_time()
            .build()?;
        Ok(Self {
            server: config.server.clone(),
            port: config.port,
            timeout: Duration::from_millis(config.timeout_ms),
            retry_interval: Duration::from_secs(config.retry_interval_secs),
            runtime,
            last_exchange: None,
        })
    }

    /// Unconditional network round-trip, ignoring the retry interval.
    pub fn force_update(&mut self) -> Result<i64, SyncError> {
        let started = Instant::now();
        let utc = self
            .runtime
            .block_on(exchange(&self.server, self.port, self.timeout))?;
        info!(server = %self.server, utc, elapsed = ?started.elapsed(), "NTP exchange succeeded");
        self.last_exchange = Some((utc, Instant::now()));
        Ok(utc)
    }
}

impl TimeServer for NtpClient {
    fn fetch_utc(&mut self) -> Result<i64, SyncError> {
        if let Some((utc, at)) = self.last_exchange {
            let age = at.elapsed();
            if age < self.retry_interval {
                debug!(?age, "NTP answer still fresh, skipping request");
                return Ok(utc + age.as_secs() as i64);
            }
        }
        self.force_update().inspect_err(|error| {
            warn!(server = %self.server, %error, "NTP exchange failed");
        })
    }
}

async fn exchange(server: &str, port: u16, timeout: Duration) -> Result<i64, SyncError> {
    let round_trip = async {
        let addr = lookup_host((server, port))
            .await?
            .next()
            .ok_or_else(|| SyncError::NoAddress(server.to_string()))?;

        let bind_addr = if addr.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(addr).await?;
        socket.send(&request_packet()).await?;

        let mut reply = [0u8; 128];
        let len = socket.recv(&mut reply).await?;
        parse_response(&reply[..len])
    };

    tokio::time::timeout(timeout, round_trip)
        .await
        .map_err(|_| SyncError::Timeout(timeout))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::UdpSocket as StdUdpSocket;
    use std::thread;

    fn reply_with(seconds: u32) -> [u8; PACKET_SIZE] {
        let mut packet = [0u8; PACKET_SIZE];
        packet[0] = 0x1C; // LI=0, VN=3, Mode=4 (server)
        packet[1] = 2;
        packet[40..44].copy_from_slice(&seconds.to_be_bytes());
        packet
    }

    fn config_for(port: u16, timeout_ms: u64, retry_interval_secs: u64) -> NtpConfig {
        NtpConfig {
            server: "127.0.0.1".to_string(),
            port,
            timeout_ms,
            retry_interval_secs,
        }
    }

    /// Answer `count` requests on a loopback socket, returning its port.
    fn spawn_server(seconds: u32, count: usize) -> (u16, thread::JoinHandle<usize>) {
        let socket = StdUdpSocket::bind("127.0.0.1:0").unwrap();
        let port = socket.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let mut served = 0;
            let mut buf = [0u8; PACKET_SIZE];
            for _ in 0..count {
                let (len, peer) = socket.recv_from(&mut buf).unwrap();
                assert_eq!(len, PACKET_SIZE);
                assert_eq!(buf[0], 0x1B);
                socket.send_to(&reply_with(seconds), peer).unwrap();
                served += 1;
            }
            served
        });
        (port, handle)
    }

    #[test]
    fn test_request_packet() {
        let packet = request_packet();
        assert_eq!(packet.len(), 48);
        assert_eq!(packet[0], 0x1B);
        assert!(packet[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_parse_response_converts_epoch() {
        // 2023-07-04 16:30:45 UTC
        let ntp = (1_688_488_245u64 + NTP_UNIX_OFFSET) as u32;
        assert_eq!(parse_response(&reply_with(ntp)).unwrap(), 1_688_488_245);
    }

    #[test]
    fn test_parse_response_after_era_rollover() {
        // Ten seconds into NTP era 1
        let unix = parse_response(&reply_with(10)).unwrap();
        assert_eq!(unix, (ERA_SECONDS + 10 - NTP_UNIX_OFFSET) as i64);
    }

    #[test]
    fn test_parse_response_rejects_bad_replies() {
        assert!(matches!(
            parse_response(&[0x1C; 20]),
            Err(SyncError::ShortResponse(20))
        ));

        let mut client_mode = reply_with(1);
        client_mode[0] = 0x1B;
        assert!(matches!(
            parse_response(&client_mode),
            Err(SyncError::InvalidResponse(_))
        ));

        assert!(matches!(
            parse_response(&reply_with(0)),
            Err(SyncError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_response_rejects_unsynchronized_servers() {
        let ntp = (1000 + NTP_UNIX_OFFSET) as u32;

        let mut alarm = reply_with(ntp);
        alarm[0] = 0b1101_1100; // LI=3, VN=3, Mode=4
        assert!(matches!(
            parse_response(&alarm),
            Err(SyncError::InvalidResponse(_))
        ));

        let mut kiss = reply_with(ntp);
        kiss[1] = 0;
        kiss[12..16].copy_from_slice(b"RATE");
        assert!(matches!(
            parse_response(&kiss),
            Err(SyncError::InvalidResponse(_))
        ));

        let mut too_deep = reply_with(ntp);
        too_deep[1] = 16;
        assert!(matches!(
            parse_response(&too_deep),
            Err(SyncError::InvalidResponse(_))
        ));

        // Leap second warnings and stratum 15 are still usable
        let mut leap = reply_with(ntp);
        leap[0] = 0b0101_1100;
        leap[1] = 15;
        assert_eq!(parse_response(&leap).unwrap(), 1000);
    }

    #[test]
    fn test_fetch_from_loopback_server() {
        let ntp = (1_700_000_000u64 + NTP_UNIX_OFFSET) as u32;
        let (port, server) = spawn_server(ntp, 1);
        let mut client = NtpClient::new(&config_for(port, 2000, 60)).unwrap();

        assert_eq!(client.fetch_utc().unwrap(), 1_700_000_000);
        assert_eq!(server.join().unwrap(), 1);
    }

    #[test]
    fn test_retry_interval_suppresses_requests() {
        let ntp = (1_700_000_000u64 + NTP_UNIX_OFFSET) as u32;
        let (port, server) = spawn_server(ntp, 1);
        let mut client = NtpClient::new(&config_for(port, 2000, 3600)).unwrap();

        let first = client.fetch_utc().unwrap();
        assert_eq!(server.join().unwrap(), 1);

        // Server is gone; the second answer comes from the first exchange
        let second = client.fetch_utc().unwrap();
        assert!(second >= first && second <= first + 1);
    }

    #[test]
    fn test_silent_server_times_out() {
        let silent = StdUdpSocket::bind("127.0.0.1:0").unwrap();
        let port = silent.local_addr().unwrap().port();
        let mut client = NtpClient::new(&config_for(port, 100, 60)).unwrap();

        let started = Instant::now();
        let result = client.fetch_utc();
        assert!(matches!(result, Err(SyncError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(2));
        drop(silent);
    }
}
