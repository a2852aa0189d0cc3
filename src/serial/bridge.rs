//! # Radio Bridge Line Protocol
//!
//! The LoRa module is driven by bridge firmware that reports every radio
//! event as one text line over USB serial:
//!
//! ```text
//! RFM 95 Receiver ready!
//! Received packet: [2;101.32,22.50,15.00]
//! RSSI: -87.50 dBm, SNR: 9.25 dB
//! No packet received, RX timeout.
//! Receive failed, error code: -7
//! ```
//!
//! `BridgeLink` turns that stream back into frames, signal metrics and
//! transport outcomes.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::link::quality::LinkQualitySample;
use crate::link::{LinkTransmitter, RadioLink, SignalReport};
use crate::packet::protocol::FRAME_START;

/// Prefixes the bridge puts in front of a frame
const FRAME_PREFIXES: &[&str] = &["Received packet:", "Sent packet:"];

/// One classified bridge line
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeLine {
    /// A telemetry frame, prefix stripped
    Frame(String),
    /// Metrics of the preceding frame
    Signal(LinkQualitySample),
    /// The radio's receive window elapsed with no packet
    Timeout,
    /// Receive error with the radio's diagnostic code
    Failure(i32),
    /// The radio reported a failed bring-up
    InitFailed(String),
    /// Banners and anything else
    Other(String),
}

/// Classify one line of bridge output
pub fn parse_bridge_line(line: &str) -> BridgeLine {
    let line = line.trim();

    for prefix in FRAME_PREFIXES {
        if let Some(frame) = line.strip_prefix(prefix) {
            return BridgeLine::Frame(frame.trim().to_string());
        }
    }

    if line.starts_with(FRAME_START) {
        return BridgeLine::Frame(line.to_string());
    }

    if let Some(signal) = parse_signal(line) {
        return BridgeLine::Signal(signal);
    }

    if line.starts_with("No packet received") {
        return BridgeLine::Timeout;
    }

    if let Some(code) = line.strip_prefix("Receive failed, error code:") {
        return match code.trim().parse::<i32>() {
            Ok(code) => BridgeLine::Failure(code),
            Err(_) => BridgeLine::Other(line.to_string()),
        };
    }

    if line.to_ascii_lowercase().contains("initialization failed") {
        return BridgeLine::InitFailed(line.to_string());
    }

    BridgeLine::Other(line.to_string())
}

/// Parse `RSSI: <f> dBm, SNR: <f> dB`
fn parse_signal(line: &str) -> Option<LinkQualitySample> {
    let rest = line.strip_prefix("RSSI:")?;
    let (rssi, snr) = rest.split_once(',')?;
    let rssi_dbm = rssi.trim().strip_suffix("dBm")?.trim().parse().ok()?;
    let snr_db = snr
        .trim()
        .strip_prefix("SNR:")?
        .trim()
        .strip_suffix("dB")?
        .trim()
        .parse()
        .ok()?;

    Some(LinkQualitySample { rssi_dbm, snr_db })
}

/// Frame transport over a radio bridge stream
///
/// Generic over the stream so tests can drive it with in-memory mocks; in
/// production `S` is a `tokio_serial::SerialStream`.
pub struct BridgeLink<S> {
    stream: BufReader<S>,
    poll_window: Duration,
    signal: Option<LinkQualitySample>,
    pending: Option<String>,
    /// Bytes of a line still being received, kept across poll windows
    partial: Vec<u8>,
}

impl<S> std::fmt::Debug for BridgeLink<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeLink")
            .field("poll_window", &self.poll_window)
            .field("signal", &self.signal)
            .field("partial_len", &self.partial.len())
            .finish_non_exhaustive()
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> BridgeLink<S> {
    /// Wrap a stream
    ///
    /// # Arguments
    ///
    /// * `stream` - Serial stream (or any async byte stream)
    /// * `poll_window` - Upper bound on one `receive` call
    pub fn new(stream: S, poll_window: Duration) -> Self {
        Self {
            stream: BufReader::new(stream),
            poll_window,
            signal: None,
            pending: None,
            partial: Vec::new(),
        }
    }

    /// Read one line before `deadline`
    ///
    /// Bytes read before the deadline stay in `partial`, so a line that
    /// straddles two poll windows is completed by the next call. Bytes that
    /// are not UTF-8 are replaced and left for the decoder to reject.
    async fn next_line(&mut self, deadline: Instant) -> Result<String, TransportError> {
        if let Some(line) = self.pending.take() {
            return Ok(line);
        }

        match timeout_at(deadline, self.stream.read_until(b'\n', &mut self.partial)).await {
            Err(_) => Err(TransportError::Timeout),
            Ok(Ok(0)) => Err(TransportError::Closed),
            Ok(Ok(_)) => {
                let line = String::from_utf8_lossy(&self.partial).into_owned();
                self.partial.clear();
                Ok(line)
            }
            Ok(Err(e)) => {
                warn!("Bridge read error: {}", e);
                Err(TransportError::Closed)
            }
        }
    }

    /// Pick up the metrics line that follows a frame
    ///
    /// Anything else is kept for the next `receive`.
    async fn read_signal(&mut self, deadline: Instant) {
        match self.next_line(deadline).await {
            Ok(line) => match parse_bridge_line(&line) {
                BridgeLine::Signal(signal) => self.signal = Some(signal),
                _ => self.pending = Some(line),
            },
            Err(e) => debug!("No signal line after frame: {}", e),
        }
    }
}

#[async_trait]
impl<S: AsyncRead + AsyncWrite + Unpin + Send> RadioLink for BridgeLink<S> {
    async fn receive(&mut self) -> Result<String, TransportError> {
        let deadline = Instant::now() + self.poll_window;

        loop {
            let line = self.next_line(deadline).await?;

            match parse_bridge_line(&line) {
                BridgeLine::Frame(frame) => {
                    self.signal = None;
                    self.read_signal(deadline).await;
                    return Ok(frame);
                }
                BridgeLine::Timeout => return Err(TransportError::Timeout),
                BridgeLine::Failure(code) => return Err(TransportError::Failure(code)),
                BridgeLine::InitFailed(message) => return Err(TransportError::InitFailed(message)),
                BridgeLine::Signal(signal) => {
                    debug!("Signal line without frame: {}", signal);
                }
                BridgeLine::Other(text) => {
                    if !text.is_empty() {
                        debug!("Bridge: {}", text);
                    }
                }
            }
        }
    }
}

impl<S> SignalReport for BridgeLink<S> {
    fn last_signal(&self) -> Option<LinkQualitySample> {
        self.signal
    }
}

#[async_trait]
impl<S: AsyncRead + AsyncWrite + Unpin + Send> LinkTransmitter for BridgeLink<S> {
    async fn send(&mut self, frame: &str) -> Result<(), TransportError> {
        write_line(self.stream.get_mut(), frame).await.map_err(|e| {
            warn!("Failed to write frame to bridge: {}", e);
            TransportError::Failure(e.raw_os_error().unwrap_or(-1))
        })?;

        debug!("Sent frame ({} bytes)", frame.len());
        Ok(())
    }
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, frame: &str) -> std::io::Result<()> {
    writer.write_all(frame.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}
