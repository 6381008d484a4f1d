//! # gpsd Client Module
//!
//! Fix source backed by a gpsd daemon speaking its JSON protocol.
//!
//! This module handles:
//! - Connecting to gpsd and enabling the JSON watch stream
//! - Draining every pending report once per polling tick
//! - Folding TPV and SKY reports into a [`FixReport`]
//!
//! A tick ends when gpsd has been quiet for the drain timeout, or when the
//! maximum drain time runs out on a stream that never pauses. Malformed lines
//! are logged and skipped; a closed connection is an error.

pub mod decoder;
pub mod protocol;
pub mod source_trait;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::{JourneyLoggerError, Result};
use crate::journey::fix::FixReport;
use decoder::{decode_line, FixAccumulator, LineBuffer};
use protocol::WATCH_COMMAND;
pub use source_trait::FixSource;

/// Default time gpsd must stay quiet before a tick's report is complete
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_millis(100);

/// Default cap on a single drain
pub const DEFAULT_MAX_DRAIN: Duration = Duration::from_secs(1);

/// Connection to gpsd
pub struct GpsdClient<T = TcpStream> {
    stream: T,
    lines: LineBuffer,
    drain_timeout: Duration,
    max_drain: Duration,
}

impl<T> std::fmt::Debug for GpsdClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpsdClient")
            .field("drain_timeout", &self.drain_timeout)
            .field("max_drain", &self.max_drain)
            .finish_non_exhaustive()
    }
}

impl GpsdClient<TcpStream> {
    /// Connect to gpsd
    ///
    /// # Errors
    ///
    /// Returns error if gpsd is not reachable
    pub async fn connect(host: &str, port: u16, drain_timeout: Duration) -> Result<Self> {
        let stream = TcpStream::connect((host, port)).await.map_err(|e| {
            JourneyLoggerError::Gpsd(format!("Failed to connect to {}:{}: {}", host, port, e))
        })?;
        info!("Connected to gpsd at {}:{}", host, port);
        Ok(Self::with_stream(stream, drain_timeout))
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> GpsdClient<T> {
    /// Wrap an already-connected stream
    pub fn with_stream(stream: T, drain_timeout: Duration) -> Self {
        Self {
            stream,
            lines: LineBuffer::new(),
            drain_timeout,
            max_drain: DEFAULT_MAX_DRAIN.max(drain_timeout),
        }
    }

    /// Cap the total time one drain may take
    pub fn with_max_drain(mut self, max_drain: Duration) -> Self {
        self.max_drain = max_drain;
        self
    }

    /// Ask gpsd to stream JSON reports
    pub async fn watch(&mut self) -> Result<()> {
        self.stream.write_all(WATCH_COMMAND.as_bytes()).await?;
        self.stream.flush().await?;
        debug!("gpsd watch enabled");
        Ok(())
    }

    /// Drain all pending reports into one [`FixReport`]
    ///
    /// Stops after `drain_timeout` of silence or `max_drain` in total,
    /// whichever comes first. Unread data stays queued for the next drain.
    ///
    /// # Errors
    ///
    /// Returns error when gpsd closes the connection or a read fails
    pub async fn drain(&mut self) -> Result<FixReport> {
        let mut acc = FixAccumulator::new();
        let deadline = Instant::now() + self.max_drain;

        loop {
            while let Some(line) = self.lines.next_line() {
                if line.trim().is_empty() {
                    continue;
                }
                match decode_line(&line) {
                    Ok(report) => acc.apply(report),
                    Err(e) => warn!("Skipping malformed gpsd line: {}", e),
                }
            }

            let now = Instant::now();
            if now >= deadline {
                debug!("gpsd drain hit the {:?} cap", self.max_drain);
                break;
            }

            let quiet_until = (now + self.drain_timeout).min(deadline);
            match timeout_at(quiet_until, self.stream.read_buf(self.lines.buffer_mut())).await {
                Ok(Ok(0)) => {
                    return Err(JourneyLoggerError::Gpsd("Connection closed by gpsd".to_string()));
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => break,
            }
        }

        debug!("Drained {} gpsd reports", acc.reports_seen());
        Ok(acc.finish())
    }
}

#[async_trait]
impl<T: AsyncRead + AsyncWrite + Unpin + Send> FixSource for GpsdClient<T> {
    async fn next_report(&mut self) -> Result<FixReport> {
        self.drain().await
    }
}
