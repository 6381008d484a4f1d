//! # pigpio Daemon Module
//!
//! Fan PWM output and tachometer notifications through `pigpiod`.
//!
//! This module handles:
//! - Connecting to the daemon's command socket
//! - Configuring the tach GPIO (input, pull-up)
//! - Driving the fan PWM duty cycle
//! - Streaming in-band level-change notifications and picking out falling
//!   edges for the pulse counter
//!
//! pigpiod closes in-band notification handles when their socket closes, so
//! dropping a [`TachNotifier`] releases its handle.

pub mod decoder;
pub mod encoder;
pub mod protocol;

use async_trait::async_trait;
use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::{debug, info, trace};

use crate::error::{JourneyLoggerError, Result};
use crate::thermal::tach::PulseCounter;
use crate::thermal::FanActuator;
use decoder::{decode_report, decode_response, decode_response_raw, EdgeDetector};
use encoder::encode_command;
use protocol::*;

/// Connection to the pigpiod command socket
pub struct PigpioClient<T = TcpStream> {
    stream: T,
    address: String,
}

impl<T> std::fmt::Debug for PigpioClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PigpioClient")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl PigpioClient<TcpStream> {
    /// Connect to pigpiod
    ///
    /// # Errors
    ///
    /// Returns error if the daemon is not reachable
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use journey_logger::pigpio::PigpioClient;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let mut pi = PigpioClient::connect("127.0.0.1", 8888).await?;
    ///     pi.set_pwm_duty_cycle(18, 0).await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = open_socket(host, port).await?;
        info!("Connected to pigpio daemon at {}:{}", host, port);
        Ok(Self {
            stream,
            address: format!("{}:{}", host, port),
        })
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> PigpioClient<T> {
    /// Wrap an already-connected stream
    pub fn with_stream(stream: T, address: &str) -> Self {
        Self {
            stream,
            address: address.to_string(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Set a GPIO's mode, e.g. [`PI_INPUT`]
    pub async fn set_mode(&mut self, gpio: u32, mode: u32) -> Result<()> {
        self.command(Command::new(PI_CMD_MODES, gpio, mode)).await.map(|_| ())
    }

    /// Set a GPIO's pull resistor, e.g. [`PI_PUD_UP`]
    pub async fn set_pull_up_down(&mut self, gpio: u32, pud: u32) -> Result<()> {
        self.command(Command::new(PI_CMD_PUD, gpio, pud)).await.map(|_| ())
    }

    /// Start PWM on a GPIO with a 0-255 duty cycle
    pub async fn set_pwm_duty_cycle(&mut self, gpio: u32, duty: u8) -> Result<()> {
        self.command(Command::new(PI_CMD_PWM, gpio, u32::from(duty))).await.map(|_| ())
    }

    /// Read the levels of GPIO 0-31
    pub async fn read_bank_1(&mut self) -> Result<u32> {
        let response = self.exchange(Command::new(PI_CMD_BR1, 0, 0)).await?;
        decode_response_raw(PI_CMD_BR1, &response)
    }

    /// Start notifications for `bits` on `handle`
    pub async fn notify_begin(&mut self, handle: u32, bits: u32) -> Result<()> {
        self.command(Command::new(PI_CMD_NB, handle, bits)).await.map(|_| ())
    }

    async fn command(&mut self, command: Command) -> Result<u32> {
        let response = self.exchange(command).await?;
        decode_response(command.cmd, &response)
    }

    async fn exchange(&mut self, command: Command) -> Result<[u8; PIGPIO_COMMAND_SIZE]> {
        exchange(&mut self.stream, command).await
    }
}

/// Fan PWM output on one GPIO
pub struct PigpioFan<T = TcpStream> {
    client: PigpioClient<T>,
    gpio: u32,
}

impl<T> std::fmt::Debug for PigpioFan<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PigpioFan")
            .field("client", &self.client)
            .field("gpio", &self.gpio)
            .finish()
    }
}

impl<T> PigpioFan<T> {
    pub fn new(client: PigpioClient<T>, gpio: u32) -> Self {
        Self { client, gpio }
    }

    pub fn gpio(&self) -> u32 {
        self.gpio
    }
}

#[async_trait]
impl<T: AsyncRead + AsyncWrite + Unpin + Send> FanActuator for PigpioFan<T> {
    async fn set_duty_cycle(&mut self, duty: u8) -> Result<()> {
        self.client.set_pwm_duty_cycle(self.gpio, duty).await?;
        debug!("PWM duty {} on GPIO {}", duty, self.gpio);
        Ok(())
    }
}

/// In-band notification stream reporting tach falling edges
pub struct TachNotifier<T = TcpStream> {
    stream: T,
    handle: u32,
    detector: EdgeDetector,
    buffer: BytesMut,
}

impl<T> std::fmt::Debug for TachNotifier<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TachNotifier")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl TachNotifier<TcpStream> {
    /// Configure `gpio` as a pulled-up input and open a notification stream
    /// for it.
    ///
    /// `control` is an existing command connection used for set-up.
    pub async fn open<C>(host: &str, port: u16, control: &mut PigpioClient<C>, gpio: u32) -> Result<Self>
    where
        C: AsyncRead + AsyncWrite + Unpin + Send,
    {
        control.set_mode(gpio, PI_INPUT).await?;
        control.set_pull_up_down(gpio, PI_PUD_UP).await?;

        let mut stream = open_socket(host, port).await?;
        let response = exchange(&mut stream, Command::new(PI_CMD_NOIB, 0, 0)).await?;
        let handle = decode_response(PI_CMD_NOIB, &response)?;

        let initial_levels = control.read_bank_1().await?;
        control.notify_begin(handle, gpio_mask(gpio)).await?;
        info!("Tachometer notifications on GPIO {} (handle {})", gpio, handle);

        Ok(Self::with_stream(stream, handle, gpio, initial_levels))
    }
}

impl<T: AsyncRead + Unpin + Send> TachNotifier<T> {
    /// Wrap a stream that already carries notification reports
    pub fn with_stream(stream: T, handle: u32, gpio: u32, initial_levels: u32) -> Self {
        Self {
            stream,
            handle,
            detector: EdgeDetector::new(gpio, initial_levels),
            buffer: BytesMut::with_capacity(PIGPIO_REPORT_SIZE * 64),
        }
    }

    pub fn handle(&self) -> u32 {
        self.handle
    }

    /// Wait for the next falling edge and return its tick
    ///
    /// Cancel-safe: partial reports stay buffered across calls.
    ///
    /// # Errors
    ///
    /// Returns error when the daemon closes the stream or a read fails
    pub async fn next_falling_edge(&mut self) -> Result<u32> {
        loop {
            while self.buffer.len() >= PIGPIO_REPORT_SIZE {
                let report = decode_report(&self.buffer[..PIGPIO_REPORT_SIZE])?;
                self.buffer.advance(PIGPIO_REPORT_SIZE);
                if let Some(tick) = self.detector.falling_edge(&report) {
                    return Ok(tick);
                }
            }

            if self.stream.read_buf(&mut self.buffer).await? == 0 {
                return Err(JourneyLoggerError::Pigpio(
                    "Notification stream closed by daemon".to_string()
                ));
            }
        }
    }

    /// Feed falling edges into `counter` until `stop` turns true
    pub async fn run(mut self, counter: PulseCounter, mut stop: watch::Receiver<bool>) -> Result<()> {
        loop {
            if *stop.borrow() {
                break;
            }
            tokio::select! {
                edge = self.next_falling_edge() => {
                    let tick = edge?;
                    if let Some(rpm) = counter.on_falling_edge(tick) {
                        trace!("Fan at {:.0} RPM", rpm);
                    }
                }
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        debug!("Tachometer task stopped");
        Ok(())
    }
}

async fn open_socket(host: &str, port: u16) -> Result<TcpStream> {
    let stream = TcpStream::connect((host, port)).await.map_err(|e| {
        JourneyLoggerError::Pigpio(format!("Failed to connect to {}:{}: {}", host, port, e))
    })?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

async fn exchange<S>(stream: &mut S, command: Command) -> Result<[u8; PIGPIO_COMMAND_SIZE]>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(&encode_command(&command)).await?;
    let mut response = [0u8; PIGPIO_COMMAND_SIZE];
    stream.read_exact(&mut response).await?;
    Ok(response)
}
