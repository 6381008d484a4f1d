//! # Journey Logger
//!
//! Log GPS journeys to KML and CSV while regulating the enclosure fan.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration (first CLI argument, default `config/default.toml`)
//!    - Set up logging with tracing subscriber
//!    - Connect to pigpiod, configure the fan and tachometer GPIOs
//!    - Connect to gpsd and enable the JSON watch stream
//!
//! 2. **Main Loop**
//!    - Fan control task adjusts PWM every 2 seconds
//!    - Tachometer task turns falling edges into RPM
//!    - Foreground loop polls gpsd every 3 seconds, logs the journey and
//!      refreshes the status display
//!
//! 3. **Graceful Shutdown** (SIGINT, SIGTERM, a fatal loop error or a panic
//!    inside the loop)
//!    - Close the logging session
//!    - Stop the background tasks and switch the fan off
//!    - Put the display to sleep
//!
//! Hardware initialization failures exit non-zero before any task starts.

use anyhow::{Context, Result};
use chrono::TimeDelta;
use std::path::Path;
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::{timeout, Duration};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use journey_logger::config::{Config, DiagnosticsConfig};
use journey_logger::datalog::LoggingEngine;
use journey_logger::display::TracingDisplay;
use journey_logger::gpsd::GpsdClient;
use journey_logger::journey::JourneyTracker;
use journey_logger::pigpio::protocol::PI_CMD_PWM;
use journey_logger::pigpio::{PigpioClient, PigpioFan, TachNotifier};
use journey_logger::runtime::MainLoop;
use journey_logger::shutdown::Shutdown;
use journey_logger::thermal::controller::ThermalController;
use journey_logger::thermal::curve::FanCurve;
use journey_logger::thermal::sensor::SysfsTemperatureSensor;
use journey_logger::thermal::tach::PulseCounter;
use journey_logger::thermal::{FanActuator, SharedThermal};

/// Configuration file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Prefix of the rolling diagnostic log files
const DIAGNOSTIC_LOG_PREFIX: &str = "journey-logger.log";

/// How long shutdown waits for the tachometer task
const TACH_STOP_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    // Held until exit so buffered log lines are flushed
    let _log_guard = init_logging(&config.diagnostics);

    info!("Journey Logger v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {}", config_path);

    // Hardware initialization: any failure here is fatal
    let fan_cfg = &config.fan;
    let mut control = PigpioClient::connect(&fan_cfg.pigpio_host, fan_cfg.pigpio_port)
        .await
        .context("pigpio daemon unavailable")?;
    let notifier = TachNotifier::open(&fan_cfg.pigpio_host, fan_cfg.pigpio_port, &mut control, fan_cfg.tach_gpio)
        .await
        .context("Failed to set up tachometer input")?;
    let mut fan = PigpioFan::new(control, fan_cfg.fan_gpio);
    fan.set_duty_cycle(0)
        .await
        .with_context(|| format!("Failed to start PWM (command {}) on GPIO {}", PI_CMD_PWM, fan_cfg.fan_gpio))?;

    let gpsd_cfg = &config.gpsd;
    let mut gpsd = GpsdClient::connect(
        &gpsd_cfg.host,
        gpsd_cfg.port,
        Duration::from_millis(gpsd_cfg.drain_timeout_ms),
    )
    .await
    .context("gpsd unavailable")?
    .with_max_drain(Duration::from_millis(gpsd_cfg.max_drain_ms));
    gpsd.watch().await.context("Failed to enable gpsd watch")?;

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    // Background tasks
    let shutdown = Shutdown::new();
    let thermal = SharedThermal::new();

    let controller = ThermalController::new(
        SysfsTemperatureSensor::new(&fan_cfg.temperature_path),
        fan,
        FanCurve::new(fan_cfg.temp_off_f, fan_cfg.temp_full_f),
        thermal.clone(),
        Duration::from_millis(fan_cfg.control_interval_ms),
    );
    let mut thermal_task = Some(tokio::spawn(controller.run(shutdown.subscribe())));
    let tach_task = tokio::spawn(notifier.run(PulseCounter::new(thermal.clone()), shutdown.subscribe()));

    let log_cfg = &config.logging;
    let mut main_loop = MainLoop::new(
        gpsd,
        TracingDisplay::new(),
        JourneyTracker::new(TimeDelta::seconds(log_cfg.grace_period_s as i64)),
        LoggingEngine::new(
            &log_cfg.log_dir,
            &log_cfg.file_prefix,
            TimeDelta::seconds(log_cfg.log_interval_s as i64),
        ),
        thermal,
        Duration::from_millis(gpsd_cfg.poll_interval_ms),
    );

    info!("Press Ctrl+C to exit");
    let outcome = main_loop
        .run(async {
            tokio::select! {
                _ = sigint.recv() => "SIGINT",
                _ = sigterm.recv() => "SIGTERM",
            }
        })
        .await;

    match &outcome {
        Ok(name) => info!("Received {}, shutting down...", name),
        Err(e) => error!("Main loop failed: {}", e),
    }

    main_loop.shutdown(&shutdown, &mut thermal_task).await;

    match timeout(TACH_STOP_TIMEOUT, tach_task).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => warn!("Tachometer task ended with error: {}", e),
        Ok(Err(e)) => warn!("Tachometer task failed: {}", e),
        Err(_) => warn!("Tachometer task did not stop within {:?}", TACH_STOP_TIMEOUT),
    }

    outcome?;
    info!("Shutdown complete");
    Ok(())
}

/// Install the tracing subscriber.
///
/// Logs go to stdout, and additionally to a daily rolling file when
/// `diagnostics.log_file_dir` is set.
fn init_logging(diagnostics: &DiagnosticsConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    if diagnostics.log_file_dir.is_empty() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return None;
    }

    use tracing_subscriber::fmt::writer::MakeWriterExt;

    let appender = tracing_appender::rolling::daily(Path::new(&diagnostics.log_file_dir), DIAGNOSTIC_LOG_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stdout.and(file_writer))
        .init();
    Some(guard)
}
