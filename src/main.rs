//! # Matrix Clock Application Entry Point
//!
//! This binary wires the clock library to real collaborators: an NTP
//! client, NetworkManager, and either the HT16K33 LED matrix (production)
//! or the terminal (development mode).

// Test modules
#[cfg(test)]
mod tests;

use anyhow::Context;
use core::convert::Infallible;
use matrix_clock_lib::{
    config::Config,
    connection::HostNetwork,
    frame::Frame,
    glyphs::Glyph,
    ntp::NtpClient,
    render::draw_ascii,
    time_source::{MonotonicClock, TimeSource},
    Canvas, Clock,
};
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Frame buffer that prints itself to stdout on every flush.
struct TerminalCanvas {
    frame: Frame,
}

impl Canvas for TerminalCanvas {
    type Error = Infallible;

    fn clear(&mut self) -> Result<(), Self::Error> {
        Canvas::clear(&mut self.frame)
    }

    fn draw_pixel(&mut self, x: i32, y: i32, on: bool) -> Result<(), Self::Error> {
        self.frame.draw_pixel(x, y, on)
    }

    fn draw_line(
        &mut self,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        on: bool,
    ) -> Result<(), Self::Error> {
        self.frame.draw_line(x0, y0, x1, y1, on)
    }

    fn draw_bitmap(&mut self, x: i32, y: i32, glyph: &Glyph, on: bool) -> Result<(), Self::Error> {
        self.frame.draw_bitmap(x, y, glyph, on)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        draw_ascii(&self.frame);
        Ok(())
    }
}

fn time_source(config: &Config) -> anyhow::Result<TimeSource<NtpClient, MonotonicClock>> {
    let client = NtpClient::new(&config.ntp).context("start NTP client runtime")?;
    Ok(TimeSource::new(
        client,
        MonotonicClock::new(),
        config.sync.interval_secs,
    ))
}

/// Development mode: host-managed network, frames printed to stdout.
fn run_in_terminal(config: &Config) -> anyhow::Result<()> {
    let canvas = TerminalCanvas {
        frame: Frame::new(),
    };
    let mut clock = Clock::new(
        HostNetwork,
        time_source(config)?,
        config.timezone.clone(),
        canvas,
    );
    clock.run(config.tick_interval(), config.icon_hold())
}

/// Production mode: HT16K33 matrix on I2C, NetworkManager for Wi-Fi.
#[cfg(all(target_os = "linux", feature = "hardware"))]
fn run_on_matrix(config: &Config) -> anyhow::Result<()> {
    use linux_embedded_hal::I2cdev;
    use matrix_clock_lib::{connection::NmcliConnection, matrix::Ht16k33Matrix};

    let display = &config.display;
    info!(
        bus = %display.i2c_bus,
        address = format_args!("{:#04x}", display.address),
        rotation = display.rotation,
        brightness = display.brightness,
        "initializing LED matrix"
    );

    let bus = I2cdev::new(&display.i2c_bus)
        .with_context(|| format!("open I2C bus {}", display.i2c_bus))?;
    let matrix = Ht16k33Matrix::new(bus, display.address, display.rotation, display.brightness)
        .map_err(|e| anyhow::anyhow!("LED matrix setup failed: {e}"))?;

    let network = NmcliConnection::new(
        config.network.connection.clone(),
        config.network.connect_timeout_secs,
    );

    let mut clock = Clock::new(network, time_source(config)?, config.timezone.clone(), matrix);
    clock.run(config.tick_interval(), config.icon_hold())
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Development mode: render to stdout for testing without hardware
    let development_mode = env::args().any(|arg| arg == "--stdout");

    let config = Config::load();
    info!(
        server = %config.ntp.server,
        sync_interval_secs = config.sync.interval_secs,
        retry_interval_secs = config.ntp.retry_interval_secs,
        summer = %config.timezone.summer.name,
        winter = %config.timezone.winter.name,
        "starting matrix clock"
    );

    if development_mode {
        return run_in_terminal(&config);
    }

    #[cfg(all(target_os = "linux", feature = "hardware"))]
    {
        run_on_matrix(&config)
    }

    #[cfg(not(all(target_os = "linux", feature = "hardware")))]
    {
        tracing::warn!("LED matrix support not enabled. Rebuild with --features hardware on Linux.");
        tracing::warn!("Showing terminal output instead");
        run_in_terminal(&config)
    }
}
