//! # Main Loop
//!
//! One tick per second, strictly sequential:
//!
//! 1. **Connectivity**: if the link is down, show the "disconnected" icon and
//!    make one reconnect attempt; on success show the "connected" icon.
//!    Nothing else happens that tick.
//! 2. **Time**: read UTC from the [`TimeSource`], which may sync over NTP.
//! 3. **Convert**: apply the [`TimezonePolicy`].
//! 4. **Report**: log the date line, then the time line.
//! 5. **Render**: draw one full frame.
//!
//! No failure stops the loop. Sync problems fall back to the cached time,
//! connection problems are retried on the next tick, and display errors
//! are logged and the next tick redraws a complete frame anyway.

use crate::canvas::{draw, Canvas, DrawCommand};
use crate::connection::ConnectionManager;
use crate::diagnostics::{date_line, time_line};
use crate::glyphs::Icon;
use crate::ntp::TimeServer;
use crate::render::{render, render_icon};
use crate::time_source::{TickClock, TimeSource};
use crate::timezone::TimezonePolicy;
use std::time::Duration;
use tracing::{info, warn};

/// What a single tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Link was up; this local instant was drawn
    Rendered { local: i64 },
    /// Link was down and came back; the connected icon is showing
    Reconnected,
    /// Link was down and is still down; the disconnected icon is showing
    ReconnectFailed,
}

pub struct Clock<N, S, T, D> {
    network: N,
    time: TimeSource<S, T>,
    policy: TimezonePolicy,
    canvas: D,
}

impl<N, S, T, D> Clock<N, S, T, D>
where
    N: ConnectionManager,
    S: TimeServer,
    T: TickClock,
    D: Canvas,
{
    pub fn new(network: N, time: TimeSource<S, T>, policy: TimezonePolicy, canvas: D) -> Self {
        Self {
            network,
            time,
            policy,
            canvas,
        }
    }

    pub fn canvas(&self) -> &D {
        &self.canvas
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn time_source(&self) -> &TimeSource<S, T> {
        &self.time
    }

    /// One pass of the main loop. Never sleeps.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.network.is_connected() {
            self.show(&render_icon(Icon::Disconnected));
            if !self.network.reconnect() {
                warn!("reconnect failed, retrying next tick");
                return TickOutcome::ReconnectFailed;
            }
            self.show(&render_icon(Icon::Connected));
            return TickOutcome::Reconnected;
        }

        let utc = self.time.now(true);
        let local = self.policy.to_local(utc);

        match date_line(local) {
            Some(date) => info!("{date}"),
            None => warn!(local, "date outside the calendar range"),
        }
        info!(zone = %self.policy.active_rule(utc).name, "{}", time_line(local));

        self.show(&render(local));
        TickOutcome::Rendered { local }
    }

    /// Tick forever, sleeping `tick_interval` between passes and holding the
    /// connected icon for `icon_hold` after a reconnect.
    pub fn run(&mut self, tick_interval: Duration, icon_hold: Duration) -> ! {
        info!(?tick_interval, "clock running");
        loop {
            if self.tick() == TickOutcome::Reconnected {
                std::thread::sleep(icon_hold);
            }
            std::thread::sleep(tick_interval);
        }
    }

    fn show(&mut self, commands: &[DrawCommand]) {
        if let Err(e) = draw(&mut self.canvas, commands) {
            warn!(error = ?e, "display update failed");
        }
    }
}
