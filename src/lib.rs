//! # Matrix Clock Core Library
//!
//! This library holds everything the clock does apart from wiring up
//! hardware: fetching time over NTP, converting it to local time, and
//! drawing it on a 16×8 LED matrix. It is built to run unattended on a
//! Raspberry Pi class board for months at a time.
//!
//! ## Design Philosophy
//!
//! ### Self-Healing
//! - **No fatal errors in the loop**: a failed sync keeps the cached time, a
//!   dropped link is retried every tick, a display error is forgotten by the
//!   next full redraw
//! - **Bounded blocking**: the NTP exchange and the reconnect attempt both
//!   carry timeouts, so the loop always comes back around
//!
//! ### Stateless Drawing
//! - **Pure rendering**: [`render::render`] maps a local instant to draw
//!   commands, no state is kept between frames
//! - **Const glyphs**: digits and icons are a fixed lookup table
//!
//! ### Explicit Time Keeping
//! Between syncs, time is the last authoritative instant plus elapsed
//! monotonic ticks. Two cadences apply:
//! - **Resync interval** ([`time_source`]): how often the clock asks for time
//! - **Retry interval** ([`ntp`]): how often the NTP client actually sends a
//!   request
//!
//! ## Data Flow
//! 1. **Connectivity**: [`connection::ConnectionManager`] says whether the link is up
//! 2. **UTC**: [`time_source::TimeSource::now`] returns cached or fresh seconds
//! 3. **Local**: [`timezone::TimezonePolicy::to_local`] applies DST rules
//! 4. **Pixels**: [`render::render`] → [`canvas::draw`] → frame or LED matrix

pub mod canvas;
pub mod config;
pub mod connection;
pub mod diagnostics;
pub mod frame;
pub mod glyphs;
pub mod matrix;
pub mod ntp;
pub mod render;
pub mod scheduler;
pub mod time_source;
pub mod timezone;

pub use canvas::{Canvas, DrawCommand};
pub use connection::{ConnectionManager, ConnectionState};
pub use scheduler::{Clock, TickOutcome};
pub use timezone::{DstRule, TimezonePolicy};
