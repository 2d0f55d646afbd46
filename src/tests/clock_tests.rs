//! # End-to-End Clock Scenarios
//!
//! These tests drive the whole pipeline (connectivity check, time source,
//! timezone conversion, rendering) through the public library API with
//! scripted collaborators, one tick at a time.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use matrix_clock_lib::{
    canvas::draw,
    connection::{ConnectionManager, ConnectionState},
    frame::Frame,
    glyphs::digit,
    ntp::{SyncError, TimeServer},
    render::{blink_column, render, TimeParts},
    time_source::{TickClock, TimeSource, TimeStatus},
    Clock, TickOutcome, TimezonePolicy,
};

// 2023-07-04 16:30:45 UTC
const JULY_4_UTC: i64 = 1_688_488_245;

#[derive(Clone, Default)]
struct Ticks(Rc<Cell<u64>>);

impl Ticks {
    fn advance(&self, secs: u64) {
        self.0.set(self.0.get() + secs * 1000);
    }
}

impl TickClock for Ticks {
    fn now_ms(&self) -> u64 {
        self.0.get()
    }
}

/// Server whose reachability the test flips, counting every request.
#[derive(Clone)]
struct Server {
    utc: Rc<Cell<i64>>,
    reachable: Rc<Cell<bool>>,
    requests: Rc<Cell<usize>>,
}

impl Server {
    fn new(utc: i64) -> Self {
        Self {
            utc: Rc::new(Cell::new(utc)),
            reachable: Rc::new(Cell::new(true)),
            requests: Rc::new(Cell::new(0)),
        }
    }
}

impl TimeServer for Server {
    fn fetch_utc(&mut self) -> Result<i64, SyncError> {
        self.requests.set(self.requests.get() + 1);
        if self.reachable.get() {
            Ok(self.utc.get())
        } else {
            Err(SyncError::Timeout(Duration::from_millis(1000)))
        }
    }
}

#[derive(Clone)]
struct Link(Rc<Cell<bool>>);

impl ConnectionManager for Link {
    fn state(&self) -> ConnectionState {
        if self.0.get() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    fn reconnect(&mut self) -> bool {
        false
    }
}

/// Whether the digit band starting at column `x` shows `value`.
fn shows_digit(frame: &Frame, x: u32, y: u32, value: u8) -> bool {
    let glyph = digit(value).expect("decimal digit");
    (0..glyph.height).all(|gy| {
        (0..glyph.width).all(|gx| frame.is_lit(x + gx, y + gy) == glyph.is_set(gx, gy))
    })
}

fn clock(link: Link, server: Server, ticks: Ticks) -> Clock<Link, Server, Ticks, Frame> {
    let time = TimeSource::new(server, ticks, 300);
    Clock::new(link, time, TimezonePolicy::us_eastern(), Frame::new())
}

/// Test that the July 4th afternoon frame shows 12:30 with the PM layout.
#[test]
fn test_independence_day_half_past_noon() {
    let local = TimezonePolicy::us_eastern().to_local(JULY_4_UTC);

    let parts = TimeParts::from_local(local);
    assert_eq!((parts.hour12, parts.minute, parts.second), (12, 30, 45));
    assert!(parts.is_pm);
    assert_eq!(parts.digits(), [1, 2, 3, 0]);
    assert_eq!(blink_column(parts.second), 10);

    let mut frame = Frame::new();
    draw(&mut frame, &render(local)).unwrap();

    // PM: digits one row down, bar along the bottom
    for (x, value) in [(0, 1), (4, 2), (9, 3), (13, 0)] {
        assert!(shows_digit(&frame, x, 1, value), "digit {value} at x={x}");
    }
    let bar: String = frame.to_ascii().lines().nth(7).unwrap().to_string();
    assert_eq!(bar, "#######..#.#####");
    assert_eq!(frame.to_ascii().lines().next().unwrap(), "................");
}

#[test]
fn test_morning_hour_has_no_leading_zero() {
    // 2023-07-04 13:05:00 UTC is 09:05 EDT
    let local = TimezonePolicy::us_eastern().to_local(1_688_475_900);
    let mut frame = Frame::new();
    draw(&mut frame, &render(local)).unwrap();

    // AM: bar along the top, digits from row 2
    assert_eq!(frame.to_ascii().lines().next().unwrap(), "#.#####..#######");
    for x in 0..3 {
        for y in 2..7 {
            assert!(!frame.is_lit(x, y));
        }
    }
    assert!(shows_digit(&frame, 4, 2, 9));
    assert!(shows_digit(&frame, 9, 2, 0));
    assert!(shows_digit(&frame, 13, 2, 5));
}

/// Test that a server outage after a good sync keeps the clock counting
/// from the cached time and retries on every read until it recovers.
#[test]
fn test_sync_timeout_keeps_counting() {
    let ticks = Ticks::default();
    let server = Server::new(JULY_4_UTC);
    let link = Link(Rc::new(Cell::new(true)));
    let mut clock = clock(link, server.clone(), ticks.clone());

    assert!(matches!(clock.tick(), TickOutcome::Rendered { .. }));
    assert_eq!(clock.time_source().status(), TimeStatus::Set);
    assert_eq!(server.requests.get(), 1);

    // Within the resync interval nothing is requested
    ticks.advance(100);
    clock.tick();
    assert_eq!(server.requests.get(), 1);

    server.reachable.set(false);
    ticks.advance(200);
    let outcome = clock.tick();
    assert_eq!(server.requests.get(), 2);
    assert_eq!(clock.time_source().status(), TimeStatus::NeedsSync);
    let expected = TimezonePolicy::us_eastern().to_local(JULY_4_UTC + 300);
    assert_eq!(outcome, TickOutcome::Rendered { local: expected });

    // Still due, so the next tick asks again
    ticks.advance(1);
    server.utc.set(JULY_4_UTC + 305);
    server.reachable.set(true);
    let outcome = clock.tick();
    assert_eq!(server.requests.get(), 3);
    assert_eq!(clock.time_source().status(), TimeStatus::Set);
    let expected = TimezonePolicy::us_eastern().to_local(JULY_4_UTC + 305);
    assert_eq!(outcome, TickOutcome::Rendered { local: expected });
}

#[test]
fn test_link_down_shows_icon_and_never_syncs() {
    let ticks = Ticks::default();
    let server = Server::new(JULY_4_UTC);
    let up = Rc::new(Cell::new(false));
    let mut clock = clock(Link(up.clone()), server.clone(), ticks.clone());

    for _ in 0..3 {
        assert_eq!(clock.tick(), TickOutcome::ReconnectFailed);
        ticks.advance(1);
    }
    assert_eq!(server.requests.get(), 0);
    assert_eq!(clock.time_source().status(), TimeStatus::NotSet);
    // Only the icon is drawn, centred between columns 4 and 11
    assert!(clock.canvas().lit_count() > 0);
    for y in 0..8 {
        for x in (0..4).chain(12..16) {
            assert!(!clock.canvas().is_lit(x, y));
        }
    }

    // Link restored outside the clock's control: next tick syncs and renders
    up.set(true);
    assert!(matches!(clock.tick(), TickOutcome::Rendered { .. }));
    assert_eq!(server.requests.get(), 1);
}
