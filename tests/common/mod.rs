//! Discrete-event medium shared by the integration tests.
//!
//! Stations sit on a line. A frame handed to the medium starts on air after
//! a fixed channel access delay and reaches every other station after the
//! propagation delay. Receivers report "rx begin" once the preamble has been
//! detected and deliver the frame at the end of its airtime. Action frames
//! addressed to a station are acked one SIFS after they end.

#![allow(dead_code)]

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use ftm_ranging::core::SPEED_OF_LIGHT;
use ftm_ranging::manager::{FtmManager, ManagerAction, ManagerConfig, ManagerTimer};
use ftm_ranging::wire::Frame;
use ftm_ranging::{MacAddress, SimTime};

pub const PREAMBLE_PS: u64 = 4_000_000;
pub const SIFS_PS: u64 = 16_000_000;
pub const CHANNEL_ACCESS_PS: u64 = 100_000_000;

/// PLCP header plus 6 Mb/s payload.
fn airtime_ps(frame: &Frame) -> u64 {
    const MAC_OVERHEAD: u64 = 28;
    20_000_000 + (frame.body_len() as u64 + MAC_OVERHEAD) * 1_333_333
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

enum EventKind {
    Transmit { station: usize, frame: Frame },
    RxBegin { station: usize, frame: Frame },
    RxEnd { station: usize, frame: Frame },
    Timer { station: usize, timer: ManagerTimer },
}

impl EventKind {
    fn station(&self) -> usize {
        match self {
            Self::Transmit { station, .. }
            | Self::RxBegin { station, .. }
            | Self::RxEnd { station, .. }
            | Self::Timer { station, .. } => *station,
        }
    }
}

struct Event {
    at: SimTime,
    seq: u64,
    kind: EventKind,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        (self.at, self.seq) == (other.at, other.seq)
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.at, self.seq).cmp(&(other.at, other.seq))
    }
}

pub struct Medium {
    pub stations: Vec<FtmManager>,
    positions: Vec<f64>,
    now: SimTime,
    seq: u64,
    queue: BinaryHeap<Reverse<Event>>,
    /// Receive power reported with every frame.
    pub signal_dbm: Option<f64>,
    /// Every frame put on air, with its sender.
    pub transmitted: Vec<(SimTime, usize, Frame)>,
}

impl Medium {
    pub fn new() -> Self {
        Self {
            stations: Vec::new(),
            positions: Vec::new(),
            now: SimTime::ZERO,
            seq: 0,
            queue: BinaryHeap::new(),
            signal_dbm: Some(-50.0),
            transmitted: Vec::new(),
        }
    }

    /// Add a station at `position` metres. Station `i` has address `from_index(i)`.
    pub fn add_station(&mut self, position: f64) -> usize {
        let index = self.stations.len();
        let address = MacAddress::from_index(index as u32);
        self.stations.push(FtmManager::new(ManagerConfig::new(address)));
        self.positions.push(position);
        index
    }

    pub fn address(&self, station: usize) -> MacAddress {
        self.stations[station].address()
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    /// One-way propagation delay between two stations, in picoseconds.
    pub fn propagation_ps(&self, a: usize, b: usize) -> u64 {
        let distance = (self.positions[a] - self.positions[b]).abs();
        (distance / SPEED_OF_LIGHT * 1e12).round() as u64
    }

    /// Move a station's pending actions onto the event queue.
    pub fn flush(&mut self, station: usize) {
        while let Some(action) = self.stations[station].poll_action() {
            match action {
                ManagerAction::Transmit(frame) => {
                    let at = after(self.now, CHANNEL_ACCESS_PS);
                    self.push(at, EventKind::Transmit { station, frame });
                }
                ManagerAction::Schedule { delay, timer } => {
                    self.push(self.now + delay, EventKind::Timer { station, timer });
                }
            }
        }
    }

    /// Process events up to and including `limit`.
    pub fn run_until(&mut self, limit: SimTime) {
        while let Some(Reverse(event)) = self.queue.peek() {
            if event.at > limit {
                break;
            }
            let Some(Reverse(event)) = self.queue.pop() else {
                break;
            };
            self.now = event.at;
            let station = event.kind.station();
            self.dispatch(event.kind);
            self.flush(station);
        }
        self.now = self.now.max(limit);
    }

    fn dispatch(&mut self, kind: EventKind) {
        let now = self.now;
        match kind {
            EventKind::Transmit { station, frame } => {
                self.stations[station].on_frame_tx_begin(now, &frame);
                let airtime = airtime_ps(&frame);
                for other in 0..self.stations.len() {
                    if other == station {
                        continue;
                    }
                    let arrival = after(now, self.propagation_ps(station, other));
                    self.push(
                        after(arrival, PREAMBLE_PS),
                        EventKind::RxBegin {
                            station: other,
                            frame: frame.clone(),
                        },
                    );
                    self.push(
                        after(arrival, airtime),
                        EventKind::RxEnd {
                            station: other,
                            frame: frame.clone(),
                        },
                    );
                }
                self.transmitted.push((now, station, frame));
            }
            EventKind::RxBegin { station, frame } => {
                let dbm = self.signal_dbm;
                self.stations[station].on_frame_rx_begin(now, &frame, dbm);
            }
            EventKind::RxEnd { station, frame } => {
                self.stations[station].on_frame_received(now, &frame);
                let addressed = frame.receiver() == self.address(station);
                if addressed && !frame.is_ack() {
                    if let Some(sender) = frame.transmitter() {
                        self.push(
                            after(now, SIFS_PS),
                            EventKind::Transmit {
                                station,
                                frame: Frame::Ack { receiver: sender },
                            },
                        );
                    }
                }
            }
            EventKind::Timer { station, timer } => {
                self.stations[station].handle_timer(now, timer);
            }
        }
    }

    fn push(&mut self, at: SimTime, kind: EventKind) {
        self.seq += 1;
        self.queue.push(Reverse(Event {
            at,
            seq: self.seq,
            kind,
        }));
    }
}

fn after(t: SimTime, ps: u64) -> SimTime {
    SimTime::from_picos(t.as_picos() + ps)
}
