//! FTM sessions.
//!
//! - **Negotiation**: [`validate_params`] decides whether a responder accepts a request
//! - **Dialogs**: [`DialogTable`] hands out tokens and holds the four timestamps of each exchange
//! - **RTT**: [`dialog_rtt`] and friends turn timestamps into round-trip times
//! - **State machine**: [`FtmSession`] runs either role of one session
//!
//! # Exchange
//!
//! ```text
//!  Initiator                         Responder
//!      │ ── FTM request (params) ──────▶ │
//!      │ ◀──── FTM frame 1 (params) ──── │  t1
//!  t2  │ ─────────── ack ──────────────▶ │
//!  t3  │                                 │  t4
//!      │ ◀── FTM frame 2 (t1, t4 of 1) ─ │
//!      │            ...                  │
//!      │ ◀── FTM frame, token 0 ──────── │  session over
//! ```

mod dialog;
mod negotiation;
mod rtt;
#[allow(clippy::module_inception)]
mod session;

pub use dialog::{DialogTable, FtmDialog};
pub use negotiation::validate_params;
pub use rtt::{dialog_rtt, mean_rtt, rtt_to_distance, timestamp_diff};
pub use session::{
    FtmSession, SessionConfig, SessionOutput, SessionPhase, SessionReport, SessionRole,
    SessionTimer,
};
