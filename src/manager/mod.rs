//! Session manager.
//!
//! One [`FtmManager`] per station. It keeps at most one session per partner,
//! a block list with timed expiry, and a look-ahead that pairs PHY transmit
//! and receive instants with the dialog they belong to:
//!
//! | PHY event | Dialog timestamp |
//! |---|---|
//! | FTM frame leaves the responder | T1 |
//! | FTM frame reaches the initiator | T2 |
//! | ack leaves the initiator | T3 |
//! | ack reaches the responder | T4 |

mod config;
mod lookahead;
#[allow(clippy::module_inception)]
mod manager;

pub use config::{ManagerConfig, ManagerConfigBuilder};
pub use manager::{FtmManager, ManagerAction, ManagerTimer};
