//! Async driver for a session manager (feature `runtime`).
//!
//! [`ManagerDriver`] runs one [`FtmManager`](crate::manager::FtmManager) on a
//! tokio task. Commands and timers are processed one at a time on that task,
//! so sessions never see concurrent mutation.

mod driver;

pub use driver::ManagerDriver;
