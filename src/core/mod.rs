//! Core types, constants, and errors.
//!
//! This module has no dependencies on the rest of the crate and defines the
//! shared vocabulary: station addresses, simulated time, node positions and
//! the error enums every layer reports through.

mod address;
mod constants;
mod error;
mod time;
mod traits;

pub use address::*;
pub use constants::*;
pub use error::*;
pub use time::*;
pub use traits::*;
