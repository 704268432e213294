//! # FTM Ranging
//!
//! IEEE 802.11 **F**ine **T**iming **M**easurement sessions for simulated
//! Wi-Fi stations.
//!
//! Two stations estimate their distance from the round-trip time of FTM
//! frames and their acks. This crate provides:
//!
//! - **Wire formats**: FTM parameters, request and response headers, TSF sync element
//! - **Sessions**: negotiation, bursts, dialog tokens, RTT computation
//! - **Manager**: one session per partner, PHY timestamp routing, block list
//! - **Error models**: Gaussian, spatial bias map and signal-strength dependent error
//!
//! ## Feature Flags
//!
//! - `runtime` (default): tokio task driving a manager against the wall clock
//!
//! ## Modules
//!
//! - [`core`]: addresses, simulated time, constants and error types
//! - [`wire`]: frame and header encoding
//! - [`error_model`]: RTT error models and the bias map
//! - [`session`]: the FTM session state machine
//! - [`manager`]: per-station session owner
//! - [`runtime`]: async driver (requires `runtime` feature)
//!
//! ## Example Usage
//!
//! Everything below the driver is sans-IO: feed events in, drain actions out.
//!
//! ```rust
//! use ftm_ranging::prelude::*;
//!
//! let sta = MacAddress::from_index(1);
//! let ap = MacAddress::from_index(2);
//! let mut initiator = FtmManager::new(ManagerConfig::new(sta));
//! let mut responder = FtmManager::new(ManagerConfig::new(ap));
//!
//! initiator.create_session(ap, SessionRole::Initiator)?;
//! initiator.begin_session(SimTime::ZERO, ap)?;
//!
//! let Some(ManagerAction::Transmit(request)) = initiator.poll_action() else {
//!     panic!("initiator sends its request first");
//! };
//! responder.on_frame_received(SimTime::from_micros(50), &request);
//! assert!(responder.session(sta).is_some_and(|s| s.is_active()));
//! # Ok::<(), ftm_ranging::core::SessionError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

pub mod error_model;
pub mod manager;
pub mod session;
pub mod wire;

// Async driver (feature-gated)
#[cfg(feature = "runtime")]
#[cfg_attr(docsrs, doc(cfg(feature = "runtime")))]
pub mod runtime;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::*;

    pub use crate::error_model::{
        BiasMap, ChannelBandwidth, ErrorContext, ErrorModel, NullErrorModel,
        SignalStrengthErrorModel, WiredConfig, WiredErrorModel, WirelessErrorModel,
    };
    pub use crate::manager::{
        FtmManager, ManagerAction, ManagerConfig, ManagerConfigBuilder, ManagerTimer,
    };
    pub use crate::session::{
        FtmDialog, FtmSession, SessionConfig, SessionPhase, SessionReport, SessionRole,
        rtt_to_distance,
    };
    pub use crate::wire::{
        Frame, FtmParams, FtmRequestHeader, FtmResponseHeader, PublicAction, StatusIndication,
    };

    #[cfg(feature = "runtime")]
    pub use crate::runtime::ManagerDriver;
}

// Re-export commonly used items at crate root
pub use core::{FtmError, MacAddress, SimTime};
pub use manager::{FtmManager, ManagerConfig};
pub use session::{FtmSession, SessionReport, SessionRole};
