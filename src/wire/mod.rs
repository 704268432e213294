//! Wire formats of FTM frames.
//!
//! - [`FtmParams`]: the 11-byte Fine Timing Measurement Parameters element
//! - [`FtmRequestHeader`]: trigger byte plus optional parameters
//! - [`FtmResponseHeader`]: dialog tokens, follow-up timestamps, optional parameters
//! - [`TsfSyncInfo`]: TSF sync element on the first frame of a burst
//! - [`Frame`] / [`PublicAction`]: the frames the manager inspects

mod frame;
mod params;
mod request;
mod response;
mod tsf;

pub use frame::{Frame, PublicAction};
pub use params::{FtmParams, StatusIndication, decode_burst_duration};
pub use request::FtmRequestHeader;
pub use response::FtmResponseHeader;
pub use tsf::TsfSyncInfo;
