//! Error types for FTM ranging.

use std::io;

use thiserror::Error;

use super::address::MacAddress;

/// Reasons a responder refuses the parameters of an FTM request.
///
/// A rejection is not fatal: the responder answers with a
/// `RequestIncapable` status and ends the session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParamsRejection {
    /// Status indication must be reserved on an incoming request.
    #[error("status indication must be reserved in a request, got {0}")]
    StatusNotReserved(u8),

    /// Burst duration uses a reserved code.
    #[error("burst duration code {0} is reserved, expected 2..=11 or 15")]
    ReservedBurstDuration(u8),

    /// ASAP capable is a responder-only field at request time.
    #[error("ASAP capable is reserved in an FTM request")]
    AsapCapableInRequest,

    /// A single burst must not carry a burst period.
    #[error("burst period {period} set for a single burst")]
    PeriodWithSingleBurst {
        /// Offending burst period.
        period: u16,
    },

    /// The burst is too short to fit all frames at the requested spacing.
    #[error("burst duration {available_us}us shorter than required {required_us}us")]
    BurstTooShort {
        /// Minimum duration needed, in microseconds.
        required_us: u32,
        /// Decoded burst duration, in microseconds.
        available_us: u32,
    },

    /// One FTM in one burst cannot produce a round trip.
    #[error("one FTM per burst with a single burst cannot produce an RTT")]
    SingleFrameSession,
}

/// Errors while decoding FTM headers and frames.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HeaderError {
    /// Input buffer is too short.
    #[error("buffer too short: expected {expected}, got {actual}")]
    TooShort {
        /// Minimum bytes required.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },

    /// A different element than the expected one was found.
    #[error("unexpected element id {actual}, expected {expected}")]
    UnexpectedElement {
        /// Expected element id.
        expected: u8,
        /// Element id found.
        actual: u8,
    },

    /// Element length field does not match the element.
    #[error("invalid length {actual} for element {element}, expected {expected}")]
    InvalidLength {
        /// Element id.
        element: u8,
        /// Expected length.
        expected: u8,
        /// Length found.
        actual: u8,
    },

    /// Element id extension does not match.
    #[error("invalid element id extension {0}")]
    InvalidExtension(u8),

    /// Action frame category is not public action.
    #[error("unsupported action category {0}")]
    UnknownCategory(u8),

    /// Public action code is not an FTM action.
    #[error("unsupported public action {0}")]
    UnknownAction(u8),
}

/// Errors while loading a bias map.
#[derive(Debug, Error)]
pub enum BiasMapError {
    /// The map source could not be read.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// The map source is empty.
    #[error("bias map has no header line")]
    MissingHeader,

    /// The header line does not have the expected fields.
    #[error("malformed bias map header: {0}")]
    MalformedHeader(String),

    /// Resolution must be positive and finite.
    #[error("invalid bias map resolution {0}")]
    InvalidResolution(f64),

    /// A cell is not a number.
    #[error("invalid value {value:?} on line {line}")]
    InvalidValue {
        /// 1-based line number.
        line: usize,
        /// Offending text.
        value: String,
    },

    /// A row does not have one cell per grid column.
    #[error("row on line {line} has {actual} cells, grid is {expected} wide")]
    RowWidth {
        /// 1-based line number.
        line: usize,
        /// Grid width.
        expected: usize,
        /// Cells found.
        actual: usize,
    },

    /// Row count does not match the grid height.
    #[error("bias map has {actual} rows, grid is {expected} high")]
    RowCount {
        /// Grid height.
        expected: usize,
        /// Rows found.
        actual: usize,
    },
}

/// Errors in the error-model layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ErrorModelError {
    /// Gaussian parameters are not usable.
    #[error("invalid normal distribution (mean {mean}, std dev {std_dev})")]
    InvalidDistribution {
        /// Requested mean.
        mean: f64,
        /// Requested standard deviation.
        std_dev: f64,
    },
}

/// Errors from session management.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A session with this partner already exists.
    #[error("session with {0} already exists")]
    AlreadyExists(MacAddress),

    /// The partner is blocked after a failed request.
    #[error("partner {0} is blocked")]
    PartnerBlocked(MacAddress),

    /// A station cannot range against itself.
    #[error("cannot open a session with own address {0}")]
    SelfPartner(MacAddress),

    /// No session with this partner.
    #[error("no session with {0}")]
    NotFound(MacAddress),

    /// The session was already started.
    #[error("session with {0} already started")]
    AlreadyStarted(MacAddress),
}

/// Top-level FTM errors.
#[derive(Debug, Error)]
pub enum FtmError {
    /// Parameter negotiation failed.
    #[error("negotiation error: {0}")]
    Params(#[from] ParamsRejection),

    /// Header decoding failed.
    #[error("header error: {0}")]
    Header(#[from] HeaderError),

    /// Bias map could not be loaded.
    #[error("bias map error: {0}")]
    BiasMap(#[from] BiasMapError),

    /// Error model could not be constructed.
    #[error("error model error: {0}")]
    ErrorModel(#[from] ErrorModelError),

    /// Session management failed.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// The async driver is gone.
    #[error("driver shut down")]
    Shutdown,
}
