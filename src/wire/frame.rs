//! Frames seen by the FTM manager.
//!
//! The manager only needs to tell FTM action frames and acknowledgments
//! apart from everything else on the medium, so frames are modeled at that
//! granularity. Action bodies have a real byte encoding:
//! ```text
//! +----------+--------+--------------------+------------------+
//! | category | action | request / response | TSF sync (opt.)  |
//! | 1 B (4)  | 32/33  | header             | 7 B              |
//! +----------+--------+--------------------+------------------+
//! ```

use crate::core::{
    ACTION_FTM_REQUEST, ACTION_FTM_RESPONSE, CATEGORY_PUBLIC_ACTION, HeaderError, MacAddress,
    TSF_SYNC_ELEMENT_ID, TSF_SYNC_SIZE,
};

use super::request::FtmRequestHeader;
use super::response::FtmResponseHeader;
use super::tsf::TsfSyncInfo;

/// Public action frame body carrying an FTM header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicAction {
    /// FTM request (initial or trigger).
    FtmRequest(FtmRequestHeader),
    /// FTM frame from the responder.
    FtmResponse {
        /// Response header.
        header: FtmResponseHeader,
        /// TSF sync element on the first frame of a burst.
        tsf_sync: Option<TsfSyncInfo>,
    },
}

impl PublicAction {
    /// Public action code of this body.
    pub fn action_code(&self) -> u8 {
        match self {
            Self::FtmRequest(_) => ACTION_FTM_REQUEST,
            Self::FtmResponse { .. } => ACTION_FTM_RESPONSE,
        }
    }

    /// Encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        2 + match self {
            Self::FtmRequest(header) => header.encoded_len(),
            Self::FtmResponse { header, tsf_sync } => {
                header.encoded_len() + tsf_sync.map_or(0, |t| t.encoded_len())
            }
        }
    }

    /// Serialize the action body.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.push(CATEGORY_PUBLIC_ACTION);
        buf.push(self.action_code());
        match self {
            Self::FtmRequest(header) => header.encode(&mut buf),
            Self::FtmResponse { header, tsf_sync } => {
                header.encode(&mut buf);
                if let Some(tsf) = tsf_sync {
                    tsf.encode(&mut buf);
                }
            }
        }
        buf
    }

    /// Parse an action body.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HeaderError> {
        if bytes.len() < 2 {
            return Err(HeaderError::TooShort {
                expected: 2,
                actual: bytes.len(),
            });
        }
        if bytes[0] != CATEGORY_PUBLIC_ACTION {
            return Err(HeaderError::UnknownCategory(bytes[0]));
        }
        let body = &bytes[2..];
        match bytes[1] {
            ACTION_FTM_REQUEST => {
                let (header, _) = FtmRequestHeader::decode(body)?;
                Ok(Self::FtmRequest(header))
            }
            ACTION_FTM_RESPONSE => {
                let (header, used) = FtmResponseHeader::decode(body)?;
                let rest = &body[used..];
                let tsf_sync = if rest.len() >= TSF_SYNC_SIZE && rest[0] == TSF_SYNC_ELEMENT_ID {
                    Some(TsfSyncInfo::decode(rest)?)
                } else {
                    None
                };
                Ok(Self::FtmResponse { header, tsf_sync })
            }
            other => Err(HeaderError::UnknownAction(other)),
        }
    }
}

/// A frame as handed to and reported by the physical layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Public action frame.
    Action {
        /// Destination station.
        receiver: MacAddress,
        /// Source station.
        transmitter: MacAddress,
        /// Action body.
        action: PublicAction,
    },
    /// Acknowledgment. Carries no transmitter address.
    Ack {
        /// Station being acknowledged.
        receiver: MacAddress,
    },
    /// Any other traffic.
    Other {
        /// Destination station.
        receiver: MacAddress,
        /// Source station.
        transmitter: MacAddress,
    },
}

impl Frame {
    /// FTM request frame.
    pub fn ftm_request(
        receiver: MacAddress,
        transmitter: MacAddress,
        header: FtmRequestHeader,
    ) -> Self {
        Self::Action {
            receiver,
            transmitter,
            action: PublicAction::FtmRequest(header),
        }
    }

    /// FTM response frame.
    pub fn ftm_response(
        receiver: MacAddress,
        transmitter: MacAddress,
        header: FtmResponseHeader,
        tsf_sync: Option<TsfSyncInfo>,
    ) -> Self {
        Self::Action {
            receiver,
            transmitter,
            action: PublicAction::FtmResponse { header, tsf_sync },
        }
    }

    /// Destination of the frame.
    pub fn receiver(&self) -> MacAddress {
        match self {
            Self::Action { receiver, .. } | Self::Ack { receiver } | Self::Other { receiver, .. } => {
                *receiver
            }
        }
    }

    /// Source of the frame, if the frame carries one.
    pub fn transmitter(&self) -> Option<MacAddress> {
        match self {
            Self::Action { transmitter, .. } | Self::Other { transmitter, .. } => {
                Some(*transmitter)
            }
            Self::Ack { .. } => None,
        }
    }

    /// Response header, if this is an FTM response frame.
    pub fn ftm_response_header(&self) -> Option<&FtmResponseHeader> {
        match self {
            Self::Action {
                action: PublicAction::FtmResponse { header, .. },
                ..
            } => Some(header),
            _ => None,
        }
    }

    /// Whether this is an acknowledgment.
    pub fn is_ack(&self) -> bool {
        matches!(self, Self::Ack { .. })
    }

    /// Size of the frame body on air, excluding MAC framing.
    pub fn body_len(&self) -> usize {
        match self {
            Self::Action { action, .. } => action.encoded_len(),
            Self::Ack { .. } | Self::Other { .. } => 0,
        }
    }
}
