//! Routing of PHY transmit and receive instants to dialog timestamps.
//!
//! The PHY only reports "a frame started". Acks carry no transmitter and no
//! dialog token, so the router remembers the last FTM frame seen in each
//! direction and pairs the next ack with it.

use crate::core::{MacAddress, NO_DIALOG};
use crate::wire::Frame;

/// Which of the four dialog timestamps an instant belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimestampSlot {
    T1,
    T2,
    T3,
    T4,
}

/// A PHY instant matched to a session's dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TimestampEvent {
    pub partner: MacAddress,
    pub token: u8,
    pub slot: TimestampSlot,
}

#[derive(Debug, Default)]
pub(crate) struct TimestampLookahead {
    /// Frames sent since the last FTM frame was received.
    sent: u32,
    /// Frames heard since the last FTM frame was sent.
    received: u32,
    awaiting_ack: bool,
    sending_ack: bool,
    ack_to: Option<MacAddress>,
    /// Last FTM frame sent, waiting for its ack.
    tx: Option<(MacAddress, u8)>,
    /// Last FTM frame received, waiting for our ack to go out.
    rx: Option<(MacAddress, u8)>,
}

impl TimestampLookahead {
    pub fn new() -> Self {
        Self::default()
    }

    /// A frame started leaving this station.
    pub fn on_tx(
        &mut self,
        frame: &Frame,
        has_session: impl Fn(MacAddress) -> bool,
    ) -> Option<TimestampEvent> {
        self.sent = self.sent.saturating_add(1);

        if let Some(header) = frame.ftm_response_header() {
            let partner = frame.receiver();
            if !has_session(partner) {
                return None;
            }
            self.received = 0;
            self.awaiting_ack = true;
            if header.dialog_token == NO_DIALOG {
                self.tx = None;
                return None;
            }
            self.tx = Some((partner, header.dialog_token));
            return Some(TimestampEvent {
                partner,
                token: header.dialog_token,
                slot: TimestampSlot::T1,
            });
        }

        if frame.is_ack() {
            let to_partner = self.ack_to == Some(frame.receiver());
            if self.sending_ack && self.sent == 1 && to_partner {
                return self.rx.map(|(partner, token)| TimestampEvent {
                    partner,
                    token,
                    slot: TimestampSlot::T3,
                });
            }
            if self.sent > 1 {
                self.sending_ack = false;
            }
        }
        None
    }

    /// A frame started arriving at this station.
    pub fn on_rx(
        &mut self,
        own: MacAddress,
        frame: &Frame,
        has_session: impl Fn(MacAddress) -> bool,
    ) -> Option<TimestampEvent> {
        self.received = self.received.saturating_add(1);
        if frame.receiver() != own {
            return None;
        }

        if let (Some(header), Some(partner)) = (frame.ftm_response_header(), frame.transmitter()) {
            self.sending_ack = true;
            self.sent = 0;
            self.ack_to = Some(partner);
            if !has_session(partner) || header.dialog_token == NO_DIALOG {
                self.rx = None;
                return None;
            }
            self.rx = Some((partner, header.dialog_token));
            return Some(TimestampEvent {
                partner,
                token: header.dialog_token,
                slot: TimestampSlot::T2,
            });
        }

        if frame.is_ack() {
            if self.awaiting_ack && self.received == 1 {
                return self.tx.map(|(partner, token)| TimestampEvent {
                    partner,
                    token,
                    slot: TimestampSlot::T4,
                });
            }
            if self.received > 1 {
                self.awaiting_ack = false;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::FtmResponseHeader;

    fn response(to: MacAddress, from: MacAddress, token: u8) -> Frame {
        Frame::ftm_response(
            to,
            from,
            FtmResponseHeader {
                dialog_token: token,
                ..Default::default()
            },
            None,
        )
    }

    fn any(_: MacAddress) -> bool {
        true
    }

    #[test]
    fn test_responder_side_t1_then_t4() {
        let me = MacAddress::from_index(1);
        let peer = MacAddress::from_index(2);
        let mut la = TimestampLookahead::new();

        let t1 = la.on_tx(&response(peer, me, 5), any).unwrap();
        assert_eq!((t1.partner, t1.token, t1.slot), (peer, 5, TimestampSlot::T1));

        let t4 = la.on_rx(me, &Frame::Ack { receiver: me }, any).unwrap();
        assert_eq!((t4.partner, t4.token, t4.slot), (peer, 5, TimestampSlot::T4));
    }

    #[test]
    fn test_initiator_side_t2_then_t3() {
        let me = MacAddress::from_index(2);
        let peer = MacAddress::from_index(1);
        let mut la = TimestampLookahead::new();

        let t2 = la.on_rx(me, &response(me, peer, 9), any).unwrap();
        assert_eq!(t2.slot, TimestampSlot::T2);

        let t3 = la.on_tx(&Frame::Ack { receiver: peer }, any).unwrap();
        assert_eq!((t3.partner, t3.token, t3.slot), (peer, 9, TimestampSlot::T3));
    }

    #[test]
    fn test_ack_after_other_traffic_is_not_matched() {
        let me = MacAddress::from_index(1);
        let peer = MacAddress::from_index(2);
        let other = MacAddress::from_index(3);
        let mut la = TimestampLookahead::new();

        la.on_tx(&response(peer, me, 5), any);
        let noise = Frame::Other {
            receiver: other,
            transmitter: peer,
        };
        assert!(la.on_rx(me, &noise, any).is_none());
        assert!(la.on_rx(me, &Frame::Ack { receiver: me }, any).is_none());
    }

    #[test]
    fn test_ack_to_other_station_is_not_t3() {
        let me = MacAddress::from_index(2);
        let peer = MacAddress::from_index(1);
        let mut la = TimestampLookahead::new();

        la.on_rx(me, &response(me, peer, 9), any);
        let ack = Frame::Ack {
            receiver: MacAddress::from_index(7),
        };
        assert!(la.on_tx(&ack, any).is_none());
    }

    #[test]
    fn test_token_zero_and_unknown_partner_are_not_tracked() {
        let me = MacAddress::from_index(2);
        let peer = MacAddress::from_index(1);
        let mut la = TimestampLookahead::new();

        assert!(la.on_rx(me, &response(me, peer, 0), any).is_none());
        assert!(la.on_tx(&Frame::Ack { receiver: peer }, any).is_none());

        assert!(la.on_rx(me, &response(me, peer, 4), |_| false).is_none());
        assert!(la.on_tx(&Frame::Ack { receiver: peer }, any).is_none());
    }
}
