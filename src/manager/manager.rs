//! Per-station owner of FTM sessions.
//!
//! `FtmManager` is sans-IO like the sessions it owns. The host feeds it PHY
//! notifications, received frames and fired timers, and drains the frames to
//! send and timers to arm with [`FtmManager::poll_action`].

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::core::{MAX_OVERRIDE_CHAIN, MacAddress, SessionError, SimTime};
use crate::session::{FtmSession, SessionOutput, SessionRole, SessionTimer};
use crate::wire::{Frame, FtmRequestHeader, FtmResponseHeader, PublicAction};

use super::config::ManagerConfig;
use super::lookahead::{TimestampEvent, TimestampLookahead, TimestampSlot};

/// Timer armed by the manager.
///
/// Each timer names the session or block entry it belongs to. A timer whose
/// owner has since been replaced is dropped when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagerTimer {
    /// A session timer.
    Session {
        /// Partner of the session.
        partner: MacAddress,
        /// Identity of the session that armed it.
        session_id: u64,
        /// Which timer.
        timer: SessionTimer,
    },
    /// End of a partner block.
    Unblock {
        /// Blocked partner.
        partner: MacAddress,
        /// Identity of the block entry.
        generation: u64,
    },
}

/// Work the manager hands to its host.
#[derive(Debug, Clone, PartialEq)]
pub enum ManagerAction {
    /// Put the frame on the medium.
    Transmit(Frame),
    /// Call [`FtmManager::handle_timer`] with `timer` after `delay`.
    Schedule {
        /// Delay from now.
        delay: Duration,
        /// Timer to hand back.
        timer: ManagerTimer,
    },
}

#[derive(Debug)]
struct SessionSlot {
    id: u64,
    session: FtmSession,
}

/// Owns at most one session per partner and routes PHY timestamps into them.
#[derive(Debug)]
pub struct FtmManager {
    config: ManagerConfig,
    sessions: HashMap<MacAddress, SessionSlot>,
    blocked: HashMap<MacAddress, u64>,
    next_session_id: u64,
    next_block_generation: u64,
    lookahead: TimestampLookahead,
    actions: VecDeque<ManagerAction>,
}

impl FtmManager {
    /// Create a manager for the station in `config`.
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            config,
            sessions: HashMap::new(),
            blocked: HashMap::new(),
            next_session_id: 0,
            next_block_generation: 0,
            lookahead: TimestampLookahead::new(),
            actions: VecDeque::new(),
        }
    }

    /// Own station address.
    pub fn address(&self) -> MacAddress {
        self.config.address
    }

    /// Configuration.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Next piece of work for the host.
    pub fn poll_action(&mut self) -> Option<ManagerAction> {
        self.actions.pop_front()
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Create a session with `partner`.
    ///
    /// Fails if the partner is this station, is blocked, or already has a
    /// session. The returned session can be configured before
    /// [`begin_session`](Self::begin_session).
    pub fn create_session(
        &mut self,
        partner: MacAddress,
        role: SessionRole,
    ) -> Result<&mut FtmSession, SessionError> {
        if partner == self.config.address {
            return Err(SessionError::SelfPartner(partner));
        }
        if self.is_blocked(partner) {
            return Err(SessionError::PartnerBlocked(partner));
        }
        if self.sessions.contains_key(&partner) {
            return Err(SessionError::AlreadyExists(partner));
        }

        let id = self.next_session_id;
        self.next_session_id += 1;
        debug!(%partner, ?role, session_id = id, "session created");

        let session = FtmSession::new(partner, role, &self.config.session_config());
        let slot = self
            .sessions
            .entry(partner)
            .or_insert(SessionSlot { id, session });
        Ok(&mut slot.session)
    }

    /// Session with `partner`.
    pub fn session(&self, partner: MacAddress) -> Option<&FtmSession> {
        self.sessions.get(&partner).map(|slot| &slot.session)
    }

    /// Session with `partner`, mutably.
    pub fn session_mut(&mut self, partner: MacAddress) -> Option<&mut FtmSession> {
        self.sessions.get_mut(&partner).map(|slot| &mut slot.session)
    }

    /// Start the session with `partner`.
    pub fn begin_session(&mut self, now: SimTime, partner: MacAddress) -> Result<(), SessionError> {
        let slot = self
            .sessions
            .get_mut(&partner)
            .ok_or(SessionError::NotFound(partner))?;
        if slot.session.is_active() {
            return Err(SessionError::AlreadyStarted(partner));
        }
        slot.session.begin(now);
        self.drain_session(partner);
        Ok(())
    }

    // =========================================================================
    // Block list
    // =========================================================================

    /// Refuse sessions with `partner` for `duration`.
    pub fn block_partner(&mut self, partner: MacAddress, duration: Duration) {
        let generation = self.next_block_generation;
        self.next_block_generation += 1;
        self.blocked.insert(partner, generation);
        info!(%partner, ?duration, "partner blocked");
        self.actions.push_back(ManagerAction::Schedule {
            delay: duration,
            timer: ManagerTimer::Unblock {
                partner,
                generation,
            },
        });
    }

    /// Whether `partner` is blocked.
    pub fn is_blocked(&self, partner: MacAddress) -> bool {
        self.blocked.contains_key(&partner)
    }

    // =========================================================================
    // Inbound
    // =========================================================================

    /// FTM request from `partner`. Creates a responder session if none exists.
    pub fn received_ftm_request(
        &mut self,
        now: SimTime,
        partner: MacAddress,
        request: &FtmRequestHeader,
    ) {
        let mut request = *request;
        let mut overrides = 0;
        loop {
            if !self.sessions.contains_key(&partner) {
                if let Err(err) = self.create_session(partner, SessionRole::Responder) {
                    warn!(%partner, %err, "dropping FTM request");
                    return;
                }
            }
            let Some(slot) = self.sessions.get_mut(&partner) else {
                return;
            };
            slot.session.process_request(now, &request);

            match self.drain_session(partner) {
                Some(next) if overrides < MAX_OVERRIDE_CHAIN => {
                    overrides += 1;
                    request = next;
                }
                Some(_) => {
                    warn!(%partner, "override limit reached, dropping request");
                    return;
                }
                None => return,
            }
        }
    }

    /// FTM frame from `partner`.
    pub fn received_ftm_response(
        &mut self,
        now: SimTime,
        partner: MacAddress,
        response: &FtmResponseHeader,
    ) {
        let Some(slot) = self.sessions.get_mut(&partner) else {
            debug!(%partner, token = response.dialog_token, "FTM frame without session");
            return;
        };
        slot.session.process_response(now, response);
        self.drain_session(partner);
    }

    /// A frame addressed to anyone finished arriving.
    pub fn on_frame_received(&mut self, now: SimTime, frame: &Frame) {
        if frame.receiver() != self.config.address {
            return;
        }
        if let Frame::Action {
            transmitter,
            action,
            ..
        } = frame
        {
            match action {
                PublicAction::FtmRequest(header) => {
                    self.received_ftm_request(now, *transmitter, header)
                }
                PublicAction::FtmResponse { header, .. } => {
                    self.received_ftm_response(now, *transmitter, header)
                }
            }
        }
    }

    /// The PHY started sending `frame`.
    pub fn on_frame_tx_begin(&mut self, now: SimTime, frame: &Frame) {
        let sessions = &self.sessions;
        let event = self
            .lookahead
            .on_tx(frame, |partner| sessions.contains_key(&partner));
        if let Some(event) = event {
            self.apply_timestamp(now, event);
        }
    }

    /// The PHY started receiving `frame`, with its receive power when known.
    pub fn on_frame_rx_begin(&mut self, now: SimTime, frame: &Frame, signal_dbm: Option<f64>) {
        let own = self.config.address;
        let sessions = &self.sessions;
        let event = self
            .lookahead
            .on_rx(own, frame, |partner| sessions.contains_key(&partner));
        let Some(event) = event else {
            return;
        };
        if event.slot == TimestampSlot::T2 {
            if let (Some(dbm), Some(session)) = (signal_dbm, self.session_mut(event.partner)) {
                session.record_signal_strength(dbm);
            }
        }
        self.apply_timestamp(now, event);
    }

    /// A timer armed through [`ManagerAction::Schedule`] fired.
    pub fn handle_timer(&mut self, now: SimTime, timer: ManagerTimer) {
        match timer {
            ManagerTimer::Session {
                partner,
                session_id,
                timer,
            } => {
                let Some(slot) = self
                    .sessions
                    .get_mut(&partner)
                    .filter(|slot| slot.id == session_id)
                else {
                    warn!(%partner, session_id, ?timer, "stale session timer dropped");
                    return;
                };
                slot.session.handle_timer(now, timer);
                if let Some(request) = self.drain_session(partner) {
                    self.received_ftm_request(now, partner, &request);
                }
            }
            ManagerTimer::Unblock {
                partner,
                generation,
            } => {
                if self.blocked.get(&partner) == Some(&generation) {
                    self.blocked.remove(&partner);
                    info!(%partner, "partner unblocked");
                }
            }
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn apply_timestamp(&mut self, now: SimTime, event: TimestampEvent) {
        let Some(session) = self.session_mut(event.partner) else {
            return;
        };
        let ts = now.timestamp();
        debug!(partner = %event.partner, token = event.token, slot = ?event.slot, ts, "timestamp");
        match event.slot {
            TimestampSlot::T1 => session.set_t1(event.token, ts),
            TimestampSlot::T2 => session.set_t2(event.token, ts),
            TimestampSlot::T3 => session.set_t3(event.token, ts),
            TimestampSlot::T4 => session.set_t4(event.token, ts),
        }
    }

    /// Turn a session's queued outputs into actions. Returns an override request, if any.
    fn drain_session(&mut self, partner: MacAddress) -> Option<FtmRequestHeader> {
        let own = self.config.address;
        let slot = self.sessions.get_mut(&partner)?;
        let session_id = slot.id;

        let mut override_request = None;
        let mut block = None;
        let mut ended = false;
        while let Some(output) = slot.session.poll_output() {
            match output {
                SessionOutput::Transmit(action) => {
                    self.actions.push_back(ManagerAction::Transmit(Frame::Action {
                        receiver: partner,
                        transmitter: own,
                        action,
                    }));
                }
                SessionOutput::Schedule { delay, timer } => {
                    self.actions.push_back(ManagerAction::Schedule {
                        delay,
                        timer: ManagerTimer::Session {
                            partner,
                            session_id,
                            timer,
                        },
                    });
                }
                SessionOutput::BlockPartner(duration) => block = Some(duration),
                SessionOutput::Override(request) => override_request = Some(request),
                SessionOutput::Ended => ended = true,
            }
        }

        if ended {
            self.sessions.remove(&partner);
            debug!(%partner, session_id, "session slot freed");
        }
        if let Some(duration) = block {
            self.block_partner(partner, duration);
        }
        override_request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{FtmParams, StatusIndication};

    fn me() -> MacAddress {
        MacAddress::from_index(1)
    }

    fn peer() -> MacAddress {
        MacAddress::from_index(2)
    }

    fn manager() -> FtmManager {
        FtmManager::new(ManagerConfig::new(me()))
    }

    fn drain(m: &mut FtmManager) -> Vec<ManagerAction> {
        std::iter::from_fn(|| m.poll_action()).collect()
    }

    fn transmitted(actions: &[ManagerAction]) -> Vec<Frame> {
        actions
            .iter()
            .filter_map(|a| match a {
                ManagerAction::Transmit(frame) => Some(frame.clone()),
                _ => None,
            })
            .collect()
    }

    fn timers(actions: &[ManagerAction]) -> Vec<ManagerTimer> {
        actions
            .iter()
            .filter_map(|a| match a {
                ManagerAction::Schedule { timer, .. } => Some(*timer),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_create_session_rejections() {
        let mut m = manager();
        assert_eq!(
            m.create_session(me(), SessionRole::Initiator).unwrap_err(),
            SessionError::SelfPartner(me())
        );

        m.create_session(peer(), SessionRole::Initiator).unwrap();
        assert_eq!(
            m.create_session(peer(), SessionRole::Responder).unwrap_err(),
            SessionError::AlreadyExists(peer())
        );

        let other = MacAddress::from_index(3);
        m.block_partner(other, Duration::from_secs(1));
        assert_eq!(
            m.create_session(other, SessionRole::Initiator).unwrap_err(),
            SessionError::PartnerBlocked(other)
        );
    }

    #[test]
    fn test_begin_session() {
        let mut m = manager();
        assert_eq!(
            m.begin_session(SimTime::ZERO, peer()),
            Err(SessionError::NotFound(peer()))
        );

        m.create_session(peer(), SessionRole::Initiator).unwrap();
        m.begin_session(SimTime::ZERO, peer()).unwrap();
        assert_eq!(
            drain(&mut m),
            vec![ManagerAction::Transmit(Frame::ftm_request(
                peer(),
                me(),
                FtmRequestHeader::initial(FtmParams::defaults())
            ))]
        );
        assert_eq!(
            m.begin_session(SimTime::ZERO, peer()),
            Err(SessionError::AlreadyStarted(peer()))
        );
    }

    #[test]
    fn test_unblock_honors_generation() {
        let mut m = manager();
        m.block_partner(peer(), Duration::from_secs(1));
        let first = timers(&drain(&mut m))[0];
        m.block_partner(peer(), Duration::from_secs(5));
        let second = timers(&drain(&mut m))[0];

        // The first block's expiry does not lift the newer block.
        m.handle_timer(SimTime::from_millis(1_000), first);
        assert!(m.is_blocked(peer()));
        m.handle_timer(SimTime::from_millis(6_000), second);
        assert!(!m.is_blocked(peer()));
    }

    #[test]
    fn test_request_creates_responder() {
        let mut m = manager();
        m.received_ftm_request(
            SimTime::ZERO,
            peer(),
            &FtmRequestHeader::initial(FtmParams::defaults()),
        );
        let session = m.session(peer()).unwrap();
        assert_eq!(session.role(), SessionRole::Responder);
        assert!(session.is_active());

        let sent = transmitted(&drain(&mut m));
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].ftm_response_header().unwrap().dialog_token, 1);
    }

    #[test]
    fn test_denied_request_frees_slot() {
        let mut m = manager();
        let params = FtmParams {
            asap_capable: true,
            ..FtmParams::defaults()
        };
        m.received_ftm_request(SimTime::ZERO, peer(), &FtmRequestHeader::initial(params));
        assert!(m.session(peer()).is_none());
        let sent = transmitted(&drain(&mut m));
        let header = sent[0].ftm_response_header().unwrap();
        assert_eq!(
            header.params.unwrap().status_indication,
            StatusIndication::RequestIncapable
        );
    }

    #[test]
    fn test_override_replaces_session() {
        let mut m = manager();
        let request = FtmRequestHeader::initial(FtmParams::defaults());
        m.received_ftm_request(SimTime::ZERO, peer(), &request);
        let old = drain(&mut m);

        m.received_ftm_request(SimTime::from_millis(1), peer(), &request);
        let new = drain(&mut m);
        assert!(m.session(peer()).unwrap().is_active());

        // Timers from the first session no longer reach the replacement.
        let old_timer = timers(&old)[0];
        let new_timer = timers(&new)[0];
        assert_ne!(old_timer, new_timer);
        m.handle_timer(SimTime::from_millis(2), old_timer);
        assert!(drain(&mut m).is_empty());
    }

    #[test]
    fn test_request_failed_blocks_partner() {
        let mut m = manager();
        m.create_session(peer(), SessionRole::Initiator).unwrap();
        m.begin_session(SimTime::ZERO, peer()).unwrap();
        drain(&mut m);

        let failed = FtmParams {
            status_indication: StatusIndication::RequestFailed,
            status_value: 7,
            ..FtmParams::default()
        };
        let frame = Frame::ftm_response(
            me(),
            peer(),
            FtmResponseHeader {
                params: Some(failed),
                ..Default::default()
            },
            None,
        );
        m.on_frame_received(SimTime::from_millis(1), &frame);

        assert!(m.session(peer()).is_none());
        assert!(m.is_blocked(peer()));
        assert_eq!(
            drain(&mut m),
            vec![ManagerAction::Schedule {
                delay: Duration::from_secs(7),
                timer: ManagerTimer::Unblock {
                    partner: peer(),
                    generation: 0
                }
            }]
        );
    }

    #[test]
    fn test_frames_for_other_stations_are_ignored() {
        let mut m = manager();
        let frame = Frame::ftm_request(
            MacAddress::from_index(9),
            peer(),
            FtmRequestHeader::initial(FtmParams::defaults()),
        );
        m.on_frame_received(SimTime::ZERO, &frame);
        assert_eq!(m.session_count(), 0);
        assert!(drain(&mut m).is_empty());
    }

    #[test]
    fn test_timestamps_reach_dialog() {
        let mut m = manager();
        m.received_ftm_request(
            SimTime::ZERO,
            peer(),
            &FtmRequestHeader::initial(FtmParams::defaults()),
        );
        let sent = transmitted(&drain(&mut m));

        m.on_frame_tx_begin(SimTime::from_micros(10), &sent[0]);
        m.on_frame_rx_begin(SimTime::from_micros(80), &Frame::Ack { receiver: me() }, None);

        let dialog = *m.session(peer()).unwrap().dialogs().get(1).unwrap();
        assert_eq!(dialog.t1, SimTime::from_micros(10).timestamp());
        assert_eq!(dialog.t4, SimTime::from_micros(80).timestamp());
    }
}
