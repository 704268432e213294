//! FTM session state machine.
//!
//! A session owns one partner relationship. It never touches the medium or
//! the clock itself: every entry point takes the current [`SimTime`] and the
//! session queues [`SessionOutput`]s (frames to send, timers to arm,
//! lifecycle events) for its owner to drain with [`FtmSession::poll_output`].

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::core::{
    DEFAULT_PREAMBLE_DETECTION, MAX_TIMESTAMP_RETRIES, MacAddress, NO_DIALOG,
    NO_PREFERENCE_BURST_DELAY_MS, SimTime, TIMESTAMP_RETRY_DIVISOR, duration_to_picos,
};
use crate::error_model::{ErrorContext, ErrorModel, NullErrorModel};
use crate::wire::{
    FtmParams, FtmRequestHeader, FtmResponseHeader, PublicAction, StatusIndication, TsfSyncInfo,
};

use super::dialog::{DialogTable, FtmDialog};
use super::negotiation::validate_params;
use super::rtt::{dialog_rtt, mean_rtt};

/// Which end of the exchange a session plays.
///
/// The role is fixed when the session is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionRole {
    /// Requests measurements and computes RTTs.
    Initiator,
    /// Sends FTM frames and timestamps them.
    Responder,
}

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// Created, no request sent or accepted yet.
    Idle,
    /// Request sent (initiator) or accepted (responder).
    Active,
    /// Finished; only the report remains.
    Ended,
}

/// Timers a session arms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionTimer {
    /// Start the next burst.
    StartNextBurst,
    /// Responder: send the next FTM frame of the burst.
    SendNextFtm,
}

/// Work a session hands to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutput {
    /// Send an action frame to the partner.
    Transmit(PublicAction),
    /// Fire `timer` after `delay`.
    Schedule {
        /// Delay from now.
        delay: Duration,
        /// Timer to fire.
        timer: SessionTimer,
    },
    /// Refuse new sessions with the partner for `duration`.
    BlockPartner(Duration),
    /// The partner renegotiated; start a fresh responder session with this request.
    Override(FtmRequestHeader),
    /// The session ended and its slot can be freed.
    Ended,
}

/// Per-session configuration.
///
/// | Option | Effect |
/// |---|---|
/// | `default_params` | parameters an initiator requests; fills no-preference fields on a responder |
/// | `preamble_detection` | subtracted twice from every RTT sample |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    /// Default FTM parameters.
    pub default_params: FtmParams,
    /// Preamble detection duration of the PHY.
    pub preamble_detection: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_params: FtmParams::defaults(),
            preamble_detection: DEFAULT_PREAMBLE_DETECTION,
        }
    }
}

/// Results of a finished session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    /// Partner station.
    pub partner: MacAddress,
    /// Role this station played.
    pub role: SessionRole,
    /// Parameters in effect at the end.
    pub params: FtmParams,
    /// RTT samples in picoseconds, in completion order.
    pub rtts: Vec<i64>,
    /// Receive power in dBm recorded with each RTT sample.
    pub signal_strengths: Vec<f64>,
    /// Dialogs still held at the end.
    pub dialogs: Vec<FtmDialog>,
}

impl SessionReport {
    /// Mean RTT rounded toward zero, 0 without samples.
    pub fn mean_rtt(&self) -> i64 {
        mean_rtt(&self.rtts)
    }

    /// Mean signal strength in dBm, 0 without samples.
    pub fn mean_signal_strength(&self) -> f64 {
        mean_signal_strength(&self.signal_strengths)
    }
}

type SessionOverCallback = Box<dyn FnOnce(SessionReport) + Send>;
type LiveRttCallback = Box<dyn FnMut(i64) + Send>;

/// One FTM session with a partner station.
pub struct FtmSession {
    partner: MacAddress,
    role: SessionRole,
    phase: SessionPhase,
    params: FtmParams,
    default_params: FtmParams,
    preamble_detection_ps: i64,

    bursts_remaining: i32,
    ftms_remaining: i32,
    burst_end: SimTime,
    next_burst_period: Duration,
    next_ftm_delay: Duration,
    timestamp_retries: u32,

    dialogs: DialogTable,
    current_dialog: Option<u8>,
    rtts: Vec<i64>,
    signal_strengths: Vec<f64>,
    last_signal_strength: Option<f64>,

    error_model: Box<dyn ErrorModel>,
    on_session_over: Option<SessionOverCallback>,
    live_rtt: Option<LiveRttCallback>,
    live_rtt_enabled: bool,

    outputs: VecDeque<SessionOutput>,
}

impl FtmSession {
    /// Create a session with `partner`. Initiators start from the default parameters.
    pub fn new(partner: MacAddress, role: SessionRole, config: &SessionConfig) -> Self {
        let params = match role {
            SessionRole::Initiator => config.default_params,
            SessionRole::Responder => FtmParams::default(),
        };
        Self {
            partner,
            role,
            phase: SessionPhase::Idle,
            params,
            default_params: config.default_params,
            preamble_detection_ps: duration_to_picos(config.preamble_detection) as i64,
            bursts_remaining: 0,
            ftms_remaining: 0,
            burst_end: SimTime::ZERO,
            next_burst_period: Duration::ZERO,
            next_ftm_delay: Duration::ZERO,
            timestamp_retries: 0,
            dialogs: DialogTable::new(),
            current_dialog: None,
            rtts: Vec::new(),
            signal_strengths: Vec::new(),
            last_signal_strength: None,
            error_model: Box::new(NullErrorModel),
            on_session_over: None,
            live_rtt: None,
            live_rtt_enabled: false,
            outputs: VecDeque::new(),
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Replace the parameters an initiator will request.
    pub fn set_params(&mut self, params: FtmParams) {
        self.params = params;
    }

    /// Current parameters.
    pub fn params(&self) -> &FtmParams {
        &self.params
    }

    /// Replace the default parameters.
    pub fn set_default_params(&mut self, params: FtmParams) {
        self.default_params = params;
    }

    /// Default parameters.
    pub fn default_params(&self) -> &FtmParams {
        &self.default_params
    }

    /// Reset the requested parameters to the defaults.
    pub fn use_default_params(&mut self) {
        self.params = self.default_params;
    }

    /// Replace the preamble detection duration.
    pub fn set_preamble_detection(&mut self, duration: Duration) {
        self.preamble_detection_ps = duration_to_picos(duration) as i64;
    }

    /// Attach an error model. The default adds no error.
    pub fn set_error_model(&mut self, model: impl ErrorModel + 'static) {
        self.error_model = Box::new(model);
    }

    /// Deliver the report to `callback` when the session ends.
    pub fn set_session_over_callback(
        &mut self,
        callback: impl FnOnce(SessionReport) + Send + 'static,
    ) {
        self.on_session_over = Some(Box::new(callback));
    }

    /// Deliver every RTT sample to `callback` as soon as it is computed.
    pub fn enable_live_rtt(&mut self, callback: impl FnMut(i64) + Send + 'static) {
        self.live_rtt = Some(Box::new(callback));
        self.live_rtt_enabled = true;
    }

    /// Stop live RTT delivery.
    pub fn disable_live_rtt(&mut self) {
        self.live_rtt_enabled = false;
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Partner station.
    pub fn partner(&self) -> MacAddress {
        self.partner
    }

    /// Role of this station.
    pub fn role(&self) -> SessionRole {
        self.role
    }

    /// Lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Whether the session is running.
    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Active
    }

    /// RTT samples so far.
    pub fn rtts(&self) -> &[i64] {
        &self.rtts
    }

    /// Mean RTT so far, rounded toward zero.
    pub fn mean_rtt(&self) -> i64 {
        mean_rtt(&self.rtts)
    }

    /// Signal strength samples so far.
    pub fn signal_strengths(&self) -> &[f64] {
        &self.signal_strengths
    }

    /// Mean signal strength so far.
    pub fn mean_signal_strength(&self) -> f64 {
        mean_signal_strength(&self.signal_strengths)
    }

    /// Live dialogs.
    pub fn dialogs(&self) -> &DialogTable {
        &self.dialogs
    }

    /// Bursts still to run.
    pub fn bursts_remaining(&self) -> i32 {
        self.bursts_remaining
    }

    /// FTM frames still to send in the current burst.
    pub fn ftms_remaining(&self) -> i32 {
        self.ftms_remaining
    }

    /// Snapshot of the session results.
    pub fn report(&self) -> SessionReport {
        SessionReport {
            partner: self.partner,
            role: self.role,
            params: self.params,
            rtts: self.rtts.clone(),
            signal_strengths: self.signal_strengths.clone(),
            dialogs: self.dialogs.iter().copied().collect(),
        }
    }

    /// Next queued output.
    pub fn poll_output(&mut self) -> Option<SessionOutput> {
        self.outputs.pop_front()
    }

    // =========================================================================
    // Protocol entry points
    // =========================================================================

    /// Start the session.
    ///
    /// An initiator sends its request. Responders begin on their own once a
    /// request is accepted, so this is a no-op for them.
    pub fn begin(&mut self, now: SimTime) {
        match (self.role, self.phase) {
            (SessionRole::Initiator, SessionPhase::Idle) => {
                info!(partner = %self.partner, at = %now, "requesting FTM session");
                self.phase = SessionPhase::Active;
                self.transmit(PublicAction::FtmRequest(FtmRequestHeader::initial(
                    self.params,
                )));
            }
            (role, phase) => {
                debug!(partner = %self.partner, ?role, ?phase, "begin ignored");
            }
        }
    }

    /// Handle an FTM request from the partner.
    pub fn process_request(&mut self, now: SimTime, request: &FtmRequestHeader) {
        if self.role != SessionRole::Responder || self.phase == SessionPhase::Ended {
            debug!(partner = %self.partner, phase = ?self.phase, "request ignored");
            return;
        }

        match (request.trigger, request.params) {
            (1, Some(requested)) if !self.is_active() => self.negotiate(now, &requested),
            (1, Some(_)) => {
                info!(partner = %self.partner, "partner renegotiated, overriding session");
                self.end();
                self.outputs.push_back(SessionOutput::Override(*request));
            }
            (1, None) => self.trigger_received(now),
            (0, _) => {
                info!(partner = %self.partner, "partner stopped session");
                self.end();
            }
            (trigger, _) => debug!(partner = %self.partner, trigger, "unknown trigger"),
        }
    }

    /// Handle an FTM frame from the partner.
    pub fn process_response(&mut self, now: SimTime, response: &FtmResponseHeader) {
        if self.role != SessionRole::Initiator || self.phase == SessionPhase::Ended {
            debug!(partner = %self.partner, phase = ?self.phase, "response ignored");
            return;
        }

        if let Some(params) = response.params {
            self.params = params;
            match params.status_indication {
                StatusIndication::Successful => self.accepted(now, &params),
                StatusIndication::RequestFailed => {
                    error!(partner = %self.partner, backoff_s = params.status_value, "FTM request failed");
                    if params.status_value != 0 {
                        let backoff = Duration::from_secs(u64::from(params.status_value));
                        self.outputs.push_back(SessionOutput::BlockPartner(backoff));
                    }
                    self.end();
                    return;
                }
                status => {
                    error!(partner = %self.partner, ?status, "FTM request incapable");
                    self.end();
                    return;
                }
            }
        }

        if response.dialog_token != NO_DIALOG {
            self.dialogs.get_or_insert(response.dialog_token);
        }

        if response.follow_up_dialog_token != NO_DIALOG {
            let follow_up = self
                .dialogs
                .get_mut(response.follow_up_dialog_token)
                .filter(|d| d.t1 == 0 && d.t4 == 0);
            if let Some(dialog) = follow_up {
                dialog.t1 = response.time_of_departure;
                dialog.t4 = response.time_of_arrival;
                let dialog = *dialog;
                self.calculate_rtt(&dialog);
            }
        }

        if response.dialog_token == NO_DIALOG {
            info!(partner = %self.partner, samples = self.rtts.len(), "responder ended session");
            self.end();
        }
    }

    /// Fire a timer armed through [`SessionOutput::Schedule`].
    pub fn handle_timer(&mut self, now: SimTime, timer: SessionTimer) {
        if self.phase == SessionPhase::Ended {
            warn!(partner = %self.partner, ?timer, "timer fired on ended session");
            return;
        }
        match timer {
            SessionTimer::StartNextBurst => self.start_next_burst(now),
            SessionTimer::SendNextFtm => self.send_next_ftm(now),
        }
    }

    /// End the session. Later calls do nothing.
    pub fn end(&mut self) {
        if self.phase == SessionPhase::Ended {
            return;
        }
        self.phase = SessionPhase::Ended;
        self.outputs.push_back(SessionOutput::Ended);
        info!(partner = %self.partner, role = ?self.role, samples = self.rtts.len(), "FTM session ended");
        if let Some(callback) = self.on_session_over.take() {
            callback(self.report());
        }
    }

    // =========================================================================
    // Timestamps
    // =========================================================================

    /// Departure of the FTM frame with `token`.
    pub fn set_t1(&mut self, token: u8, timestamp: u64) {
        if let Some(dialog) = self.dialogs.get_mut(token) {
            dialog.t1 = timestamp;
        }
    }

    /// Arrival of the FTM frame with `token`. Creates the dialog if needed.
    pub fn set_t2(&mut self, token: u8, timestamp: u64) {
        self.dialogs.get_or_insert(token).t2 = timestamp;
    }

    /// Departure of the ack for `token`.
    pub fn set_t3(&mut self, token: u8, timestamp: u64) {
        if let Some(dialog) = self.dialogs.get_mut(token) {
            dialog.t3 = timestamp;
        }
    }

    /// Arrival of the ack for `token`.
    pub fn set_t4(&mut self, token: u8, timestamp: u64) {
        if let Some(dialog) = self.dialogs.get_mut(token) {
            dialog.t4 = timestamp;
        }
    }

    /// Receive power of the latest FTM frame from the partner.
    pub fn record_signal_strength(&mut self, dbm: f64) {
        self.last_signal_strength = Some(dbm);
    }

    // =========================================================================
    // Responder
    // =========================================================================

    fn negotiate(&mut self, now: SimTime, requested: &FtmParams) {
        match validate_params(requested, &self.default_params) {
            Ok(accepted) => {
                info!(
                    partner = %self.partner,
                    bursts = accepted.number_of_bursts(),
                    ftms_per_burst = accepted.ftms_per_burst,
                    asap = accepted.asap,
                    "accepted FTM session"
                );
                self.params = accepted;
                self.phase = SessionPhase::Active;
                self.dialogs.reset();
                self.bursts_remaining = accepted.number_of_bursts() as i32;
                self.ftms_remaining = i32::from(accepted.ftms_per_burst);
                self.responder_begin(now);
            }
            Err(_) => self.deny(),
        }
    }

    fn responder_begin(&mut self, now: SimTime) {
        self.next_burst_period = self.params.burst_period_delay();
        self.next_ftm_delay = self.params.min_delta_ftm_delay();
        let token = self.dialogs.current_token();

        if self.params.asap {
            self.dialogs.insert_new(token);
            self.current_dialog = Some(token);
            self.burst_end = now + self.params.burst_duration_delay();
            self.bursts_remaining -= 1;
            self.ftms_remaining -= 1;

            self.schedule(self.next_ftm_delay, SessionTimer::SendNextFtm);
            if self.bursts_remaining > 0 {
                self.schedule(self.next_burst_period, SessionTimer::StartNextBurst);
            }
            self.params.partial_tsf_no_preference = false;
        } else if self.params.partial_tsf_no_preference {
            self.params.partial_tsf_no_preference = false;
            self.params.partial_tsf_timer = NO_PREFERENCE_BURST_DELAY_MS;
            self.schedule(
                Duration::from_millis(u64::from(NO_PREFERENCE_BURST_DELAY_MS)),
                SessionTimer::StartNextBurst,
            );
        } else {
            self.schedule(
                Duration::from_millis(u64::from(self.params.partial_tsf_timer)),
                SessionTimer::StartNextBurst,
            );
        }

        let header = FtmResponseHeader {
            dialog_token: token,
            params: Some(self.params),
            ..Default::default()
        };
        self.transmit(PublicAction::FtmResponse {
            header,
            tsf_sync: Some(TsfSyncInfo::default()),
        });
    }

    fn deny(&mut self) {
        let params = FtmParams {
            status_indication: StatusIndication::RequestIncapable,
            ..FtmParams::default()
        };
        let header = FtmResponseHeader {
            params: Some(params),
            ..Default::default()
        };
        self.transmit(PublicAction::FtmResponse {
            header,
            tsf_sync: None,
        });
        self.end();
    }

    fn trigger_received(&mut self, now: SimTime) {
        if self.is_active() && now < self.burst_end {
            self.send_next_ftm(now);
        } else {
            debug!(partner = %self.partner, at = %now, "trigger outside burst window");
        }
    }

    fn send_next_ftm(&mut self, now: SimTime) {
        if self.ftms_remaining > 0 && now < self.burst_end {
            if !self.current_timestamps_ready() {
                self.retry_for_timestamps();
                return;
            }
            self.timestamp_retries = 0;

            let first_of_burst = self.ftms_remaining == i32::from(self.params.ftms_per_burst);
            self.ftms_remaining -= 1;

            let token = self.dialogs.advance();
            self.dialogs.insert_new(token);
            self.current_dialog = Some(token);

            let previous = self.dialogs.previous_token();
            let mut header = FtmResponseHeader {
                dialog_token: token,
                ..Default::default()
            };
            if let Some(prev) = self.dialogs.get(previous) {
                header.follow_up_dialog_token = previous;
                header.time_of_departure = prev.t1;
                header.time_of_arrival = prev.t4;
            }
            if self.ftms_remaining <= 0 && self.bursts_remaining <= 0 {
                header.dialog_token = NO_DIALOG;
            }

            debug!(
                partner = %self.partner,
                token = header.dialog_token,
                follow_up = header.follow_up_dialog_token,
                first_of_burst,
                "sending FTM frame"
            );
            self.transmit(PublicAction::FtmResponse {
                header,
                tsf_sync: first_of_burst.then(TsfSyncInfo::default),
            });
            self.schedule(self.next_ftm_delay, SessionTimer::SendNextFtm);
        } else if self.ftms_remaining <= 0 && self.bursts_remaining <= 0 {
            self.end();
        } else if now >= self.burst_end && self.bursts_remaining <= 0 && self.ftms_remaining > 0 {
            // Out of time with frames left: close with the last dialog's timestamps.
            if !self.current_timestamps_ready() {
                self.retry_for_timestamps();
                return;
            }
            self.send_termination();
        }
    }

    fn start_next_burst(&mut self, now: SimTime) {
        if self.bursts_remaining <= 0 {
            return;
        }
        self.bursts_remaining -= 1;
        self.ftms_remaining = i32::from(self.params.ftms_per_burst);
        self.burst_end = now + self.params.burst_duration_delay();
        debug!(
            partner = %self.partner,
            role = ?self.role,
            bursts_remaining = self.bursts_remaining,
            "burst started"
        );

        if self.role == SessionRole::Initiator {
            self.transmit(PublicAction::FtmRequest(FtmRequestHeader::trigger()));
        }
        if self.bursts_remaining > 0 {
            self.schedule(self.next_burst_period, SessionTimer::StartNextBurst);
        }
    }

    fn current_timestamps_ready(&self) -> bool {
        match self.current_dialog {
            None => true,
            Some(token) => self.dialogs.get(token).is_none_or(FtmDialog::has_departure_pair),
        }
    }

    fn retry_for_timestamps(&mut self) {
        self.timestamp_retries += 1;
        if self.timestamp_retries > MAX_TIMESTAMP_RETRIES {
            warn!(
                partner = %self.partner,
                token = ?self.current_dialog,
                "timestamps never captured, closing session"
            );
            self.send_termination();
            return;
        }
        self.schedule(
            self.next_ftm_delay / TIMESTAMP_RETRY_DIVISOR,
            SessionTimer::SendNextFtm,
        );
    }

    /// Final frame with token 0, carrying the current dialog's timestamps when known.
    fn send_termination(&mut self) {
        let mut header = FtmResponseHeader::default();
        let current = self
            .current_dialog
            .and_then(|token| self.dialogs.get(token))
            .filter(|d| d.has_departure_pair());
        if let Some(dialog) = current {
            header.follow_up_dialog_token = dialog.token;
            header.time_of_departure = dialog.t1;
            header.time_of_arrival = dialog.t4;
        }
        self.transmit(PublicAction::FtmResponse {
            header,
            tsf_sync: None,
        });
        self.end();
    }

    // =========================================================================
    // Initiator
    // =========================================================================

    fn accepted(&mut self, now: SimTime, params: &FtmParams) {
        self.bursts_remaining = params.number_of_bursts() as i32;
        self.next_burst_period = params.burst_period_delay();
        info!(
            partner = %self.partner,
            at = %now,
            bursts = self.bursts_remaining,
            asap = params.asap,
            "FTM session accepted by responder"
        );

        if params.asap {
            self.bursts_remaining -= 1;
            self.schedule(self.next_burst_period, SessionTimer::StartNextBurst);
        } else {
            self.dialogs.clear();
            self.schedule(
                Duration::from_millis(u64::from(params.partial_tsf_timer)),
                SessionTimer::StartNextBurst,
            );
        }
    }

    fn calculate_rtt(&mut self, dialog: &FtmDialog) {
        let ctx = ErrorContext {
            signal_strength: self.last_signal_strength,
        };
        let rtt = dialog_rtt(dialog, self.preamble_detection_ps) + self.error_model.sample(&ctx);
        debug!(partner = %self.partner, token = dialog.token, rtt, "RTT sample");

        self.rtts.push(rtt);
        if let Some(dbm) = self.last_signal_strength {
            self.signal_strengths.push(dbm);
        }
        if self.live_rtt_enabled {
            if let Some(live) = self.live_rtt.as_mut() {
                live(rtt);
            }
        }
    }

    // =========================================================================
    // Output helpers
    // =========================================================================

    fn transmit(&mut self, action: PublicAction) {
        self.outputs.push_back(SessionOutput::Transmit(action));
    }

    fn schedule(&mut self, delay: Duration, timer: SessionTimer) {
        self.outputs.push_back(SessionOutput::Schedule { delay, timer });
    }
}

impl fmt::Debug for FtmSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FtmSession")
            .field("partner", &self.partner)
            .field("role", &self.role)
            .field("phase", &self.phase)
            .field("params", &self.params)
            .field("bursts_remaining", &self.bursts_remaining)
            .field("ftms_remaining", &self.ftms_remaining)
            .field("rtts", &self.rtts)
            .finish_non_exhaustive()
    }
}

fn mean_signal_strength(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}
