//! Tokio task driving one [`FtmManager`].

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

use crate::core::{FtmError, MacAddress, SessionError, SimTime, duration_to_picos};
use crate::manager::{FtmManager, ManagerAction, ManagerTimer};
use crate::session::{FtmSession, SessionRole};
use crate::wire::Frame;

/// Command queue depth.
const COMMAND_CAPACITY: usize = 256;

type Configure = Box<dyn FnOnce(&mut FtmSession) + Send>;
type Reply = oneshot::Sender<Result<(), SessionError>>;

/// Requests handled by the driver task.
pub(crate) enum DriverCommand {
    /// Create a session and configure it before anything else runs.
    CreateSession {
        /// Partner station.
        partner: MacAddress,
        /// Role of this station.
        role: SessionRole,
        /// Applied to the new session.
        configure: Configure,
        /// Outcome.
        reply: Reply,
    },
    /// Start a created session.
    BeginSession {
        /// Partner station.
        partner: MacAddress,
        /// Outcome.
        reply: Reply,
    },
    /// The PHY started sending a frame.
    FrameTxBegin(Frame),
    /// The PHY started receiving a frame.
    FrameRxBegin {
        /// The frame.
        frame: Frame,
        /// Receive power in dBm, when known.
        signal_dbm: Option<f64>,
    },
    /// A frame finished arriving.
    FrameReceived(Frame),
    /// Stop the task.
    Shutdown,
}

/// Heap entry. Ties on the deadline fire in scheduling order.
#[derive(Debug)]
struct PendingTimer {
    deadline: Instant,
    seq: u64,
    timer: ManagerTimer,
}

impl PartialEq for PendingTimer {
    fn eq(&self, other: &Self) -> bool {
        (self.deadline, self.seq) == (other.deadline, other.seq)
    }
}

impl Eq for PendingTimer {}

impl PartialOrd for PendingTimer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingTimer {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.deadline, self.seq).cmp(&(other.deadline, other.seq))
    }
}

/// Handle to a task that owns an [`FtmManager`].
///
/// All protocol work happens on the task, one command or timer at a time.
/// Simulated time is the tokio clock measured from [`spawn`](Self::spawn).
///
/// ```no_run
/// # async fn demo() -> Result<(), ftm_ranging::core::FtmError> {
/// use ftm_ranging::prelude::*;
/// use tokio::sync::mpsc;
///
/// let own = MacAddress::from_index(1);
/// let (tx, mut outbound) = mpsc::channel(64);
/// let driver = ManagerDriver::spawn(FtmManager::new(ManagerConfig::new(own)), tx);
///
/// let partner = MacAddress::from_index(2);
/// driver
///     .create_session(partner, SessionRole::Initiator, |session| {
///         session.set_session_over_callback(|report| println!("{} ps", report.mean_rtt()));
///     })
///     .await?;
/// driver.begin_session(partner).await?;
/// let request = outbound.recv().await;
/// # Ok(())
/// # }
/// ```
pub struct ManagerDriver {
    commands: mpsc::Sender<DriverCommand>,
    task: JoinHandle<FtmManager>,
}

impl ManagerDriver {
    /// Spawn the task. Frames to transmit are sent to `outbound`.
    pub fn spawn(manager: FtmManager, outbound: mpsc::Sender<Frame>) -> Self {
        let (commands, rx) = mpsc::channel(COMMAND_CAPACITY);
        let task = tokio::spawn(run(manager, rx, outbound));
        Self { commands, task }
    }

    /// Create a session with `partner` and apply `configure` to it.
    pub async fn create_session(
        &self,
        partner: MacAddress,
        role: SessionRole,
        configure: impl FnOnce(&mut FtmSession) + Send + 'static,
    ) -> Result<(), FtmError> {
        let (reply, rx) = oneshot::channel();
        self.send(DriverCommand::CreateSession {
            partner,
            role,
            configure: Box::new(configure),
            reply,
        })
        .await?;
        rx.await
            .map_err(|_| FtmError::Shutdown)?
            .map_err(FtmError::from)
    }

    /// Start the session with `partner`.
    pub async fn begin_session(&self, partner: MacAddress) -> Result<(), FtmError> {
        let (reply, rx) = oneshot::channel();
        self.send(DriverCommand::BeginSession { partner, reply }).await?;
        rx.await
            .map_err(|_| FtmError::Shutdown)?
            .map_err(FtmError::from)
    }

    /// Report that the PHY started sending `frame`.
    pub async fn frame_tx_begin(&self, frame: Frame) -> Result<(), FtmError> {
        self.send(DriverCommand::FrameTxBegin(frame)).await
    }

    /// Report that the PHY started receiving `frame`.
    pub async fn frame_rx_begin(
        &self,
        frame: Frame,
        signal_dbm: Option<f64>,
    ) -> Result<(), FtmError> {
        self.send(DriverCommand::FrameRxBegin { frame, signal_dbm }).await
    }

    /// Report that `frame` finished arriving.
    pub async fn frame_received(&self, frame: Frame) -> Result<(), FtmError> {
        self.send(DriverCommand::FrameReceived(frame)).await
    }

    /// Stop the task and take the manager back.
    pub async fn shutdown(self) -> Result<FtmManager, FtmError> {
        // The task may already be gone; joining still reports how it ended.
        let _ = self.commands.send(DriverCommand::Shutdown).await;
        self.task.await.map_err(|_| FtmError::Shutdown)
    }

    async fn send(&self, command: DriverCommand) -> Result<(), FtmError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| FtmError::Shutdown)
    }
}

async fn run(
    mut manager: FtmManager,
    mut commands: mpsc::Receiver<DriverCommand>,
    outbound: mpsc::Sender<Frame>,
) -> FtmManager {
    let epoch = Instant::now();
    let sim_now = || SimTime::from_picos(duration_to_picos(Instant::now() - epoch));
    let mut timers: BinaryHeap<Reverse<PendingTimer>> = BinaryHeap::new();
    let mut seq = 0u64;

    debug!(address = %manager.address(), "manager driver started");
    loop {
        while let Some(action) = manager.poll_action() {
            match action {
                ManagerAction::Transmit(frame) => {
                    if outbound.send(frame).await.is_err() {
                        warn!("outbound channel closed, dropping frame");
                    }
                }
                ManagerAction::Schedule { delay, timer } => {
                    seq += 1;
                    timers.push(Reverse(PendingTimer {
                        deadline: Instant::now() + delay,
                        seq,
                        timer,
                    }));
                }
            }
        }

        let next_deadline = timers.peek().map(|Reverse(pending)| pending.deadline);
        tokio::select! {
            command = commands.recv() => match command {
                None | Some(DriverCommand::Shutdown) => break,
                Some(command) => handle_command(&mut manager, sim_now(), command),
            },
            () = sleep_until_deadline(next_deadline) => {
                let now = Instant::now();
                while let Some(Reverse(pending)) = timers.peek() {
                    if pending.deadline > now {
                        break;
                    }
                    let timer = pending.timer;
                    timers.pop();
                    debug!(?timer, "timer fired");
                    manager.handle_timer(sim_now(), timer);
                }
            }
        }
    }
    debug!(address = %manager.address(), pending_timers = timers.len(), "manager driver stopped");
    manager
}

fn handle_command(manager: &mut FtmManager, now: SimTime, command: DriverCommand) {
    match command {
        DriverCommand::CreateSession {
            partner,
            role,
            configure,
            reply,
        } => {
            let result = manager.create_session(partner, role).map(configure);
            let _ = reply.send(result);
        }
        DriverCommand::BeginSession { partner, reply } => {
            let _ = reply.send(manager.begin_session(now, partner));
        }
        DriverCommand::FrameTxBegin(frame) => manager.on_frame_tx_begin(now, &frame),
        DriverCommand::FrameRxBegin { frame, signal_dbm } => {
            manager.on_frame_rx_begin(now, &frame, signal_dbm)
        }
        DriverCommand::FrameReceived(frame) => manager.on_frame_received(now, &frame),
        DriverCommand::Shutdown => {}
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::manager::ManagerConfig;
    use crate::wire::{FtmParams, FtmRequestHeader, FtmResponseHeader, StatusIndication};

    fn me() -> MacAddress {
        MacAddress::from_index(1)
    }

    fn peer() -> MacAddress {
        MacAddress::from_index(2)
    }

    fn spawn() -> (ManagerDriver, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(16);
        (
            ManagerDriver::spawn(FtmManager::new(ManagerConfig::new(me())), tx),
            rx,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_begin_sends_request() {
        let (driver, mut outbound) = spawn();
        driver
            .create_session(peer(), SessionRole::Initiator, |_| {})
            .await
            .unwrap();
        driver.begin_session(peer()).await.unwrap();

        let frame = outbound.recv().await.unwrap();
        assert_eq!(
            frame,
            Frame::ftm_request(peer(), me(), FtmRequestHeader::initial(FtmParams::defaults()))
        );

        let err = driver.begin_session(peer()).await.unwrap_err();
        assert!(matches!(
            err,
            FtmError::Session(SessionError::AlreadyStarted(p)) if p == peer()
        ));

        let manager = driver.shutdown().await.unwrap();
        assert_eq!(manager.session_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_block_expires_on_timer() {
        let (driver, mut outbound) = spawn();
        let (report_tx, mut reports) = mpsc::unbounded_channel();
        driver
            .create_session(peer(), SessionRole::Initiator, move |session| {
                session.set_session_over_callback(move |report| {
                    let _ = report_tx.send(report);
                });
            })
            .await
            .unwrap();
        driver.begin_session(peer()).await.unwrap();
        outbound.recv().await.unwrap();

        let failed = FtmParams {
            status_indication: StatusIndication::RequestFailed,
            status_value: 1,
            ..FtmParams::default()
        };
        let response = Frame::ftm_response(
            me(),
            peer(),
            FtmResponseHeader {
                params: Some(failed),
                ..Default::default()
            },
            None,
        );
        driver.frame_received(response).await.unwrap();
        let report = reports.recv().await.unwrap();
        assert!(report.rtts.is_empty());

        let err = driver
            .create_session(peer(), SessionRole::Initiator, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FtmError::Session(SessionError::PartnerBlocked(_))
        ));

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        driver
            .create_session(peer(), SessionRole::Initiator, |_| {})
            .await
            .unwrap();
        driver.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_commands_after_shutdown_fail() {
        let (driver, _outbound) = spawn();
        let commands = driver.commands.clone();
        driver.shutdown().await.unwrap();
        assert!(commands.send(DriverCommand::Shutdown).await.is_err());
    }
}
