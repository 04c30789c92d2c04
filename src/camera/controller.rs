//! Asynchronous camera session controller
//!
//! Wraps [`CameraSession`] in a single-owner event loop: heartbeats,
//! responses, link lifecycle changes, and caller operations all funnel
//! through one mailbox and are processed in arrival order, with watchdog
//! expiry handled as one more branch of the same loop. That keeps timer
//! rearming and state updates serialized without locking in the hot path.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use tokio::time::sleep_until;
use tracing::{debug, trace};

use super::event::{CameraEvent, LinkEvent};
use super::pending::{GetCallback, SetCallback};
use super::session::{CameraSession, RequestTarget};
use super::watchdog::Watchdog;
use crate::protocol::{
    camera_notification, CameraCommand, CameraNotification, CameraRequest, CameraStatus,
    GetResponse, Heartbeat, SetResponse,
};
use crate::timing;

/// Errors surfaced by [`CameraController`] operations.
#[derive(Debug, Error)]
pub enum CameraError {
    /// The session task has stopped, so the operation was not queued.
    #[error("camera session task is not running")]
    SessionClosed,
}

/// Configuration for a camera session.
#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// Initial addressing for outgoing requests, refreshed later by
    /// [`LinkEvent`]s.
    pub target: RequestTarget,
    /// Silence window after which the accessory is declared gone.
    pub heartbeat_timeout: Duration,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            target: RequestTarget::default(),
            heartbeat_timeout: timing::HEARTBEAT_TIMEOUT,
        }
    }
}

/// One unit of work for the session task.
enum Op {
    Heartbeat(Heartbeat),
    SetResponse(SetResponse),
    GetResponse(GetResponse),
    Link(LinkEvent),
    Set {
        command: CameraCommand,
        value: u8,
        on_result: Option<SetCallback>,
    },
    Get {
        command: CameraCommand,
        on_value: Option<GetCallback>,
    },
    StartRecording,
    StopRecording,
}

/// Handle to a running camera session task.
///
/// Cheap to clone; the task stops once every handle is dropped.
#[derive(Clone)]
pub struct CameraController {
    op_tx: mpsc::UnboundedSender<Op>,
    status: Arc<RwLock<CameraStatus>>,
}

impl CameraController {
    /// Spawn the session event loop on the current runtime. Outbound
    /// requests are pushed into `outbound`; the returned receiver carries
    /// emitted [`CameraEvent`]s.
    pub fn spawn(
        config: CameraConfig,
        outbound: mpsc::UnboundedSender<CameraRequest>,
    ) -> (Self, mpsc::UnboundedReceiver<CameraEvent>) {
        let (op_tx, op_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let status = Arc::new(RwLock::new(CameraStatus::Disconnected));

        let session = CameraSession::new(config.target, outbound, event_tx);
        let shared_status = status.clone();
        tokio::spawn(async move {
            session_loop(session, config.heartbeat_timeout, op_rx, shared_status).await;
        });

        (Self { op_tx, status }, event_rx)
    }

    /// Feed one decoded accessory notification into the session.
    pub fn handle_notification(
        &self,
        notification: CameraNotification,
    ) -> Result<(), CameraError> {
        match notification.body {
            Some(camera_notification::Body::Heartbeat(heartbeat)) => {
                self.handle_heartbeat(heartbeat)
            }
            Some(camera_notification::Body::SetResponse(response)) => {
                self.handle_set_response(response)
            }
            Some(camera_notification::Body::GetResponse(response)) => {
                self.handle_get_response(response)
            }
            None => Ok(()),
        }
    }

    /// Feed a heartbeat into the session.
    pub fn handle_heartbeat(&self, heartbeat: Heartbeat) -> Result<(), CameraError> {
        self.send_op(Op::Heartbeat(heartbeat))
    }

    /// Feed a set response into the session.
    pub fn handle_set_response(&self, response: SetResponse) -> Result<(), CameraError> {
        self.send_op(Op::SetResponse(response))
    }

    /// Feed a get response into the session.
    pub fn handle_get_response(&self, response: GetResponse) -> Result<(), CameraError> {
        self.send_op(Op::GetResponse(response))
    }

    /// Feed a link lifecycle change into the session.
    pub fn handle_link_event(&self, event: LinkEvent) -> Result<(), CameraError> {
        self.send_op(Op::Link(event))
    }

    /// Queue a set request. See [`CameraSession::send_set`].
    pub fn set(
        &self,
        command: CameraCommand,
        value: u8,
        on_result: Option<SetCallback>,
    ) -> Result<(), CameraError> {
        self.send_op(Op::Set {
            command,
            value,
            on_result,
        })
    }

    /// Queue a get request. See [`CameraSession::send_get`].
    pub fn get(
        &self,
        command: CameraCommand,
        on_value: Option<GetCallback>,
    ) -> Result<(), CameraError> {
        self.send_op(Op::Get { command, on_value })
    }

    /// Queue the start-recording chain. See
    /// [`CameraSession::start_recording`].
    pub fn start_recording(&self) -> Result<(), CameraError> {
        self.send_op(Op::StartRecording)
    }

    /// Queue the stop-recording command. See
    /// [`CameraSession::stop_recording`].
    pub fn stop_recording(&self) -> Result<(), CameraError> {
        self.send_op(Op::StopRecording)
    }

    /// Last status processed by the session task.
    pub async fn status(&self) -> CameraStatus {
        *self.status.read().await
    }

    /// Whether the accessory is present (connected or recording).
    pub async fn is_connected(&self) -> bool {
        matches!(
            self.status().await,
            CameraStatus::Connected | CameraStatus::Recording
        )
    }

    /// Whether the accessory is currently recording.
    pub async fn is_recording(&self) -> bool {
        self.status().await == CameraStatus::Recording
    }

    fn send_op(&self, op: Op) -> Result<(), CameraError> {
        self.op_tx.send(op).map_err(|_| CameraError::SessionClosed)
    }
}

async fn session_loop(
    mut session: CameraSession,
    heartbeat_timeout: Duration,
    mut op_rx: mpsc::UnboundedReceiver<Op>,
    status: Arc<RwLock<CameraStatus>>,
) {
    let mut watchdog = Watchdog::new(heartbeat_timeout);

    loop {
        tokio::select! {
            op = op_rx.recv() => {
                match op {
                    Some(op) => {
                        // Every heartbeat debounces the watchdog, whatever
                        // status it reports.
                        if matches!(op, Op::Heartbeat(_)) {
                            watchdog.reset();
                        }
                        apply(&mut session, op);
                    }
                    None => {
                        debug!("all camera handles dropped, stopping session task");
                        break;
                    }
                }
            }
            _ = sleep_until(watchdog.deadline()), if session.is_connected() => {
                session.handle_timeout();
            }
        }

        *status.write().await = session.status();
    }
}

fn apply(session: &mut CameraSession, op: Op) {
    match op {
        Op::Heartbeat(heartbeat) => match CameraStatus::try_from(heartbeat.status) {
            Ok(status) => session.handle_heartbeat(status),
            Err(_) => trace!("heartbeat with unknown status {}", heartbeat.status),
        },
        Op::SetResponse(response) => match CameraCommand::try_from(response.command) {
            Ok(command) => session.handle_set_response(command, response.result),
            Err(_) => trace!(
                "dropping set response for unknown command id {}",
                response.command
            ),
        },
        Op::GetResponse(response) => match CameraCommand::try_from(response.command) {
            Ok(command) => session.handle_get_response(command, response.value as u8),
            Err(_) => trace!(
                "dropping get response for unknown command id {}",
                response.command
            ),
        },
        Op::Link(event) => session.handle_link_event(event),
        Op::Set {
            command,
            value,
            on_result,
        } => session.send_set(command, value, on_result),
        Op::Get { command, on_value } => session.send_get(command, on_value),
        Op::StartRecording => session.start_recording(),
        Op::StopRecording => session.stop_recording(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{camera_request, values, SetRequest, RESULT_SUCCESS};

    fn spawn_default() -> (
        CameraController,
        mpsc::UnboundedReceiver<CameraRequest>,
        mpsc::UnboundedReceiver<CameraEvent>,
    ) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (controller, event_rx) = CameraController::spawn(CameraConfig::default(), outbound_tx);
        (controller, outbound_rx, event_rx)
    }

    /// Let the session task drain its mailbox (current-thread runtime).
    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    fn expect_set(request: CameraRequest) -> SetRequest {
        match request.kind {
            Some(camera_request::Kind::Set(request)) => request,
            _ => panic!("expected a set request"),
        }
    }

    fn success_for(command: CameraCommand) -> SetResponse {
        SetResponse {
            command: command.into(),
            result: RESULT_SUCCESS,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_declares_accessory_gone() {
        let (controller, _outbound, mut events) = spawn_default();

        controller
            .handle_heartbeat(Heartbeat::new(CameraStatus::Connected))
            .unwrap();
        assert_eq!(
            events.recv().await.unwrap(),
            CameraEvent::StatusChanged {
                status: CameraStatus::Connected
            }
        );

        // No further heartbeats: the paused clock jumps straight to the
        // watchdog deadline.
        assert_eq!(
            events.recv().await.unwrap(),
            CameraEvent::StatusChanged {
                status: CameraStatus::Disconnected
            }
        );
        assert!(!controller.is_connected().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeats_debounce_watchdog() {
        let (controller, _outbound, mut events) = spawn_default();

        controller
            .handle_heartbeat(Heartbeat::new(CameraStatus::Connected))
            .unwrap();
        assert_eq!(
            events.recv().await.unwrap(),
            CameraEvent::StatusChanged {
                status: CameraStatus::Connected
            }
        );

        // Three windows' worth of time, but never a full window of silence.
        for _ in 0..3 {
            tokio::time::advance(Duration::from_millis(3000)).await;
            controller
                .handle_heartbeat(Heartbeat::new(CameraStatus::Connected))
                .unwrap();
            settle().await;
        }
        assert!(events.try_recv().is_err(), "accessory must stay connected");
        assert!(controller.is_connected().await);

        // Now go silent for a full window.
        assert_eq!(
            events.recv().await.unwrap(),
            CameraEvent::StatusChanged {
                status: CameraStatus::Disconnected
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_recording_flow() {
        let (controller, mut outbound, mut events) = spawn_default();

        controller
            .handle_heartbeat(Heartbeat::new(CameraStatus::Connected))
            .unwrap();
        assert_eq!(
            events.recv().await.unwrap(),
            CameraEvent::StatusChanged {
                status: CameraStatus::Connected
            }
        );

        controller.start_recording().unwrap();
        let power = expect_set(outbound.recv().await.unwrap());
        assert_eq!(power.command, CameraCommand::Power as i32);
        assert_eq!(power.value, values::POWER_ON as u32);

        controller
            .handle_set_response(success_for(CameraCommand::Power))
            .unwrap();
        let mode = expect_set(outbound.recv().await.unwrap());
        assert_eq!(mode.command, CameraCommand::CaptureMode as i32);
        assert_eq!(mode.value, values::MODE_VIDEO as u32);

        controller
            .handle_set_response(success_for(CameraCommand::CaptureMode))
            .unwrap();
        let shutter = expect_set(outbound.recv().await.unwrap());
        assert_eq!(shutter.command, CameraCommand::Shutter as i32);
        assert_eq!(shutter.value, values::SHUTTER_START as u32);

        // The accessory confirms over its next heartbeat.
        controller
            .handle_heartbeat(Heartbeat::new(CameraStatus::Recording))
            .unwrap();
        assert_eq!(
            events.recv().await.unwrap(),
            CameraEvent::StatusChanged {
                status: CameraStatus::Recording
            }
        );
        assert!(controller.is_recording().await);

        controller.stop_recording().unwrap();
        let stop = expect_set(outbound.recv().await.unwrap());
        assert_eq!(stop.command, CameraCommand::Shutter as i32);
        assert_eq!(stop.value, values::SHUTTER_STOP as u32);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequence_failure_is_reported() {
        let (controller, mut outbound, mut events) = spawn_default();

        controller
            .handle_heartbeat(Heartbeat::new(CameraStatus::Connected))
            .unwrap();
        assert_eq!(
            events.recv().await.unwrap(),
            CameraEvent::StatusChanged {
                status: CameraStatus::Connected
            }
        );

        controller.start_recording().unwrap();
        let _ = expect_set(outbound.recv().await.unwrap());

        controller
            .handle_set_response(SetResponse {
                command: CameraCommand::Power.into(),
                result: 0,
            })
            .unwrap();
        match events.recv().await.unwrap() {
            CameraEvent::SequenceFailed { reason } => {
                assert!(reason.contains("power"), "unexpected reason: {}", reason)
            }
            other => panic!("expected a sequence failure, got {:?}", other),
        }

        settle().await;
        assert!(outbound.try_recv().is_err(), "chain must stop");
    }

    #[tokio::test(start_paused = true)]
    async fn test_notification_envelope_dispatch() {
        let (controller, mut outbound, mut events) = spawn_default();

        controller
            .handle_notification(CameraNotification {
                body: Some(camera_notification::Body::Heartbeat(Heartbeat::new(
                    CameraStatus::Connected,
                ))),
            })
            .unwrap();
        assert_eq!(
            events.recv().await.unwrap(),
            CameraEvent::StatusChanged {
                status: CameraStatus::Connected
            }
        );

        // A response with an unknown command id is dropped quietly.
        controller
            .handle_notification(CameraNotification {
                body: Some(camera_notification::Body::SetResponse(SetResponse {
                    command: 99,
                    result: RESULT_SUCCESS,
                })),
            })
            .unwrap();
        // An empty envelope is a no-op.
        controller
            .handle_notification(CameraNotification { body: None })
            .unwrap();

        settle().await;
        assert!(outbound.try_recv().is_err());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_link_event_restamps_future_requests() {
        let (controller, mut outbound, _events) = spawn_default();

        controller
            .handle_link_event(LinkEvent::Established {
                target: RequestTarget {
                    system: 7,
                    component: 42,
                },
            })
            .unwrap();
        controller
            .set(CameraCommand::Power, values::POWER_ON, None)
            .unwrap();

        let request = expect_set(outbound.recv().await.unwrap());
        assert_eq!(request.target_system, 7);
        assert_eq!(request.target_component, 42);
    }
}
