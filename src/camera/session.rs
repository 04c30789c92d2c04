//! Camera accessory session state
//!
//! [`CameraSession`] is the stateful middle layer between the decoded
//! accessory messages and the transport adapter: it tracks the accessory's
//! reported status, correlates in-flight set/get requests with their
//! responses, and runs the dependent command chains behind recording
//! control. It processes one event at a time and never blocks; the
//! surrounding event loop owns the watchdog timer and feeds it events in
//! arrival order.

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use super::event::{CameraEvent, LinkEvent};
use super::pending::{GetCallback, PendingRequests, SetCallback, SetContinuation};
use crate::protocol::{
    camera_request, values, CameraCommand, CameraRequest, CameraStatus, GetRequest, SetRequest,
    RESULT_SUCCESS,
};

/// Addressing identifiers stamped into every outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestTarget {
    /// System id of the vehicle carrying the accessory.
    pub system: u8,
    /// Component id the accessory answers on.
    pub component: u8,
}

/// Steps of the start-recording chain that wait on a set response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecordingStep {
    PowerOn,
    SelectVideoMode,
}

/// Session state for one camera accessory.
///
/// Requests go out through the `outbound` channel as fully-built
/// [`CameraRequest`]s; [`CameraEvent`]s surface on `events`. The accessory
/// starts out disconnected until its first heartbeat says otherwise.
pub struct CameraSession {
    status: CameraStatus,
    target: RequestTarget,
    pending: PendingRequests,
    outbound: mpsc::UnboundedSender<CameraRequest>,
    events: mpsc::UnboundedSender<CameraEvent>,
}

impl CameraSession {
    pub fn new(
        target: RequestTarget,
        outbound: mpsc::UnboundedSender<CameraRequest>,
        events: mpsc::UnboundedSender<CameraEvent>,
    ) -> Self {
        Self {
            status: CameraStatus::Disconnected,
            target,
            pending: PendingRequests::default(),
            outbound,
            events,
        }
    }

    /// Current accessory status.
    pub fn status(&self) -> CameraStatus {
        self.status
    }

    /// Whether the accessory is present (connected or recording).
    pub fn is_connected(&self) -> bool {
        matches!(
            self.status,
            CameraStatus::Connected | CameraStatus::Recording
        )
    }

    /// Whether the accessory is currently recording.
    pub fn is_recording(&self) -> bool {
        self.status == CameraStatus::Recording
    }

    /// Process a heartbeat's reported status.
    ///
    /// A status change is emitted as [`CameraEvent::StatusChanged`]; a change
    /// to disconnected first discards every pending continuation. The caller
    /// rearms the watchdog for every heartbeat, changed or not.
    pub fn handle_heartbeat(&mut self, status: CameraStatus) {
        if status == self.status {
            return;
        }

        debug!("camera status: {:?} -> {:?}", self.status, status);
        self.status = status;
        if status == CameraStatus::Disconnected {
            self.purge_pending();
        }
        self.emit(CameraEvent::StatusChanged { status });
    }

    /// Process watchdog expiry: the accessory has been silent for a full
    /// heartbeat window. Idempotent, so a timeout racing a disconnect
    /// heartbeat is harmless.
    pub fn handle_timeout(&mut self) {
        if self.status == CameraStatus::Disconnected {
            return;
        }

        warn!("camera heartbeat lost, marking accessory disconnected");
        self.status = CameraStatus::Disconnected;
        self.purge_pending();
        self.emit(CameraEvent::StatusChanged {
            status: CameraStatus::Disconnected,
        });
    }

    /// Send a set request. `on_result` is invoked exactly once if and when a
    /// matching response arrives, with `true` on success; `None` makes the
    /// request fire-and-forget.
    pub fn send_set(&mut self, command: CameraCommand, value: u8, on_result: Option<SetCallback>) {
        self.send_set_request(command, value, on_result.map(SetContinuation::Callback));
    }

    /// Send a get request. `on_value` is invoked exactly once if and when a
    /// matching response arrives.
    pub fn send_get(&mut self, command: CameraCommand, on_value: Option<GetCallback>) {
        if let Some(continuation) = on_value {
            self.pending.insert_get(command, continuation);
        }

        let request = GetRequest {
            target_system: self.target.system as u32,
            target_component: self.target.component as u32,
            command: command.into(),
        };
        trace!("get request: {:?}", command);
        self.dispatch(camera_request::Kind::Get(request));
    }

    /// Resolve the continuation waiting on a set response, if one is still
    /// registered. Unmatched responses are dropped.
    pub fn handle_set_response(&mut self, command: CameraCommand, result: u32) {
        let success = result == RESULT_SUCCESS;
        match self.pending.take_set(command) {
            Some(SetContinuation::Callback(callback)) => callback(command, success),
            Some(SetContinuation::Step(step)) => self.advance_recording(step, success),
            None => trace!("dropping unmatched set response for {:?}", command),
        }
    }

    /// Resolve the continuation waiting on a get response, if one is still
    /// registered. Unmatched responses are dropped.
    pub fn handle_get_response(&mut self, command: CameraCommand, value: u8) {
        match self.pending.take_get(command) {
            Some(callback) => callback(command, value),
            None => trace!("dropping unmatched get response for {:?}", command),
        }
    }

    /// Power the accessory on, switch it to video mode, and open the
    /// shutter. No-op unless the accessory is connected and idle.
    ///
    /// The chain aborts with [`CameraEvent::SequenceFailed`] on the first
    /// rejected step. The shutter step itself is fire-and-forget: the status
    /// change to recording is confirmed by a later heartbeat, not here.
    pub fn start_recording(&mut self) {
        if !self.is_connected() || self.is_recording() {
            return;
        }

        self.send_set_request(
            CameraCommand::Power,
            values::POWER_ON,
            Some(SetContinuation::Step(RecordingStep::PowerOn)),
        );
    }

    /// Close the shutter. No-op unless the accessory is recording;
    /// confirmation arrives with a later heartbeat.
    pub fn stop_recording(&mut self) {
        if !self.is_connected() || !self.is_recording() {
            return;
        }

        self.send_set_request(CameraCommand::Shutter, values::SHUTTER_STOP, None);
    }

    /// React to link lifecycle changes by refreshing the request target, so
    /// every request built afterwards is addressed correctly. Pending
    /// continuations are unaffected.
    pub fn handle_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Established { target } | LinkEvent::Restored { target } => {
                debug!(
                    "request target refreshed: system={} component={}",
                    target.system, target.component
                );
                self.target = target;
            }
            LinkEvent::Lost => {}
        }
    }

    fn advance_recording(&mut self, step: RecordingStep, success: bool) {
        match (step, success) {
            (RecordingStep::PowerOn, true) => {
                self.send_set_request(
                    CameraCommand::CaptureMode,
                    values::MODE_VIDEO,
                    Some(SetContinuation::Step(RecordingStep::SelectVideoMode)),
                );
            }
            (RecordingStep::SelectVideoMode, true) => {
                self.send_set_request(CameraCommand::Shutter, values::SHUTTER_START, None);
            }
            (step, false) => {
                let reason = match step {
                    RecordingStep::PowerOn => "unable to power the camera on",
                    RecordingStep::SelectVideoMode => "unable to switch the camera to video mode",
                };
                warn!("recording sequence aborted: {}", reason);
                self.emit(CameraEvent::SequenceFailed {
                    reason: reason.to_string(),
                });
            }
        }
    }

    fn send_set_request(
        &mut self,
        command: CameraCommand,
        value: u8,
        continuation: Option<SetContinuation>,
    ) {
        if let Some(continuation) = continuation {
            self.pending.insert_set(command, continuation);
        }

        let request = SetRequest {
            target_system: self.target.system as u32,
            target_component: self.target.component as u32,
            command: command.into(),
            value: value as u32,
        };
        trace!("set request: {:?} value={}", command, value);
        self.dispatch(camera_request::Kind::Set(request));
    }

    fn dispatch(&self, kind: camera_request::Kind) {
        let request = CameraRequest { kind: Some(kind) };
        if self.outbound.send(request).is_err() {
            warn!("transport adapter gone, dropping outbound request");
        }
    }

    fn purge_pending(&mut self) {
        if !self.pending.is_empty() {
            debug!("discarding pending continuations on disconnect");
        }
        self.pending.clear();
    }

    fn emit(&self, event: CameraEvent) {
        let _ = self.events.send(event);
    }
}
