//! Continuation bookkeeping for in-flight requests
//!
//! At most one continuation is tracked per command and request kind; set and
//! get requests are separate namespaces. A second request for the same
//! command replaces the stored continuation, and the earlier one is dropped
//! without ever being invoked. Entries carry no timeout of their own:
//! staleness is bounded only by the liveness watchdog, which purges
//! everything on disconnect.

use std::collections::HashMap;

use tracing::debug;

use super::session::RecordingStep;
use crate::protocol::CameraCommand;

/// Caller-supplied continuation for a set request. Receives the command and
/// whether the accessory reported success.
pub type SetCallback = Box<dyn FnOnce(CameraCommand, bool) + Send>;

/// Caller-supplied continuation for a get request. Receives the command and
/// the returned value byte.
pub type GetCallback = Box<dyn FnOnce(CameraCommand, u8) + Send>;

/// What to do when a set response arrives.
pub(crate) enum SetContinuation {
    /// Hand the result to external code.
    Callback(SetCallback),
    /// Advance a recording sequence.
    Step(RecordingStep),
}

/// The continuation maps for in-flight requests.
#[derive(Default)]
pub(crate) struct PendingRequests {
    set: HashMap<CameraCommand, SetContinuation>,
    get: HashMap<CameraCommand, GetCallback>,
}

impl PendingRequests {
    /// Track the continuation for an in-flight set request, replacing any
    /// unresolved one for the same command.
    pub(crate) fn insert_set(&mut self, command: CameraCommand, continuation: SetContinuation) {
        if self.set.insert(command, continuation).is_some() {
            debug!("replaced pending set continuation for {:?}", command);
        }
    }

    /// Track the continuation for an in-flight get request, replacing any
    /// unresolved one for the same command.
    pub(crate) fn insert_get(&mut self, command: CameraCommand, continuation: GetCallback) {
        if self.get.insert(command, continuation).is_some() {
            debug!("replaced pending get continuation for {:?}", command);
        }
    }

    pub(crate) fn take_set(&mut self, command: CameraCommand) -> Option<SetContinuation> {
        self.set.remove(&command)
    }

    pub(crate) fn take_get(&mut self, command: CameraCommand) -> Option<GetCallback> {
        self.get.remove(&command)
    }

    /// Drop every tracked continuation without invoking it.
    pub(crate) fn clear(&mut self) {
        self.set.clear();
        self.get.clear();
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.set.is_empty() && self.get.is_empty()
    }
}
