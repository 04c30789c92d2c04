//! Events crossing the session boundary

use super::session::RequestTarget;
use crate::protocol::CameraStatus;

/// Events emitted by the session for whoever owns UI or telemetry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraEvent {
    /// The accessory reported a new status, or the watchdog forced it to
    /// disconnected.
    StatusChanged { status: CameraStatus },
    /// A recording command chain aborted on a rejected step.
    SequenceFailed { reason: String },
}

/// Link lifecycle notifications from the owner of the underlying connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// The link came up; requests must be addressed to `target` from now on.
    Established { target: RequestTarget },
    /// The link came back after an interruption.
    Restored { target: RequestTarget },
    /// The link went away. The session learns about accessory loss from the
    /// heartbeat watchdog, so this carries no session-level action.
    Lost,
}
