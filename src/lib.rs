//! Camera accessory session management
//!
//! This crate provides the control-plane session logic for a camera accessory
//! that hangs off a shared, unreliable vehicle telemetry link: liveness
//! tracking driven by periodic heartbeats, correlation of in-flight set/get
//! requests with their eventual responses, dependent command chains for
//! recording control, and re-addressing of outgoing requests when the link is
//! (re)established.
//!
//! The crate deliberately stops at the message boundary. An external decoder
//! pushes decoded notifications in through [`CameraController`]; fully-built
//! [`protocol::CameraRequest`]s come out on a channel for whatever owns the
//! actual link. No subscriber is installed for the `tracing` output here;
//! that is the embedding application's call.

pub mod camera;
pub mod protocol;

pub use camera::{
    CameraConfig, CameraController, CameraError, CameraEvent, CameraSession, GetCallback,
    LinkEvent, RequestTarget, SetCallback,
};
pub use protocol::{CameraCommand, CameraStatus};

/// Timing parameters for the session core.
pub mod timing {
    use std::time::Duration;

    /// The accessory is declared gone when no heartbeat arrives within this
    /// many milliseconds of the previous one.
    pub const HEARTBEAT_TIMEOUT_MS: u64 = 5000;

    /// [`HEARTBEAT_TIMEOUT_MS`] as a [`Duration`].
    pub const HEARTBEAT_TIMEOUT: Duration = Duration::from_millis(HEARTBEAT_TIMEOUT_MS);
}
