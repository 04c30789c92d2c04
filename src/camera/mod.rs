//! Camera accessory session management
//!
//! This module handles:
//! - Tracking accessory presence from heartbeats, with a watchdog that
//!   declares it gone after a silent window
//! - Correlating in-flight set/get requests with their eventual responses
//! - Dependent command chains for starting and stopping recording
//! - Refreshing request addressing when the vehicle link is (re)established

mod controller;
mod event;
mod pending;
mod session;
mod watchdog;

pub use controller::{CameraConfig, CameraController, CameraError};
pub use event::{CameraEvent, LinkEvent};
pub use pending::{GetCallback, SetCallback};
pub use session::{CameraSession, RequestTarget};
