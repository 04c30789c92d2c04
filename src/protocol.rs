//! Decoded accessory protocol messages
//!
//! In-memory shapes of the camera accessory messages that share the vehicle
//! telemetry link. An external decoder produces the inbound notifications;
//! the transport adapter consumes the outbound requests. For transports that
//! need explicit message boundaries, length-prefix helpers are provided:
//!
//! ```text
//! [ 4 bytes: length (u32, big-endian) ][ N bytes: protobuf message ]
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use prost::Message;
use thiserror::Error;

/// Result code reported by the accessory when a set request succeeded.
pub const RESULT_SUCCESS: u32 = 1;

/// Maximum accepted message size. Accessory messages are tiny; anything
/// larger is a corrupt length prefix.
pub const MAX_MESSAGE_SIZE: u32 = 1024;

/// Connection status reported by the accessory heartbeat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum CameraStatus {
    Disconnected = 0,
    Connected = 1,
    Recording = 2,
}

/// Logical command channels on the accessory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum CameraCommand {
    Power = 0,
    CaptureMode = 1,
    Shutter = 2,
}

/// Value payloads understood by the sequenced commands.
pub mod values {
    /// `Power`: turn the accessory on.
    pub const POWER_ON: u8 = 1;
    /// `CaptureMode`: video.
    pub const MODE_VIDEO: u8 = 0;
    /// `Shutter`: open (start recording).
    pub const SHUTTER_START: u8 = 1;
    /// `Shutter`: close (stop recording).
    pub const SHUTTER_STOP: u8 = 0;
}

/// Periodic liveness report from the accessory.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Heartbeat {
    #[prost(enumeration = "CameraStatus", tag = "1")]
    pub status: i32,
}

impl Heartbeat {
    /// Create a heartbeat reporting `status`.
    pub fn new(status: CameraStatus) -> Self {
        Self {
            status: status.into(),
        }
    }
}

/// Accessory acknowledgment of a set request.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SetResponse {
    #[prost(enumeration = "CameraCommand", tag = "1")]
    pub command: i32,
    #[prost(uint32, tag = "2")]
    pub result: u32,
}

impl SetResponse {
    /// Whether the accessory accepted the request.
    pub fn succeeded(&self) -> bool {
        self.result == RESULT_SUCCESS
    }
}

/// Accessory reply to a get request.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetResponse {
    #[prost(enumeration = "CameraCommand", tag = "1")]
    pub command: i32,
    #[prost(uint32, tag = "2")]
    pub value: u32,
}

/// Write a value on one of the accessory's command channels.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SetRequest {
    #[prost(uint32, tag = "1")]
    pub target_system: u32,
    #[prost(uint32, tag = "2")]
    pub target_component: u32,
    #[prost(enumeration = "CameraCommand", tag = "3")]
    pub command: i32,
    #[prost(uint32, tag = "4")]
    pub value: u32,
}

/// Read the current value of one of the accessory's command channels.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetRequest {
    #[prost(uint32, tag = "1")]
    pub target_system: u32,
    #[prost(uint32, tag = "2")]
    pub target_component: u32,
    #[prost(enumeration = "CameraCommand", tag = "3")]
    pub command: i32,
}

/// Outbound request envelope handed to the transport adapter.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CameraRequest {
    #[prost(oneof = "camera_request::Kind", tags = "1, 2")]
    pub kind: ::core::option::Option<camera_request::Kind>,
}

/// Nested types in `CameraRequest`.
pub mod camera_request {
    /// The request payload.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Kind {
        #[prost(message, tag = "1")]
        Set(super::SetRequest),
        #[prost(message, tag = "2")]
        Get(super::GetRequest),
    }
}

/// Inbound notification envelope produced by the external decoder.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CameraNotification {
    #[prost(oneof = "camera_notification::Body", tags = "1, 2, 3")]
    pub body: ::core::option::Option<camera_notification::Body>,
}

/// Nested types in `CameraNotification`.
pub mod camera_notification {
    /// The notification payload.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Body {
        #[prost(message, tag = "1")]
        Heartbeat(super::Heartbeat),
        #[prost(message, tag = "2")]
        SetResponse(super::SetResponse),
        #[prost(message, tag = "3")]
        GetResponse(super::GetResponse),
    }
}

/// Errors from the length-prefix helpers.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("message too large: {0} bytes (max: {MAX_MESSAGE_SIZE})")]
    MessageTooLarge(usize),

    #[error("invalid message length prefix: {0}")]
    InvalidLength(u32),

    #[error("protobuf decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("protobuf encode error: {0}")]
    Encode(#[from] prost::EncodeError),
}

/// Encode a message into a length-prefixed byte buffer.
pub fn encode<M: Message>(msg: &M) -> Result<Bytes, CodecError> {
    let msg_len = msg.encoded_len();
    if msg_len > MAX_MESSAGE_SIZE as usize {
        return Err(CodecError::MessageTooLarge(msg_len));
    }

    let mut buf = BytesMut::with_capacity(4 + msg_len);
    buf.put_u32(msg_len as u32);
    msg.encode(&mut buf)?;

    Ok(buf.freeze())
}

/// Try to decode one length-prefixed message from the front of `buf`.
///
/// Returns `Ok(None)` when more data is needed; the buffer is left untouched
/// in that case.
pub fn decode<M: Message + Default>(buf: &mut BytesMut) -> Result<Option<M>, CodecError> {
    if buf.len() < 4 {
        return Ok(None);
    }

    let msg_len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
    if msg_len > MAX_MESSAGE_SIZE {
        return Err(CodecError::InvalidLength(msg_len));
    }

    let total_len = 4 + msg_len as usize;
    if buf.len() < total_len {
        return Ok(None);
    }

    buf.advance(4);
    let msg_bytes = buf.split_to(msg_len as usize);

    Ok(Some(M::decode(msg_bytes)?))
}
