//! Pusher protocol 7 frame codec.
//!
//! Every frame is a JSON object `{"event": .., "channel": .., "data": ..}`.
//! Servers encode `data` as a JSON string; it is decoded once on the way in
//! and left as a plain string when it is not JSON.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::ports::ChannelAuth;

pub const CONNECTION_ESTABLISHED: &str = "pusher:connection_established";
pub const ERROR: &str = "pusher:error";
pub const PING: &str = "pusher:ping";
pub const PONG: &str = "pusher:pong";
pub const SUBSCRIBE: &str = "pusher:subscribe";
pub const UNSUBSCRIBE: &str = "pusher:unsubscribe";
pub const SUBSCRIPTION_SUCCEEDED: &str = "pusher:subscription_succeeded";
pub const SUBSCRIPTION_ERROR: &str = "pusher:subscription_error";
pub const INTERNAL_SUBSCRIPTION_SUCCEEDED: &str = "pusher_internal:subscription_succeeded";

/// Errors decoding an inbound frame.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Frame is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Frame has no event name")]
    MissingEvent,

    #[error("Invalid {event} data: {reason}")]
    InvalidData { event: String, reason: String },
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundFrame {
    pub event: String,
    pub channel: Option<String>,
    pub data: Value,
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    data: Value,
}

impl InboundFrame {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let raw: RawFrame = serde_json::from_str(text)?;
        let event = raw
            .event
            .filter(|e| !e.is_empty())
            .ok_or(ProtocolError::MissingEvent)?;
        Ok(Self {
            event,
            channel: raw.channel,
            data: decode_data(raw.data),
        })
    }

    /// Decodes `data` into a typed record.
    pub fn data_as<T: for<'de> Deserialize<'de>>(&self) -> Result<T, ProtocolError> {
        serde_json::from_value(self.data.clone()).map_err(|e| ProtocolError::InvalidData {
            event: self.event.clone(),
            reason: e.to_string(),
        })
    }
}

fn decode_data(data: Value) -> Value {
    match data {
        Value::String(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        other => other,
    }
}

/// Data of `pusher:connection_established`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionEstablished {
    pub socket_id: String,
    /// Seconds; servers advertise how long they tolerate silence.
    #[serde(default)]
    pub activity_timeout: Option<u64>,
}

/// Data of `pusher:error`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerError {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<u16>,
}

/// What to do after the server closes the connection with a given code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// 4000-4099: the connection must not be retried.
    Stop,
    /// 4100-4199: retry after backing off.
    Backoff,
    /// 4200-4299: retry straight away.
    Immediate,
}

impl ReconnectPolicy {
    pub fn for_code(code: Option<u16>) -> Self {
        match code {
            Some(4000..=4099) => ReconnectPolicy::Stop,
            Some(4200..=4299) => ReconnectPolicy::Immediate,
            _ => ReconnectPolicy::Backoff,
        }
    }
}

#[derive(Serialize)]
struct OutboundFrame<'a> {
    event: &'a str,
    data: Value,
}

fn encode(event: &str, data: Value) -> String {
    // Serializing a struct of a str and a Value cannot fail.
    serde_json::to_string(&OutboundFrame { event, data }).unwrap_or_default()
}

pub fn subscribe(channel: &str, auth: Option<&ChannelAuth>) -> String {
    let mut data = json!({ "channel": channel });
    if let Some(auth) = auth {
        data["auth"] = Value::String(auth.auth.clone());
        if let Some(channel_data) = &auth.channel_data {
            data["channel_data"] = Value::String(channel_data.clone());
        }
    }
    encode(SUBSCRIBE, data)
}

pub fn unsubscribe(channel: &str) -> String {
    encode(UNSUBSCRIBE, json!({ "channel": channel }))
}

pub fn ping() -> String {
    encode(PING, json!({}))
}

pub fn pong() -> String {
    encode(PONG, json!({}))
}
