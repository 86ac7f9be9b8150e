//! Gateway frame format

use super::{HelloPayload, IdentifyPayload, OpCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One gateway frame
///
/// Every text frame in either direction has this shape. `t` and `s` are only
/// set on dispatches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayMessage {
    pub op: OpCode,

    /// Event type (op=0 only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    /// Per-connection sequence number (op=0 only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<Value>,
}

impl GatewayMessage {
    /// Create a Dispatch message (op=0)
    #[must_use]
    pub fn dispatch(event_type: impl Into<String>, sequence: u64, data: Value) -> Self {
        Self {
            op: OpCode::Dispatch,
            t: Some(event_type.into()),
            s: Some(sequence),
            d: Some(data),
        }
    }

    /// Create a Hello message (op=10)
    #[must_use]
    pub fn hello(payload: &HelloPayload) -> Self {
        Self {
            op: OpCode::Hello,
            t: None,
            s: None,
            d: Some(serde_json::json!({ "heartbeat_interval": payload.heartbeat_interval })),
        }
    }

    /// Create a Heartbeat ACK message (op=11)
    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self {
            op: OpCode::HeartbeatAck,
            t: None,
            s: None,
            d: None,
        }
    }

    /// Parse an Identify payload (op=2)
    pub fn as_identify(&self) -> Option<IdentifyPayload> {
        if self.op != OpCode::Identify {
            return None;
        }
        self.d.as_ref().and_then(|d| serde_json::from_value(d.clone()).ok())
    }

    /// Last sequence the client reports in a heartbeat (op=1)
    pub fn as_heartbeat_seq(&self) -> Option<Option<u64>> {
        if self.op != OpCode::Heartbeat {
            return None;
        }
        Some(self.d.as_ref().and_then(Value::as_u64))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.t, self.s) {
            (Some(t), Some(s)) => write!(f, "GatewayMessage(op={}, t={t}, s={s})", self.op),
            (Some(t), None) => write!(f, "GatewayMessage(op={}, t={t})", self.op),
            _ => write!(f, "GatewayMessage(op={})", self.op),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_message() {
        let msg = GatewayMessage::dispatch("NOTIFICATION_CREATE", 3, serde_json::json!({"id": "1"}));
        let json: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();

        assert_eq!(json["op"], 0);
        assert_eq!(json["t"], "NOTIFICATION_CREATE");
        assert_eq!(json["s"], 3);
        assert_eq!(json["d"]["id"], "1");
    }

    #[test]
    fn test_hello_and_ack_omit_dispatch_fields() {
        let hello = GatewayMessage::hello(&HelloPayload::with_interval(41_250)).to_json().unwrap();
        assert_eq!(hello, r#"{"op":10,"d":{"heartbeat_interval":41250}}"#);

        let ack = GatewayMessage::heartbeat_ack().to_json().unwrap();
        assert_eq!(ack, r#"{"op":11}"#);
    }

    #[test]
    fn test_parse_identify() {
        let msg = GatewayMessage::from_json(r#"{"op":2,"d":{"token":"Bearer xyz"}}"#).unwrap();
        assert_eq!(msg.as_identify().unwrap().token, "Bearer xyz");

        let missing = GatewayMessage::from_json(r#"{"op":2,"d":{}}"#).unwrap();
        assert!(missing.as_identify().is_none());
    }

    #[test]
    fn test_parse_heartbeat() {
        let msg = GatewayMessage::from_json(r#"{"op":1,"d":41}"#).unwrap();
        assert_eq!(msg.as_heartbeat_seq(), Some(Some(41)));

        let bare = GatewayMessage::from_json(r#"{"op":1}"#).unwrap();
        assert_eq!(bare.as_heartbeat_seq(), Some(None));

        let null = GatewayMessage::from_json(r#"{"op":1,"d":null}"#).unwrap();
        assert_eq!(null.as_heartbeat_seq(), Some(None));
    }

    #[test]
    fn test_unknown_op_is_decode_failure() {
        assert!(GatewayMessage::from_json(r#"{"op":7}"#).is_err());
        assert!(GatewayMessage::from_json("not json").is_err());
    }

    #[test]
    fn test_message_display() {
        let dispatch = GatewayMessage::dispatch("READY", 1, serde_json::json!({}));
        assert!(dispatch.to_string().contains("t=READY, s=1"));
    }
}
