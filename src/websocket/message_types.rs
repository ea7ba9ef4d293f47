use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Inbound frames from client to server, keyed by `action`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum WsInboundEvent {
    #[serde(rename = "ping")]
    Ping,
    #[serde(rename = "typing")]
    Typing { conversation_id: Uuid },
}

/// Outbound frames that answer the client directly rather than via the hub.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsOutboundEvent {
    #[serde(rename = "pong")]
    Pong,
    #[serde(rename = "error")]
    Error { message: String },
}

impl WsOutboundEvent {
    /// Reply to a frame that named a known action but failed to decode.
    pub fn malformed(detail: &str) -> Self {
        WsOutboundEvent::Error {
            message: format!("malformed frame: {detail}"),
        }
    }
}

/// Result of decoding a text frame.
#[derive(Debug, PartialEq)]
pub enum InboundFrame {
    Event(WsInboundEvent),
    /// Valid JSON with an action this server does not handle.
    Unhandled(String),
    /// Valid JSON without a string `action` field.
    NoAction,
    Malformed(String),
}

impl InboundFrame {
    pub fn parse(text: &str) -> Self {
        let value: serde_json::Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => return InboundFrame::Malformed(e.to_string()),
        };

        let Some(action) = value.get("action").and_then(|a| a.as_str()).map(str::to_owned) else {
            return InboundFrame::NoAction;
        };

        match serde_json::from_value::<WsInboundEvent>(value) {
            Ok(event) => InboundFrame::Event(event),
            Err(e) if matches!(action.as_str(), "ping" | "typing") => {
                InboundFrame::Malformed(format!("{action}: {e}"))
            }
            Err(_) => InboundFrame::Unhandled(action),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_actions() {
        assert_eq!(
            InboundFrame::parse(r#"{"action":"ping"}"#),
            InboundFrame::Event(WsInboundEvent::Ping)
        );

        let conv = Uuid::new_v4();
        let text = format!(r#"{{"action":"typing","conversation_id":"{conv}"}}"#);
        assert_eq!(
            InboundFrame::parse(&text),
            InboundFrame::Event(WsInboundEvent::Typing {
                conversation_id: conv
            })
        );
    }

    #[test]
    fn test_parse_unknown_and_malformed() {
        assert_eq!(
            InboundFrame::parse(r#"{"action":"dance"}"#),
            InboundFrame::Unhandled("dance".into())
        );
        assert_eq!(InboundFrame::parse(r#"{"foo":1}"#), InboundFrame::NoAction);
        assert!(matches!(
            InboundFrame::parse("not json"),
            InboundFrame::Malformed(_)
        ));
        assert!(matches!(
            InboundFrame::parse(r#"{"action":"typing","conversation_id":"nope"}"#),
            InboundFrame::Malformed(_)
        ));
    }

    #[test]
    fn test_malformed_frame_reply_shape() {
        let InboundFrame::Malformed(detail) =
            InboundFrame::parse(r#"{"action":"typing","conversation_id":"nope"}"#)
        else {
            panic!("expected a malformed frame");
        };
        let v = serde_json::to_value(WsOutboundEvent::malformed(&detail)).unwrap();
        assert_eq!(v["type"], "error");
        assert!(v["message"]
            .as_str()
            .unwrap()
            .starts_with("malformed frame: typing:"));
    }

    #[test]
    fn test_pong_shape() {
        let v = serde_json::to_value(WsOutboundEvent::Pong).unwrap();
        assert_eq!(v, serde_json::json!({"type": "pong"}));
    }
}
