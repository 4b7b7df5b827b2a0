//! services/api/src/web/protocol.rs
//!
//! Defines the push-channel message format between the browser client and the API server.
//! Every frame, in both directions, is a JSON object `{"event": ..., "data": ...}`.

use dream_journal_core::domain::{ImageGeneration, Interpretation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

//=========================================================================================
// Event Names
//=========================================================================================

/// Published once a dream's interpretation has been stored.
pub const INTERPRETATION_COMPLETE: &str = "interpretationComplete";

/// Published once a dream's illustration has been stored.
pub const IMAGE_READY: &str = "imageReady";

/// Sent by clients to show they are still there.
pub const PING: &str = "ping";

//=========================================================================================
// Envelope
//=========================================================================================

/// The envelope for every push-channel frame.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PushMessage {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

//=========================================================================================
// Server Event Payloads
//=========================================================================================

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct InterpretationCompletePayload<'a> {
    pub dream_id: Uuid,
    pub interpretation: &'a Interpretation,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ImageReadyPayload<'a> {
    pub dream_id: Uuid,
    pub image_generation: &'a ImageGeneration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_ping_parses_without_data() {
        let msg: PushMessage = serde_json::from_str(r#"{"event":"ping"}"#).unwrap();
        assert_eq!(msg.event, PING);
        assert_eq!(msg.data, Value::Null);
    }
}
