//! Line-delimited JSON messages exchanged with the runner process.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    StepValidateRequest,
    StepValidateResponse,
    KillProcessRequest,
    /// Any type this side does not understand.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepValidateRequest {
    pub step_text: String,
    pub number_of_parameters: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepValidateResponse {
    pub is_valid: bool,
    /// Runner error type, e.g. `STEP_IMPLEMENTATION_NOT_FOUND`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error_message: String,
}

/// Envelope for every message on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message_type: MessageType,
    #[serde(default)]
    pub message_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_validate_request: Option<StepValidateRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_validate_response: Option<StepValidateResponse>,
}

impl Message {
    fn empty(message_type: MessageType) -> Self {
        Self {
            message_type,
            message_id: 0,
            step_validate_request: None,
            step_validate_response: None,
        }
    }

    pub fn step_validate_request(step_text: &str, number_of_parameters: usize) -> Self {
        Self {
            step_validate_request: Some(StepValidateRequest {
                step_text: step_text.to_string(),
                number_of_parameters,
            }),
            ..Self::empty(MessageType::StepValidateRequest)
        }
    }

    pub fn step_validate_response(response: StepValidateResponse) -> Self {
        Self {
            step_validate_response: Some(response),
            ..Self::empty(MessageType::StepValidateResponse)
        }
    }

    pub fn kill_process_request() -> Self {
        Self::empty(MessageType::KillProcessRequest)
    }

    pub fn with_id(mut self, message_id: u64) -> Self {
        self.message_id = message_id;
        self
    }
}

/// Serialize `message` as one JSON line (trailing newline included).
pub fn encode_line(message: &Message) -> Result<String> {
    let mut line = serde_json::to_string(message).context("serialize runner message")?;
    line.push('\n');
    Ok(line)
}

pub fn decode_line(line: &str) -> Result<Message> {
    serde_json::from_str(line.trim_end()).context("parse runner message")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wire_shape() {
        let line =
            encode_line(&Message::step_validate_request("say {}", 1).with_id(7)).expect("encode");
        let value: serde_json::Value = serde_json::from_str(&line).expect("json");
        assert_eq!(value["message_type"], "StepValidateRequest");
        assert_eq!(value["message_id"], 7);
        assert_eq!(value["step_validate_request"]["step_text"], "say {}");
        assert_eq!(value["step_validate_request"]["number_of_parameters"], 1);
        assert!(value.get("step_validate_response").is_none());
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn decode_response_with_defaults() {
        let message = decode_line(
            r#"{"message_type":"StepValidateResponse","message_id":3,"step_validate_response":{"is_valid":false}}"#,
        )
        .expect("decode");
        assert_eq!(message.message_type, MessageType::StepValidateResponse);
        assert_eq!(message.message_id, 3);
        let response = message.step_validate_response.expect("response");
        assert!(!response.is_valid);
        assert_eq!(response.error_type, None);
    }

    #[test]
    fn decode_unknown_message_type() {
        let message = decode_line(r#"{"message_type":"ExecutionStatusResponse","message_id":1}"#)
            .expect("decode");
        assert_eq!(message.message_type, MessageType::Unknown);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_line("not json").is_err());
    }
}
