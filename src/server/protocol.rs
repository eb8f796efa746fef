use serde::{Deserialize, Serialize};

use crate::providers::Provider;
use crate::services::MetricsSummary;

/// Frames larger than this are rejected and the connection dropped.
pub const MAX_FRAME_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    Ping,
    Shutdown,
    Status,
    Upload(UploadRequest),
    Ask(AskRequest),
    Reset(ResetRequest),
    SessionInfo(SessionInfoRequest),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRequest {
    /// Reuse an existing session; omitted or stale ids start a fresh one.
    pub session_id: Option<String>,
    pub filename: String,
    /// Extracted document text; extraction happens client-side.
    pub text: String,
    pub provider: Provider,
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub session_id: String,
    pub question: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetRequest {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfoRequest {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Pong,
    ShutdownAck,
    Status(StatusResponse),
    Upload(UploadResponse),
    Ask(AskResponse),
    ResetAck,
    SessionInfo(SessionInfoResponse),
    Error(ErrorResponse),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub running: bool,
    pub active_sessions: usize,
    pub idle_secs: u64,
    pub requests_served: u64,
    pub metrics: Option<MetricsSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub session_id: String,
    /// Chunks produced by this upload, not the session total.
    pub chunk_count: usize,
    /// Every file in the session, in upload order.
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfoResponse {
    pub session_id: String,
    pub provider: Provider,
    pub files: Vec<String>,
    pub history_len: usize,
    pub index_size: usize,
    pub age_secs: u64,
    pub started_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl Response {
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error(ErrorResponse {
            message: message.into(),
        })
    }
}

pub fn encode_message(msg: &impl Serialize) -> Result<Vec<u8>, serde_json::Error> {
    let json = serde_json::to_vec(msg)?;
    let len = (json.len() as u32).to_be_bytes();
    let mut buf = Vec::with_capacity(4 + json.len());
    buf.extend_from_slice(&len);
    buf.extend_from_slice(&json);
    Ok(buf)
}

pub fn decode_length(buf: &[u8; 4]) -> usize {
    u32::from_be_bytes(*buf) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_roundtrip() {
        let request = Request::Upload(UploadRequest {
            session_id: None,
            filename: "a.txt".to_string(),
            text: "content".to_string(),
            provider: Provider::Gemini,
            api_key: "key".to_string(),
        });

        let encoded = serde_json::to_string(&request).unwrap();
        assert!(encoded.contains("\"type\":\"upload\""));
        assert!(encoded.contains("\"provider\":\"gemini\""));

        let decoded: Request = serde_json::from_str(&encoded).unwrap();
        match decoded {
            Request::Upload(req) => {
                assert_eq!(req.filename, "a.txt");
                assert!(req.session_id.is_none());
            }
            other => panic!("unexpected request: {:?}", other),
        }
    }

    #[test]
    fn test_frame_roundtrip() {
        let response = Response::error("boom");
        let encoded = encode_message(&response).unwrap();

        let mut len_buf = [0u8; 4];
        len_buf.copy_from_slice(&encoded[..4]);
        let len = decode_length(&len_buf);
        assert_eq!(len, encoded.len() - 4);

        let decoded: Response = serde_json::from_slice(&encoded[4..]).unwrap();
        match decoded {
            Response::Error(e) => assert_eq!(e.message, "boom"),
            other => panic!("unexpected response: {:?}", other),
        }
    }
}
