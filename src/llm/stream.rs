//! Decoding of server-sent event bodies produced by streaming chat completions.

use serde::Deserialize;

use super::LlmError;

/// Splits a byte stream into SSE `data:` payloads, tolerating chunk boundaries anywhere.
#[derive(Default)]
pub(crate) struct SseLines {
    buffer: Vec<u8>,
}

impl SseLines {
    /// Feed a chunk and return the payloads of every line it completed.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut payloads = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if let Some(payload) = data_payload(&line) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flush a trailing line that was not newline-terminated.
    pub(crate) fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.buffer);
        data_payload(&line)
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim_end_matches(|c| c == '\r' || c == '\n');
    let payload = text.strip_prefix("data:")?;
    Some(payload.strip_prefix(' ').unwrap_or(payload).to_string())
}

/// Interpretation of one `data:` payload.
#[derive(Debug, PartialEq)]
pub(crate) enum StreamEvent {
    /// Incremental text to forward.
    Text(String),
    /// Terminal marker; nothing follows.
    Done,
    /// Keep-alive or role-only delta.
    Empty,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<StreamFailure>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
}

#[derive(Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamFailure {
    #[serde(default)]
    message: Option<String>,
}

pub(crate) fn parse_event(payload: &str) -> Result<StreamEvent, LlmError> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Ok(StreamEvent::Empty);
    }
    if payload == "[DONE]" {
        return Ok(StreamEvent::Done);
    }

    let chunk: StreamChunk = serde_json::from_str(payload)
        .map_err(|error| LlmError::InvalidResponse(format!("bad stream chunk: {error}")))?;
    if let Some(failure) = chunk.error {
        return Err(LlmError::GenerationFailed(
            failure
                .message
                .unwrap_or_else(|| "stream reported an error".into()),
        ));
    }

    let text: String = chunk
        .choices
        .into_iter()
        .filter_map(|choice| choice.delta.and_then(|delta| delta.content))
        .collect();
    if text.is_empty() {
        Ok(StreamEvent::Empty)
    } else {
        Ok(StreamEvent::Text(text))
    }
}
