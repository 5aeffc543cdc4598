//! Streaming response frame handling
//!
//! The completion endpoint streams newline-delimited event frames
//! (`data: {json}` / `data: [DONE]`). Chunks can cut a frame anywhere, so a
//! carry buffer holds partial input until the frame-end sequence arrives.

use serde::Deserialize;

use crate::{Error, Result};

/// Frame marker prefix
const DATA_PREFIX: &str = "data:";

/// Stream termination marker
const DONE_MARKER: &str = "[DONE]";

/// Completion payload shape, resolved once at request time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionMode {
    /// `choices[0].delta.content`
    Plain,
    /// `choices[0].messages[0].delta.{role,content}`, with a `tool` role
    /// carrying retrieval evidence
    Grounded,
}

/// One token extracted from a parsed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamToken {
    /// Reply text to display and speak
    Assistant(String),
    /// Retrieval evidence; accumulated, never spoken
    Tool(String),
}

/// Reassembles frames from arbitrarily-cut stream chunks
///
/// A buffer not yet ending in the frame-end sequence is held and merged with
/// the next chunk instead of being parsed.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    carry: Vec<u8>,
}

impl FrameBuffer {
    /// Create an empty buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk; returns the complete frames it unlocked, if any
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.carry.extend_from_slice(chunk);

        if !self.carry.ends_with(b"}\n\n") && !self.carry.ends_with(b"[DONE]\n\n") {
            return Vec::new();
        }

        let text = String::from_utf8_lossy(&self.carry).into_owned();
        self.carry.clear();

        text.split("\n\n")
            .filter(|frame| !frame.trim().is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Whether input is still held back waiting for a frame end
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.carry.is_empty()
    }
}

#[derive(Deserialize)]
struct Delta {
    role: Option<String>,
    content: Option<String>,
}

#[derive(Deserialize)]
struct PlainChoice {
    delta: Option<Delta>,
}

#[derive(Deserialize)]
struct PlainChunk {
    choices: Vec<PlainChoice>,
}

#[derive(Deserialize)]
struct GroundedMessage {
    delta: Option<Delta>,
}

#[derive(Deserialize)]
struct GroundedChoice {
    messages: Vec<GroundedMessage>,
}

#[derive(Deserialize)]
struct GroundedChunk {
    choices: Vec<GroundedChoice>,
}

/// Parse one frame into at most one token
///
/// Non-data frames and the termination marker yield `None`.
///
/// # Errors
///
/// Returns `Error::StreamParse` when the frame payload is not valid JSON for
/// the resolved mode; the caller skips the frame and continues.
pub fn parse_frame(frame: &str, mode: CompletionMode) -> Result<Option<StreamToken>> {
    let frame = frame.trim();
    if !frame.starts_with(DATA_PREFIX) || frame.ends_with(DONE_MARKER) {
        return Ok(None);
    }

    let payload = frame[DATA_PREFIX.len()..].trim();

    match mode {
        CompletionMode::Plain => {
            let chunk: PlainChunk = serde_json::from_str(payload)
                .map_err(|e| Error::StreamParse(e.to_string()))?;
            Ok(chunk
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta)
                .and_then(|delta| delta.content)
                .filter(|content| !content.is_empty())
                .map(StreamToken::Assistant))
        }
        CompletionMode::Grounded => {
            let chunk: GroundedChunk = serde_json::from_str(payload)
                .map_err(|e| Error::StreamParse(e.to_string()))?;
            let Some(delta) = chunk
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.messages.into_iter().next())
                .and_then(|message| message.delta)
            else {
                return Ok(None);
            };

            let content = delta.content.unwrap_or_default();
            if content.is_empty() {
                return Ok(None);
            }
            if delta.role.as_deref() == Some("tool") {
                return Ok(Some(StreamToken::Tool(content)));
            }
            // Some grounded backends echo the termination marker as content
            if content == DONE_MARKER {
                return Ok(None);
            }
            Ok(Some(StreamToken::Assistant(content)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_chunk_yields_frames() {
        let mut buffer = FrameBuffer::new();
        let frames = buffer.push(b"data: {\"a\":1}\n\ndata: {\"b\":2}\n\n");
        assert_eq!(frames.len(), 2);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_partial_chunk_is_held_until_completed() {
        let mut buffer = FrameBuffer::new();
        assert!(buffer.push(b"data: {\"choices\":[{\"delta\":{\"co").is_empty());
        assert!(!buffer.is_empty());

        let frames = buffer.push(b"ntent\":\"hi\"}}]}\n\n");
        assert_eq!(frames.len(), 1);

        let token = parse_frame(&frames[0], CompletionMode::Plain).unwrap();
        assert_eq!(token, Some(StreamToken::Assistant("hi".to_string())));
    }

    #[test]
    fn test_done_chunk_terminates_buffering() {
        let mut buffer = FrameBuffer::new();
        let frames = buffer.push(b"data: [DONE]\n\n");
        assert_eq!(frames, vec!["data: [DONE]"]);
        assert_eq!(parse_frame(&frames[0], CompletionMode::Plain).unwrap(), None);
    }

    #[test]
    fn test_plain_token_extraction() {
        let token = parse_frame(
            r#"data: {"choices":[{"delta":{"role":"assistant","content":"Hello"}}]}"#,
            CompletionMode::Plain,
        )
        .unwrap();
        assert_eq!(token, Some(StreamToken::Assistant("Hello".to_string())));
    }

    #[test]
    fn test_role_only_frame_yields_nothing() {
        let token = parse_frame(
            r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#,
            CompletionMode::Plain,
        )
        .unwrap();
        assert_eq!(token, None);
    }

    #[test]
    fn test_empty_choices_yield_nothing() {
        let token = parse_frame(r#"data: {"choices":[]}"#, CompletionMode::Plain).unwrap();
        assert_eq!(token, None);
    }

    #[test]
    fn test_grounded_tool_content_is_routed_separately() {
        let frame = r#"data: {"choices":[{"messages":[{"delta":{"role":"tool","content":"evidence"}}]}]}"#;
        let token = parse_frame(frame, CompletionMode::Grounded).unwrap();
        assert_eq!(token, Some(StreamToken::Tool("evidence".to_string())));
    }

    #[test]
    fn test_grounded_assistant_content() {
        let frame = r#"data: {"choices":[{"messages":[{"delta":{"role":"assistant","content":"answer"}}]}]}"#;
        let token = parse_frame(frame, CompletionMode::Grounded).unwrap();
        assert_eq!(token, Some(StreamToken::Assistant("answer".to_string())));
    }

    #[test]
    fn test_grounded_done_content_is_dropped() {
        let frame = r#"data: {"choices":[{"messages":[{"delta":{"role":"assistant","content":"[DONE]"}}]}]}"#;
        let token = parse_frame(frame, CompletionMode::Grounded).unwrap();
        assert_eq!(token, None);
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        let result = parse_frame("data: {not json", CompletionMode::Plain);
        assert!(matches!(result, Err(Error::StreamParse(_))));
    }

    #[test]
    fn test_non_data_frame_is_skipped() {
        let token = parse_frame(": keepalive", CompletionMode::Plain).unwrap();
        assert_eq!(token, None);
    }
}
