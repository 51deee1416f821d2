//! Wire chunk codec.
//!
//! Backends and the host exchange newline-delimited `data: <json>` events
//! where each JSON object carries one text delta under
//! `choices[0].delta.content`. This module extracts deltas from received
//! lines, constructs event lines from deltas, and splits a transport byte
//! stream into lines. Decoding is permissive: any parse failure or missing
//! field yields `None`, never an error.

use crate::types::FinishReason;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;

/// Event-stream line prefix.
pub const DATA_PREFIX: &str = "data: ";

/// Explicit end-of-stream marker used by the hosted router.
pub const DONE_MARKER: &str = "[DONE]";

/// Extract the text delta from one wire line.
///
/// Strips the `data: ` prefix if present, parses the remainder as JSON,
/// and returns the first choice's delta content. Returns `None` for the
/// `[DONE]` marker, malformed JSON, or a missing field.
pub fn decode_content(line: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(line).ok()?;
    let payload = text.strip_prefix(DATA_PREFIX).unwrap_or(text).trim();
    if payload.is_empty() || payload == DONE_MARKER {
        return None;
    }
    let value: serde_json::Value = serde_json::from_str(payload).ok()?;
    value
        .get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()
        .map(str::to_owned)
}

/// Encode a text delta as one prefixed, newline-terminated event line.
pub fn encode_delta(text: &str) -> Bytes {
    let body = json!({"choices": [{"delta": {"content": text}}]});
    Bytes::from(format!("{DATA_PREFIX}{body}\n\n"))
}

/// Encode a synthetic error chunk.
///
/// Streaming failures surface as one of these instead of an error, so a
/// chunk stream is always iterable to completion.
pub fn encode_error_chunk(message: &str) -> Bytes {
    let body = json!({
        "id": "error-chunk",
        "object": "chat.completion.chunk",
        "choices": [{
            "delta": {"content": message},
            "index": 0,
            "finish_reason": "error"
        }]
    });
    Bytes::from(format!("{DATA_PREFIX}{body}\n\n"))
}

/// Read the finish reason of a wire line, if it carries a known one.
pub fn decode_finish_reason(line: &[u8]) -> Option<FinishReason> {
    let text = std::str::from_utf8(line).ok()?;
    let payload = text.strip_prefix(DATA_PREFIX).unwrap_or(text).trim();
    let value: serde_json::Value = serde_json::from_str(payload).ok()?;
    let reason = value.get("choices")?.get(0)?.get("finish_reason")?;
    serde_json::from_value(reason.clone()).ok()
}

/// Buffered chat-completion response body, decoded permissively: missing
/// fields fall back to empty defaults instead of failing.
#[derive(Debug, Default, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompletionChoice {
    #[serde(default)]
    pub message: CompletionMessage,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompletionMessage {
    #[serde(default)]
    pub content: String,
}

impl CompletionResponse {
    /// Text content of the first choice, empty if the shape is missing it.
    pub fn first_content(self) -> String {
        self.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default()
    }
}

/// Split a transport byte stream into non-empty lines.
///
/// Line fragments spanning reads are reassembled; `\r` and `\n`
/// terminators are stripped; empty lines are dropped. A transport error is
/// forwarded once and ends the stream.
pub fn lines<S, E>(input: S) -> impl Stream<Item = Result<Bytes, E>>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    async_stream::stream! {
        futures::pin_mut!(input);
        let mut pending: Vec<u8> = Vec::new();
        while let Some(read) = input.next().await {
            match read {
                Ok(chunk) => {
                    for byte in chunk {
                        if byte == b'\n' {
                            if pending.last() == Some(&b'\r') {
                                pending.pop();
                            }
                            if !pending.is_empty() {
                                yield Ok(Bytes::from(std::mem::take(&mut pending)));
                            }
                        } else {
                            pending.push(byte);
                        }
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }
        if pending.last() == Some(&b'\r') {
            pending.pop();
        }
        if !pending.is_empty() {
            yield Ok(Bytes::from(pending));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[test]
    fn round_trip_preserves_delta() {
        let encoded = encode_delta("hello 世界");
        assert_eq!(decode_content(&encoded), Some("hello 世界".to_string()));
    }

    #[test]
    fn decode_without_prefix() {
        let line = br#"{"choices":[{"delta":{"content":"x"}}]}"#;
        assert_eq!(decode_content(line), Some("x".to_string()));
    }

    #[test]
    fn decode_truncated_json_is_none() {
        assert_eq!(decode_content(b"data: {\"choices\":[{\"del"), None);
    }

    #[test]
    fn decode_missing_field_is_none() {
        assert_eq!(decode_content(br#"data: {"choices":[{}]}"#), None);
        assert_eq!(decode_content(br#"data: {"choices":[]}"#), None);
        assert_eq!(decode_content(br#"data: {}"#), None);
    }

    #[test]
    fn decode_done_marker_is_none() {
        assert_eq!(decode_content(b"data: [DONE]"), None);
    }

    #[test]
    fn decode_non_utf8_is_none() {
        assert_eq!(decode_content(&[0xff, 0xfe, 0x00]), None);
    }

    #[test]
    fn error_chunk_carries_finish_reason() {
        let chunk = encode_error_chunk("Error: boom");
        assert_eq!(decode_content(&chunk), Some("Error: boom".to_string()));
        assert_eq!(decode_finish_reason(&chunk), Some(FinishReason::Error));
        assert_eq!(decode_finish_reason(&encode_delta("x")), None);
    }

    #[test]
    fn first_content_handles_missing_shapes() {
        let full: CompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"content":"answer"}}]}"#,
        )
        .unwrap();
        assert_eq!(full.first_content(), "answer");

        let empty: CompletionResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.first_content(), "");

        let no_content: CompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{}}]}"#).unwrap();
        assert_eq!(no_content.first_content(), "");
    }

    #[tokio::test]
    async fn lines_reassembles_split_reads() {
        let reads: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"data: a")),
            Ok(Bytes::from_static(b"bc\r\ndata:")),
            Ok(Bytes::from_static(b" def\n\ntail")),
        ];
        let collected: Vec<_> = lines(stream::iter(reads)).collect().await;
        let lines: Vec<_> = collected.into_iter().map(|l| l.unwrap()).collect();
        assert_eq!(
            lines,
            vec![
                Bytes::from_static(b"data: abc"),
                Bytes::from_static(b"data: def"),
                Bytes::from_static(b"tail"),
            ]
        );
    }

    #[tokio::test]
    async fn lines_forwards_error_once_and_ends() {
        let reads: Vec<Result<Bytes, String>> = vec![
            Ok(Bytes::from_static(b"one\n")),
            Err("broken".to_string()),
            Ok(Bytes::from_static(b"never\n")),
        ];
        let collected: Vec<_> = lines(stream::iter(reads)).collect().await;
        assert_eq!(collected.len(), 2);
        assert_eq!(collected[0].as_ref().unwrap(), &Bytes::from_static(b"one"));
        assert!(collected[1].is_err());
    }
}
