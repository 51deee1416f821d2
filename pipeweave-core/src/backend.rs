//! Backend seam: the trait all chat-completion backends implement.
//!
//! A backend performs one conversation-completion call in buffered or
//! streaming mode. Failures never cross this boundary as errors: buffered
//! calls return an `"Error: <description>"` string in place of the text,
//! streaming calls return a one-chunk synthetic error stream. Callers can
//! therefore chain results and iterate streams without an error branch.

use crate::codec;
use crate::types::Message;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::pin::Pin;

/// Forward-only, single-pass stream of wire chunks. Infallible by
/// construction: in-band error chunks stand in for failures.
pub type ByteStream = Pin<Box<dyn Stream<Item = Bytes> + Send>>;

/// A chat-completion backend.
#[async_trait]
pub trait ChatBackend: Send + Sync + 'static {
    /// Backend identifier used in logs
    fn name(&self) -> &str;

    /// Buffered call: one request, full text of the first completion
    /// choice. Returns `"Error: <description>"` on any failure.
    async fn complete(&self, messages: &[Message], model: Option<&str>) -> String;

    /// Streaming call: one request, live sequence of wire chunks. Never
    /// fails; a failure is a single synthetic error chunk.
    async fn stream(&self, messages: &[Message], model: Option<&str>) -> ByteStream;
}

/// A one-chunk stream carrying a synthetic error chunk.
pub fn error_stream(message: &str) -> ByteStream {
    let chunk = codec::encode_error_chunk(message);
    Box::pin(futures::stream::once(async move { chunk }))
}

/// Drain a chunk stream, concatenating the decoded text deltas.
pub async fn collect_content(mut stream: ByteStream) -> String {
    let mut content = String::new();
    while let Some(chunk) = stream.next().await {
        if let Some(delta) = codec::decode_content(&chunk) {
            content.push_str(&delta);
        }
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn error_stream_is_single_error_chunk() {
        let mut stream = error_stream("Error: unreachable");
        let first = stream.next().await.expect("one chunk");
        assert_eq!(
            codec::decode_content(&first),
            Some("Error: unreachable".to_string())
        );
        assert_eq!(
            codec::decode_finish_reason(&first),
            Some(crate::types::FinishReason::Error)
        );
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn collect_content_concatenates_deltas() {
        let chunks = vec![
            codec::encode_delta("he"),
            Bytes::from_static(b"not json"),
            codec::encode_delta("llo"),
        ];
        let stream: ByteStream = Box::pin(futures::stream::iter(chunks));
        assert_eq!(collect_content(stream).await, "hello");
    }
}
