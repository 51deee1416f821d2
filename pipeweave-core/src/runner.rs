//! Sequence runner: record once, replay on demand.
//!
//! A pipeline describes its work as an ordered sequence of dependent
//! completion steps. The runner executes the sequence exactly once in
//! buffered mode, recording each step's target and messages, so that the
//! definition can build later prompts from earlier results. If streaming
//! output was requested, the recorded log is then replayed against the
//! backends' streaming calls, forwarding chunks to the consumer as they
//! arrive.
//!
//! The replay deliberately re-issues every backend call: the buffered pass
//! already paid the full latency of each request, and the streaming pass
//! pays it again to obtain chunk-level granularity. That trade-off is kept
//! as-is; deduplicating the calls would require a caching layer this crate
//! does not have.

use crate::backend::{ByteStream, ChatBackend};
use crate::codec;
use crate::pipeline::PipeOutput;
use crate::types::Message;
use futures::StreamExt;
use std::future::Future;
use std::sync::Arc;

/// Where a recorded step is sent during replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Local inference backend
    Local,
    /// Hosted router backend
    Router,
    /// Literal text, streamed without a network round trip
    Synthetic,
}

/// One recorded invocation. Appended in call order, never mutated, and
/// discarded at the end of the `pipe` call.
#[derive(Debug, Clone)]
pub struct Step {
    pub target: Target,
    pub messages: Vec<Message>,
}

/// Mutable recording context handed to a sequence definition.
///
/// Each operation performs (or fakes) a buffered call, appends the step to
/// the log and its text to the result list, and returns the text so the
/// definition can build subsequent steps from it.
pub struct SequenceContext {
    local: Arc<dyn ChatBackend>,
    router: Arc<dyn ChatBackend>,
    steps: Vec<Step>,
    results: Vec<String>,
}

impl SequenceContext {
    fn new(local: Arc<dyn ChatBackend>, router: Arc<dyn ChatBackend>) -> Self {
        Self {
            local,
            router,
            steps: Vec::new(),
            results: Vec::new(),
        }
    }

    /// Buffered call against the local backend.
    pub async fn request(&mut self, messages: Vec<Message>) -> String {
        let text = self.local.complete(&messages, None).await;
        self.record(Target::Local, messages, text)
    }

    /// Buffered call against the router backend.
    pub async fn router_request(&mut self, messages: Vec<Message>) -> String {
        let text = self.router.complete(&messages, None).await;
        self.record(Target::Router, messages, text)
    }

    /// Inject literal text into the output without any backend call.
    ///
    /// During a streaming replay the text is typed out one character per
    /// chunk, matching the feel of generated output.
    pub fn emit_text(&mut self, text: impl Into<String>) -> String {
        let text = text.into();
        self.record(
            Target::Synthetic,
            vec![Message::assistant(text.clone())],
            text,
        )
    }

    /// Number of steps recorded so far.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn record(&mut self, target: Target, messages: Vec<Message>, text: String) -> String {
        tracing::debug!(?target, step = self.steps.len(), "recorded sequence step");
        self.steps.push(Step { target, messages });
        self.results.push(text.clone());
        text
    }
}

/// Executes sequence definitions against a pair of backends.
pub struct SequenceRunner {
    local: Arc<dyn ChatBackend>,
    router: Arc<dyn ChatBackend>,
    default_stream: bool,
}

impl SequenceRunner {
    /// Create a runner. The router target defaults to the same backend as
    /// the local target until `with_router` is called.
    pub fn new(local: Arc<dyn ChatBackend>) -> Self {
        Self {
            router: local.clone(),
            local,
            default_stream: true,
        }
    }

    /// Set the backend used for router-targeted steps.
    pub fn with_router(mut self, router: Arc<dyn ChatBackend>) -> Self {
        self.router = router;
        self
    }

    /// Set the streaming default applied when a request has no preference.
    pub fn with_default_stream(mut self, stream: bool) -> Self {
        self.default_stream = stream;
        self
    }

    /// Run a sequence definition.
    ///
    /// The definition is executed once in buffered mode. With streaming
    /// off the result is the recorded texts joined by newlines. With
    /// streaming on, a lazy stream replays the step log strictly in
    /// order: backend steps re-issue the streaming call with the stored
    /// messages and forward every chunk unchanged; synthetic steps yield
    /// one encoded chunk per character.
    ///
    /// The runner has no error branch: adapter failures already arrived
    /// in-band during the buffered pass and will again during replay.
    pub async fn run<F, Fut>(&self, stream: Option<bool>, define: F) -> PipeOutput
    where
        F: FnOnce(SequenceContext) -> Fut,
        Fut: Future<Output = SequenceContext>,
    {
        let stream = stream.unwrap_or(self.default_stream);
        let ctx = SequenceContext::new(self.local.clone(), self.router.clone());
        let ctx = define(ctx).await;

        if !stream {
            return PipeOutput::Text(ctx.results.join("\n"));
        }

        let steps = ctx.steps;
        let local = self.local.clone();
        let router = self.router.clone();
        let replay: ByteStream = Box::pin(async_stream::stream! {
            for step in steps {
                match step.target {
                    Target::Local | Target::Router => {
                        let backend = if step.target == Target::Local {
                            &local
                        } else {
                            &router
                        };
                        let mut inner = backend.stream(&step.messages, None).await;
                        while let Some(chunk) = inner.next().await {
                            yield chunk;
                        }
                    }
                    Target::Synthetic => {
                        let text = step
                            .messages
                            .first()
                            .map(|m| m.content.clone())
                            .unwrap_or_default();
                        for ch in text.chars() {
                            yield codec::encode_delta(ch.encode_utf8(&mut [0u8; 4]));
                        }
                    }
                }
            }
        });

        PipeOutput::Stream(replay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::collect_content;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;

    /// Records every call and answers from a script.
    #[derive(Debug, Default)]
    struct ScriptedBackend {
        name: String,
        replies: Vec<String>,
        completes: Mutex<Vec<Vec<Message>>>,
        streams: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedBackend {
        fn new(name: &str, replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                replies: replies.iter().map(|r| r.to_string()).collect(),
                completes: Mutex::new(Vec::new()),
                streams: Mutex::new(Vec::new()),
            })
        }

        fn reply_for(&self, call: usize) -> String {
            self.replies
                .get(call % self.replies.len().max(1))
                .cloned()
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        fn name(&self) -> &str {
            &self.name
        }

        async fn complete(&self, messages: &[Message], _model: Option<&str>) -> String {
            let mut calls = self.completes.lock().unwrap();
            let reply = self.reply_for(calls.len());
            calls.push(messages.to_vec());
            reply
        }

        async fn stream(&self, messages: &[Message], _model: Option<&str>) -> ByteStream {
            let reply = {
                let mut calls = self.streams.lock().unwrap();
                let reply = self.reply_for(calls.len());
                calls.push(messages.to_vec());
                reply
            };
            // Two chunks per reply so ordering inside a step is observable.
            let mid = reply.len() / 2;
            let chunks = vec![
                codec::encode_delta(&reply[..mid]),
                codec::encode_delta(&reply[mid..]),
            ];
            Box::pin(futures::stream::iter(chunks))
        }
    }

    async fn collect_chunks(output: PipeOutput) -> Vec<Bytes> {
        match output {
            PipeOutput::Stream(mut s) => {
                let mut chunks = Vec::new();
                while let Some(c) = s.next().await {
                    chunks.push(c);
                }
                chunks
            }
            PipeOutput::Text(t) => panic!("expected stream, got text: {t}"),
        }
    }

    #[tokio::test]
    async fn buffered_output_joins_results_in_call_order() {
        let backend = ScriptedBackend::new("local", &["first", "second"]);
        let runner = SequenceRunner::new(backend.clone());

        let output = runner
            .run(Some(false), |mut ctx| async move {
                let first = ctx.request(vec![Message::user("hi")]).await;
                ctx.request(vec![Message::user(format!("follow up: {first}"))])
                    .await;
                ctx
            })
            .await;

        match output {
            PipeOutput::Text(text) => assert_eq!(text, "first\nsecond"),
            PipeOutput::Stream(_) => panic!("expected buffered text"),
        }
        assert_eq!(backend.completes.lock().unwrap().len(), 2);
        assert!(backend.streams.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn replay_reissues_each_step_with_stored_messages() {
        let backend = ScriptedBackend::new("local", &["alpha", "beta"]);
        let runner = SequenceRunner::new(backend.clone());

        let output = runner
            .run(Some(true), |mut ctx| async move {
                let first = ctx.request(vec![Message::user("hi")]).await;
                ctx.request(vec![Message::user(format!("based on: {first}"))])
                    .await;
                ctx
            })
            .await;

        let chunks = collect_chunks(output).await;
        assert_eq!(chunks.len(), 4);

        let streamed = backend.streams.lock().unwrap();
        let buffered = backend.completes.lock().unwrap();
        assert_eq!(streamed.len(), 2);
        // Replay carries the exact messages of the buffered pass, in order.
        assert_eq!(*streamed, *buffered);
        assert_eq!(streamed[1][0].content, "based on: alpha");
    }

    #[tokio::test]
    async fn synthetic_text_streams_one_chunk_per_character() {
        let backend = ScriptedBackend::new("local", &[]);
        let runner = SequenceRunner::new(backend);

        let output = runner
            .run(Some(true), |mut ctx| async move {
                ctx.emit_text("abc");
                ctx
            })
            .await;

        let chunks = collect_chunks(output).await;
        let deltas: Vec<_> = chunks
            .iter()
            .map(|c| codec::decode_content(c).unwrap())
            .collect();
        assert_eq!(deltas, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn synthetic_text_appears_in_buffered_join() {
        let backend = ScriptedBackend::new("local", &["reply"]);
        let runner = SequenceRunner::new(backend);

        let output = runner
            .run(Some(false), |mut ctx| async move {
                ctx.request(vec![Message::user("q")]).await;
                ctx.emit_text("status note");
                ctx
            })
            .await;

        match output {
            PipeOutput::Text(text) => assert_eq!(text, "reply\nstatus note"),
            PipeOutput::Stream(_) => panic!("expected buffered text"),
        }
    }

    #[tokio::test]
    async fn replay_routes_steps_to_their_recorded_backend() {
        let local = ScriptedBackend::new("local", &["from-local"]);
        let router = ScriptedBackend::new("router", &["from-router"]);
        let runner = SequenceRunner::new(local.clone()).with_router(router.clone());

        let output = runner
            .run(Some(true), |mut ctx| async move {
                ctx.request(vec![Message::user("a")]).await;
                ctx.router_request(vec![Message::user("b")]).await;
                ctx
            })
            .await;

        // Local chunks first, router chunks after, no interleaving.
        let text = collect_content(match output {
            PipeOutput::Stream(s) => s,
            PipeOutput::Text(_) => panic!("expected stream"),
        })
        .await;
        assert_eq!(text, "from-localfrom-router");
        assert_eq!(local.streams.lock().unwrap().len(), 1);
        assert_eq!(router.streams.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn default_stream_flag_applies_when_unset() {
        let backend = ScriptedBackend::new("local", &["r"]);
        let runner = SequenceRunner::new(backend).with_default_stream(false);

        let output = runner
            .run(None, |mut ctx| async move {
                ctx.request(vec![Message::user("q")]).await;
                ctx
            })
            .await;
        assert!(matches!(output, PipeOutput::Text(_)));
    }
}
