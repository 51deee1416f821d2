//! Basic usage example using the pipeweave meta crate.
//!
//! This demonstrates:
//! 1. Buffered pipeline output (all backend calls collected into one text)
//! 2. Streaming pipeline output (the same sequence replayed as wire chunks)
//! 3. Mixing a local inference server with a hosted router
//!
//! Requires an Ollama server; set OLLAMA_URL if it is not on the default
//! address. Set OPENROUTER_API_KEY to run the dual-backend example.

use pipeweave::backend::{OllamaBackend, OllamaSettings};
use pipeweave::pipeline::{ChatPipeline, DualBackendPipeline};
use pipeweave::prelude::*;
use std::sync::Arc;
use tokio_stream::StreamExt;

fn request(message: &str, stream: bool) -> PipeRequest {
    let body = PipeBody {
        stream: Some(stream),
        ..Default::default()
    };
    PipeRequest::new(message, "qwen2.5:latest", vec![Message::user(message)], body)
}

async fn print_output(output: PipeOutput) {
    match output {
        PipeOutput::Text(text) => println!("{text}"),
        PipeOutput::Stream(mut chunks) => {
            while let Some(chunk) = chunks.next().await {
                if let Some(delta) = pipeweave::codec::decode_content(&chunk) {
                    print!("{delta}");
                }
            }
            println!();
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let mut settings = OllamaSettings::default();
    if let Ok(url) = std::env::var("OLLAMA_URL") {
        settings.base_url = url;
    }
    let local: Arc<dyn ChatBackend> = Arc::new(OllamaBackend::new(settings));

    // Example 1: buffered output. Both backend calls run up front and the
    // results come back joined into one text.
    println!("=== Example 1: Buffered ===");
    let chat = ChatPipeline::new(local.clone());
    let req = request("Compare NT5AD512M16C4 against our catalog", false);
    print_output(run_pipe(&chat, req).await).await;

    // Example 2: the same pipeline streamed. The recorded sequence is
    // replayed step by step as OpenAI-style chunks.
    println!("\n=== Example 2: Streaming ===");
    let req = request("Compare NT5AD512M16C4 against our catalog", true);
    print_output(run_pipe(&chat, req).await).await;

    // Example 3: dual backend. The comparison runs locally, the review is
    // delegated to a hosted router.
    if let Ok(api_key) = std::env::var("OPENROUTER_API_KEY") {
        println!("\n=== Example 3: Dual backend ===");
        let router: Arc<dyn ChatBackend> = Arc::new(pipeweave::backend::openrouter(api_key));
        let dual = DualBackendPipeline::new(local, router);
        let req = request("Compare NT5AD512M16C4 against our catalog", true);
        print_output(run_pipe(&dual, req).await).await;
    }
}
