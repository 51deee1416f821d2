//! Search-augmented part-number lookup pipeline.
//!
//! Always streams. Given a competitor's DRAM part number as the user
//! message, it runs five attribute searches, summarizes the findings with
//! the local backend, asks the model to translate the summary into a
//! tagged `get_filtered_products` call, filters the catalog through the
//! host-supplied selector, then decodes and matches the candidates in two
//! further completions. Every backend response is forwarded to the caller
//! while its content is accumulated for the next stage; search and
//! selector failures degrade the output instead of aborting it.

use async_trait::async_trait;
use pipeweave_core::backend::ByteStream;
use pipeweave_core::{codec, ChatBackend, Message, PipeError, PipeOutput, PipeRequest, Pipeline};
use pipeweave_search::SearchClient;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_stream::StreamExt;

use crate::live::{TITLE_PROBE_PREFIX, TITLE_REPLY};

/// Product attributes searched for a part number, in query order.
const SEARCH_ATTRIBUTES: [&str; 5] = [
    "ddr type",
    "operation voltage",
    "density",
    "operating temperature",
    "max frequency",
];

/// Host-supplied catalog filter. Receives the parameters extracted from
/// the model's tagged function call.
#[async_trait]
pub trait ProductSelector: Send + Sync {
    async fn filtered_products(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<Vec<String>, PipeError>;
}

pub struct PartLookupPipeline {
    local: Arc<dyn ChatBackend>,
    search: SearchClient,
    selector: Arc<dyn ProductSelector>,
    model: Option<String>,
}

impl PartLookupPipeline {
    pub fn new(
        local: Arc<dyn ChatBackend>,
        search: SearchClient,
        selector: Arc<dyn ProductSelector>,
    ) -> Self {
        Self {
            local,
            search,
            selector,
            model: None,
        }
    }

    /// Override the backend's configured model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

#[async_trait]
impl Pipeline for PartLookupPipeline {
    fn name(&self) -> &str {
        "part-lookup"
    }

    async fn pipe(&self, req: PipeRequest) -> Result<PipeOutput, PipeError> {
        if req.user_message.starts_with(TITLE_PROBE_PREFIX) {
            return Ok(PipeOutput::Text(TITLE_REPLY.to_string()));
        }

        let part_number = req.user_message.trim().to_string();
        let local = self.local.clone();
        let search = self.search.clone();
        let selector = self.selector.clone();
        let model = self.model.clone();

        let output: ByteStream = Box::pin(async_stream::stream! {
            yield codec::encode_delta(&format!(
                "## Processing part number: {part_number}\n\n\
                 Performing web search to gather information..."
            ));
            yield codec::encode_delta("\n\n### Starting web searches...\n");

            let queries: Vec<String> = SEARCH_ATTRIBUTES
                .iter()
                .map(|attr| format!("{part_number} {attr}"))
                .collect();

            let mut hits = Vec::new();
            for query in &queries {
                yield codec::encode_delta(&format!("\n- Searching for: '{query}'"));
                let outcome = search.search_with_retry(query).await;
                if outcome.exhausted {
                    yield codec::encode_delta(&format!(
                        "\n  - All {} attempts failed for '{query}'",
                        outcome.attempts
                    ));
                } else {
                    yield codec::encode_delta(&format!(
                        "\n  - Found {} results for '{query}'",
                        outcome.hits.len()
                    ));
                }
                hits.extend(outcome.hits);
            }
            yield codec::encode_delta("\n\n### Search completed. Analyzing information...\n\n");

            let hits_json = serde_json::to_string(&hits).unwrap_or_default();

            // Stage 1: summarize the search results.
            let mut summary = String::new();
            let summary_messages = vec![Message::user(summary_prompt(&part_number, &hits_json))];
            let mut stream = local.stream(&summary_messages, model.as_deref()).await;
            while let Some(chunk) = stream.next().await {
                if let Some(delta) = codec::decode_content(&chunk) {
                    summary.push_str(&delta);
                }
                yield chunk;
            }
            yield codec::encode_delta(&format!(
                "\n\n### Summary of search results:\n\n{summary}\n\n"
            ));

            // Stage 2: extract selector parameters from the summary.
            let mut params_response = String::new();
            let params_messages = vec![Message::user(extraction_prompt(&part_number, &summary))];
            let mut stream = local.stream(&params_messages, model.as_deref()).await;
            while let Some(chunk) = stream.next().await {
                if let Some(delta) = codec::decode_content(&chunk) {
                    params_response.push_str(&delta);
                }
                yield chunk;
            }

            let params = extract_function_call(&params_response);
            tracing::debug!(?params, "extracted selector parameters");

            let products = match selector.filtered_products(&params).await {
                Ok(products) => products,
                Err(e) => {
                    tracing::warn!(error = %e, "product selector failed");
                    yield codec::encode_delta(&format!("\n\nError: {e}\n\n"));
                    Vec::new()
                }
            };
            yield codec::encode_delta(&format!(
                "\n\n### Found {} potential matching products\n\n\
                 Decoding product information...\n\n",
                products.len()
            ));

            // Stage 3: decode the candidate products.
            let mut decoded = String::new();
            let decode_messages = vec![Message::user(decode_prompt(&summary, &products))];
            let mut stream = local.stream(&decode_messages, model.as_deref()).await;
            while let Some(chunk) = stream.next().await {
                if let Some(delta) = codec::decode_content(&chunk) {
                    decoded.push_str(&delta);
                }
                yield chunk;
            }

            // Stage 4: pick the best match.
            let match_messages =
                vec![Message::user(match_prompt(&part_number, &summary, &decoded))];
            let mut stream = local.stream(&match_messages, model.as_deref()).await;
            while let Some(chunk) = stream.next().await {
                yield chunk;
            }
        });

        Ok(PipeOutput::Stream(output))
    }
}

/// Pull the parameters out of the last `<get_filtered_products>` block in
/// the model's response. Both quote styles are accepted; anything that
/// fails to match yields an empty map.
fn extract_function_call(response: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let Ok(block_re) =
        Regex::new(r"(?s)<get_filtered_products>(.*?)</get_filtered_products>")
    else {
        return params;
    };
    let Some(block) = block_re
        .captures_iter(response)
        .last()
        .and_then(|caps| caps.get(1))
    else {
        return params;
    };
    let Ok(param_re) = Regex::new(r#"(\w+)=["']([^"']*)["']"#) else {
        return params;
    };
    for caps in param_re.captures_iter(block.as_str().trim()) {
        params.insert(caps[1].to_string(), caps[2].to_string());
    }
    params
}

fn summary_prompt(part_number: &str, hits_json: &str) -> String {
    format!(
        "User query: {part_number}\n\n\
         Web search results: {hits_json}\n\n\
         Summarize the web search results to satisfy the user query in a \
         detailed way. Do not include any other knowledge, just the search \
         results. Speed/frequency should be shown in Hz, not bps."
    )
}

fn extraction_prompt(part_number: &str, summary: &str) -> String {
    format!(
        "You are an assistant specialized in parsing memory component \
         specifications and translating them into function parameters. Read \
         the search summary, extract key parameters such as DDR type, \
         voltage, and density, and map them to arguments of the \
         get_filtered_products function.\n\n\
         User query for the search: {part_number}\n\n\
         Search summary: {summary}\n\n\
         The arguments of get_filtered_products are:\n\
         get_filtered_products(\n\
         \x20   type_of_ddr=\"SDRAM\", # one of: \"SDRAM\", \"DDR SDRAM\", \
         \"DDR II SDRAM\", \"DDR3 SDRAM or DDR3(L) SDRAM\", \"DDR4 SDRAM\", \
         \"PSRAM\", \"Mobile SDRAM\", \"Mobile DDR SDRAM\", \"LPDDR SDRAM\", \
         \"LPDDR2 SDRAM\", \"LPDDR3 SDRAM\", \"LPDDR4X SDRAM or \
         LPDDR4/LPDDR4X SDRAM\"\n\
         \x20   Operation_Voltage=\"D\", # one of: \"L\" (3.3V), \"S\" (2.5V), \
         \"F\" (1.5V), \"T\" (1.35V), \"U\" (1.2V), \"D\"/\"Y\"/\"Z\" (1.8V \
         variants)\n\
         \x20   Density=\"64Mb\" # one of: \"8Mb\" through \"16Gb\"\n\
         )\n\n\
         If the summary does not contain the information for an argument, \
         leave that argument out.\n\n\
         First print your chain of thought, then print the \
         get_filtered_products call between <get_filtered_products> and \
         </get_filtered_products> tags."
    )
}

fn decode_prompt(summary: &str, products: &[String]) -> String {
    format!(
        "This is the golden target to be matched:\n{summary}\n\n\
         These are the candidate products:\n{products:?}\n\n\
         #### DRAM naming pattern\n\
         `<Category> <Product Family> <Operation Voltage> <Density> \
         <I/O Pin Number> <Address>`\n\n\
         Category: M (DRAM). Product family: 12 SDRAM, 52 LP SDRAM, 13 DDR, \
         53 LPDDR, 14 DDR2, 54 LPDDR2, 15 DDR3, 55 LPDDR3, 16 DDR4, 56 \
         LPDDR4/4X. Operation voltage: L 3.3V, S 2.5V, F 1.5V, T 1.35V, U \
         1.2V, D/Y/Z 1.8V variants. Density: 8 through 16G. I/O pins: 8, 16, \
         32. Address: 512Kb through 512Mb.\n\n\
         Decode each candidate product by the naming pattern and include all \
         of its features. Show the decoded result for every candidate \
         product id in JSON format."
    )
}

fn match_prompt(part_number: &str, summary: &str, decoded: &str) -> String {
    format!(
        "You are an assistant specialized in matching memory component \
         specifications to a golden target.\n\n\
         Original user query for the golden target: <query>{part_number}</query>\n\n\
         Golden target description:\n\
         <golden_target_description>{summary}</golden_target_description>\n\n\
         Decoded candidate products:\n<candidate>{decoded}</candidate>\n\n\
         Rules:\n\
         - A stated clock speed is the golden target's max frequency.\n\
         - A candidate's temperature range may be wider than the target's \
         but must contain it.\n\
         - Only select candidates that fully meet the required max \
         frequency. 1600 MHz equals 1.6 GHz.\n\n\
         Show a markdown table comparing every feature of each candidate \
         against the golden target, giving the reason before the verdict in \
         each cell. Then name the best match product_id and analyze why."
    )
}
