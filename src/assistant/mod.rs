// src/assistant/mod.rs

mod heuristic;
mod llm;

pub use heuristic::HeuristicParser;
pub use llm::LlmParser;

use crate::config::{LlmBackend, LlmSection};
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

/// A single item the assistant pulled out of free text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedItem {
    pub description: String,
    #[serde(default)]
    pub sub_description: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub rate: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
}

/// Best-effort partial invoice read from a billing request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedInvoice {
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub items: Vec<ParsedItem>,
}

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Turns a free-text billing request into structured line items.
#[async_trait]
pub trait InvoiceParser: Send + Sync {
    async fn parse(&self, text: &str) -> Result<ParsedInvoice, AssistantError>;

    /// Short label for logs.
    fn name(&self) -> &str;
}

/// Pick the parser the config asks for, falling back to heuristics when a
/// local model server is not running.
pub async fn build_parser(llm: &LlmSection) -> Result<Box<dyn InvoiceParser>, AssistantError> {
    match llm.backend {
        LlmBackend::Heuristics => {
            info!("Using heuristic parser");
            Ok(Box::new(HeuristicParser::new()))
        }
        LlmBackend::Ollama => {
            let parser = LlmParser::new(&llm.ollama.base_url, &llm.ollama.model, "ollama");
            if parser.check_health().await {
                Ok(Box::new(parser))
            } else {
                warn!(
                    url = %llm.ollama.base_url,
                    "Ollama is not reachable, falling back to heuristics"
                );
                Ok(Box::new(HeuristicParser::new()))
            }
        }
        LlmBackend::Remote => {
            let api_key = std::env::var("LLM_API_KEY").map_err(|_| {
                AssistantError::Unavailable(
                    "LLM_API_KEY env var required for remote backend".to_string(),
                )
            })?;
            Ok(Box::new(LlmParser::new(
                &llm.remote.base_url,
                &llm.remote.model,
                &api_key,
            )))
        }
    }
}
