// src/assistant/llm.rs

use super::{AssistantError, InvoiceParser, ParsedInvoice};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Instructions that pin the model to the billing-request schema.
const SYSTEM_PROMPT: &str = r#"You turn short billing requests into invoice data.
Find the customer being billed and every good or service they are charged for.

Return ONLY a JSON object with this shape:
{
  "customerName": "string or null",
  "items": [
    {
      "description": "string",
      "quantity": number,
      "rate": number,
      "unit": "string or null",
      "subDescription": "string or null"
    }
  ]
}

Rules:
- Phrases like "goods given to him" still describe items to bill.
- A missing quantity is 1. A missing rate is 1.
- Keep descriptions short and clean: "2 apples" is description "Apples", quantity 2.
- The customer is the person receiving the bill.
- No markdown fences, no commentary."#;

/// Hard cap on user text sent upstream.
const MAX_INPUT_CHARS: usize = 4_000;

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Parser backed by an OpenAI-compatible `/chat/completions` endpoint.
pub struct LlmParser {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl LlmParser {
    pub fn new(base_url: &str, model: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Probe the server root (Ollama answers there, not under `/v1`).
    pub async fn check_health(&self) -> bool {
        let health_url = self.base_url.trim_end_matches("/v1");

        match self
            .client
            .get(health_url)
            .timeout(Duration::from_secs(3))
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                info!(url = %health_url, "Model server is reachable");
                true
            }
            Ok(resp) => {
                warn!(status = %resp.status(), "Model server returned non-OK status");
                false
            }
            Err(e) => {
                warn!(error = %e, "Model server not reachable");
                false
            }
        }
    }
}

#[async_trait]
impl InvoiceParser for LlmParser {
    async fn parse(&self, text: &str) -> Result<ParsedInvoice, AssistantError> {
        let text = truncate_chars(text, MAX_INPUT_CHARS);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: format!("Billing request: \"{text}\""),
                },
            ],
            temperature: 0.0,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::Api { status, body });
        }

        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or_default();

        let parsed = interpret_reply(content);
        info!(
            model = %self.model,
            customer = ?parsed.customer_name,
            items = parsed.items.len(),
            "LLM parse result"
        );
        Ok(parsed)
    }

    fn name(&self) -> &str {
        "llm"
    }
}

/// Read the model's reply as a `ParsedInvoice`; anything unusable is empty.
fn interpret_reply(content: &str) -> ParsedInvoice {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        warn!("Empty reply from LLM");
        return ParsedInvoice::default();
    }

    let unfenced = trimmed
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let Some(json_str) = extract_json_object(unfenced) else {
        warn!(raw = %trimmed, "No JSON object in LLM reply");
        return ParsedInvoice::default();
    };

    match serde_json::from_str(json_str) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, raw = %json_str, "Failed to parse LLM reply");
            ParsedInvoice::default()
        }
    }
}

/// Outermost `{...}` in a reply that may carry reasoning text around it.
fn extract_json_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let end = s.rfind('}')?;
    (end > start).then(|| &s[start..=end])
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
