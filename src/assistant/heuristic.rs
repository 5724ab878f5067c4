// src/assistant/heuristic.rs

use super::{AssistantError, InvoiceParser, ParsedInvoice, ParsedItem};
use async_trait::async_trait;
use regex::{Captures, Regex};
use tracing::debug;

/// Offline parser built from keyword-anchored regexes.
///
/// It understands requests shaped like
/// `Charge Alex for 5 bags of cement at 450 each and 2 trucks of sand at 3000`.
pub struct HeuristicParser {
    customer_re: Regex,
    grouped_number_re: Regex,
    clause_split_re: Regex,
    item_re: Regex,
}

impl HeuristicParser {
    pub fn new() -> Self {
        Self {
            // Capitalized name right after a billing verb or "to".
            customer_re: Regex::new(
                r"(?:(?i:charge|bill|invoice)|\bto)\s+([A-Z][\w.'-]*(?:\s+[A-Z][\w.'-]*)*)",
            )
            .expect("static regex"),
            // 1,200 / 1,00,000 / 12,500.50
            grouped_number_re: Regex::new(r"\b\d{1,3}(?:,\d{2,3})+(?:\.\d+)?\b")
                .expect("static regex"),
            clause_split_re: Regex::new(r"(?i)\s*(?:,|;|\band\b|\bplus\b)\s*")
                .expect("static regex"),
            // qty [unit of] description [at|@ [currency] rate] [each|per ...] [given to ...]
            item_re: Regex::new(
                r"(?i)(\d+(?:\.\d+)?)\s+(?:([a-z]+)\s+of\s+)?([a-z][a-z\s-]*?)\s*(?:(?:at|@|for)\s*(?:rs\.?|inr|usd|eur|\$|₹|€|£)?\s*(\d+(?:\.\d+)?))?(?:\s*(?:each|apiece|per\s+\w+))?(?:\s+(?:given|sold|delivered|supplied)\s+to\b.*)?\s*$",
            )
            .expect("static regex"),
        }
    }

    fn extract(&self, text: &str) -> ParsedInvoice {
        let customer_name = self
            .customer_re
            .captures(text)
            .map(|c| c[1].trim().to_string());

        let ungrouped = self
            .grouped_number_re
            .replace_all(text, |c: &Captures| c[0].replace(',', ""));
        let items = self
            .clause_split_re
            .split(&ungrouped)
            .filter_map(|clause| self.extract_item(clause))
            .collect();

        ParsedInvoice {
            customer_name,
            items,
        }
    }

    fn extract_item(&self, clause: &str) -> Option<ParsedItem> {
        let cap = self.item_re.captures(clause.trim())?;
        let quantity = cap[1].parse::<f64>().ok();
        let unit = cap.get(2).map(|m| m.as_str().to_lowercase());
        let description = capitalize(cap[3].trim());
        let rate = cap.get(4).and_then(|m| m.as_str().parse::<f64>().ok());

        if description.is_empty() {
            return None;
        }
        debug!(%description, ?quantity, ?rate, ?unit, "Heuristic item");
        Some(ParsedItem {
            description,
            sub_description: None,
            quantity,
            rate,
            unit,
        })
    }
}

impl Default for HeuristicParser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InvoiceParser for HeuristicParser {
    async fn parse(&self, text: &str) -> Result<ParsedInvoice, AssistantError> {
        Ok(self.extract(text))
    }

    fn name(&self) -> &str {
        "heuristics"
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
