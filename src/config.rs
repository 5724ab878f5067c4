use crate::format::Grouping;
use crate::sanitize::ZeroPolicy;
use serde::Deserialize;
use std::{fs, path::Path};
use toml_edit::{DocumentMut, value};

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_out_dir")]
    pub out_dir: String,
    #[serde(default)]
    pub business: BusinessSection,
    #[serde(default)]
    pub invoice: InvoiceSection,
    #[serde(default)]
    pub display: DisplaySection,
    #[serde(default)]
    pub llm: LlmSection,
}

fn default_db_path() -> String {
    "store/customers.db".to_string()
}

fn default_out_dir() -> String {
    ".".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BusinessSection {
    pub name: String,
    pub address: String,
    pub email: String,
    pub phone: String,
    pub tax_number: String,
    pub bank_details: String,
}

impl Default for BusinessSection {
    fn default() -> Self {
        Self {
            name: "Your Business Name".to_string(),
            address: "City, State, Country".to_string(),
            email: "contact@business.com".to_string(),
            phone: "+1 000 000 0000".to_string(),
            tax_number: "TAX-000000".to_string(),
            bank_details: "SWIFT: BANKCODE\nIBAN: ACCOUNT-NUMBER".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InvoiceSection {
    pub currency: String,
    pub notes: String,
    pub terms: String,
    pub due_days: i64,
    pub number_prefix: String,
    pub zero_policy: ZeroPolicy,
}

impl Default for InvoiceSection {
    fn default() -> Self {
        Self {
            currency: "₹".to_string(),
            notes: "Thank you for your business!".to_string(),
            terms: "Payment is due within 7 days.".to_string(),
            due_days: 7,
            number_prefix: "INV".to_string(),
            zero_policy: ZeroPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DisplaySection {
    pub grouping: Grouping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    Ollama,
    Remote,
    #[default]
    Heuristics,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub backend: LlmBackend,
    pub ollama: EndpointSection,
    pub remote: EndpointSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EndpointSection {
    pub base_url: String,
    pub model: String,
}

impl Default for EndpointSection {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/v1".to_string(),
            model: "qwen3:8b".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            out_dir: default_out_dir(),
            business: BusinessSection::default(),
            invoice: InvoiceSection::default(),
            display: DisplaySection::default(),
            llm: LlmSection::default(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load the file if it exists, otherwise fall back to the built-in template.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Persist one `[business]` key, keeping the rest of the file's layout.
    pub fn update_business_field(
        path: impl AsRef<Path>,
        key: &str,
        new_value: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        let mut doc = content.parse::<DocumentMut>()?;

        if !doc.contains_table("business") {
            doc["business"] = toml_edit::table();
        }
        doc["business"][key] = value(new_value);

        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&path, doc.to_string())?;
        Ok(())
    }
}
