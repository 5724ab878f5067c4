use crate::assistant::ParsedInvoice;
use crate::config::{BusinessSection, InvoiceSection};
use crate::customer_db::{Customer, CustomerDirectory};
use crate::ledger::Ledger;
use serde::Serialize;
use std::str::FromStr;
use thiserror::Error;
use time::macros::format_description;
use time::{Date, Duration};
use tracing::info;

#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("invalid date '{value}', expected YYYY-MM-DD")]
    InvalidDate { value: String },

    #[error("{0} cannot be cleared")]
    Required(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessInfo {
    pub name: String,
    pub address: String,
    pub email: String,
    pub phone: String,
    pub tax_number: String,
    pub bank_details: String,
}

impl From<&BusinessSection> for BusinessInfo {
    fn from(b: &BusinessSection) -> Self {
        Self {
            name: b.name.clone(),
            address: b.address.clone(),
            email: b.email.clone(),
            phone: b.phone.clone(),
            tax_number: b.tax_number.clone(),
            bank_details: b.bank_details.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusinessField {
    Name,
    Address,
    Email,
    Phone,
    TaxNumber,
    BankDetails,
}

impl BusinessField {
    /// Key used for this field in the `[business]` config table.
    pub fn config_key(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Address => "address",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::TaxNumber => "tax_number",
            Self::BankDetails => "bank_details",
        }
    }
}

impl FromStr for BusinessField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "address" => Ok(Self::Address),
            "email" => Ok(Self::Email),
            "phone" => Ok(Self::Phone),
            "tax" | "tax_number" => Ok(Self::TaxNumber),
            "bank" | "bank_details" => Ok(Self::BankDetails),
            other => Err(format!("unknown business field '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderField {
    CustomerName,
    CustomerAddress,
    CustomerTaxNumber,
    Date,
    DeliveryDate,
    DueDate,
    InvoiceNumber,
    Currency,
    Notes,
    Terms,
}

impl FromStr for HeaderField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "customer" | "customer_name" => Ok(Self::CustomerName),
            "address" | "customer_address" => Ok(Self::CustomerAddress),
            "tax" | "customer_tax" => Ok(Self::CustomerTaxNumber),
            "date" => Ok(Self::Date),
            "delivery" | "delivery_date" => Ok(Self::DeliveryDate),
            "due" | "due_date" => Ok(Self::DueDate),
            "number" | "invoice_number" => Ok(Self::InvoiceNumber),
            "currency" => Ok(Self::Currency),
            "notes" => Ok(Self::Notes),
            "terms" => Ok(Self::Terms),
            other => Err(format!("unknown header field '{other}'")),
        }
    }
}

/// The one invoice being edited.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub business_info: BusinessInfo,
    pub customer_name: String,
    pub customer_address: String,
    pub customer_tax_number: String,
    pub date: Date,
    pub delivery_date: Option<Date>,
    pub due_date: Option<Date>,
    pub invoice_number: String,
    items: Ledger,
    pub currency: String,
    pub notes: String,
    pub terms: String,
}

impl Invoice {
    /// Fresh invoice from the configured template, dated `today`.
    pub fn from_template(business: &BusinessSection, defaults: &InvoiceSection, today: Date) -> Self {
        Self::with_ledger(business, defaults, today, Ledger::seeded(defaults.zero_policy))
    }

    pub(crate) fn with_ledger(
        business: &BusinessSection,
        defaults: &InvoiceSection,
        today: Date,
        items: Ledger,
    ) -> Self {
        Self {
            business_info: BusinessInfo::from(business),
            customer_name: "Customer Name".to_string(),
            customer_address: "Customer Address".to_string(),
            customer_tax_number: String::new(),
            date: today,
            delivery_date: Some(today),
            due_date: due_after(today, defaults.due_days),
            invoice_number: format!("{}-{}-001", defaults.number_prefix, today.year()),
            items,
            currency: defaults.currency.clone(),
            notes: defaults.notes.clone(),
            terms: defaults.terms.clone(),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.items
    }

    pub fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.items
    }

    pub fn grand_total(&self) -> f64 {
        self.items.grand_total()
    }

    /// Edit a header field. A rejected value leaves the invoice untouched.
    pub fn set_header(&mut self, field: HeaderField, value: &str) -> Result<(), HeaderError> {
        match field {
            HeaderField::CustomerName => self.customer_name = value.to_string(),
            HeaderField::CustomerAddress => self.customer_address = value.to_string(),
            HeaderField::CustomerTaxNumber => self.customer_tax_number = value.to_string(),
            HeaderField::InvoiceNumber => self.invoice_number = value.to_string(),
            HeaderField::Currency => self.currency = value.to_string(),
            HeaderField::Notes => self.notes = value.to_string(),
            HeaderField::Terms => self.terms = value.to_string(),
            HeaderField::Date => {
                self.date = parse_date(value)?.ok_or(HeaderError::Required("date"))?;
            }
            HeaderField::DeliveryDate => self.delivery_date = parse_date(value)?,
            HeaderField::DueDate => self.due_date = parse_date(value)?,
        }
        Ok(())
    }

    pub fn set_business(&mut self, field: BusinessField, value: &str) {
        let slot = match field {
            BusinessField::Name => &mut self.business_info.name,
            BusinessField::Address => &mut self.business_info.address,
            BusinessField::Email => &mut self.business_info.email,
            BusinessField::Phone => &mut self.business_info.phone,
            BusinessField::TaxNumber => &mut self.business_info.tax_number,
            BusinessField::BankDetails => &mut self.business_info.bank_details,
        };
        *slot = value.to_string();
    }

    /// Copy a directory entry into the customer fields.
    pub fn apply_customer(&mut self, customer: &Customer) {
        self.customer_name = customer.name.clone();
        self.customer_address = customer.address.clone().unwrap_or_default();
        self.customer_tax_number = customer.tax_number.clone().unwrap_or_default();
        info!(id = %customer.id, name = %customer.name, "Customer applied");
    }

    /// Merge an assistant result: name if present, known-customer details,
    /// and a wholesale item replacement when any items were found.
    pub fn apply_parsed(&mut self, parsed: &ParsedInvoice, directory: &CustomerDirectory) {
        let name = parsed
            .customer_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());

        if let Some(name) = name {
            self.customer_name = name.to_string();
            if let Some(known) = directory.find_by_name(name) {
                if let Some(address) = known.address.as_deref().filter(|a| !a.is_empty()) {
                    self.customer_address = address.to_string();
                }
                if let Some(tax) = known.tax_number.as_deref().filter(|t| !t.is_empty()) {
                    self.customer_tax_number = tax.to_string();
                }
            }
        }

        self.items.replace_items(&parsed.items);
    }
}

/// `today + days`, or no due date when that is not a representable date.
fn due_after(today: Date, days: i64) -> Option<Date> {
    days.checked_mul(86_400)
        .map(Duration::seconds)
        .and_then(|offset| today.checked_add(offset))
}

fn parse_date(value: &str) -> Result<Option<Date>, HeaderError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .map(Some)
        .map_err(|_| HeaderError::InvalidDate {
            value: value.to_string(),
        })
}
