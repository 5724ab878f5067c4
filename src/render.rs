use crate::format::{Grouping, format_amount};
use crate::invoice::Invoice;
use std::fmt;
use std::str::FromStr;

/// Paper colour scheme handed to a rasterizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Background as RGB.
    pub fn background(self) -> [u8; 3] {
        match self {
            Self::Light => [0xff, 0xff, 0xff],
            Self::Dark => [0x0f, 0x17, 0x2a],
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("unknown theme '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Party {
    pub heading: &'static str,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub position: usize,
    pub description: String,
    pub sub_description: String,
    pub quantity: String,
    pub rate: String,
    pub amount: String,
}

/// Everything printed on the invoice paper, already formatted.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentView {
    pub title: String,
    pub invoice_number: String,
    pub dates: Vec<(&'static str, String)>,
    pub from: Party,
    pub to: Party,
    pub rows: Vec<Row>,
    pub total_line: String,
    pub notes: String,
    pub terms: String,
    pub bank_details: String,
}

impl DocumentView {
    pub fn build(invoice: &Invoice, grouping: Grouping) -> Self {
        let mut dates = vec![("Date", invoice.date.to_string())];
        if let Some(d) = invoice.delivery_date {
            dates.push(("Delivery", d.to_string()));
        }
        if let Some(d) = invoice.due_date {
            dates.push(("Due", d.to_string()));
        }

        let b = &invoice.business_info;
        let from = Party {
            heading: "From",
            lines: non_empty([
                b.name.clone(),
                b.address.clone(),
                b.email.clone(),
                b.phone.clone(),
                labelled("Tax No", &b.tax_number),
            ]),
        };
        let to = Party {
            heading: "Bill To",
            lines: non_empty([
                invoice.customer_name.clone(),
                invoice.customer_address.clone(),
                labelled("Tax No", &invoice.customer_tax_number),
            ]),
        };

        let rows = invoice
            .ledger()
            .items()
            .iter()
            .enumerate()
            .map(|(idx, item)| Row {
                position: idx + 1,
                description: if item.description.is_empty() {
                    "New Product".to_string()
                } else {
                    item.description.clone()
                },
                sub_description: item.sub_description.clone(),
                quantity: if item.unit.is_empty() {
                    trim_number(item.quantity)
                } else {
                    format!("{} {}", trim_number(item.quantity), item.unit)
                },
                rate: format_amount(item.rate, grouping),
                amount: format_amount(item.total, grouping),
            })
            .collect();

        Self {
            title: "INVOICE".to_string(),
            invoice_number: invoice.invoice_number.clone(),
            dates,
            from,
            to,
            rows,
            total_line: format!(
                "{} {}",
                invoice.currency,
                format_amount(invoice.grand_total(), grouping)
            ),
            notes: invoice.notes.clone(),
            terms: invoice.terms.clone(),
            bank_details: b.bank_details.clone(),
        }
    }

    /// Plain text lines, top to bottom, used by the console and the text PDF.
    pub fn lines(&self) -> Vec<String> {
        let mut out = vec![format!("{}  #{}", self.title, self.invoice_number)];
        out.extend(self.dates.iter().map(|(k, v)| format!("{k}: {v}")));
        out.push(String::new());
        for party in [&self.from, &self.to] {
            out.push(format!("{}:", party.heading));
            out.extend(party.lines.iter().map(|l| format!("  {l}")));
        }
        out.push(String::new());
        out.push(format!(
            "{:<4}{:<32}{:>10}{:>14}{:>16}",
            "#", "Description", "Qty", "Rate", "Amount"
        ));
        for row in &self.rows {
            out.push(format!(
                "{:<4}{:<32}{:>10}{:>14}{:>16}",
                row.position, row.description, row.quantity, row.rate, row.amount
            ));
            if !row.sub_description.is_empty() {
                out.push(format!("    {}", row.sub_description));
            }
        }
        out.push(String::new());
        out.push(format!("Total: {}", self.total_line));
        for (heading, body) in [
            ("Notes", &self.notes),
            ("Terms", &self.terms),
            ("Bank", &self.bank_details),
        ] {
            if !body.is_empty() {
                out.push(String::new());
                out.push(format!("{heading}:"));
                out.extend(body.lines().map(|l| format!("  {l}")));
            }
        }
        out
    }
}

impl fmt::Display for DocumentView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

fn non_empty<const N: usize>(lines: [String; N]) -> Vec<String> {
    lines.into_iter().filter(|l| !l.trim().is_empty()).collect()
}

fn labelled(label: &str, value: &str) -> String {
    if value.trim().is_empty() {
        String::new()
    } else {
        format!("{label}: {value}")
    }
}

/// `5` rather than `5.0`, but keep real fractions.
fn trim_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}
