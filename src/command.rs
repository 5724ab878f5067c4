use crate::customer_db::NewCustomer;
use crate::invoice::{BusinessField, HeaderField};
use crate::ledger::{ItemField, NumericField};
use crate::render::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Pdf,
}

/// One console line, parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Show,
    Json,
    Add,
    Remove(String),
    SetItem { id: String, field: ItemField, value: String },
    FinishEdit { id: String, field: NumericField },
    Header { field: HeaderField, value: String },
    Business { field: BusinessField, value: String },
    Ask(String),
    Dictate,
    Customers,
    AddCustomer(NewCustomer),
    PickCustomer(String),
    Theme(Theme),
    Export(ExportFormat),
    Share,
    Help,
    Quit,
}

pub const HELP: &str = "\
show                          print the invoice
json                          print the invoice as JSON
add                           append a blank line item
rm <id>                       remove a line item
set <id> <field> <value>      edit desc|sub|qty|rate|unit of an item
done <id> qty|rate            finish editing a numeric field
header <field> <value>        customer|address|tax|date|delivery|due|number|currency|notes|terms
business <field> <value>      name|address|email|phone|tax|bank (saved to config)
ask <request>                 fill the invoice from a plain-language request
dictate                       capture the request by voice
customers                     list saved customers
customer add name=<n> [email=..] [address=..] [phone=..] [tax=..]
customer pick <id>            copy a saved customer onto the invoice
theme light|dark
export png|pdf
share
quit";

const CUSTOMER_KEYS: [&str; 5] = ["name", "email", "address", "phone", "tax"];

/// Parse a console line. Blank lines are not commands.
pub fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (verb, rest) = split_word(line);

    match verb.to_ascii_lowercase().as_str() {
        "" => Err("empty command".to_string()),
        "show" | "view" => Ok(Command::Show),
        "json" => Ok(Command::Json),
        "add" => Ok(Command::Add),
        "rm" | "remove" => Ok(Command::Remove(required(rest, "rm <id>")?.to_string())),
        "set" => {
            let (id, rest) = split_word(rest);
            let (field, value) = split_word(rest);
            if id.is_empty() || field.is_empty() {
                return Err("usage: set <id> <field> <value>".to_string());
            }
            Ok(Command::SetItem {
                id: id.to_string(),
                field: field.parse()?,
                value: value.to_string(),
            })
        }
        "done" => {
            let (id, field) = split_word(rest);
            if id.is_empty() || field.is_empty() {
                return Err("usage: done <id> qty|rate".to_string());
            }
            Ok(Command::FinishEdit {
                id: id.to_string(),
                field: field.parse()?,
            })
        }
        "header" => {
            let (field, value) = split_word(rest);
            Ok(Command::Header {
                field: required(field, "header <field> <value>")?.parse()?,
                value: value.to_string(),
            })
        }
        "business" => {
            let (field, value) = split_word(rest);
            Ok(Command::Business {
                field: required(field, "business <field> <value>")?.parse()?,
                value: value.to_string(),
            })
        }
        "ask" => Ok(Command::Ask(rest.to_string())),
        "dictate" => Ok(Command::Dictate),
        "customers" => Ok(Command::Customers),
        "customer" => {
            let (sub, rest) = split_word(rest);
            match sub {
                "add" => Ok(Command::AddCustomer(parse_customer(rest)?)),
                "pick" => Ok(Command::PickCustomer(
                    required(rest, "customer pick <id>")?.to_string(),
                )),
                _ => Err("usage: customer add ... | customer pick <id>".to_string()),
            }
        }
        "theme" => Ok(Command::Theme(required(rest, "theme light|dark")?.parse()?)),
        "export" => match rest.to_ascii_lowercase().as_str() {
            "png" => Ok(Command::Export(ExportFormat::Png)),
            "pdf" => Ok(Command::Export(ExportFormat::Pdf)),
            _ => Err("usage: export png|pdf".to_string()),
        },
        "share" => Ok(Command::Share),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(format!("unknown command '{other}', try 'help'")),
    }
}

fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.split_once(char::is_whitespace) {
        Some((head, tail)) => (head, tail.trim()),
        None => (s, ""),
    }
}

fn required<'a>(s: &'a str, usage: &str) -> Result<&'a str, String> {
    let s = s.trim();
    if s.is_empty() {
        Err(format!("usage: {usage}"))
    } else {
        Ok(s)
    }
}

/// `key=value` pairs; a value runs until the next known key.
fn parse_customer(rest: &str) -> Result<NewCustomer, String> {
    let mut pairs: Vec<(&str, String)> = Vec::new();
    for word in rest.split_whitespace() {
        if let Some((k, v)) = word.split_once('=').filter(|(k, _)| CUSTOMER_KEYS.contains(k)) {
            pairs.push((k, v.to_string()));
            continue;
        }
        let Some((_, value)) = pairs.last_mut() else {
            return Err(format!("expected key=value, got '{word}'"));
        };
        value.push(' ');
        value.push_str(word);
    }

    let mut customer = NewCustomer::default();
    for (key, value) in pairs {
        let value = value.trim().to_string();
        match key {
            "name" => customer.name = value,
            "email" => customer.email = Some(value),
            "address" => customer.address = Some(value),
            "phone" => customer.phone = Some(value),
            _ => customer.tax_number = Some(value),
        }
    }
    Ok(customer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_verbs() {
        assert_eq!(parse("show"), Ok(Command::Show));
        assert_eq!(parse("  QUIT "), Ok(Command::Quit));
        assert_eq!(parse("export pdf"), Ok(Command::Export(ExportFormat::Pdf)));
        assert_eq!(parse("theme dark"), Ok(Command::Theme(Theme::Dark)));
        assert!(parse("").is_err());
        assert!(parse("frobnicate").is_err());
        assert!(parse("export gif").is_err());
    }

    #[test]
    fn test_item_edits() {
        assert_eq!(
            parse("set a1b2 desc Portland cement"),
            Ok(Command::SetItem {
                id: "a1b2".to_string(),
                field: ItemField::Description,
                value: "Portland cement".to_string(),
            })
        );
        assert_eq!(
            parse("set a1b2 rate"),
            Ok(Command::SetItem {
                id: "a1b2".to_string(),
                field: ItemField::Rate,
                value: String::new(),
            })
        );
        assert_eq!(
            parse("done a1b2 qty"),
            Ok(Command::FinishEdit {
                id: "a1b2".to_string(),
                field: NumericField::Quantity,
            })
        );
        assert!(parse("set a1b2").is_err());
        assert!(parse("done a1b2 desc").is_err());
        assert!(parse("rm").is_err());
    }

    #[test]
    fn test_header_and_business() {
        assert_eq!(
            parse("header due 2026-11-01"),
            Ok(Command::Header {
                field: HeaderField::DueDate,
                value: "2026-11-01".to_string(),
            })
        );
        assert_eq!(
            parse("business name Acme Traders"),
            Ok(Command::Business {
                field: BusinessField::Name,
                value: "Acme Traders".to_string(),
            })
        );
        assert!(parse("header colour red").is_err());
    }

    #[test]
    fn test_ask_keeps_whole_request() {
        assert_eq!(
            parse("ask Charge Alex for 5 bags of cement at 450 each"),
            Ok(Command::Ask(
                "Charge Alex for 5 bags of cement at 450 each".to_string()
            ))
        );
    }

    #[test]
    fn test_customer_add_pairs() {
        let Ok(Command::AddCustomer(c)) =
            parse("customer add name=Ravi Kumar address=12 MG Road, Pune tax=GST-9")
        else {
            panic!("expected customer add");
        };
        assert_eq!(c.name, "Ravi Kumar");
        assert_eq!(c.address.as_deref(), Some("12 MG Road, Pune"));
        assert_eq!(c.tax_number.as_deref(), Some("GST-9"));
        assert_eq!(c.email, None);

        assert!(parse("customer add Ravi").is_err());
        assert_eq!(
            parse("customer pick c42"),
            Ok(Command::PickCustomer("c42".to_string()))
        );
    }
}
