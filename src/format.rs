use serde::Deserialize;

/// Digit grouping used when printing amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grouping {
    /// Lakh/crore style: `12,34,567.89`.
    #[default]
    Indian,
    /// Thousands style: `1,234,567.89`.
    Western,
}

/// Round to two decimals and insert group separators.
///
/// Only the printed text is rounded; callers keep the full-precision value.
pub fn format_amount(value: f64, grouping: Grouping) -> String {
    if !value.is_finite() {
        return "n/a".to_string();
    }
    let fixed = format!("{:.2}", value.abs());
    let (int_part, dec_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let grouped = group_digits(int_part, grouping);
    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{dec_part}")
}

fn group_digits(digits: &str, grouping: Grouping) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let step = match grouping {
        Grouping::Indian => 2,
        Grouping::Western => 3,
    };

    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(step);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();
    format!("{},{tail}", groups.join(","))
}
