// src/sanitize.rs

use serde::Deserialize;

/// What happens to a quantity or rate still at zero once editing ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroPolicy {
    /// Zero is only a transient typing state; a finished edit becomes 1.
    #[default]
    ResetToOne,
    /// Zero is a legitimate permanent value (free items).
    Keep,
}

/// Largest quantity or rate accepted; larger input is capped here so that
/// line totals and their sum stay finite.
pub const MAX_INPUT: f64 = 1e12;

/// Coerce raw keystroke input while the field is still being edited.
///
/// Empty, unparsable, non-finite and negative input all become `0.0`
/// so the line total can always be recomputed.
pub fn during_edit(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => v.min(MAX_INPUT),
        _ => 0.0,
    }
}

/// Normalize a numeric field once its edit is complete.
pub fn on_edit_complete(value: f64, policy: ZeroPolicy) -> f64 {
    match policy {
        ZeroPolicy::ResetToOne if value == 0.0 => 1.0,
        _ => value,
    }
}
