//! Text truncation.
//!
//! Printers clip text that runs past the label edge at an unpredictable
//! point. Text fields are cut to a character budget instead, with an
//! ellipsis marker so the cut is visible. The budget is a character count,
//! not a measured width.

use serde::{Deserialize, Serialize};

/// Default characters per text field
pub const DEFAULT_BUDGET: usize = 30;

/// Default marker appended to truncated text
pub const DEFAULT_ELLIPSIS: &str = "...";

/// Character-count truncation policy for text fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruncationPolicy {
    /// Characters allowed when an element has no budget of its own.
    /// Zero disables truncation.
    pub default_budget: usize,
    /// Marker appended to cut text.
    pub ellipsis: String,
}

impl Default for TruncationPolicy {
    fn default() -> Self {
        Self {
            default_budget: DEFAULT_BUDGET,
            ellipsis: DEFAULT_ELLIPSIS.to_string(),
        }
    }
}

impl TruncationPolicy {
    /// Policy that never truncates.
    pub fn disabled() -> Self {
        Self {
            default_budget: 0,
            ..Self::default()
        }
    }

    /// Apply the policy to `text`, with an optional per-field budget.
    ///
    /// ```
    /// use etiqueta::codegen::TruncationPolicy;
    ///
    /// let policy = TruncationPolicy::default();
    /// assert_eq!(policy.apply("short", None), "short");
    /// assert_eq!(policy.apply("ABCDEFGHIJ", Some(8)), "ABCDE...");
    /// ```
    pub fn apply(&self, text: &str, budget: Option<usize>) -> String {
        let budget = budget.unwrap_or(self.default_budget);
        let len = text.chars().count();
        if budget == 0 || len <= budget {
            return text.to_string();
        }

        let marker_len = self.ellipsis.chars().count();
        if budget <= marker_len {
            return text.chars().take(budget).collect();
        }

        let mut out: String = text.chars().take(budget - marker_len).collect();
        out.push_str(&self.ellipsis);
        out
    }
}

// ============================================================================
// TESTS
// ============================================================================
