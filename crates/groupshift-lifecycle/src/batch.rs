//! Outcome of a best-effort batch.

use serde::Serialize;

/// An item that was not processed, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skipped {
    pub item: String,
    pub reason: String,
}

/// Per-item result of a batch where one failure never stops the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub succeeded: Vec<String>,
    pub skipped: Vec<Skipped>,
}

impl BatchOutcome {
    pub fn succeed(&mut self, item: impl Into<String>) {
        self.succeeded.push(item.into());
    }

    pub fn skip(&mut self, item: impl Into<String>, reason: impl ToString) {
        self.skipped.push(Skipped {
            item: item.into(),
            reason: reason.to_string(),
        });
    }

    /// No item was skipped.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.skipped.len()
    }

    pub fn was_skipped(&self, item: &str) -> bool {
        self.skipped.iter().any(|s| s.item == item)
    }
}
