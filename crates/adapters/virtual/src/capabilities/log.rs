//! Log: records the fact it receives.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::de::IgnoredAny;

use relay_app::ports::{HandlerContext, JsonReaction};
use relay_domain::capability::CapabilityInfo;
use relay_domain::error::HandlerError;

/// Facts kept by a default [`LogBook`].
const DEFAULT_LOG_CAPACITY: usize = 100;

/// Shared list of the most recently logged facts; older ones are dropped.
#[derive(Debug, Clone)]
pub struct LogBook {
    entries: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl Default for LogBook {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl LogBook {
    /// Book keeping at most `capacity` facts (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Snapshot of the retained facts, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    fn push(&self, fact: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(fact.to_string());
    }
}

/// Emits the fact as a log line and appends it to a [`LogBook`].
#[derive(Debug, Clone)]
pub struct Log {
    book: LogBook,
}

impl Log {
    #[must_use]
    pub fn new(book: LogBook) -> Self {
        Self { book }
    }
}

#[async_trait]
impl JsonReaction for Log {
    type Options = IgnoredAny;

    fn info(&self) -> CapabilityInfo {
        CapabilityInfo::new("Log", "Logs the fact")
    }

    async fn execute(
        &self,
        ctx: &HandlerContext,
        _options: IgnoredAny,
        fact: &str,
    ) -> Result<String, HandlerError> {
        tracing::info!(unit_id = %ctx.unit_id, fact, "virtual log");
        self.book.push(fact);
        Ok(format!("logged: {fact}"))
    }
}
