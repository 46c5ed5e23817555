//! Invocation options for a single sync run

use serde::{Deserialize, Serialize};

/// Who started a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    /// A person asked for it; always a complete reconciliation
    Manual,
    /// The scheduler fired; incremental when a watermark exists
    Scheduled,
}

impl SyncTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncTrigger::Manual => "manual",
            SyncTrigger::Scheduled => "scheduled",
        }
    }
}

impl std::fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options accepted by `run_sync`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub trigger: SyncTrigger,

    /// Explicit parent contracts to scope a contract-line sync
    pub parent_ids: Vec<String>,

    /// Only parents synced within the last N months (30-day months)
    pub recent_parent_months: Option<u32>,

    /// Start the resume window here instead of at the stored offset
    pub resume_offset: Option<usize>,

    /// Size of the resume window
    pub page_size: Option<usize>,

    /// Delete every local record of the kind and reinsert the remote set
    pub full_sync: bool,

    /// Classify and report without writing anything
    pub dry_run: bool,
}

impl SyncOptions {
    pub fn manual() -> Self {
        Self {
            trigger: SyncTrigger::Manual,
            parent_ids: Vec::new(),
            recent_parent_months: None,
            resume_offset: None,
            page_size: None,
            full_sync: false,
            dry_run: false,
        }
    }

    pub fn scheduled() -> Self {
        Self {
            trigger: SyncTrigger::Scheduled,
            ..Self::manual()
        }
    }

    pub fn with_parent_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parent_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_recent_parent_months(mut self, months: u32) -> Self {
        self.recent_parent_months = Some(months);
        self
    }

    pub fn with_resume_offset(mut self, offset: usize) -> Self {
        self.resume_offset = Some(offset);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn full_sync(mut self) -> Self {
        self.full_sync = true;
        self
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Whether children are fetched one parent at a time
    pub fn uses_parent_scope(&self) -> bool {
        !self.parent_ids.is_empty() || self.recent_parent_months.is_some()
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::manual()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let options = SyncOptions::scheduled()
            .with_parent_ids(["12", "13"])
            .with_page_size(100)
            .dry_run();

        assert_eq!(options.trigger, SyncTrigger::Scheduled);
        assert_eq!(options.parent_ids, vec!["12".to_string(), "13".to_string()]);
        assert_eq!(options.page_size, Some(100));
        assert!(options.dry_run);
        assert!(!options.full_sync);
        assert!(options.uses_parent_scope());
    }

    #[test]
    fn test_parent_scope() {
        assert!(!SyncOptions::manual().uses_parent_scope());
        assert!(SyncOptions::manual()
            .with_recent_parent_months(3)
            .uses_parent_scope());
    }
}
