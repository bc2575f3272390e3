// src/report/store.rs
use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use super::{Report, ReportStatus};
use crate::analysis::UrgencyLevel;

/// Listing cap for `find` (newest first).
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Optional equality filters; `None` means "any".
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub category: Option<String>,
    pub status: Option<ReportStatus>,
    pub urgency_level: Option<UrgencyLevel>,
}

impl ReportFilter {
    fn matches(&self, r: &Report) -> bool {
        self.category
            .as_deref()
            .map_or(true, |c| c.eq_ignore_ascii_case(&r.category))
            && self.status.map_or(true, |s| s == r.status)
            && self.urgency_level.map_or(true, |u| u == r.urgency_level)
    }
}

/// Document-store seam. The real store (ids, indexes, geo queries) lives outside this crate.
#[async_trait::async_trait]
pub trait ReportStore: Send + Sync {
    /// Persist a new report; the store assigns `id`.
    async fn insert(&self, report: Report) -> Result<Report>;
    /// Matching reports, newest first, at most `DEFAULT_LIST_LIMIT`.
    async fn find(&self, filter: &ReportFilter) -> Result<Vec<Report>>;
}

/// In-memory store for tests and the demo binary.
#[derive(Debug, Default)]
pub struct MemoryReportStore {
    inner: Mutex<Vec<Report>>,
    next_id: AtomicU64,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl ReportStore for MemoryReportStore {
    async fn insert(&self, mut report: Report) -> Result<Report> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        report.id = format!("rpt-{n:06}");
        let mut v = self
            .inner
            .lock()
            .map_err(|_| anyhow!("report store mutex poisoned"))?;
        v.push(report.clone());
        Ok(report)
    }

    async fn find(&self, filter: &ReportFilter) -> Result<Vec<Report>> {
        let v = self
            .inner
            .lock()
            .map_err(|_| anyhow!("report store mutex poisoned"))?;
        // Insertion order is creation order, so reverse iteration is newest first.
        Ok(v.iter()
            .rev()
            .filter(|r| filter.matches(r))
            .take(DEFAULT_LIST_LIMIT)
            .cloned()
            .collect())
    }
}
