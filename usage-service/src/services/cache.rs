//! Cache of closed historical months.

use crate::models::MonthSummary;
use chrono::NaiveDate;
use dashmap::DashMap;

/// Identifies one tenant's month as served by one backend endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub endpoint: String,
    pub tenant_id: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
}

/// Store for finalized months. The live month is never cached.
pub trait MonthCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<MonthSummary>;

    /// Insert unless an entry already exists; the first value wins.
    fn insert(&self, key: CacheKey, month: MonthSummary);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct InMemoryMonthCache {
    entries: DashMap<CacheKey, MonthSummary>,
}

impl InMemoryMonthCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MonthCache for InMemoryMonthCache {
    fn get(&self, key: &CacheKey) -> Option<MonthSummary> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn insert(&self, key: CacheKey, month: MonthSummary) {
        self.entries.entry(key).or_insert(month);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
