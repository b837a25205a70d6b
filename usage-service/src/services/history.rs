//! Twelve-month cost history: eleven closed months plus the live month.

use crate::client::{BackendError, InvoicePayload, RatingBackend, RegionDirectory};
use crate::error::UsageError;
use crate::models::{BillItem, Category, CreditsResponse, InvoiceStatus, MonthSummary, UsageLine};
use crate::services::cache::{CacheKey, MonthCache};
use crate::services::calendar::{coverage_windows, MonthWindow};
use crate::services::dedupe::remove_excess_shared_cost;
use crate::services::discount::apply_free_tier;
use crate::services::merger::{merge_regions, RegionalUsage};
use crate::services::metrics::{record_cache_lookup, record_cost_computation, record_integrity_skip};
use crate::services::normalizer::usage_line;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_MAX_CONCURRENCY: usize = 12;

/// Assembles a tenant's cost history from the rating backend.
#[derive(Clone)]
pub struct HistoryAssembler {
    backend: Arc<dyn RatingBackend>,
    regions: Arc<dyn RegionDirectory>,
    cache: Option<Arc<dyn MonthCache>>,
    max_concurrency: usize,
}

impl HistoryAssembler {
    pub fn new(backend: Arc<dyn RatingBackend>, regions: Arc<dyn RegionDirectory>) -> Self {
        Self {
            backend,
            regions,
            cache: None,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn MonthCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Cost history as of the current instant.
    pub async fn get_cost(&self, tenant_id: &str) -> Result<Vec<MonthSummary>, UsageError> {
        self.compute_history(tenant_id, Utc::now()).await
    }

    /// Build the twelve month slots, oldest first, for the month of `now`.
    ///
    /// Any backend failure aborts the whole computation; partial histories
    /// are never returned.
    #[instrument(skip(self))]
    pub async fn compute_history(
        &self,
        tenant_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<MonthSummary>, UsageError> {
        let windows = coverage_windows(now.date_naive());
        let Some((current, closed)) = windows.split_last() else {
            return Ok(Vec::new());
        };

        let result = tokio::try_join!(
            self.closed_months(tenant_id, closed),
            self.live_month(tenant_id, *current, now),
        );

        match result {
            Ok((mut months, live)) => {
                months.push(live);
                record_cost_computation(tenant_id, "success");
                info!(months = months.len(), "Cost history assembled");
                Ok(months)
            }
            Err(err) => {
                record_cost_computation(tenant_id, err.kind());
                warn!(error = %err, "Cost history failed");
                Err(err)
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn get_credits(&self, tenant_id: &str) -> Result<CreditsResponse, UsageError> {
        Ok(self.backend.list_credits(tenant_id).await?)
    }

    fn cache_key(&self, tenant_id: &str, window: &MonthWindow) -> CacheKey {
        CacheKey {
            endpoint: self.backend.endpoint().to_string(),
            tenant_id: tenant_id.to_string(),
            period_start: window.start,
            period_end: window.end,
        }
    }

    fn cached(&self, tenant_id: &str, window: &MonthWindow) -> Option<MonthSummary> {
        let cache = self.cache.as_ref()?;
        let hit = cache.get(&self.cache_key(tenant_id, window));
        record_cache_lookup(hit.is_some());
        hit
    }

    /// Closed months in window order. Served entirely from cache when every
    /// month is present; otherwise the whole span is fetched in one call.
    async fn closed_months(
        &self,
        tenant_id: &str,
        windows: &[MonthWindow],
    ) -> Result<Vec<MonthSummary>, UsageError> {
        let mut months: Vec<Option<MonthSummary>> = windows
            .iter()
            .map(|window| self.cached(tenant_id, window))
            .collect();

        if months.iter().all(Option::is_some) {
            debug!(months = months.len(), "Closed months served from cache");
            return Ok(months.into_iter().flatten().collect());
        }

        let (Some(first), Some(last)) = (windows.first(), windows.last()) else {
            return Ok(Vec::new());
        };
        let invoices = self
            .backend
            .list_invoices(tenant_id, first.start, last.end, true)
            .await?;

        let mut by_month: HashMap<(i32, u32), (NaiveDate, InvoicePayload)> = HashMap::new();
        for (key, invoice) in invoices {
            match parse_invoice_date(&key) {
                Some(date) => {
                    by_month.insert((date.year(), date.month()), (date, invoice));
                }
                None => {
                    warn!(invoice_date = %key, "Ignoring invoice with unparseable date");
                    record_integrity_skip("invoice_date");
                }
            }
        }

        for (slot, window) in months.iter_mut().zip(windows) {
            if slot.is_some() {
                continue;
            }
            let summary = match by_month.remove(&window.key()) {
                Some((date, invoice)) => {
                    let summary = summarize_invoice(date, invoice);
                    if let Some(cache) = &self.cache {
                        cache.insert(self.cache_key(tenant_id, window), summary.clone());
                    }
                    summary
                }
                None => {
                    debug!(period = %window.start, "No invoice for period");
                    MonthSummary::empty(window.start)
                }
            };
            *slot = Some(summary);
        }

        if !by_month.is_empty() {
            debug!(unmatched = by_month.len(), "Invoices outside the coverage window ignored");
        }

        Ok(months.into_iter().flatten().collect())
    }

    /// Live month: merge every region's quotation, remove the shared-storage
    /// overcount, then apply the free tier.
    async fn live_month(
        &self,
        tenant_id: &str,
        window: MonthWindow,
        now: DateTime<Utc>,
    ) -> Result<MonthSummary, UsageError> {
        let today = now.date_naive();
        let regions = self.regions.list_regions().await?;
        if regions.is_empty() {
            warn!("Region directory returned no regions");
            return Ok(MonthSummary::empty(today));
        }

        let backend = Arc::clone(&self.backend);
        let tenant = tenant_id.to_string();
        let quotations: Vec<(String, BTreeMap<String, InvoicePayload>)> = stream::iter(regions)
            .map(move |region| {
                let backend = Arc::clone(&backend);
                let tenant = tenant.clone();
                async move {
                    let quotations = backend.list_quotations(&tenant, &region, today).await?;
                    Ok::<_, BackendError>((region, quotations))
                }
            })
            .buffered(self.max_concurrency)
            .try_collect()
            .await?;

        let regional: Vec<RegionalUsage> = quotations
            .into_iter()
            .filter_map(|(region, quotations)| match select_quotation(quotations, today, &window) {
                Some(payload) => Some(RegionalUsage { region, payload }),
                None => {
                    warn!(region = %region, "No quotation for the current period");
                    record_integrity_skip("missing_quotation");
                    None
                }
            })
            .collect();

        if regional.is_empty() {
            return Ok(MonthSummary::empty(today));
        }

        let region_count = regional.len();
        let merged = merge_regions(&regional);
        let deduped = remove_excess_shared_cost(merged, region_count);
        let discounted = apply_free_tier(deduped, now);

        debug!(regions = region_count, total = %discounted.total_cost, "Live month computed");
        Ok(MonthSummary::from_breakdown(
            today,
            Some(InvoiceStatus::Open),
            discounted,
        ))
    }
}

/// Accepts `YYYY-MM-DD` optionally followed by a time component.
pub fn parse_invoice_date(raw: &str) -> Option<NaiveDate> {
    let date = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Quotation keyed by today, otherwise the latest one dated inside `window`.
fn select_quotation(
    mut quotations: BTreeMap<String, InvoicePayload>,
    today: NaiveDate,
    window: &MonthWindow,
) -> Option<InvoicePayload> {
    if let Some(payload) = quotations.remove(&today.format("%Y-%m-%d").to_string()) {
        return Some(payload);
    }
    quotations
        .into_iter()
        .rev()
        .find(|(key, _)| {
            parse_invoice_date(key).is_some_and(|date| date >= window.start && date < window.end)
        })
        .map(|(_, payload)| payload)
}

/// A closed month exactly as the backend invoiced it.
///
/// Totals are copied verbatim. Invoice-level discounts appear only in the
/// details; the breakdown keeps non-negative categories. Unrecognised
/// categories are dropped from the breakdown but still counted in the
/// reported total.
pub fn summarize_invoice(date: NaiveDate, invoice: InvoicePayload) -> MonthSummary {
    let mut summary = MonthSummary::empty(date);
    summary.total_cost = invoice.total_cost;
    summary.status = invoice.status.as_deref().map(InvoiceStatus::from_string);

    for (reported, category_payload) in invoice.details {
        let resolved = Category::from_reported(&reported).or_else(|| {
            category_payload
                .breakdown
                .keys()
                .find_map(|product| Category::from_product(product))
        });
        let Some(category) = resolved else {
            warn!(%date, category = %reported, "Dropping unrecognised invoice category");
            record_integrity_skip("unknown_category");
            continue;
        };

        let lines: Vec<UsageLine> = category_payload
            .breakdown
            .iter()
            .flat_map(|(product, lines)| {
                lines.iter().map(move |line| usage_line(product, line, None))
            })
            .collect();

        if category == Category::Discounts {
            summary.details.entry(category).or_default().extend(lines);
            continue;
        }

        let next_id = summary.breakdown.len() as u32 + 1;
        let item = summary
            .breakdown
            .entry(category)
            .or_insert_with(|| BillItem::new(next_id, category));
        *item = item.adjusted(lines.len() as i64, category_payload.total_cost);
        summary.details.entry(category).or_default().extend(lines);
    }

    summary
}
