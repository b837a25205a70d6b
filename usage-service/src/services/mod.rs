pub mod cache;
pub mod calendar;
pub mod dedupe;
pub mod discount;
pub mod history;
pub mod merger;
pub mod metrics;
pub mod normalizer;

pub use cache::{CacheKey, InMemoryMonthCache, MonthCache};
pub use history::HistoryAssembler;
