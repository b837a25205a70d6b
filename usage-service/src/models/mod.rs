//! Domain models for usage-service.

mod bill_item;
mod breakdown;
mod category;
mod credits;
mod month_summary;
mod usage_line;

pub use bill_item::BillItem;
pub use breakdown::RegionBreakdown;
pub use category::{Category, SKU_CATEGORIES};
pub use credits::{Credit, CreditsResponse};
pub use month_summary::{InvoiceStatus, MonthSummary};
pub use usage_line::{UsageLine, ALL_REGIONS};
