//! Tenant cost and credit endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{CreditsView, MonthSummaryView},
    AppState,
};

/// Twelve months of cost, oldest first, the live month last.
pub async fn get_cost(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Result<Json<Vec<MonthSummaryView>>, AppError> {
    tracing::info!(tenant_id = %tenant_id, "Fetching cost history");

    let months = state.assembler.get_cost(&tenant_id).await?;

    Ok(Json(months.iter().map(MonthSummaryView::from).collect()))
}

pub async fn get_credits(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Result<Json<CreditsView>, AppError> {
    tracing::info!(tenant_id = %tenant_id, "Fetching credits");

    let credits = state.assembler.get_credits(&tenant_id).await?;

    Ok(Json(CreditsView::from(credits)))
}
