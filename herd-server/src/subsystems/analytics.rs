//! Analytics subsystem — monthly AMU usage chart for one owned animal
//!
//! Implements `GET /amu-insights/chart-data`:
//! - Only farm owners may read analytics; labourers and unaffiliated users are forbidden
//! - The animal must belong to a farm owned by the caller, otherwise it is not found
//! - Usage events in the trailing window are bucketed per calendar month and
//!   counted per drug display name

use chrono::{DateTime, Utc};
use herd_core::analytics::{aggregate, assemble, known_categories, ChartPayload, UsageWindow};
use herd_core::{CallerRole, FarmStore, HerdError, Livestock};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("You do not have permission to perform this action.")]
    Forbidden,

    #[error("Livestock not found or you don't own it.")]
    LivestockNotFound,

    #[error(transparent)]
    Store(#[from] HerdError),
}

/// Owner id of `caller`, or `Forbidden` for anyone who owns no farm.
pub fn require_owner(caller: &CallerRole) -> Result<i64, AnalyticsError> {
    match caller.owned_farm() {
        Some(_) => Ok(caller.user_id()),
        None => Err(AnalyticsError::Forbidden),
    }
}

/// Animal `livestock_id` if `caller` owns the farm it lives on.
pub async fn authorized_livestock(
    store: &dyn FarmStore,
    caller: &CallerRole,
    livestock_id: i64,
) -> Result<Livestock, AnalyticsError> {
    let owner_id = require_owner(caller)?;

    store
        .owned_livestock(owner_id, livestock_id)
        .await?
        .ok_or(AnalyticsError::LivestockNotFound)
}

/// Build the monthly usage chart for `livestock_id` over the `window_days`
/// days ending at `window_end`.
pub async fn chart_for_livestock(
    store: &dyn FarmStore,
    caller: &CallerRole,
    livestock_id: i64,
    window_end: DateTime<Utc>,
    window_days: u32,
) -> Result<ChartPayload, AnalyticsError> {
    let livestock = authorized_livestock(store, caller, livestock_id).await?;

    let window = UsageWindow::trailing(window_end, window_days);
    let buckets = window.buckets();

    let events = store
        .usage_events(livestock.id, window.start, window.end)
        .await?;

    let categories = known_categories(&events);
    let series = aggregate(&events, &window, &buckets, &categories.names);
    let payload = assemble(&buckets, &series, events.len(), categories.distinct_ids);

    tracing::info!(
        livestock_id,
        user_id = caller.user_id(),
        treatments = payload.summary.total_treatments,
        drugs = payload.summary.unique_drugs,
        months = buckets.len(),
        "Built AMU chart"
    );

    Ok(payload)
}
