//! Insight subsystem — narrative AMU analysis for one owned animal
//!
//! Implements `POST /amu-insights/generate`. Access rules match the analytics
//! subsystem. Once access is granted the response is always text: provider
//! failures come back as a readable error message, not as an error status.

use herd_core::insights::{compose_prompt, generate_insight, CompletionBackend, RECENT_RECORD_LIMIT};
use herd_core::{CallerRole, FarmStore};

use super::analytics::{authorized_livestock, AnalyticsError};

/// Compose a prompt from the animal and its latest records and hand it to
/// `backend`.
pub async fn insights_for_livestock(
    store: &dyn FarmStore,
    backend: &dyn CompletionBackend,
    caller: &CallerRole,
    livestock_id: i64,
) -> Result<String, AnalyticsError> {
    let livestock = authorized_livestock(store, caller, livestock_id).await?;

    let health = store
        .recent_health_records(livestock.id, RECENT_RECORD_LIMIT)
        .await?;
    let amu = store
        .recent_amu_records(livestock.id, RECENT_RECORD_LIMIT)
        .await?;

    let prompt = compose_prompt(&livestock, &health, &amu);

    tracing::info!(
        livestock_id,
        health_records = health.len(),
        amu_records = amu.len(),
        backend = backend.name(),
        "Requesting AMU insights"
    );

    Ok(generate_insight(backend, &prompt).await)
}
