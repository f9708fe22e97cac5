//! Record store — read access to farms, livestock and their records
//!
//! [`FarmStore`] is the seam the analytics and insight services read through:
//! - **postgres** — [`PgFarmStore`], sqlx over the farm schema
//! - **memory** — [`MemoryFarmStore`], in-process records for tests and local runs

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::HerdError;
use crate::models::{AmuRecord, CallerRole, HealthRecord, Livestock, UsageEvent};

pub use memory::MemoryFarmStore;
pub use postgres::PgFarmStore;

#[async_trait]
pub trait FarmStore: Send + Sync {
    /// Resolve the role of `user_id`: farm owner, labourer, or neither.
    async fn resolve_caller(&self, user_id: i64) -> Result<CallerRole, HerdError>;

    /// Livestock `livestock_id`, only if it belongs to a farm owned by `owner_id`.
    async fn owned_livestock(
        &self,
        owner_id: i64,
        livestock_id: i64,
    ) -> Result<Option<Livestock>, HerdError>;

    /// AMU events for one animal with `start <= event_date <= end`, oldest first.
    async fn usage_events(
        &self,
        livestock_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<UsageEvent>, HerdError>;

    /// Newest health records first, at most `limit`.
    async fn recent_health_records(
        &self,
        livestock_id: i64,
        limit: usize,
    ) -> Result<Vec<HealthRecord>, HerdError>;

    /// Newest AMU records first, at most `limit`, with their drug attached.
    async fn recent_amu_records(
        &self,
        livestock_id: i64,
        limit: usize,
    ) -> Result<Vec<AmuRecord>, HerdError>;

    /// Backend version string for health reporting.
    async fn health_check(&self) -> Result<String, HerdError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}
