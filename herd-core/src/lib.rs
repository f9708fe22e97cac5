pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod insights;
pub mod models;
pub mod store;

pub use analytics::{
    aggregate, assemble, build_monthly_buckets, color_for, CategorySeries, ChartPayload,
    MonthBucket, UsageWindow,
};
pub use config::HerdConfig;
pub use error::HerdError;
pub use insights::{
    compose_prompt, generate_insight, ChatCompletionClient, CompletionBackend, InsightError,
};
pub use models::{AmuRecord, CallerRole, Drug, HealthRecord, Livestock, MembershipStatus, UsageEvent};
pub use store::{FarmStore, MemoryFarmStore, PgFarmStore};
