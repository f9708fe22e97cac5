use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::drug::Drug;

/// A general health event for one animal (checkup, illness, treatment...).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct HealthRecord {
    pub id: i64,
    pub livestock_id: i64,
    pub event_type: String,
    pub event_date: DateTime<Utc>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
}

/// An antimicrobial administration, attached to a health record.
///
/// `event_date` is the parent health record's timestamp; it drives both
/// monthly bucketing and recency ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmuRecord {
    pub id: i64,
    pub health_record_id: i64,
    pub event_date: DateTime<Utc>,
    pub drug: Option<Drug>,
    pub dosage: f64,
    pub unit: String,
    pub withdrawal_period_days: Option<i32>,
}

/// Projection of an [`AmuRecord`] consumed by the usage aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageEvent {
    pub record_id: i64,
    pub occurred_at: DateTime<Utc>,
    pub drug_id: Option<i64>,
    pub drug_name: Option<String>,
}

impl From<&AmuRecord> for UsageEvent {
    fn from(record: &AmuRecord) -> Self {
        Self {
            record_id: record.id,
            occurred_at: record.event_date,
            drug_id: record.drug.as_ref().map(|d| d.id),
            drug_name: record.drug.as_ref().map(|d| d.name.clone()),
        }
    }
}
