use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::FarmStore;
use crate::error::HerdError;
use crate::models::{
    AmuRecord, CallerRole, Drug, HealthRecord, Livestock, MembershipStatus, UsageEvent,
};

/// PostgreSQL-backed store over the tables in `migrations/0001_farm_schema.sql`.
#[derive(Debug, Clone)]
pub struct PgFarmStore {
    pool: PgPool,
}

impl PgFarmStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct AmuRow {
    id: i64,
    health_record_id: i64,
    event_date: DateTime<Utc>,
    dosage: f64,
    unit: String,
    withdrawal_period_days: Option<i32>,
    drug_id: Option<i64>,
    drug_name: Option<String>,
    active_ingredient: Option<String>,
    species_target: Option<String>,
    recommended_dosage_min: Option<f64>,
    recommended_dosage_max: Option<f64>,
    drug_unit: Option<String>,
}

impl From<AmuRow> for AmuRecord {
    fn from(row: AmuRow) -> Self {
        let drug = match (
            row.drug_id,
            row.drug_name,
            row.active_ingredient,
            row.species_target,
            row.recommended_dosage_min,
            row.recommended_dosage_max,
            row.drug_unit,
        ) {
            (Some(id), Some(name), Some(active_ingredient), Some(species_target), Some(min), Some(max), Some(unit)) => {
                Some(Drug {
                    id,
                    name,
                    active_ingredient,
                    species_target,
                    recommended_dosage_min: min,
                    recommended_dosage_max: max,
                    unit,
                })
            }
            _ => None,
        };

        AmuRecord {
            id: row.id,
            health_record_id: row.health_record_id,
            event_date: row.event_date,
            drug,
            dosage: row.dosage,
            unit: row.unit,
            withdrawal_period_days: row.withdrawal_period_days,
        }
    }
}

#[async_trait]
impl FarmStore for PgFarmStore {
    async fn resolve_caller(&self, user_id: i64) -> Result<CallerRole, HerdError> {
        let owned: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM farms WHERE owner_id = $1 ORDER BY id LIMIT 1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        if let Some((farm_id,)) = owned {
            return Ok(CallerRole::Owner { user_id, farm_id });
        }

        let labourer: Option<(Option<i64>, String)> =
            sqlx::query_as("SELECT farm_id, status FROM labourers WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        let role = match labourer {
            Some((farm_id, status)) => match MembershipStatus::parse(&status) {
                Some(status) => CallerRole::Labourer {
                    user_id,
                    farm_id,
                    status,
                },
                None => {
                    tracing::warn!(user_id, status = %status, "Unknown labourer status");
                    CallerRole::Unaffiliated { user_id }
                }
            },
            None => CallerRole::Unaffiliated { user_id },
        };

        Ok(role)
    }

    async fn owned_livestock(
        &self,
        owner_id: i64,
        livestock_id: i64,
    ) -> Result<Option<Livestock>, HerdError> {
        let livestock = sqlx::query_as::<_, Livestock>(
            r#"
            SELECT l.id, l.farm_id, l.tag_number, l.species, l.breed, l.gender,
                   l.current_weight_kg, l.health_status
            FROM livestock l
            JOIN farms f ON f.id = l.farm_id
            WHERE l.id = $1 AND f.owner_id = $2
            "#,
        )
        .bind(livestock_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(livestock)
    }

    async fn usage_events(
        &self,
        livestock_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<UsageEvent>, HerdError> {
        let rows = sqlx::query_as::<_, (i64, DateTime<Utc>, Option<i64>, Option<String>)>(
            r#"
            SELECT a.id, h.event_date, d.id, d.name
            FROM amu_records a
            JOIN health_records h ON h.id = a.health_record_id
            LEFT JOIN drugs d ON d.id = a.drug_id
            WHERE h.livestock_id = $1
              AND h.event_date >= $2
              AND h.event_date <= $3
            ORDER BY h.event_date ASC, a.id ASC
            "#,
        )
        .bind(livestock_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(record_id, occurred_at, drug_id, drug_name)| UsageEvent {
                record_id,
                occurred_at,
                drug_id,
                drug_name,
            })
            .collect())
    }

    async fn recent_health_records(
        &self,
        livestock_id: i64,
        limit: usize,
    ) -> Result<Vec<HealthRecord>, HerdError> {
        let records = sqlx::query_as::<_, HealthRecord>(
            r#"
            SELECT id, livestock_id, event_type, event_date, diagnosis, notes
            FROM health_records
            WHERE livestock_id = $1
            ORDER BY event_date DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(livestock_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn recent_amu_records(
        &self,
        livestock_id: i64,
        limit: usize,
    ) -> Result<Vec<AmuRecord>, HerdError> {
        let rows = sqlx::query_as::<_, AmuRow>(
            r#"
            SELECT a.id, a.health_record_id, h.event_date, a.dosage, a.unit,
                   a.withdrawal_period_days,
                   d.id AS drug_id, d.name AS drug_name, d.active_ingredient,
                   d.species_target, d.recommended_dosage_min, d.recommended_dosage_max,
                   d.unit AS drug_unit
            FROM amu_records a
            JOIN health_records h ON h.id = a.health_record_id
            LEFT JOIN drugs d ON d.id = a.drug_id
            WHERE h.livestock_id = $1
            ORDER BY h.event_date DESC, a.id DESC
            LIMIT $2
            "#,
        )
        .bind(livestock_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AmuRecord::from).collect())
    }

    async fn health_check(&self) -> Result<String, HerdError> {
        Ok(crate::db::health_check(&self.pool).await?)
    }

    fn name(&self) -> &str {
        "postgres"
    }
}

// ============================================================================
// TESTS — require a live PostgreSQL; skipped when unreachable
// ============================================================================
