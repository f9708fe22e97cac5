use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::FarmStore;
use crate::error::HerdError;
use crate::models::{
    AmuRecord, CallerRole, HealthRecord, Livestock, MembershipStatus, UsageEvent,
};

#[derive(Debug, Default)]
struct Records {
    /// (farm id, owner user id)
    farms: Vec<(i64, i64)>,
    /// (user id, farm id, status)
    labourers: Vec<(i64, Option<i64>, MembershipStatus)>,
    livestock: Vec<Livestock>,
    health: Vec<HealthRecord>,
    amu: Vec<AmuRecord>,
}

impl Records {
    fn health_record(&self, id: i64) -> Option<&HealthRecord> {
        self.health.iter().find(|h| h.id == id)
    }

    /// AMU records of one animal, each stamped with its health record's date.
    fn amu_for(&self, livestock_id: i64) -> Vec<AmuRecord> {
        self.amu
            .iter()
            .filter_map(|a| {
                let parent = self.health_record(a.health_record_id)?;
                (parent.livestock_id == livestock_id).then(|| AmuRecord {
                    event_date: parent.event_date,
                    ..a.clone()
                })
            })
            .collect()
    }
}

/// In-process store. AMU records are joined to animals through their health
/// record, like the relational schema.
#[derive(Debug, Default)]
pub struct MemoryFarmStore {
    records: RwLock<Records>,
}

impl MemoryFarmStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Records> {
        self.records.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Records> {
        self.records.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_farm(&self, farm_id: i64, owner_id: i64) {
        self.write().farms.push((farm_id, owner_id));
    }

    pub fn add_labourer(&self, user_id: i64, farm_id: Option<i64>, status: MembershipStatus) {
        self.write().labourers.push((user_id, farm_id, status));
    }

    pub fn add_livestock(&self, livestock: Livestock) {
        self.write().livestock.push(livestock);
    }

    pub fn add_health_record(&self, record: HealthRecord) {
        self.write().health.push(record);
    }

    pub fn add_amu_record(&self, record: AmuRecord) {
        self.write().amu.push(record);
    }
}

#[async_trait]
impl FarmStore for MemoryFarmStore {
    async fn resolve_caller(&self, user_id: i64) -> Result<CallerRole, HerdError> {
        let records = self.read();

        let owned = records
            .farms
            .iter()
            .filter(|(_, owner)| *owner == user_id)
            .map(|(farm_id, _)| *farm_id)
            .min();

        if let Some(farm_id) = owned {
            return Ok(CallerRole::Owner { user_id, farm_id });
        }

        let role = records
            .labourers
            .iter()
            .find(|(uid, _, _)| *uid == user_id)
            .map(|&(_, farm_id, status)| CallerRole::Labourer {
                user_id,
                farm_id,
                status,
            })
            .unwrap_or(CallerRole::Unaffiliated { user_id });

        Ok(role)
    }

    async fn owned_livestock(
        &self,
        owner_id: i64,
        livestock_id: i64,
    ) -> Result<Option<Livestock>, HerdError> {
        let records = self.read();

        let livestock = records
            .livestock
            .iter()
            .find(|l| {
                l.id == livestock_id
                    && records
                        .farms
                        .iter()
                        .any(|(farm_id, owner)| *farm_id == l.farm_id && *owner == owner_id)
            })
            .cloned();

        Ok(livestock)
    }

    async fn usage_events(
        &self,
        livestock_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<UsageEvent>, HerdError> {
        let mut amu = self.read().amu_for(livestock_id);
        amu.retain(|a| a.event_date >= start && a.event_date <= end);
        amu.sort_by_key(|a| (a.event_date, a.id));

        Ok(amu.iter().map(UsageEvent::from).collect())
    }

    async fn recent_health_records(
        &self,
        livestock_id: i64,
        limit: usize,
    ) -> Result<Vec<HealthRecord>, HerdError> {
        let mut health: Vec<HealthRecord> = self
            .read()
            .health
            .iter()
            .filter(|h| h.livestock_id == livestock_id)
            .cloned()
            .collect();
        health.sort_by(|a, b| (b.event_date, b.id).cmp(&(a.event_date, a.id)));
        health.truncate(limit);

        Ok(health)
    }

    async fn recent_amu_records(
        &self,
        livestock_id: i64,
        limit: usize,
    ) -> Result<Vec<AmuRecord>, HerdError> {
        let mut amu = self.read().amu_for(livestock_id);
        amu.sort_by(|a, b| (b.event_date, b.id).cmp(&(a.event_date, a.id)));
        amu.truncate(limit);

        Ok(amu)
    }

    async fn health_check(&self) -> Result<String, HerdError> {
        let records = self.read();
        Ok(format!(
            "in-memory ({} livestock, {} health records, {} AMU records)",
            records.livestock.len(),
            records.health.len(),
            records.amu.len()
        ))
    }

    fn name(&self) -> &str {
        "memory"
    }
}
