use serde::{Deserialize, Serialize};

/// Catalogue entry for an antimicrobial, including its reference dosage range.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Drug {
    pub id: i64,
    pub name: String,
    pub active_ingredient: String,
    pub species_target: String,
    pub recommended_dosage_min: f64,
    pub recommended_dosage_max: f64,
    pub unit: String,
}
