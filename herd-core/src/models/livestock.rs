use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Livestock {
    pub id: i64,
    pub farm_id: i64,
    pub tag_number: String,
    pub species: String,
    pub breed: String,
    pub gender: String,
    pub current_weight_kg: Option<f64>,
    pub health_status: String,
}
