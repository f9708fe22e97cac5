use std::fmt::Write;

use crate::models::{AmuRecord, HealthRecord, Livestock};

/// Number of recent health and AMU records included in a prompt.
pub const RECENT_RECORD_LIMIT: usize = 5;

/// Build the insight prompt for `livestock`.
///
/// Only the [`RECENT_RECORD_LIMIT`] most recent records of each kind (by
/// event date, newest first) are included, whatever the caller passes in.
/// Values are interpolated as-is.
pub fn compose_prompt(
    livestock: &Livestock,
    health_records: &[HealthRecord],
    amu_records: &[AmuRecord],
) -> String {
    let health = most_recent(health_records, |r| r.event_date);
    let amu = most_recent(amu_records, |r| r.event_date);

    let weight = livestock
        .current_weight_kg
        .map(|w| w.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let mut prompt = format!(
        "Analyze the following data for a livestock animal and provide insights on AMU (Antimicrobial Usage).
Determine if the current drug dosages are correct based on recommended ranges and animal weight.
If not correct, suggest adjustments (e.g., bring the dosage up or down by X quantity).
Also, provide any additional relevant insights about the animal's health and drug usage.

Livestock Details:
- Species: {species}
- Breed: {breed}
- Gender: {gender}
- Current Weight (kg): {weight}
- Health Status: {status}

Recent Health Records:
{health}

Recent AMU Records:
{amu}

Recommended Drug Information (if available in AMU records):
",
        species = livestock.species,
        breed = livestock.breed,
        gender = livestock.gender,
        weight = weight,
        status = livestock.health_status,
        health = serialize_records(&health),
        amu = serialize_records(&amu),
    );

    for drug in amu.iter().filter_map(|r| r.drug.as_ref()) {
        let _ = write!(
            prompt,
            "
- Drug Name: {name}
- Active Ingredient: {ingredient}
- Species Target: {target}
- Recommended Dosage Min: {min} {unit}
- Recommended Dosage Max: {max} {unit}
",
            name = drug.name,
            ingredient = drug.active_ingredient,
            target = drug.species_target,
            min = drug.recommended_dosage_min,
            max = drug.recommended_dosage_max,
            unit = drug.unit,
        );
    }

    prompt
}

fn most_recent<T, K, F>(records: &[T], key: F) -> Vec<&T>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut sorted: Vec<&T> = records.iter().collect();
    sorted.sort_by(|a, b| key(b).cmp(&key(a)));
    sorted.truncate(RECENT_RECORD_LIMIT);
    sorted
}

fn serialize_records<T: serde::Serialize>(records: &[&T]) -> String {
    serde_json::to_string(records).unwrap_or_else(|_| "[]".to_string())
}
