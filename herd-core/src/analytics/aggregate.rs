use std::collections::{BTreeMap, HashMap};

use crate::models::UsageEvent;

use super::buckets::{MonthBucket, UsageWindow};

/// Per-drug monthly counts. Every series has exactly one slot per bucket,
/// and series keep the order in which their categories were first seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySeries {
    entries: Vec<(String, Vec<u32>)>,
    index: HashMap<String, usize>,
    bucket_count: usize,
}

impl CategorySeries {
    /// All-zero series for each category. Repeated names collapse into the
    /// first occurrence.
    pub fn zeroed<I, S>(categories: I, bucket_count: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut entries = Vec::new();
        let mut index = HashMap::new();

        for name in categories {
            let name = name.into();
            if index.contains_key(&name) {
                continue;
            }
            index.insert(name.clone(), entries.len());
            entries.push((name, vec![0; bucket_count]));
        }

        Self {
            entries,
            index,
            bucket_count,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }

    pub fn get(&self, name: &str) -> Option<&[u32]> {
        self.index
            .get(name)
            .map(|&i| self.entries[i].1.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u32])> {
        self.entries
            .iter()
            .map(|(name, counts)| (name.as_str(), counts.as_slice()))
    }

    /// Sum over every category and bucket.
    pub fn total(&self) -> u64 {
        self.entries
            .iter()
            .flat_map(|(_, counts)| counts.iter())
            .map(|&c| u64::from(c))
            .sum()
    }

    fn increment(&mut self, name: &str, bucket: usize) -> bool {
        match self.index.get(name) {
            Some(&i) if bucket < self.bucket_count => {
                self.entries[i].1[bucket] += 1;
                true
            }
            _ => false,
        }
    }
}

/// Drug set of a record selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownCategories {
    /// Display names ordered by drug id, one per distinct id.
    pub names: Vec<String>,
    /// Number of distinct drug ids. Can exceed the number of series when two
    /// drugs share a display name.
    pub distinct_ids: usize,
}

/// Distinct drugs referenced by `events`, ordered by drug id.
pub fn known_categories(events: &[UsageEvent]) -> KnownCategories {
    let by_id: BTreeMap<i64, &str> = events
        .iter()
        .filter_map(|e| match (e.drug_id, e.drug_name.as_deref()) {
            (Some(id), Some(name)) => Some((id, name)),
            _ => None,
        })
        .collect();

    KnownCategories {
        names: by_id.values().map(|n| n.to_string()).collect(),
        distinct_ids: by_id.len(),
    }
}

/// Count `events` per drug display name per month.
///
/// Events outside `window`, events without a drug and events whose drug is
/// not in `categories` are skipped.
pub fn aggregate(
    events: &[UsageEvent],
    window: &UsageWindow,
    buckets: &[MonthBucket],
    categories: &[String],
) -> CategorySeries {
    let mut series = CategorySeries::zeroed(categories.iter().cloned(), buckets.len());
    let mut skipped = 0usize;

    for event in events {
        if !window.contains(event.occurred_at) {
            skipped += 1;
            continue;
        }

        let Some(name) = event.drug_name.as_deref() else {
            skipped += 1;
            continue;
        };

        let counted = buckets
            .binary_search(&MonthBucket::containing(event.occurred_at))
            .map(|idx| series.increment(name, idx))
            .unwrap_or(false);

        if !counted {
            skipped += 1;
        }
    }

    tracing::debug!(
        events = events.len(),
        skipped,
        categories = series.len(),
        buckets = buckets.len(),
        "Aggregated monthly AMU usage"
    );

    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 30, 0).unwrap()
    }

    fn event(id: i64, ts: DateTime<Utc>, drug: Option<(i64, &str)>) -> UsageEvent {
        UsageEvent {
            record_id: id,
            occurred_at: ts,
            drug_id: drug.map(|(id, _)| id),
            drug_name: drug.map(|(_, name)| name.to_string()),
        }
    }

    fn index_of(buckets: &[MonthBucket], year: i32, month: u32) -> usize {
        buckets
            .iter()
            .position(|b| *b == MonthBucket { year, month })
            .expect("bucket present")
    }

    #[test]
    fn test_march_april_example() {
        let window = UsageWindow::trailing(at(2024, 6, 15), 365);
        let buckets = window.buckets();
        let events = vec![
            event(1, at(2024, 3, 2), Some((1, "A"))),
            event(2, at(2024, 3, 20), Some((1, "A"))),
            event(3, at(2024, 3, 11), Some((2, "B"))),
            event(4, at(2024, 4, 5), Some((1, "A"))),
        ];
        let known = known_categories(&events);
        assert_eq!(known.names, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(known.distinct_ids, 2);

        let series = aggregate(&events, &window, &buckets, &known.names);
        let march = index_of(&buckets, 2024, 3);
        let april = index_of(&buckets, 2024, 4);

        assert_eq!(series.get("A").unwrap()[march], 2);
        assert_eq!(series.get("B").unwrap()[march], 1);
        assert_eq!(series.get("A").unwrap()[april], 1);
        assert_eq!(series.get("B").unwrap()[april], 0);
        assert_eq!(series.total(), 4);
    }

    #[test]
    fn test_every_series_matches_bucket_count() {
        let window = UsageWindow::trailing(at(2024, 6, 15), 365);
        let buckets = window.buckets();
        let categories = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let series = aggregate(&[], &window, &buckets, &categories);

        assert_eq!(series.len(), 3);
        assert_eq!(series.bucket_count(), buckets.len());
        for (_, counts) in series.iter() {
            assert_eq!(counts.len(), buckets.len());
            assert!(counts.iter().all(|&c| c == 0));
        }
    }

    #[test]
    fn test_out_of_window_and_unknown_events_are_skipped() {
        let end = at(2024, 6, 15);
        let window = UsageWindow::trailing(end, 30);
        let buckets = window.buckets();
        let events = vec![
            event(1, end - Duration::days(5), Some((1, "A"))),
            event(2, end - Duration::days(31), Some((1, "A"))),
            event(3, end + Duration::days(1), Some((1, "A"))),
            event(4, end - Duration::days(2), Some((9, "Unlisted"))),
            event(5, end - Duration::days(3), None),
        ];
        let categories = vec!["A".to_string()];
        let series = aggregate(&events, &window, &buckets, &categories);

        assert_eq!(series.total(), 1);
        assert!(series.get("Unlisted").is_none());
    }

    #[test]
    fn test_total_equals_in_window_known_events() {
        let end = at(2024, 12, 31);
        let window = UsageWindow::trailing(end, 365);
        let buckets = window.buckets();
        let drugs = [(1, "Oxytetracycline"), (2, "Penicillin"), (3, "Tylosin")];

        let events: Vec<UsageEvent> = (0..200)
            .map(|i| {
                let ts = end - Duration::days(i * 3);
                let drug = if i % 7 == 0 { None } else { Some(drugs[(i % 3) as usize]) };
                event(i, ts, drug)
            })
            .collect();

        let known = known_categories(&events);
        let series = aggregate(&events, &window, &buckets, &known.names);
        let expected = events
            .iter()
            .filter(|e| window.contains(e.occurred_at) && e.drug_name.is_some())
            .count() as u64;

        assert_eq!(series.total(), expected);
    }

    #[test]
    fn test_shared_display_name_collapses_into_one_series() {
        // Two distinct drugs with the same name are counted as one series,
        // while the distinct drug count still sees both ids.
        let window = UsageWindow::trailing(at(2024, 6, 15), 365);
        let buckets = window.buckets();
        let events = vec![
            event(1, at(2024, 5, 1), Some((1, "Penicillin"))),
            event(2, at(2024, 5, 2), Some((2, "Penicillin"))),
        ];
        let known = known_categories(&events);
        assert_eq!(known.distinct_ids, 2);

        let series = aggregate(&events, &window, &buckets, &known.names);
        assert_eq!(series.len(), 1);
        let may = index_of(&buckets, 2024, 5);
        assert_eq!(series.get("Penicillin").unwrap()[may], 2);
    }

    #[test]
    fn test_known_categories_ordered_by_drug_id() {
        let events = vec![
            event(1, at(2024, 1, 1), Some((30, "Zeta"))),
            event(2, at(2024, 1, 2), Some((10, "Alpha"))),
            event(3, at(2024, 1, 3), Some((20, "Mid"))),
            event(4, at(2024, 1, 4), Some((10, "Alpha"))),
        ];
        let known = known_categories(&events);
        assert_eq!(known.names, vec!["Alpha", "Mid", "Zeta"]);
        assert_eq!(known.distinct_ids, 3);
    }
}
