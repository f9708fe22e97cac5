use serde::Serialize;

use super::aggregate::CategorySeries;
use super::buckets::MonthBucket;

const PALETTE: [&str; 10] = [
    "#FF6384", "#36A2EB", "#FFCE56", "#4BC0C0", "#9966FF", "#FF9F40", "#FF6384", "#C9CBCF",
    "#4BC0C0", "#FF9F40",
];

/// Display colour for the dataset at position `index`.
pub fn color_for(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartPayload {
    pub chart_data: ChartData,
    pub summary: ChartSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataset {
    pub label: String,
    pub data: Vec<u32>,
    pub background_color: &'static str,
    pub border_color: &'static str,
    pub border_width: u32,
    pub fill: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartSummary {
    pub total_treatments: usize,
    pub unique_drugs: usize,
    pub time_period: String,
}

/// Build the chart payload from aggregated series.
pub fn assemble(
    buckets: &[MonthBucket],
    series: &CategorySeries,
    total_count: usize,
    category_count: usize,
) -> ChartPayload {
    let labels: Vec<String> = buckets.iter().map(MonthBucket::label).collect();

    let datasets = series
        .iter()
        .enumerate()
        .map(|(i, (name, counts))| ChartDataset {
            label: name.to_string(),
            data: counts.to_vec(),
            background_color: color_for(i),
            border_color: color_for(i),
            border_width: 1,
            fill: false,
        })
        .collect();

    let time_period = match (labels.first(), labels.last()) {
        (Some(first), Some(last)) if labels.len() > 1 => format!("{} to {}", first, last),
        (Some(only), _) => only.clone(),
        _ => String::new(),
    };

    ChartPayload {
        chart_data: ChartData { labels, datasets },
        summary: ChartSummary {
            total_treatments: total_count,
            unique_drugs: category_count,
            time_period,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::buckets::build_monthly_buckets;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_palette_cycles_every_ten() {
        assert_eq!(color_for(0), "#FF6384");
        assert_eq!(color_for(1), "#36A2EB");
        assert_eq!(color_for(7), "#C9CBCF");
        assert_eq!(color_for(10), color_for(0));
        assert_eq!(color_for(23), color_for(3));
    }

    #[test]
    fn test_assemble_labels_colors_and_summary() {
        let end = Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap();
        let buckets = build_monthly_buckets(end, 365);
        let series = CategorySeries::zeroed(["A", "B"], buckets.len());

        let payload = assemble(&buckets, &series, 4, 2);

        assert_eq!(payload.chart_data.labels.len(), 13);
        assert_eq!(payload.chart_data.labels[0], "Jun 2023");
        assert_eq!(payload.chart_data.labels[12], "Jun 2024");
        assert_eq!(payload.chart_data.datasets.len(), 2);
        assert_eq!(payload.chart_data.datasets[0].label, "A");
        assert_eq!(payload.chart_data.datasets[0].background_color, "#FF6384");
        assert_eq!(payload.chart_data.datasets[1].border_color, "#36A2EB");
        assert_eq!(payload.summary.total_treatments, 4);
        assert_eq!(payload.summary.unique_drugs, 2);
        assert_eq!(payload.summary.time_period, "Jun 2023 to Jun 2024");
    }

    #[test]
    fn test_colors_are_stable_across_runs() {
        let buckets = vec![MonthBucket { year: 2024, month: 1 }];
        let names: Vec<String> = (0..12).map(|i| format!("drug-{}", i)).collect();
        let series = CategorySeries::zeroed(names, 1);

        let first = assemble(&buckets, &series, 0, 12);
        let second = assemble(&buckets, &series, 0, 12);

        let colors = |p: &ChartPayload| {
            p.chart_data
                .datasets
                .iter()
                .map(|d| d.background_color)
                .collect::<Vec<_>>()
        };
        assert_eq!(colors(&first), colors(&second));
        assert_eq!(first.chart_data.datasets[10].background_color, color_for(0));
    }

    #[test]
    fn test_single_bucket_period_is_single_label() {
        let buckets = vec![MonthBucket { year: 2024, month: 2 }];
        let series = CategorySeries::zeroed(Vec::<String>::new(), 1);
        let payload = assemble(&buckets, &series, 0, 0);
        assert_eq!(payload.summary.time_period, "Feb 2024");
        assert!(payload.chart_data.datasets.is_empty());
    }

    #[test]
    fn test_dataset_serializes_with_chart_js_keys() {
        let buckets = vec![MonthBucket { year: 2024, month: 3 }];
        let series = CategorySeries::zeroed(["A"], 1);
        let payload = assemble(&buckets, &series, 0, 1);
        let json = serde_json::to_value(&payload).unwrap();

        let dataset = &json["chart_data"]["datasets"][0];
        assert_eq!(dataset["label"], "A");
        assert_eq!(dataset["backgroundColor"], "#FF6384");
        assert_eq!(dataset["borderColor"], "#FF6384");
        assert_eq!(dataset["borderWidth"], 1);
        assert_eq!(dataset["fill"], false);
        assert_eq!(json["summary"]["time_period"], "Mar 2024");
    }
}
