//! AMU analytics — monthly usage chart for one animal
//!
//! Pipeline: [`buckets`] lays out the calendar months of a trailing window,
//! [`aggregate`] counts usage events per drug per month into those buckets,
//! and [`chart`] turns the counts into a labelled, coloured chart payload.

pub mod aggregate;
pub mod buckets;
pub mod chart;

pub use aggregate::{aggregate, known_categories, CategorySeries, KnownCategories};
pub use buckets::{build_monthly_buckets, MonthBucket, UsageWindow};
pub use chart::{assemble, color_for, ChartData, ChartDataset, ChartPayload, ChartSummary};
