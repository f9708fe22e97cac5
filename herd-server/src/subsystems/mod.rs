pub mod analytics;
pub mod insights;
