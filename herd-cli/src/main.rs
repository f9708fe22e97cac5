//! herd-cli — command-line client for the Herdbook AMU analytics API
//!
//! # Subcommands
//! - `chart <livestock_id> [--json]` — monthly AMU usage per drug
//! - `insights <livestock_id>`       — narrative AMU insights
//! - `status`                        — show server health

use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8780";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "herd-cli", version, about = "Herdbook AMU analytics and insights CLI")]
struct Cli {
    /// Herdbook HTTP server URL (overrides HERD_HTTP_URL env var)
    #[arg(long, env = "HERD_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    /// Authenticated user id sent as x-user-id
    #[arg(long, env = "HERD_USER_ID")]
    user: Option<i64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show monthly antimicrobial usage for one animal
    Chart {
        livestock_id: i64,

        /// Print the raw chart payload as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate narrative AMU insights for one animal
    Insights { livestock_id: i64 },

    /// Show Herdbook server status
    Status,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    pub chart_data: ChartData,
    pub summary: ChartSummary,
}

#[derive(Debug, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

#[derive(Debug, Deserialize)]
pub struct ChartDataset {
    pub label: String,
    pub data: Vec<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ChartSummary {
    pub total_treatments: usize,
    pub unique_drugs: usize,
    pub time_period: String,
}

#[derive(Debug, Deserialize)]
pub struct InsightsResponse {
    pub insights: String,
}

// ============================================================================
// Rendering
// ============================================================================

/// Month-per-row table with one column per drug, followed by the summary.
pub fn render_chart(chart: &ChartResponse) -> String {
    let mut out = String::new();
    let summary = &chart.summary;

    out.push_str(&format!("Period:      {}\n", summary.time_period));
    out.push_str(&format!("Treatments:  {}\n", summary.total_treatments));
    out.push_str(&format!("Drugs:       {}\n", summary.unique_drugs));

    if chart.chart_data.datasets.is_empty() {
        out.push_str("\nNo antimicrobial usage recorded in this period.\n");
        return out;
    }

    let widths: Vec<usize> = chart
        .chart_data
        .datasets
        .iter()
        .map(|d| d.label.chars().count().max(3))
        .collect();

    out.push_str(&format!("\n{:<10}", "Month"));
    for (ds, w) in chart.chart_data.datasets.iter().zip(&widths) {
        out.push_str(&format!("  {:>w$}", ds.label, w = w));
    }
    out.push('\n');

    for (i, label) in chart.chart_data.labels.iter().enumerate() {
        out.push_str(&format!("{:<10}", label));
        for (ds, w) in chart.chart_data.datasets.iter().zip(&widths) {
            let count = ds.data.get(i).copied().unwrap_or(0);
            out.push_str(&format!("  {:>w$}", count, w = w));
        }
        out.push('\n');
    }

    out
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn client(timeout: Duration) -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder().timeout(timeout).build()?)
}

fn require_user(user: Option<i64>) -> i64 {
    match user {
        Some(u) => u,
        None => {
            eprintln!("herd-cli: a user id is required (--user or HERD_USER_ID)");
            std::process::exit(2);
        }
    }
}

/// Send a request, exiting with the server's error message on failure.
fn send_checked(req: reqwest::blocking::RequestBuilder, url: &str) -> reqwest::blocking::Response {
    let resp = match req.send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("herd-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    if !resp.status().is_success() {
        let status = resp.status();
        let body: serde_json::Value = resp.json().unwrap_or_default();
        let message = body["error"].as_str().unwrap_or("no details");
        eprintln!("herd-cli: server returned {}: {}", status, message);
        std::process::exit(1);
    }

    resp
}

/// Fetch and print the usage chart for one animal.
fn do_chart(server: &str, user: i64, livestock_id: i64, json_output: bool) -> anyhow::Result<()> {
    let url = format!("{}/amu-insights/chart-data", server);
    let req = client(Duration::from_secs(30))?
        .get(&url)
        .header("x-user-id", user.to_string())
        .query(&[("livestock_id", livestock_id)]);

    let body: serde_json::Value = send_checked(req, &url).json()?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        let chart: ChartResponse = serde_json::from_value(body)?;
        print!("{}", render_chart(&chart));
    }

    Ok(())
}

/// Request and print insights for one animal. The provider may take several
/// attempts, so the timeout is generous.
fn do_insights(server: &str, user: i64, livestock_id: i64) -> anyhow::Result<()> {
    let url = format!("{}/amu-insights/generate", server);
    let req = client(Duration::from_secs(300))?
        .post(&url)
        .header("x-user-id", user.to_string())
        .json(&serde_json::json!({ "livestock_id": livestock_id }));

    let resp: InsightsResponse = send_checked(req, &url).json()?;
    println!("{}", resp.insights);

    Ok(())
}

/// Show the server status by calling GET /health.
fn do_status(server: &str) -> anyhow::Result<()> {
    let url = format!("{}/health", server);
    let resp = client(Duration::from_secs(10))?.get(&url).send();

    match resp {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("Herdbook server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:         {}", body["version"].as_str().unwrap_or("?"));
            println!("Store:           {}", body["store"].as_str().unwrap_or("?"));
            println!("Database:        {}", body["database"].as_str().unwrap_or("?"));
        }
        Ok(r) => {
            eprintln!("herd-cli: server unhealthy (HTTP {})", r.status());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("herd-cli: cannot reach {}: {}", url, e);
            std::process::exit(1);
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Chart { livestock_id, json } => {
            do_chart(&server, require_user(cli.user), livestock_id, json)
        }
        Commands::Insights { livestock_id } => {
            do_insights(&server, require_user(cli.user), livestock_id)
        }
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("herd-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
