use std::sync::Arc;

use clap::Parser;
use herd_core::{ChatCompletionClient, FarmStore, HerdConfig, PgFarmStore};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use herd_server::http::{start_http_server, HttpState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "herd.toml")]
    config: String,

    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (PERPLEXITY_API_KEY, HERD__DATABASE__URL, ...)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match HerdConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    // Connect to DB
    let pool = match herd_core::db::create_pool(&config.database).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };
    let store = PgFarmStore::new(pool);

    if args.health {
        match store.health_check().await {
            Ok(v) => println!("✅ PostgreSQL connected: {}", v),
            Err(e) => {
                println!("❌ PostgreSQL connection failed: {}", e);
                std::process::exit(1);
            }
        }

        println!("✅ Herdbook DB health check passed");
        return Ok(());
    }

    let insights = ChatCompletionClient::new(config.insights.clone())?;
    tracing::info!(
        endpoint = %config.insights.endpoint,
        model = %config.insights.model,
        max_attempts = config.insights.max_attempts,
        "Insight provider configured"
    );

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    let state = HttpState {
        store: Arc::new(store),
        insights: Arc::new(insights),
        config,
    };

    start_http_server(state, tx.subscribe()).await
}
