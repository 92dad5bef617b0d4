use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use newslens_common::Config;
use newslens_pipeline::{
    AnalysisRequest, AnalyzerConfig, NewsApiSource, OracleClassifier, TopicAnalyzer,
};
use newslens_store::{AnalysisStore, MemoryStore, PgStore};

#[derive(Parser)]
#[command(name = "newslens", about = "Topic analysis pipeline")]
struct Cli {
    /// Use the in-memory store instead of Postgres (offline demo).
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a topic and print the perspective-grouped response as JSON.
    Analyze {
        topic: String,
        #[arg(long)]
        location: Option<String>,
        /// Refresh even if the persisted analysis is still fresh.
        #[arg(long)]
        force_refresh: bool,
        /// Fail instead of returning an empty article set.
        #[arg(long)]
        require_data: bool,
    },
    /// Print trending topics, global or for one location.
    Trending {
        #[arg(long)]
        location: Option<String>,
    },
    /// Create or update the store schema and exit.
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("newslens=info".parse()?))
        .init();

    let cli = Cli::parse();

    if cli.memory {
        let config = Config::offline_from_env();
        config.log_redacted();
        return run(cli.command, Arc::new(MemoryStore::new()), &config).await;
    }

    let config = Config::from_env();
    config.log_redacted();

    let store = PgStore::connect(&config.database_url).await?;
    store.migrate().await?;
    let store = Arc::new(store);

    let result = run(cli.command, store.clone(), &config).await;
    store.close().await;
    result
}

async fn run(command: Command, store: Arc<dyn AnalysisStore>, config: &Config) -> Result<()> {
    match command {
        Command::Migrate => {
            // Postgres migration already ran at startup; nothing to do for
            // the in-memory store.
            info!("Store schema up to date");
            Ok(())
        }

        Command::Analyze {
            topic,
            location,
            force_refresh,
            require_data,
        } => {
            let source = Arc::new(NewsApiSource::new(&config.news_api_key));
            let classifier = Arc::new(
                OracleClassifier::new(&config.anthropic_api_key)
                    .with_timeout(config.oracle_timeout())
                    .with_batch_cap(config.oracle_batch_cap),
            );
            let analyzer = TopicAnalyzer::new(
                store,
                source,
                classifier,
                AnalyzerConfig {
                    ttl: chrono::Duration::seconds(config.analysis_ttl_secs as i64),
                    persist_concurrency: config.persist_concurrency,
                },
            );

            let analysis = analyzer
                .analyze(AnalysisRequest {
                    topic,
                    location,
                    force_refresh,
                })
                .await?;
            if require_data {
                analysis.require_articles()?;
            }

            println!("{}", serde_json::to_string_pretty(&analysis)?);
            Ok(())
        }

        Command::Trending { location } => {
            let payload = match location {
                Some(location) => {
                    let topics = store.trending_for_location(&location, 5).await?;
                    let rows: Vec<_> = topics
                        .into_iter()
                        .map(|t| {
                            serde_json::json!({
                                "topic": t.topic,
                                "heat": (t.count * 10).min(100),
                            })
                        })
                        .collect();
                    serde_json::json!({ "location": location, "topics": rows })
                }
                None => {
                    let trending = store.trending_topics(10).await?;
                    let rows: Vec<_> = trending
                        .into_iter()
                        .map(|t| {
                            serde_json::json!({
                                "topic": t.topic,
                                "heat": (t.search_count * 5).min(100),
                                "searches": t.search_count,
                            })
                        })
                        .collect();
                    serde_json::json!({ "topics": rows })
                }
            };

            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(())
        }
    }
}
