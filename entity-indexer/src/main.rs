//! Entity Indexer
//!
//! Entry point: loads the job definition named by `INDEXING_CONFIG` and runs it.

use std::env;
use std::process::ExitCode;

use entity_indexer::Dependencies;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    init_tracing();

    let mut dependencies = match Dependencies::from_env() {
        Ok(dependencies) => dependencies,
        Err(e) => {
            error!(error = %e, "Failed to assemble indexing job");
            return ExitCode::FAILURE;
        }
    };

    match dependencies.run().await {
        Ok(stats) => {
            info!(
                indexed = stats.entities_indexed,
                skipped = stats.entities_skipped,
                failed = stats.entities_failed,
                post_processed = stats.entities_post_processed,
                "Indexing job completed"
            );
            ExitCode::SUCCESS
        }
        Err(_) => ExitCode::FAILURE,
    }
}
