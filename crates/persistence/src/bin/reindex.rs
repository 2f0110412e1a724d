//! Danak search mirror rebuild.
//!
//! Clears the search mirror of each selected record type and rewrites it
//! from the primary store. Stores are configured through the `DANAK_*`
//! environment variables read by `PersistenceConfig::from_env`.
//!
//! # Usage
//!
//! ```bash
//! # Rebuild every index
//! DANAK_DATABASE_PATH=danak.db danak-reindex
//!
//! # Rebuild one index into Elasticsearch
//! DANAK_SEARCH_BACKEND=elasticsearch danak-reindex --resource static-page
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use danak_persistence::config::{PersistenceConfig, Stores};
use danak_persistence::logging::init_logging;
use danak_persistence::model::{ContactUs, HelpApp, Record, StaticPage};
use danak_persistence::ReindexReport;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Resource {
    StaticPage,
    HelpApp,
    ContactUs,
}

#[derive(Debug, Parser)]
#[command(name = "danak-reindex")]
#[command(about = "Rebuild the Danak search mirror from the primary store")]
struct Args {
    /// Record types to rebuild. All of them when omitted.
    #[arg(long = "resource", value_enum)]
    resources: Vec<Resource>,

    /// Primary store file, overriding DANAK_DATABASE_PATH.
    #[arg(long)]
    database: Option<PathBuf>,

    /// Log level.
    #[arg(long, env = "DANAK_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

async fn reindex<R: Record>(stores: &Stores) -> anyhow::Result<ReindexReport> {
    let (entities, _) = stores.services::<R>();
    let report = entities.reindex().await?;
    println!(
        "{:<12} indexed {:>6}  failed {:>6}",
        R::resource_type(),
        report.indexed,
        report.failed
    );
    Ok(report)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let mut config = PersistenceConfig::from_env()?;
    if let Some(database) = args.database {
        config.database_path = database;
    }
    info!(database = %config.database_path.display(), "Rebuilding search mirror");
    let stores = config.open()?;

    let resources = if args.resources.is_empty() {
        vec![Resource::StaticPage, Resource::HelpApp, Resource::ContactUs]
    } else {
        args.resources
    };

    let mut failed = 0;
    for resource in resources {
        let report = match resource {
            Resource::StaticPage => reindex::<StaticPage>(&stores).await?,
            Resource::HelpApp => reindex::<HelpApp>(&stores).await?,
            Resource::ContactUs => reindex::<ContactUs>(&stores).await?,
        };
        failed += report.failed;
    }

    if failed > 0 {
        eprintln!("{} records could not be indexed", failed);
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
