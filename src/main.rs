//! Policy verdict - outcome prediction service

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};

use policy_verdict::{
    auth::{MemoryUserStore, MongoUserStore, UserStore},
    config::{Args, HistoryBackend},
    corpus::{CorpusOptions, PolicyIndex},
    db::{redact_uri, MongoClient},
    history::{FileHistoryStore, HistoryStore, MemoryHistoryStore, MongoHistoryStore},
    logging,
    model::ModelAdapter,
    server, AppState,
};

type Stores = (Arc<dyn HistoryStore>, Arc<dyn UserStore>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    logging::init(&args.log_level, args.log_format);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Policy Verdict");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("Model: {}", args.model_path.display());
    info!(
        "Corpus: {} ({}, '{}')",
        args.corpus_path.display(),
        args.corpus_encoding,
        args.corpus_delimiter
    );
    info!("History backend: {}", args.history_backend.as_str());
    if args.history_backend == HistoryBackend::Mongo {
        info!("MongoDB: {} / {}", redact_uri(&args.mongo_uri), args.mongo_db);
    }
    info!("======================================");

    // The artifact and the corpus are required; there is no degraded mode
    let adapter = match ModelAdapter::load(&args.model_path) {
        Ok(a) => a,
        Err(e) => {
            error!("Failed to load model artifact: {}", e);
            std::process::exit(1);
        }
    };
    info!("Model loaded: {}", adapter.describe());

    let index = match CorpusOptions::new(&args.corpus_encoding, args.corpus_delimiter)
        .and_then(|options| PolicyIndex::load(&args.corpus_path, &options))
    {
        Ok(i) => Arc::new(i),
        Err(e) => {
            error!("Failed to load reference corpus: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        "Corpus loaded: {} rows across {} groups",
        index.len(),
        index.group_count()
    );

    let (history, users) = build_stores(&args).await?;
    info!(
        "Storage ready (history: {}, users: {})",
        history.backend(),
        users.backend()
    );

    let state = Arc::new(AppState::new(args, adapter, index, history, users)?);

    server::run(state).await?;

    Ok(())
}

async fn build_stores(args: &Args) -> anyhow::Result<Stores> {
    match args.history_backend {
        HistoryBackend::Memory => Ok(memory_stores()),
        HistoryBackend::File => {
            let history: Arc<dyn HistoryStore> =
                Arc::new(FileHistoryStore::open(&args.history_file).await?);
            let users: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
            Ok((history, users))
        }
        HistoryBackend::Mongo => match connect_mongo(args).await {
            Ok(stores) => Ok(stores),
            Err(e) if args.dev_mode => {
                warn!("MongoDB unavailable (dev mode, continuing in memory): {}", e);
                Ok(memory_stores())
            }
            Err(e) => {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        },
    }
}

async fn connect_mongo(args: &Args) -> policy_verdict::Result<Stores> {
    let client = MongoClient::new(&args.mongo_uri, &args.mongo_db).await?;
    let history: Arc<dyn HistoryStore> = Arc::new(MongoHistoryStore::new(&client).await?);
    let users: Arc<dyn UserStore> = Arc::new(MongoUserStore::new(&client).await?);
    Ok((history, users))
}

fn memory_stores() -> Stores {
    let history: Arc<dyn HistoryStore> = Arc::new(MemoryHistoryStore::new());
    let users: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
    (history, users)
}
