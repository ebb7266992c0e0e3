use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use csvsense_api::{RestApi, SessionStore};
use csvsense_query::{AnswerView, EngineConfig, QaEngine, DEFAULT_TOP_N};
use csvsense_schema::{InferenceConfig, TableLoader};
use csvsense_similarity::{
    EmbeddingBackend, ModelLoader, DEFAULT_EMBEDDING_DIM, DEFAULT_MODEL, DEFAULT_SIMILARITY_THRESHOLD,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Ask natural-language questions about a CSV file
#[derive(Parser, Debug)]
#[command(name = "csvsense")]
#[command(about = "Ask natural-language questions about a CSV file", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Minimum cosine similarity for a fallback answer
    #[arg(long, global = true, default_value_t = DEFAULT_SIMILARITY_THRESHOLD)]
    threshold: f32,

    /// Value counts returned for category questions
    #[arg(long, global = true, default_value_t = DEFAULT_TOP_N)]
    top_n: usize,

    /// Embedding backend
    #[arg(long, global = true, value_enum, default_value_t = Embedder::Hashing)]
    embedder: Embedder,

    /// Dimension of hashed embeddings
    #[arg(long, global = true, default_value_t = DEFAULT_EMBEDDING_DIM)]
    dim: usize,

    /// Where fastembed stores downloaded models
    #[arg(long, global = true)]
    model_cache_dir: Option<PathBuf>,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP API
    Serve {
        /// HTTP API port
        #[arg(long, default_value_t = 8080)]
        http_port: u16,
    },
    /// Answer questions about a CSV file and print the answers as JSON
    Ask {
        /// Path to the CSV file
        #[arg(long)]
        csv: PathBuf,

        /// Questions to answer, in order
        #[arg(required = true)]
        questions: Vec<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Embedder {
    Hashing,
    Fastembed,
}

impl Args {
    fn backend(&self) -> EmbeddingBackend {
        match self.embedder {
            Embedder::Hashing => EmbeddingBackend::Hashing { dim: self.dim },
            Embedder::Fastembed => EmbeddingBackend::FastEmbed {
                model: DEFAULT_MODEL.to_string(),
                cache_dir: self.model_cache_dir.clone(),
            },
        }
    }

    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            similarity_threshold: self.threshold,
            top_n: self.top_n,
            inference: InferenceConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout carries answers; logs go to stderr
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = args.engine_config();
    config.validate()?;
    let models = Arc::new(ModelLoader::new(args.backend()));

    match &args.command {
        Command::Serve { http_port } => serve(models, config, *http_port).await,
        Command::Ask { csv, questions } => ask(models, config, csv, questions),
    }
}

async fn serve(models: Arc<ModelLoader>, config: EngineConfig, http_port: u16) -> anyhow::Result<()> {
    info!("Starting csvsense v{}", env!("CARGO_PKG_VERSION"));
    info!("Embedding backend: {:?}", models.backend());
    info!("HTTP API port: {}", http_port);

    let store = Arc::new(SessionStore::new(models, config)?);

    let http_handle = std::thread::spawn(move || {
        info!("Starting HTTP server on port {}", http_port);
        let sys = actix_web::rt::System::new();
        sys.block_on(async {
            if let Err(e) = RestApi::start(store, http_port).await {
                tracing::error!("HTTP server error: {}", e);
            }
        })
    });

    info!("csvsense started successfully");
    info!("HTTP API: http://localhost:{}/sessions", http_port);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        _ = tokio::task::spawn_blocking(move || {
            http_handle.join().ok();
        }) => {
            info!("HTTP server stopped");
        }
    }

    info!("Shutting down...");
    Ok(())
}

fn ask(
    models: Arc<ModelLoader>,
    config: EngineConfig,
    csv: &Path,
    questions: &[String],
) -> anyhow::Result<()> {
    let table = TableLoader::new(config.inference)
        .load_path(csv)
        .with_context(|| format!("failed to load {}", csv.display()))?;

    let provider = models.load().context("embedding model unavailable")?;
    let engine = QaEngine::new(provider, config)?;

    for question in questions {
        let answer = engine.ask(&table, question)?;
        let view = AnswerView::from_answer(&answer, &table);
        println!("{}", serde_json::to_string_pretty(&view)?);
    }
    Ok(())
}
