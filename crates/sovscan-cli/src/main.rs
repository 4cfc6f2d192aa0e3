use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod scan;

#[derive(Debug, Parser)]
#[command(name = "sovscan")]
#[command(about = "Brand-visibility batch scans across LLM providers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create a scan in pending status from a YAML definition.
    Create {
        /// Path to a definition file, or a bare name resolved under the
        /// configured scans directory.
        definition: String,
        /// Owner of the scan; generated when omitted.
        #[arg(long)]
        user: Option<uuid::Uuid>,
    },
    /// Admit a pending scan and run it until it completes, pauses or fails.
    Start {
        /// Scan id or public UUID.
        scan: String,
    },
    /// Resume a paused scan.
    Resume {
        /// Scan id or public UUID.
        scan: String,
    },
    /// Request a pause of a running scan.
    Pause {
        /// Scan id or public UUID.
        scan: String,
    },
    /// Show a scan's progress and aggregated statistics.
    Status {
        /// Scan id or public UUID.
        scan: String,
        /// Also print per-question rollups.
        #[arg(long)]
        questions: bool,
    },
    /// List recent scans.
    List {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Apply pending database migrations.
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = sovscan_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let pool =
        sovscan_db::connect_pool(&config.database_url, sovscan_db::PoolConfig::from_env()).await?;

    match cli.command {
        Commands::Create { definition, user } => {
            scan::run_create(&pool, &config, &definition, user).await?;
        }
        Commands::Start { scan } => scan::run_start(&pool, &config, &scan).await?,
        Commands::Resume { scan } => scan::run_resume(&pool, &config, &scan).await?,
        Commands::Pause { scan } => scan::run_pause(&pool, &config, &scan).await?,
        Commands::Status { scan, questions } => scan::run_status(&pool, &scan, questions).await?,
        Commands::List { limit } => scan::run_list(&pool, limit).await?,
        Commands::Migrate => {
            let applied = sovscan_db::run_migrations(&pool).await?;
            println!("applied {applied} migrations");
        }
    }

    Ok(())
}
