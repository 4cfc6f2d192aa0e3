//! Scan command handlers for the CLI.
//!
//! These are called from `main` after the database pool and config are
//! established. Lifecycle outcomes (paused, failed) are reported on stdout
//! rather than treated as command errors; only infrastructure problems
//! propagate.

use std::path::{Path, PathBuf};

use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use sovscan_core::{
    load_scan_definition, AppConfig, BatchScan, BatchScanQuestion, ScanDefinition, ScanStore,
};
use sovscan_db::PgScanStore;
use sovscan_engine::{EngineConfig, ScanOrchestrator, ScanOutcome};
use sovscan_providers::{
    AnthropicClient, OpenAiClient, PerplexityClient, ProviderRegistry,
};

/// A scan referenced on the command line, either by internal id or by its
/// external UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScanRef {
    Id(i64),
    Public(Uuid),
}

pub(crate) fn parse_scan_ref(raw: &str) -> anyhow::Result<ScanRef> {
    if let Ok(id) = raw.parse::<i64>() {
        return Ok(ScanRef::Id(id));
    }
    if let Ok(public_id) = raw.parse::<Uuid>() {
        return Ok(ScanRef::Public(public_id));
    }
    anyhow::bail!("'{raw}' is neither a scan id nor a UUID");
}

/// Resolve a definition argument: an existing path is used as-is, anything
/// else is treated as a name under the configured scans directory.
pub(crate) fn resolve_definition_path(scans_dir: &Path, arg: &str) -> PathBuf {
    let direct = PathBuf::from(arg);
    if direct.exists() {
        direct
    } else {
        scans_dir.join(format!("{arg}.yaml"))
    }
}

pub(crate) fn format_rate(rate: Option<f64>) -> String {
    match rate {
        Some(rate) => format!("{:.1}%", rate * 100.0),
        None => "n/a".to_string(),
    }
}

async fn resolve_scan(store: &PgScanStore, raw: &str) -> anyhow::Result<BatchScan> {
    let scan = match parse_scan_ref(raw)? {
        ScanRef::Id(id) => store.get_scan(id).await,
        ScanRef::Public(public_id) => store.get_scan_by_public_id(public_id).await,
    };
    scan.with_context(|| format!("scan '{raw}' not found"))
}

/// Build the provider registry from whichever API keys are configured.
fn build_registry(config: &AppConfig) -> anyhow::Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();
    if let Some(key) = &config.openai_api_key {
        registry = registry.with_openai(OpenAiClient::new(key)?);
    }
    if let Some(key) = &config.anthropic_api_key {
        registry = registry.with_anthropic(AnthropicClient::new(key)?);
    }
    if let Some(key) = &config.perplexity_api_key {
        registry = registry.with_perplexity(PerplexityClient::new(key)?);
    }
    Ok(registry)
}

/// Every provider the scan's settings name must have a configured client
/// before the scan is admitted.
fn ensure_providers_configured(
    registry: &ProviderRegistry,
    scan: &BatchScan,
) -> anyhow::Result<()> {
    for provider in scan.settings.providers.keys() {
        if !registry.is_configured(*provider) {
            anyhow::bail!("scan uses provider '{provider}' but no API key is configured");
        }
    }
    Ok(())
}

fn report_outcome(scan_id: i64, outcome: &ScanOutcome) {
    match outcome {
        ScanOutcome::Completed {
            overall_exposure_rate,
        } => println!(
            "scan {scan_id} completed: overall exposure rate {}",
            format_rate(Some(*overall_exposure_rate))
        ),
        ScanOutcome::Paused(reason) => {
            println!("scan {scan_id} paused ({reason}); resume with `sovscan resume {scan_id}`");
        }
        ScanOutcome::Failed(reason) => match reason {
            Some(reason) => println!("scan {scan_id} failed ({reason})"),
            None => println!("scan {scan_id} failed"),
        },
    }
}

fn print_scan(scan: &BatchScan) {
    println!("scan {} (public {})", scan.id, scan.public_id);
    println!("  brand:      {}", scan.brand_name);
    println!("  set:        {}", scan.question_set);
    match scan.pause_reason {
        Some(reason) => println!("  status:     {} ({reason})", scan.status),
        None => println!("  status:     {}", scan.status),
    }
    println!(
        "  questions:  {}/{}",
        scan.completed_questions, scan.total_questions
    );
    println!(
        "  iterations: {}/{}",
        scan.completed_iterations, scan.total_iterations
    );
    println!(
        "  credits:    {}/{}",
        scan.used_credits, scan.estimated_credits
    );
    println!("  exposure:   {}", format_rate(scan.overall_exposure_rate));
}

fn print_question(question: &BatchScanQuestion) {
    println!(
        "  [{}] {} - {} (exposure {})",
        question.order_index,
        question.question_text,
        question.status.as_str(),
        format_rate(question.rollup.avg_exposure_rate)
    );
    for (provider, stats) in &question.rollup.providers {
        println!(
            "      {provider}: {}/{} done, {} mentions, rate {}",
            stats.completed,
            stats.total,
            stats.mentions,
            format_rate(stats.exposure_rate)
        );
    }
    let sentiment = &question.rollup.sentiment;
    println!(
        "      sentiment: +{} ={} -{}",
        sentiment.positive, sentiment.neutral, sentiment.negative
    );
    if let Some(error) = &question.last_error {
        println!("      last error: {error}");
    }
}

pub(crate) async fn run_create(
    pool: &PgPool,
    config: &AppConfig,
    definition_arg: &str,
    user: Option<Uuid>,
) -> anyhow::Result<()> {
    let path = resolve_definition_path(&config.scans_path, definition_arg);
    let definition: ScanDefinition = load_scan_definition(&path)
        .with_context(|| format!("failed to load scan definition from {}", path.display()))?;

    let user_id = user.unwrap_or_else(Uuid::new_v4);
    let orch = ScanOrchestrator::new(
        PgScanStore::new(pool.clone()),
        ProviderRegistry::new(),
        EngineConfig::from_app_config(config),
    );
    let scan = orch.create_scan(user_id, &definition).await?;

    println!(
        "created scan {} (public {}): {} questions, {} iterations, {} credits estimated",
        scan.id,
        scan.public_id,
        scan.total_questions,
        scan.total_iterations,
        scan.estimated_credits
    );
    println!("start it with `sovscan start {}`", scan.id);
    Ok(())
}

pub(crate) async fn run_start(
    pool: &PgPool,
    config: &AppConfig,
    scan_arg: &str,
) -> anyhow::Result<()> {
    let store = PgScanStore::new(pool.clone());
    let scan = resolve_scan(&store, scan_arg).await?;
    let registry = build_registry(config)?;
    ensure_providers_configured(&registry, &scan)?;

    let orch = ScanOrchestrator::new(store, registry, EngineConfig::from_app_config(config));
    let outcome = orch.start(scan.id).await?;
    report_outcome(scan.id, &outcome);
    Ok(())
}

pub(crate) async fn run_resume(
    pool: &PgPool,
    config: &AppConfig,
    scan_arg: &str,
) -> anyhow::Result<()> {
    let store = PgScanStore::new(pool.clone());
    let scan = resolve_scan(&store, scan_arg).await?;
    let registry = build_registry(config)?;
    ensure_providers_configured(&registry, &scan)?;

    let orch = ScanOrchestrator::new(store, registry, EngineConfig::from_app_config(config));
    let outcome = orch.resume(scan.id).await?;
    report_outcome(scan.id, &outcome);
    Ok(())
}

pub(crate) async fn run_pause(
    pool: &PgPool,
    config: &AppConfig,
    scan_arg: &str,
) -> anyhow::Result<()> {
    let orch = ScanOrchestrator::new(
        PgScanStore::new(pool.clone()),
        ProviderRegistry::new(),
        EngineConfig::from_app_config(config),
    );
    let scan = resolve_scan(orch.store(), scan_arg).await?;
    orch.request_pause(scan.id).await?;
    println!(
        "pause requested for scan {}; takes effect before the next dispatched iteration",
        scan.id
    );
    Ok(())
}

pub(crate) async fn run_status(
    pool: &PgPool,
    scan_arg: &str,
    show_questions: bool,
) -> anyhow::Result<()> {
    let store = PgScanStore::new(pool.clone());
    let scan = resolve_scan(&store, scan_arg).await?;
    print_scan(&scan);

    if show_questions {
        for question in store.list_questions(scan.id).await? {
            print_question(&question);
        }
    }
    Ok(())
}

pub(crate) async fn run_list(pool: &PgPool, limit: i64) -> anyhow::Result<()> {
    let scans = sovscan_db::list_recent_scans(pool, limit).await?;
    if scans.is_empty() {
        println!("no scans yet");
        return Ok(());
    }
    for scan in scans {
        println!(
            "{:>5}  {:<10} {:<24} q {}/{} credits {}/{} exposure {}",
            scan.id,
            scan.status.as_str(),
            scan.brand_name,
            scan.completed_questions,
            scan.total_questions,
            scan.used_credits,
            scan.estimated_credits,
            format_rate(scan.overall_exposure_rate)
        );
    }
    Ok(())
}

#[cfg(test)]
#[path = "scan_test.rs"]
mod tests;
