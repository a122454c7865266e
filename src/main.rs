//! Form-Scout main entry point
//!
//! This is the command-line interface for the Form-Scout document discovery
//! engine.

use anyhow::Context;
use clap::Parser;
use form_scout::config::{load_config_with_hash, Config, MunicipalityEntry};
use form_scout::discovery::{
    build_http_client, matches_positive_term, DiscoveryOrchestrator, EndpointSearchProbe,
    PageStore, SearchProbe,
};
use form_scout::download::{download_subdir, Downloader, DownloadStatus, StructuralPdfValidator};
use form_scout::profile::DocumentProfile;
use form_scout::report::{FileReport, FileStatus, RunReport};
use form_scout::CrawlBudget;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Candidates below this score are never downloaded
const MIN_SELECTION_SCORE: u8 = 30;

/// At most this many candidates are downloaded per run
const MAX_DOWNLOADS: usize = 5;

/// Form-Scout: find downloadable application forms on municipal websites
///
/// For every configured municipality and document profile, Form-Scout runs a
/// cascading discovery session, downloads the strongest candidate PDFs, and
/// writes a JSON report of what happened.
#[derive(Parser, Debug)]
#[command(name = "form-scout")]
#[command(version = "0.3.0")]
#[command(about = "Municipal form discovery and retrieval", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Only process these municipality keys (repeatable)
    #[arg(short, long = "municipality", value_name = "KEY")]
    municipalities: Vec<String>,

    /// Only process these profile keys (repeatable)
    #[arg(short, long = "profile", value_name = "KEY")]
    profiles: Vec<String>,

    /// Override the configured page budget per session
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Run discovery and write reports without downloading anything
    #[arg(long)]
    discover_only: bool,

    /// Validate config and show what would be scouted without any requests
    #[arg(long, conflicts_with = "discover_only")]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(max_pages) = cli.max_pages {
        tracing::info!("Page budget overridden to {} pages per session", max_pages);
        config.crawler.max_pages = max_pages;
    }

    let municipalities = select_municipalities(&config, &cli.municipalities)?;
    let profiles = select_profiles(&config, &cli.profiles)?;

    if cli.dry_run {
        handle_dry_run(&config, &municipalities, &profiles);
        return Ok(());
    }

    run_scout(
        config,
        config_hash,
        municipalities,
        profiles,
        cli.discover_only,
    )
    .await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("form_scout=info,warn"),
            1 => EnvFilter::new("form_scout=debug,info"),
            2 => EnvFilter::new("form_scout=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Resolves the municipality selection, rejecting unknown keys
fn select_municipalities(
    config: &Config,
    keys: &[String],
) -> anyhow::Result<Vec<MunicipalityEntry>> {
    if keys.is_empty() {
        return Ok(config.municipality.clone());
    }

    keys.iter()
        .map(|key| {
            config
                .municipality
                .iter()
                .find(|m| &m.key == key)
                .cloned()
                .with_context(|| format!("unknown municipality key '{}'", key))
        })
        .collect()
}

/// Resolves the profile selection, rejecting unknown keys
fn select_profiles(config: &Config, keys: &[String]) -> anyhow::Result<Vec<DocumentProfile>> {
    let all = DocumentProfile::build_all(&config.profile);

    if keys.is_empty() {
        return Ok(all);
    }

    keys.iter()
        .map(|key| {
            all.iter()
                .find(|p| &p.key == key)
                .cloned()
                .with_context(|| format!("unknown profile key '{}'", key))
        })
        .collect()
}

/// Handles the --dry-run mode: validates config and shows the work plan
fn handle_dry_run(
    config: &Config,
    municipalities: &[MunicipalityEntry],
    profiles: &[DocumentProfile],
) {
    println!("=== Form-Scout Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max pages per session: {}", config.crawler.max_pages);
    println!("  Max depth: {}", config.crawler.max_depth);
    println!(
        "  Strong score threshold: {}",
        config.crawler.strong_score_threshold
    );
    println!(
        "  Politeness delay: {}ms",
        config.crawler.politeness_delay_ms
    );
    println!(
        "  Concurrent sessions: {}",
        config.crawler.concurrent_sessions
    );

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Downloads: {}", config.output.downloads_dir);
    println!("  Reports: {}", config.output.reports_dir);

    match &config.search {
        Some(search) => println!("\nSearch endpoint: {}", search.endpoint),
        None => println!("\nSearch endpoint: none (search phase will be skipped)"),
    }

    println!("\nMunicipalities ({}):", municipalities.len());
    for m in municipalities {
        println!("  - {} ({}) {}", m.key, m.name_en, m.domain);
    }

    println!("\nProfiles ({}):", profiles.len());
    for p in profiles {
        println!(
            "  - {}: {} positive terms, {} seed paths",
            p.key,
            p.positive_terms.len(),
            p.seed_paths.len()
        );
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would run {} discovery sessions",
        municipalities.len() * profiles.len()
    );
}

/// Runs every (municipality, profile) pipeline, bounded by the session limit
async fn run_scout(
    config: Config,
    config_hash: String,
    municipalities: Vec<MunicipalityEntry>,
    profiles: Vec<DocumentProfile>,
    discover_only: bool,
) -> anyhow::Result<()> {
    let config = Arc::new(config);
    let config_hash = Arc::new(config_hash);
    let semaphore = Arc::new(Semaphore::new(config.crawler.concurrent_sessions as usize));
    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, finishing in-flight sessions");
                cancel.cancel();
            }
        });
    }

    let mut tasks = Vec::new();

    for municipality in &municipalities {
        for profile in &profiles {
            let config = Arc::clone(&config);
            let config_hash = Arc::clone(&config_hash);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let municipality = municipality.clone();
            let profile = profile.clone();

            tasks.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await?;
                if cancel.is_cancelled() {
                    anyhow::bail!("cancelled before start");
                }
                run_pipeline(
                    &config,
                    &config_hash,
                    &municipality,
                    &profile,
                    discover_only,
                    cancel,
                )
                .await
            }));
        }
    }

    let mut failures = 0usize;
    for task in tasks {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                failures += 1;
                tracing::error!("pipeline failed: {:#}", e);
            }
            Err(e) => {
                failures += 1;
                tracing::error!("pipeline panicked: {}", e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} pipeline(s) failed", failures);
    }

    Ok(())
}

/// One full run: discover, select, download, report
async fn run_pipeline(
    config: &Config,
    config_hash: &str,
    municipality: &MunicipalityEntry,
    profile: &DocumentProfile,
    discover_only: bool,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let root = Url::parse(&municipality.domain)
        .with_context(|| format!("bad domain for '{}'", municipality.key))?;

    tracing::info!(
        municipality = %municipality.key,
        profile = %profile.key,
        "starting pipeline"
    );

    let client = build_http_client(&config.user_agent, config.crawler.request_timeout_secs)?;
    let mut store = PageStore::new(client.clone(), config.crawler.politeness_delay_ms);

    let probe: Option<Box<dyn SearchProbe>> = config.search.as_ref().map(|search| {
        Box::new(EndpointSearchProbe::new(
            search.endpoint.clone(),
            search.result_limit,
        )) as Box<dyn SearchProbe>
    });

    let budget = CrawlBudget::from_config(&config.crawler);
    let orchestrator = DiscoveryOrchestrator::new(budget, probe, cancel);
    let outcome = orchestrator.discover(&mut store, &root, profile).await;

    let selected: Vec<_> = outcome
        .candidates
        .iter()
        .filter(|c| {
            c.score >= MIN_SELECTION_SCORE
                && matches_positive_term(profile, &c.link_text, &c.surrounding_context)
        })
        .take(MAX_DOWNLOADS)
        .cloned()
        .collect();

    let mut per_file = Vec::new();

    if !discover_only {
        let mut downloader = Downloader::new(
            client,
            &config.output.downloads_dir,
            config.crawler.politeness_delay_ms,
        );
        let validator = StructuralPdfValidator::new();
        let subdir = download_subdir(&municipality.key, &profile.key);

        for candidate in &selected {
            let url = match Url::parse(&candidate.url) {
                Ok(u) => u,
                Err(e) => {
                    per_file.push(FileReport {
                        filename: candidate.url.clone(),
                        status: FileStatus::Failed,
                        detail: format!("bad URL: {}", e),
                    });
                    continue;
                }
            };

            let filename = form_scout::url::filename_from_url(&url);
            match downloader.download(&url, &subdir, profile, &validator).await {
                Ok(DownloadStatus::Downloaded { path, sha256 }) => per_file.push(FileReport {
                    filename,
                    status: FileStatus::Ok,
                    detail: format!("{} (sha256:{})", path.display(), sha256),
                }),
                Ok(DownloadStatus::SkippedExisting { path }) => per_file.push(FileReport {
                    filename,
                    status: FileStatus::Skipped,
                    detail: format!("already present at {}", path.display()),
                }),
                Err(e) => per_file.push(FileReport {
                    filename,
                    status: FileStatus::Failed,
                    detail: e.to_string(),
                }),
            }
        }
    }

    let report = RunReport {
        municipality: municipality.key.clone(),
        form_type: profile.key.clone(),
        timestamp: chrono::Utc::now(),
        config_hash: config_hash.to_string(),
        phases: outcome.phases_run.clone(),
        pages_fetched: outcome.pages_fetched,
        candidates: outcome.candidates.clone(),
        per_file,
        errors: outcome.errors.clone(),
    };

    if report.is_flagged() && !discover_only {
        tracing::warn!(
            municipality = %municipality.key,
            profile = %profile.key,
            "no document retrieved, run flagged for review"
        );
    }

    let path = report
        .write(std::path::Path::new(&config.output.reports_dir))
        .await?;

    tracing::info!(
        municipality = %municipality.key,
        profile = %profile.key,
        report = %path.display(),
        candidates = outcome.candidates.len(),
        "pipeline finished"
    );

    Ok(())
}
