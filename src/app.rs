use crate::cli::{Cli, Commands};
use exportq::assets::{AssetRef, StaticAssetLibrary};
use exportq::engine::{ExportJob, ExportQueue, JobState, QueueStore, SimulatedTranscodeProvider};
use exportq::stats::{QueueStats, format_bytes, format_duration};
use exportq::{config, engine};

use chrono::Utc;
use std::collections::HashMap;
use std::process;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

pub fn run(cli: Cli) {
    match cli.command {
        Some(Commands::Demo {
            count,
            preset,
            flaky,
        }) => handle_demo(count, preset, flaky),
        Some(Commands::Presets) => handle_presets(),
        Some(Commands::Status) => handle_status(),
        Some(Commands::Clear) => handle_clear(),
        Some(Commands::InitConfig) => handle_init_config(),
        None => handle_status(),
    }
}

fn state_label(state: JobState) -> &'static str {
    match state {
        JobState::Queued => "queued",
        JobState::Processing => "processing",
        JobState::Ready => "ready",
        JobState::Error => "error",
    }
}

fn store_from_config(config: &config::Config) -> anyhow::Result<QueueStore> {
    let store = match &config.queue.state_path {
        Some(path) => QueueStore::at(path.clone()),
        None => QueueStore::open_default()?,
    };
    Ok(store.with_retention_hours(config.queue.retention_hours))
}

fn handle_demo(count: usize, preset: Option<String>, flaky: bool) {
    let config = config::Config::load().unwrap_or_default();
    let preset_id = preset.unwrap_or_else(|| config.demo.preset.clone());

    let preset = match engine::get_preset(&preset_id) {
        Some(p) => p,
        None => {
            eprintln!(
                "Unknown preset '{}'. Run 'exportq presets' for the catalog.",
                preset_id
            );
            process::exit(1);
        }
    };

    let library = Arc::new(StaticAssetLibrary::sample());
    let pool: Vec<AssetRef> = library
        .assets()
        .iter()
        .filter(|a| preset.applies_to(a.kind))
        .cloned()
        .collect();
    if pool.is_empty() {
        eprintln!("No sample asset matches preset '{}'", preset_id);
        process::exit(1);
    }
    let selected: Vec<AssetRef> = pool.iter().cloned().cycle().take(count).collect();

    // The demo always starts from a clean slate in a temp location
    let store = QueueStore::at(std::env::temp_dir().join("exportq-demo-state.json"));
    if let Err(e) = store.clear() {
        eprintln!("Error clearing old demo state: {:#}", e);
        process::exit(1);
    }

    let tick = Duration::from_millis(config.demo.tick_ms.max(1));
    let mut provider = SimulatedTranscodeProvider::new(tick);
    if flaky {
        if let Some(last) = selected.last() {
            provider = provider.failing_when_key_contains(&last.storage_key);
        }
    }

    let queue = ExportQueue::open(store, provider, library.clone());

    println!(
        "Enqueueing {} export(s) with preset {}...",
        selected.len(),
        preset.id
    );
    for asset in selected {
        match queue.enqueue(asset, preset.id) {
            Ok(job) => println!(
                "  {} {} [{}]",
                job.id,
                job.asset.display_name,
                state_label(job.state)
            ),
            Err(e) => {
                eprintln!("Error: {:#}", e);
                process::exit(1);
            }
        }
    }

    // Subscribe after enqueueing; the initial snapshot carries anything
    // that already finished, so nothing is missed
    let updates = queue.subscribe();

    let started = Instant::now();
    let mut last_state: HashMap<Uuid, JobState> = HashMap::new();
    let mut last_bucket: HashMap<Uuid, u32> = HashMap::new();
    let mut final_jobs: Vec<ExportJob> = queue.list(None);

    loop {
        let snapshot = match updates.recv() {
            Ok(snapshot) => snapshot,
            Err(_) => break,
        };

        for job in &snapshot {
            let changed = last_state.get(&job.id) != Some(&job.state);
            if changed {
                last_state.insert(job.id, job.state);
                match job.state {
                    JobState::Queued => {}
                    JobState::Processing => {
                        println!("> processing {}", job.asset.display_name);
                    }
                    JobState::Ready => {
                        let size = job
                            .result_size_bytes
                            .map(format_bytes)
                            .unwrap_or_else(|| "original file".to_string());
                        println!(
                            "+ ready      {} ({}) {}",
                            job.asset.display_name,
                            size,
                            job.result_url.as_deref().unwrap_or("-")
                        );
                    }
                    JobState::Error => {
                        println!(
                            "! failed     {}: {}",
                            job.asset.display_name,
                            job.error.as_deref().unwrap_or("unknown failure")
                        );
                    }
                }
            } else if job.state == JobState::Processing {
                // Progress in 25% steps keeps the output short
                let bucket = (job.progress_pct / 25.0) as u32;
                let prev = last_bucket.get(&job.id).copied().unwrap_or(0);
                if bucket > prev {
                    last_bucket.insert(job.id, bucket);
                    println!("  ... {} {:.0}%", job.asset.display_name, job.progress_pct);
                }
            }
        }

        let stats = QueueStats::from_jobs(&snapshot);
        final_jobs = snapshot;
        if stats.all_terminal() {
            break;
        }
    }

    let stats = QueueStats::from_jobs(&final_jobs);
    println!();
    println!(
        "Done in {}: {} ready, {} failed, {} of output",
        format_duration(started.elapsed().as_secs_f64()),
        stats.ready,
        stats.failed,
        format_bytes(stats.result_bytes)
    );

    if let Some(warning) = queue.persistence_warning() {
        eprintln!("Warning: {}", warning);
    }
}

fn handle_presets() {
    println!("{:<12} {:<22} {:<28} KINDS", "ID", "LABEL", "OUTPUT");
    for preset in engine::PRESETS {
        let kinds = preset
            .kinds
            .iter()
            .map(|k| format!("{:?}", k).to_lowercase())
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "{:<12} {:<22} {:<28} {}",
            preset.id,
            preset.label,
            preset.contract.summary(),
            kinds
        );
    }
}

fn handle_status() {
    let config = config::Config::load().unwrap_or_default();
    let store = match store_from_config(&config) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    };

    println!("Queue state file: {}", store.path().display());
    if !store.exists() {
        println!("No persisted queue state.");
        return;
    }

    let jobs = store.load(Utc::now());
    let stats = QueueStats::from_jobs(&jobs);
    println!(
        "{} job(s): {} queued, {} ready, {} failed",
        stats.total(),
        stats.queued,
        stats.ready,
        stats.failed
    );

    for job in &jobs {
        match job.state {
            JobState::Ready => {
                let size = job
                    .result_size_bytes
                    .map(format_bytes)
                    .unwrap_or_else(|| "original file".to_string());
                println!(
                    "  {:<10} {} -> {} ({}, {})",
                    state_label(job.state),
                    job.asset.display_name,
                    job.preset_id,
                    size,
                    job.result_url.as_deref().unwrap_or("-")
                );
            }
            JobState::Error => {
                println!(
                    "  {:<10} {} -> {} ({})",
                    state_label(job.state),
                    job.asset.display_name,
                    job.preset_id,
                    job.error.as_deref().unwrap_or("unknown failure")
                );
            }
            _ => {
                println!(
                    "  {:<10} {} -> {}",
                    state_label(job.state),
                    job.asset.display_name,
                    job.preset_id
                );
            }
        }
    }
}

fn handle_clear() {
    let config = config::Config::load().unwrap_or_default();
    let store = match store_from_config(&config) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    };

    if !store.exists() {
        println!("Nothing to clear at {}", store.path().display());
        return;
    }

    match store.clear() {
        Ok(()) => println!("Removed {}", store.path().display()),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn handle_init_config() {
    match config::Config::load() {
        Ok(cfg) => {
            match config::Config::config_path() {
                Ok(path) => println!("Config loaded successfully from {}", path.display()),
                Err(e) => println!("Config loaded, but config path unknown: {:#}", e),
            }
            println!("{:#?}", cfg);
        }
        Err(e) => {
            println!("Config missing or invalid: {:#}", e);
            println!("Creating default config...");

            let cfg = config::Config::default();
            if let Err(err) = cfg.save() {
                eprintln!("Failed to save default config: {:#}", err);
                process::exit(1);
            } else {
                match config::Config::config_path() {
                    Ok(path) => println!("Default config saved to {}", path.display()),
                    Err(e) => println!("Default config saved (path unknown): {:#}", e),
                }
            }
        }
    }
}
