//! `jarlock update` – fetch and hash builds missing from each lock file.

use anyhow::{Context, Result};
use jarlock_core::catalog::catalog_for;
use jarlock_core::config::JarlockConfig;
use jarlock_core::fetcher::{ArtifactHasher, CurlHasher};
use jarlock_core::http::HttpClient;
use jarlock_core::retry::RetryPolicy;
use jarlock_core::update::{update_lock, UpdateEvent, UpdateOptions};
use std::path::Path;
use std::sync::Arc;

use super::select_sources;

pub async fn run_update(
    cfg: &JarlockConfig,
    work_dir: &Path,
    sources: &[String],
    jobs: Option<usize>,
    lock: Option<&Path>,
) -> Result<()> {
    let selected = select_sources(cfg, sources)?;
    if lock.is_some() && selected.len() != 1 {
        anyhow::bail!("--lock requires exactly one --source");
    }

    let http = HttpClient::from_config(cfg);
    let retry = RetryPolicy::from(&cfg.retry_config());
    let hasher: Arc<dyn ArtifactHasher> = Arc::new(CurlHasher::new(http, retry));
    let mut opts = UpdateOptions::from(cfg);
    if let Some(n) = jobs {
        opts.max_concurrent = n;
    }

    let mut total_added = 0usize;
    let mut total_failed = 0usize;
    for source in selected {
        let lock_path = lock
            .map(Path::to_path_buf)
            .unwrap_or_else(|| source.lock_path_in(work_dir));
        let catalog = catalog_for(source, http, retry)?;
        println!("[{}] loading lock file {}", source.name, lock_path.display());

        let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel::<UpdateEvent>(16);
        let name = source.name.clone();
        let progress_handle = tokio::spawn(async move {
            while let Some(event) = progress_rx.recv().await {
                print_event(&name, &event);
            }
        });

        let report = update_lock(
            &lock_path,
            catalog,
            Arc::clone(&hasher),
            &opts,
            Some(progress_tx),
        )
        .await
        .with_context(|| format!("updating {}", source.name))?;
        let _ = progress_handle.await;

        println!("[{}] Updated {} builds", source.name, report.added);
        if report.failed > 0 {
            println!(
                "[{}] {} build(s) could not be fetched; they will be retried next run",
                source.name, report.failed
            );
        }
        total_added += report.added;
        total_failed += report.failed;
    }

    tracing::info!("update finished: {} added, {} failed", total_added, total_failed);
    Ok(())
}

fn print_event(source: &str, event: &UpdateEvent) {
    match event {
        UpdateEvent::Planned { listed, pending } => {
            println!("[{}] {} builds upstream, {} new", source, listed, pending)
        }
        UpdateEvent::Added { version, build } => {
            println!("[{}]   + {} build {}", source, version, build)
        }
        UpdateEvent::Rejected { version, build } => {
            println!("[{}]   x {} build {} (marked failed upstream)", source, version, build)
        }
        UpdateEvent::Failed { version, build } => {
            println!("[{}]   ! {} build {} (fetch failed)", source, version, build)
        }
    }
}
