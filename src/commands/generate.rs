//! Generate static files

use anyhow::Result;
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode};
use std::time::{Duration, Instant};

use crate::content::loader::ContentLoader;
use crate::error::Error;
use crate::generator::Generator;
use crate::index::SiteIndex;
use crate::{Site, CONFIG_FILE};

/// Result of one generation run
#[derive(Debug, Default)]
pub struct Summary {
    pub posts: usize,
    pub tags: usize,
    pub drafts_skipped: usize,
    /// Documents left out of the site because they failed to parse
    pub failures: Vec<Error>,
    pub files_written: usize,
    /// Unresolved links and images
    pub warnings: usize,
}

/// Load, index and write the whole site.
///
/// Fails when any document is malformed, unless the site allows it.
pub fn run(site: &Site) -> Result<Summary> {
    let start = Instant::now();

    let loader = ContentLoader::new(site)?;
    let report = loader.load_posts()?;

    if !report.failures.is_empty() {
        for failure in &report.failures {
            tracing::error!("{}", failure);
        }
        if !site.config.allow_malformed {
            anyhow::bail!(
                "{} document(s) failed to parse, nothing was generated",
                report.failures.len()
            );
        }
        tracing::warn!(
            "Generating without {} malformed document(s)",
            report.failures.len()
        );
    }

    let index = SiteIndex::build(&report.posts);
    tracing::info!(
        "Loaded {} posts with {} tags",
        index.len(),
        index.tags().len()
    );

    let assets = loader.collect_assets();
    let generator = Generator::new(site)?;
    let output = generator.generate(&index, &assets)?;

    let summary = Summary {
        posts: index.len(),
        tags: index.tags().len(),
        drafts_skipped: report.drafts_skipped,
        failures: report.failures,
        files_written: output.files_written,
        warnings: output.warnings.len(),
    };

    tracing::info!(
        "Generated {} files in {:.2}s",
        summary.files_written,
        start.elapsed().as_secs_f64()
    );

    Ok(summary)
}

/// Watch the source directory and config file, regenerating on change.
///
/// Blocks until the watcher shuts down.
pub fn watch(site: &Site) -> Result<()> {
    let (tx, rx) = std::sync::mpsc::channel();

    // Create debouncer to avoid multiple rapid rebuilds
    let mut debouncer = new_debouncer(Duration::from_millis(500), tx)?;

    if site.source_dir.exists() {
        debouncer
            .watcher()
            .watch(&site.source_dir, RecursiveMode::Recursive)?;
        tracing::debug!("Watching: {:?}", site.source_dir);
    }

    let config_path = site.base_dir.join(CONFIG_FILE);
    if config_path.exists() {
        debouncer
            .watcher()
            .watch(&config_path, RecursiveMode::NonRecursive)?;
        tracing::debug!("Watching: {:?}", config_path);
    }

    tracing::info!("Watching for changes. Press Ctrl+C to stop.");

    let mut site = site.clone();
    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let changed: Vec<_> = events
                    .iter()
                    .filter(|e| {
                        let path_str = e.path.to_string_lossy();
                        !path_str.contains(".git")
                            && !path_str.contains(".DS_Store")
                            && !path_str.ends_with('~')
                    })
                    .collect();

                if changed.is_empty() {
                    continue;
                }
                for event in &changed {
                    tracing::info!("File changed: {}", event.path.display());
                }

                // Pick up config edits
                match Site::new(&site.base_dir) {
                    Ok(reloaded) => site = reloaded,
                    Err(e) => tracing::error!("Keeping previous config: {}", e),
                }

                match run(&site) {
                    Ok(summary) => tracing::info!(
                        "Regenerated {} posts ({} warnings)",
                        summary.posts,
                        summary.warnings
                    ),
                    Err(e) => tracing::error!("Generation failed: {}", e),
                }
            }
            Ok(Err(e)) => {
                tracing::error!("Watch error: {:?}", e);
            }
            Err(e) => {
                tracing::error!("Channel error: {:?}", e);
                break;
            }
        }
    }

    Ok(())
}
