use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use gloss::cache::{RenderCache, RenderedBlock};
use gloss::discovery::{self, DiscoveryConfig};
use gloss::lint::{self, FileStats, LintConfig};
use gloss::reader;

#[derive(Parser, Debug)]
#[command(name = "gloss")]
#[command(about = "Resolve and lint annotations on lecture code snippets")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check every annotated snippet under a content directory
    Lint {
        /// Root directory to scan for lecture JSON files
        root_dir: PathBuf,

        /// Abort on first unreadable file
        #[arg(long)]
        fail_fast: bool,

        /// Walk the directory tree on multiple threads
        #[arg(long)]
        parallel_discovery: bool,

        /// Exit with an error if any annotation is unresolved
        #[arg(long)]
        deny_warnings: bool,

        /// Suppress console progress bars
        #[arg(long)]
        no_progress: bool,

        /// Files linted concurrently (defaults to the CPU count)
        #[arg(long)]
        jobs: Option<usize>,

        /// File name suffix of lecture content files
        #[arg(long, default_value = ".json")]
        suffix: String,

        /// Stats output file path
        #[arg(long, default_value = "gloss_stats.json")]
        stats_out: PathBuf,
    },
    /// Print render segments for the snippets of one lecture as JSON
    Render {
        /// Lecture JSON file
        file: PathBuf,

        /// Only render the code example of this section index
        #[arg(long)]
        section: Option<usize>,
    },
}

#[derive(Serialize)]
struct RenderOutput<'a> {
    block_id: &'a str,
    language: &'a str,
    #[serde(flatten)]
    rendered: &'a RenderedBlock,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries render output, so logs go to stderr
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let args = Args::parse();
    info!(?args, "Parsed CLI arguments");

    match args.command {
        Command::Lint {
            root_dir,
            fail_fast,
            parallel_discovery,
            deny_warnings,
            no_progress,
            jobs,
            suffix,
            stats_out,
        } => {
            let discovery_config = DiscoveryConfig { fail_fast, suffix };
            let lint_config = LintConfig {
                fail_fast,
                max_concurrency: jobs.unwrap_or_else(num_cpus::get),
                show_progress: !no_progress,
            };
            run_lint(&root_dir, discovery_config, lint_config, parallel_discovery, deny_warnings, &stats_out).await
        }
        Command::Render { file, section } => run_render(&file, section).await,
    }
}

async fn run_lint(
    root_dir: &Path,
    discovery_config: DiscoveryConfig,
    lint_config: LintConfig,
    parallel_discovery: bool,
    deny_warnings: bool,
    stats_out: &Path,
) -> Result<()> {
    if !root_dir.exists() {
        anyhow::bail!("Root directory does not exist: {}", root_dir.display());
    }
    if !root_dir.is_dir() {
        anyhow::bail!("Root path is not a directory: {}", root_dir.display());
    }

    info!("Starting file discovery in: {}", root_dir.display());
    let discovered = if parallel_discovery {
        discovery::collect_discovered_files_parallel(root_dir, discovery_config).await?
    } else {
        discovery::collect_discovered_files(root_dir, discovery_config).await?
    };

    // A previous run's stats file may sit inside the content tree
    let stats_path = std::fs::canonicalize(stats_out).ok();
    let (valid, invalid): (Vec<_>, Vec<_>) = discovered
        .into_iter()
        .filter(|f| stats_path.is_none() || std::fs::canonicalize(&f.path).ok() != stats_path)
        .partition(|f| f.is_valid());

    println!("gloss v{} - lint", env!("CARGO_PKG_VERSION"));
    println!("Found {} lecture files ({} with issues)", valid.len() + invalid.len(), invalid.len());

    let paths: Vec<PathBuf> = valid.into_iter().map(|f| f.path).collect();
    let unreadable = invalid.into_iter().map(|f| {
        let error = f.error.unwrap_or_else(|| "File failed validation".to_string());
        FileStats::failed(&f.path, 0, error)
    });
    let stats = lint::lint_files_parallel(&paths, lint_config)
        .await?
        .with_failed_files(unreadable);

    for file in &stats.file_stats {
        if let Some(ref error) = file.error {
            println!("{}: error: {}", file.path, error);
        }
        for block in &file.blocks {
            for diagnostic in &block.diagnostics {
                println!("{}: {}: warning: {}", file.path, block.block_id, diagnostic);
            }
        }
    }

    println!("Lint complete:");
    println!("  Files processed: {}", stats.files_processed);
    if stats.files_failed > 0 {
        println!("  Files failed: {}", stats.files_failed);
    }
    println!("  Annotations resolved: {}/{}", stats.total_resolved, stats.total_rules);
    println!("  Diagnostics: {}", stats.total_diagnostics);

    lint::write_stats(stats_out, &stats).await?;
    info!("Wrote run statistics to {}", stats_out.display());

    if deny_warnings && (stats.has_diagnostics() || stats.files_failed > 0) {
        anyhow::bail!(
            "{} unresolved annotations and {} failed files",
            stats.total_diagnostics,
            stats.files_failed
        );
    }
    Ok(())
}

async fn run_render(file: &Path, section: Option<usize>) -> Result<()> {
    let lecture = reader::read_lecture_async(file).await?;
    let mut cache = RenderCache::new();

    let blocks = match section {
        Some(index) => match lecture.code_block(index) {
            Some(block) => vec![block],
            None => anyhow::bail!("Section {} of {} has no code example", index, file.display()),
        },
        None => lecture.code_blocks(),
    };

    let mut outputs = Vec::with_capacity(blocks.len());
    for (block, rules) in &blocks {
        let rendered = cache.get_or_render(block, rules);
        for diagnostic in &rendered.output.diagnostics {
            eprintln!("{}: warning: {}", block.id, diagnostic);
        }
        outputs.push((block, rendered));
    }

    let json: Vec<RenderOutput<'_>> = outputs
        .iter()
        .map(|(block, rendered)| RenderOutput {
            block_id: &block.id,
            language: &block.language,
            rendered,
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&json)?);

    Ok(())
}
