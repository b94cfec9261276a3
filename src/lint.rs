// Build-time linter: resolve every code block of every lecture and report what did not resolve.
// Files are linted concurrently on tokio tasks sharing one render cache.

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};

use crate::annotation::{AnnotationRule, CodeBlock, Diagnostic, DiagnosticReason, LineIndex, LineSpan};
use crate::cache::{ContentKey, RenderCache, RenderedBlock};
use crate::content::Lecture;
use crate::reader::{LectureReader, ReaderConfig};

#[derive(Debug, Clone)]
pub struct LintConfig {
    /// Stop at the first unreadable or unparsable file
    pub fail_fast: bool,
    /// Files linted at once
    pub max_concurrency: usize,
    pub show_progress: bool,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            max_concurrency: num_cpus::get(),
            show_progress: false,
        }
    }
}

/// Where one rule landed
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AnnotationReport {
    /// Authoring position of the rule
    pub order: usize,
    /// Byte offset of the claimed range start
    pub start: usize,
    /// Exclusive byte offset of the claimed range end
    pub end: usize,
    /// 1-based line/column of the range
    pub location: Option<LineSpan>,
}

/// Lint result for one code block
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BlockReport {
    /// `"{lecture_id}#{section_index}"`
    pub block_id: String,
    /// Language tag of the code example
    pub language: String,
    /// Number of authored annotation rules
    pub rules: usize,
    /// Rules that resolved, sorted by offset
    pub annotations: Vec<AnnotationReport>,
    /// Rules that did not resolve
    pub diagnostics: Vec<Diagnostic>,
}

/// Per-file lint statistics
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FileStats {
    /// Path to the lecture file
    pub path: String,
    /// Number of code sections in the lecture
    pub code_blocks: u64,
    /// Total annotation rules across all code sections
    pub rules: u64,
    /// Rules that resolved to a range
    pub resolved: u64,
    /// Rules reported as diagnostics
    pub diagnostics: u64,
    /// Time spent reading and linting this file
    pub processing_time_ms: u64,
    /// "success" or "failed"
    pub status: String,
    /// Read, parse or discovery error (None if successful)
    pub error: Option<String>,
    /// Per-block results, empty when the file failed
    pub blocks: Vec<BlockReport>,
}

impl FileStats {
    /// Stats for a file that could not be linted
    pub fn failed(path: &Path, processing_time_ms: u64, error: String) -> Self {
        Self {
            path: path.display().to_string(),
            code_blocks: 0,
            rules: 0,
            resolved: 0,
            diagnostics: 0,
            processing_time_ms,
            status: "failed".to_string(),
            error: Some(error),
            blocks: Vec::new(),
        }
    }
}

/// Aggregate statistics for one lint run
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RunStats {
    /// Unix seconds
    pub run_start: u64,
    pub total_processing_time_ms: u64,
    pub files_processed: u64,
    pub files_failed: u64,
    pub total_rules: u64,
    pub total_resolved: u64,
    pub total_diagnostics: u64,
    pub diagnostics_by_reason: BTreeMap<String, u64>,
    /// Sorted by path
    pub file_stats: Vec<FileStats>,
}

impl RunStats {
    fn from_files(run_start: u64, total_processing_time_ms: u64, mut file_stats: Vec<FileStats>) -> Self {
        file_stats.sort_by(|a, b| a.path.cmp(&b.path));

        let mut diagnostics_by_reason: BTreeMap<String, u64> = DiagnosticReason::ALL
            .iter()
            .map(|reason| (reason.as_str().to_string(), 0))
            .collect();
        for diagnostic in file_stats.iter().flat_map(|f| &f.blocks).flat_map(|b| &b.diagnostics) {
            *diagnostics_by_reason.entry(diagnostic.reason.as_str().to_string()).or_default() += 1;
        }

        Self {
            run_start,
            total_processing_time_ms,
            files_processed: file_stats.iter().filter(|f| f.error.is_none()).count() as u64,
            files_failed: file_stats.iter().filter(|f| f.error.is_some()).count() as u64,
            total_rules: file_stats.iter().map(|f| f.rules).sum(),
            total_resolved: file_stats.iter().map(|f| f.resolved).sum(),
            total_diagnostics: file_stats.iter().map(|f| f.diagnostics).sum(),
            diagnostics_by_reason,
            file_stats,
        }
    }

    pub fn has_diagnostics(&self) -> bool {
        self.total_diagnostics > 0
    }

    /// Add files that failed before linting (e.g. discovery validation) and recompute totals
    pub fn with_failed_files(self, failed: impl IntoIterator<Item = FileStats>) -> Self {
        let mut file_stats = self.file_stats;
        file_stats.extend(failed);
        Self::from_files(self.run_start, self.total_processing_time_ms, file_stats)
    }
}

/// Cache lookup and insert each take the lock briefly; resolution itself runs unlocked
fn render_shared(cache: &Mutex<RenderCache>, block: &CodeBlock, rules: &[AnnotationRule]) -> Arc<RenderedBlock> {
    let key = ContentKey::compute(&block.source_text, rules);
    let cached = cache.lock().unwrap_or_else(PoisonError::into_inner).get(&key);
    if let Some(rendered) = cached {
        return rendered;
    }

    let rendered = RenderedBlock::render(key, block, rules);
    cache.lock().unwrap_or_else(PoisonError::into_inner).insert(rendered)
}

/// Resolve every code block in a lecture
pub fn lint_lecture(lecture: &Lecture, cache: &Mutex<RenderCache>) -> Vec<BlockReport> {
    lecture
        .code_blocks()
        .into_iter()
        .map(|(block, rules)| {
            let rendered = render_shared(cache, &block, &rules);
            let index = LineIndex::new(&block.source_text);

            let annotations = rendered
                .output
                .resolved
                .iter()
                .map(|r| AnnotationReport {
                    order: r.order,
                    start: r.start,
                    end: r.end,
                    location: index.span(r.start, r.end),
                })
                .collect();

            for diagnostic in &rendered.output.diagnostics {
                debug!(block = %block.id, "{}", diagnostic);
            }

            BlockReport {
                block_id: block.id,
                language: block.language,
                rules: rules.len(),
                annotations,
                diagnostics: rendered.output.diagnostics.clone(),
            }
        })
        .collect()
}

async fn lint_file(path: PathBuf, reader: Arc<LectureReader>, cache: Arc<Mutex<RenderCache>>) -> Result<FileStats> {
    let start = Instant::now();
    let (lecture, read_stats) = reader.read_lecture(&path).await?;

    let Some(lecture) = lecture else {
        let error = read_stats
            .read_error
            .unwrap_or_else(|| "Lecture could not be read".to_string());
        return Ok(FileStats::failed(&path, start.elapsed().as_millis() as u64, error));
    };

    let blocks = lint_lecture(&lecture, &cache);

    let rules: usize = blocks.iter().map(|b| b.rules).sum();
    let resolved: usize = blocks.iter().map(|b| b.annotations.len()).sum();
    let diagnostics: usize = blocks.iter().map(|b| b.diagnostics.len()).sum();
    if diagnostics > 0 {
        warn!("{}: {} of {} annotations unresolved", path.display(), diagnostics, rules);
    }

    Ok(FileStats {
        path: path.display().to_string(),
        code_blocks: blocks.len() as u64,
        rules: rules as u64,
        resolved: resolved as u64,
        diagnostics: diagnostics as u64,
        processing_time_ms: start.elapsed().as_millis() as u64,
        status: "success".to_string(),
        error: None,
        blocks,
    })
}

fn progress_bar(len: usize, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} {msg}") {
        bar.set_style(style);
    }
    bar
}

/// Lint many lecture files concurrently and aggregate the results
pub async fn lint_files_parallel(paths: &[PathBuf], config: LintConfig) -> Result<RunStats> {
    let run_start = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let started = Instant::now();
    info!("Linting {} files with concurrency {}", paths.len(), config.max_concurrency);

    let reader = Arc::new(LectureReader::new(ReaderConfig {
        fail_fast: config.fail_fast,
        ..Default::default()
    }));
    let cache = Arc::new(Mutex::new(RenderCache::new()));
    let progress = progress_bar(paths.len(), config.show_progress);

    let mut results = stream::iter(paths.iter().cloned())
        .map(|path| {
            let reader = Arc::clone(&reader);
            let cache = Arc::clone(&cache);
            tokio::spawn(lint_file(path, reader, cache))
        })
        .buffer_unordered(config.max_concurrency.max(1));

    let mut file_stats = Vec::with_capacity(paths.len());
    while let Some(joined) = results.next().await {
        let stats = joined.context("Lint task panicked")??;
        progress.inc(1);
        progress.set_message(stats.path.clone());
        file_stats.push(stats);
    }
    progress.finish_and_clear();

    let cache_stats = cache.lock().unwrap_or_else(PoisonError::into_inner).stats();
    info!(
        hits = cache_stats.hits,
        misses = cache_stats.misses,
        entries = cache_stats.entries,
        "Render cache summary"
    );

    let run = RunStats::from_files(run_start, started.elapsed().as_millis() as u64, file_stats);
    info!(
        "Lint complete: {} files, {} failed, {}/{} annotations resolved",
        run.files_processed, run.files_failed, run.total_resolved, run.total_rules
    );
    Ok(run)
}

/// Write run statistics as pretty JSON
pub async fn write_stats(path: &Path, stats: &RunStats) -> Result<()> {
    let file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("Failed to create stats file {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    let json = serde_json::to_vec_pretty(stats)?;
    writer.write_all(&json).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
