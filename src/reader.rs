use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::content::Lecture;

/// Configuration for lecture file reading
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Return the first read/parse error instead of recording it in `ReadStats`
    pub fail_fast: bool,
    /// Buffer size for async reading (default: 8KB)
    pub buffer_size: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            buffer_size: 8192,
        }
    }
}

/// Statistics for a single lecture file read
#[derive(Debug, Clone)]
pub struct ReadStats {
    /// Path to the lecture file
    pub file_path: String,
    /// Bytes read from disk
    pub bytes_read: u64,
    /// Sections in the parsed lecture
    pub sections: u64,
    /// Sections carrying a code example
    pub code_blocks: u64,
    /// Time spent reading and parsing
    pub duration_ms: u64,
    /// Read or parse error (None if successful)
    pub read_error: Option<String>,
}

impl ReadStats {
    fn failed(path: &Path, bytes_read: u64, duration_ms: u64, error: String) -> Self {
        Self {
            file_path: path.display().to_string(),
            bytes_read,
            sections: 0,
            code_blocks: 0,
            duration_ms,
            read_error: Some(error),
        }
    }
}

/// Async reader that loads and parses lecture JSON files
pub struct LectureReader {
    config: ReaderConfig,
}

impl LectureReader {
    pub fn new(config: ReaderConfig) -> Self {
        Self { config }
    }

    /// Read and parse one lecture file.
    ///
    /// Without `fail_fast`, failures come back as `(None, stats)` with `read_error` set.
    /// A lecture without an `id` takes the file stem.
    pub async fn read_lecture<P: AsRef<Path>>(&self, file_path: P) -> Result<(Option<Lecture>, ReadStats)> {
        let path = file_path.as_ref();
        let start_time = std::time::Instant::now();

        debug!("Starting async read of file: {}", path.display());

        let (content, bytes_read) = match self.read_to_string(path).await {
            Ok(read) => read,
            Err(e) => {
                let error_msg = format!("{e:#}");
                warn!("{}", error_msg);
                if self.config.fail_fast {
                    return Err(e);
                }
                let stats = ReadStats::failed(path, 0, start_time.elapsed().as_millis() as u64, error_msg);
                return Ok((None, stats));
            }
        };

        let mut lecture = match Lecture::from_json(&content)
            .with_context(|| format!("Failed to parse lecture {}", path.display()))
        {
            Ok(lecture) => lecture,
            Err(e) => {
                let error_msg = format!("{e:#}");
                warn!("{}", error_msg);
                if self.config.fail_fast {
                    return Err(e);
                }
                let stats = ReadStats::failed(path, bytes_read, start_time.elapsed().as_millis() as u64, error_msg);
                return Ok((None, stats));
            }
        };

        if lecture.id.is_empty() {
            lecture.id = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "lecture".to_string());
        }

        let stats = ReadStats {
            file_path: path.display().to_string(),
            bytes_read,
            sections: lecture.sections.len() as u64,
            code_blocks: lecture.code_blocks().len() as u64,
            duration_ms: start_time.elapsed().as_millis() as u64,
            read_error: None,
        };

        info!(
            "Read {}: {} sections, {} code blocks, {} bytes in {}ms",
            path.display(),
            stats.sections,
            stats.code_blocks,
            stats.bytes_read,
            stats.duration_ms
        );

        Ok((Some(lecture), stats))
    }

    async fn read_to_string(&self, path: &Path) -> Result<(String, u64)> {
        let file = File::open(path)
            .await
            .with_context(|| format!("Failed to open file {}", path.display()))?;

        let mut reader = BufReader::with_capacity(self.config.buffer_size, file);
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .await
            .with_context(|| format!("Failed to read file {}", path.display()))?;

        let bytes_read = bytes.len() as u64;
        let content = String::from_utf8(bytes)
            .with_context(|| format!("UTF-8 decoding error in {}", path.display()))?;
        Ok((content, bytes_read))
    }

    /// Read several files one after another, keeping per-file stats
    pub async fn read_lectures_batch<P: AsRef<Path>>(
        &self,
        file_paths: &[P],
    ) -> Result<Vec<(Option<Lecture>, ReadStats)>> {
        info!("Starting batch read of {} files", file_paths.len());

        let mut results = Vec::with_capacity(file_paths.len());
        for file_path in file_paths {
            results.push(self.read_lecture(file_path).await?);
        }

        info!("Completed batch read of {} files", results.len());
        Ok(results)
    }
}

/// Read a single lecture with default configuration, failing on any error
pub async fn read_lecture_async<P: AsRef<Path>>(file_path: P) -> Result<Lecture> {
    let reader = LectureReader::new(ReaderConfig {
        fail_fast: true,
        ..Default::default()
    });
    let (lecture, _stats) = reader.read_lecture(file_path).await?;
    lecture.context("Lecture reader returned no lecture")
}
