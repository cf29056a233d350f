//! Document source: turns a directory of OCR `.txt` files into documents
//! and chunks.
//!
//! Publication metadata is best effort. It comes from a sidecar
//! `<stem>.json` when present, otherwise from the file name or the
//! archive-style parent directory. An unknown date stays `None`.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::chunker::Chunker;
use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::{Chunk, Document, DocumentMetadata};

static NAME_THEN_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)_(\d{4}-\d{2}-\d{2})(?:_p?(\d+))?$").expect("valid regex"));
static DATE_THEN_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})_(.+?)(?:_p?(\d+))?$").expect("valid regex"));
static ARCHIVE_DIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^per_(.+?)_(\d{4}-\d{2}-\d{2})_(\d+)_(\d+)$").expect("valid regex"));
static ANY_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2})").expect("valid regex"));

/// Sidecar metadata file written next to an OCR text file.
#[derive(Debug, Deserialize)]
struct Sidecar {
    newspaper_name: Option<String>,
    publication_date: Option<String>,
    page_number: Option<u32>,
    section: Option<String>,
    source_url: Option<String>,
    volume: Option<u32>,
    issue: Option<u32>,
    language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// What happened during one ingestion batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub total_files: usize,
    pub processed_files: usize,
    pub failures: Vec<IngestFailure>,
    pub total_chunks: usize,
    pub total_words: usize,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub sources: Vec<String>,
}

impl IngestReport {
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    fn record(&mut self, doc: &Document, chunks: usize) {
        self.processed_files += 1;
        self.total_chunks += chunks;
        self.total_words += doc.text.split_whitespace().count();
        if let Some(d) = doc.metadata.publication_date {
            self.date_range = Some(match self.date_range {
                Some((lo, hi)) => (lo.min(d), hi.max(d)),
                None => (d, d),
            });
        }
    }
}

/// Documents, their chunks and the batch report.
#[derive(Debug, Default)]
pub struct Ingested {
    pub documents: Vec<Document>,
    pub chunks: Vec<Chunk>,
    pub report: IngestReport,
}

pub struct DataProcessor {
    chunker: Chunker,
}

impl DataProcessor {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        Ok(Self { chunker: Chunker::new(config)? })
    }

    pub fn process_directory(&self, data_dir: &Path) -> Result<Ingested> {
        self.process_files(data_dir, list_txt_files(data_dir)?)
    }

    pub fn process_directory_limited(&self, data_dir: &Path, limit: usize) -> Result<Ingested> {
        let mut files = list_txt_files(data_dir)?;
        if files.len() > limit {
            files.truncate(limit);
            info!(limit, "limited ingestion to first files");
        }
        self.process_files(data_dir, files)
    }

    fn process_files(&self, data_dir: &Path, files: Vec<PathBuf>) -> Result<Ingested> {
        let mut out = Ingested::default();
        out.report.total_files = files.len();
        if files.is_empty() {
            warn!(dir = %data_dir.display(), "no .txt files found");
            return Ok(out);
        }
        let mut sources = BTreeSet::new();
        for (i, path) in files.iter().enumerate() {
            debug!(n = i + 1, of = files.len(), path = %path.display(), "processing file");
            let result = load_document(path, data_dir).and_then(|doc| {
                let chunks = self.chunker.chunk(&doc)?;
                Ok((doc, chunks))
            });
            match result {
                Ok((doc, chunks)) => {
                    out.report.record(&doc, chunks.len());
                    sources.insert(doc.metadata.source.clone());
                    out.chunks.extend(chunks);
                    out.documents.push(doc);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping document");
                    out.report.failures.push(IngestFailure { path: path.clone(), reason: e.to_string() });
                }
            }
        }
        out.report.sources = sources.into_iter().collect();
        info!(
            files = out.report.processed_files,
            chunks = out.report.total_chunks,
            failures = out.report.failures.len(),
            "processed directory"
        );
        Ok(out)
    }
}

/// Read one OCR file and resolve its metadata. The document id is the path
/// relative to `root` without extension, which stays unique across issue
/// directories that reuse page file names.
pub fn load_document(path: &Path, root: &Path) -> Result<Document> {
    let id = document_id(path, root);
    let raw = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => String::from_utf8_lossy(&fs::read(path)?).to_string(),
    };
    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return Err(Error::MalformedDocument { id, reason: "no text content".into() });
    }
    let metadata = resolve_metadata(path).map_err(|reason| Error::MalformedDocument { id: id.clone(), reason })?;
    Ok(Document { id, text, metadata })
}

fn document_id(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path).with_extension("");
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn parse_date(s: &str, origin: &Path) -> Option<NaiveDate> {
    let parsed = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok();
    if parsed.is_none() {
        warn!(value = s, path = %origin.display(), "ignoring invalid publication date");
    }
    parsed
}

/// `daily-worker_the-worker` -> `The Worker`
fn title_from_slug(slug: &str) -> String {
    let last = slug.rsplit('_').next().unwrap_or(slug);
    last.split('-')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            chars.next().map_or_else(String::new, |first| first.to_uppercase().chain(chars).collect())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolve metadata for `path`; `Err` carries the reason a sidecar was unusable.
pub fn resolve_metadata(path: &Path) -> std::result::Result<DocumentMetadata, String> {
    let sidecar = path.with_extension("json");
    if sidecar.is_file() {
        let raw = fs::read_to_string(&sidecar).map_err(|e| format!("unreadable sidecar: {e}"))?;
        let meta: Sidecar = serde_json::from_str(&raw).map_err(|e| format!("malformed sidecar json: {e}"))?;
        return Ok(DocumentMetadata {
            source: meta.newspaper_name.unwrap_or_else(|| "Unknown".to_string()),
            publication_date: meta.publication_date.as_deref().and_then(|d| parse_date(d, &sidecar)),
            volume: meta.volume,
            issue: meta.issue,
            page_number: meta.page_number,
            section: meta.section,
            source_url: meta.source_url,
            language: meta.language,
        });
    }

    let stem = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
    if let Some(caps) = NAME_THEN_DATE.captures(&stem) {
        return Ok(DocumentMetadata {
            source: caps[1].replace('_', " "),
            publication_date: parse_date(&caps[2], path),
            page_number: caps.get(3).and_then(|m| m.as_str().parse().ok()),
            ..DocumentMetadata::default()
        });
    }
    if let Some(caps) = DATE_THEN_NAME.captures(&stem) {
        return Ok(DocumentMetadata {
            source: caps[2].replace('_', " "),
            publication_date: parse_date(&caps[1], path),
            page_number: caps.get(3).and_then(|m| m.as_str().parse().ok()),
            ..DocumentMetadata::default()
        });
    }

    let parent = path
        .parent()
        .and_then(Path::file_name)
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    if let Some(caps) = ARCHIVE_DIR.captures(&parent) {
        return Ok(DocumentMetadata {
            source: title_from_slug(&caps[1]),
            publication_date: parse_date(&caps[2], path),
            volume: caps[3].parse().ok(),
            issue: caps[4].parse().ok(),
            source_url: Some(format!("https://archive.org/details/{parent}")),
            ..DocumentMetadata::default()
        });
    }
    if let Some(caps) = ANY_DATE.captures(&parent) {
        return Ok(DocumentMetadata {
            source: parent.clone(),
            publication_date: parse_date(&caps[1], path),
            ..DocumentMetadata::default()
        });
    }

    debug!(path = %path.display(), "no publication metadata found");
    Ok(DocumentMetadata { source: stem, ..DocumentMetadata::default() })
}

fn list_txt_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(Error::InvalidArgument(format!("{} is not a directory", root.display())));
    }
    let mut txt_files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("txt"))
        .map(|e| e.path().to_path_buf())
        .collect();
    txt_files.sort();
    Ok(txt_files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn filename_patterns() {
        let meta = resolve_metadata(Path::new("/x/Chicago_Defender_1945-06-01_p3.txt")).unwrap();
        assert_eq!(meta.source, "Chicago Defender");
        assert_eq!(meta.publication_date, date(1945, 6, 1));
        assert_eq!(meta.page_number, Some(3));

        let meta = resolve_metadata(Path::new("/x/1930-01-01_the_worker.txt")).unwrap();
        assert_eq!(meta.source, "the worker");
        assert_eq!(meta.publication_date, date(1930, 1, 1));
        assert_eq!(meta.page_number, None);
    }

    #[test]
    fn archive_directory_pattern() {
        let path = Path::new("/data/per_daily-worker_the-worker_1960-12-31_37_52/page_0001.txt");
        let meta = resolve_metadata(path).unwrap();
        assert_eq!(meta.source, "The Worker");
        assert_eq!(meta.publication_date, date(1960, 12, 31));
        assert_eq!((meta.volume, meta.issue), (Some(37), Some(52)));
        assert_eq!(
            meta.source_url.as_deref(),
            Some("https://archive.org/details/per_daily-worker_the-worker_1960-12-31_37_52")
        );

        let meta = resolve_metadata(Path::new("/d/per_daily-worker_1945-06-01_22_130/p.txt")).unwrap();
        assert_eq!(meta.source, "Daily Worker");
    }

    #[test]
    fn impossible_or_missing_dates_are_none() {
        let meta = resolve_metadata(Path::new("/x/Gazette_1945-02-30.txt")).unwrap();
        assert_eq!(meta.publication_date, None);
        assert_eq!(meta.source, "Gazette");

        let meta = resolve_metadata(Path::new("/x/loose_scan.txt")).unwrap();
        assert_eq!(meta.publication_date, None);
        assert_eq!(meta.source, "loose_scan");
    }

    #[test]
    fn title_from_slug_uses_last_segment() {
        assert_eq!(title_from_slug("daily-worker"), "Daily Worker");
        assert_eq!(title_from_slug("daily-worker_daily-worker"), "Daily Worker");
        assert_eq!(title_from_slug("daily-worker_the-worker"), "The Worker");
    }
}
