//! Domain types shared by the chunker, both indexes and the fusion ranker.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Stable chunk identity: owning document plus sequence index.
///
/// Ordered by `(document_id, sequence)` so `paper:2` sorts before
/// `paper:10`. Rendered and serialised as `{document_id}:{sequence}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ChunkId {
    document_id: String,
    sequence: u32,
}

impl ChunkId {
    pub fn new(document_id: impl Into<String>, sequence: u32) -> Self {
        Self { document_id: document_id.into(), sequence }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.document_id, self.sequence)
    }
}

impl FromStr for ChunkId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        // Document ids may themselves contain ':'; the sequence is always last.
        let (doc, seq) = s
            .rsplit_once(':')
            .ok_or_else(|| Error::InvalidArgument(format!("chunk id '{s}' has no ':' separator")))?;
        if doc.is_empty() {
            return Err(Error::InvalidArgument(format!("chunk id '{s}' has an empty document id")));
        }
        let sequence = seq
            .parse::<u32>()
            .map_err(|e| Error::InvalidArgument(format!("chunk id '{s}': bad sequence: {e}")))?;
        Ok(Self::new(doc, sequence))
    }
}

impl From<ChunkId> for String {
    fn from(id: ChunkId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for ChunkId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// Best-effort metadata for one newspaper issue.
///
/// Every field except `source` may be unknown; absence is `None`, never a
/// sentinel value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Newspaper title, e.g. "Daily Worker".
    pub source: String,
    pub publication_date: Option<NaiveDate>,
    pub volume: Option<u32>,
    pub issue: Option<u32>,
    pub page_number: Option<u32>,
    pub section: Option<String>,
    pub source_url: Option<String>,
    pub language: Option<String>,
}

/// One source newspaper issue with its raw OCR text. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self { id: id.into(), text: text.into(), metadata }
    }
}

/// The atomic retrieval unit: an overlapping word window of a document.
///
/// `start_word..end_word` is the half-open word range in the parent
/// document. Metadata is copied from the parent so filters need no join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
    pub start_word: usize,
    pub end_word: usize,
    pub metadata: DocumentMetadata,
}

impl Chunk {
    pub fn document_id(&self) -> &str {
        self.id.document_id()
    }

    pub fn sequence(&self) -> u32 {
        self.id.sequence()
    }

    pub fn publication_date(&self) -> Option<NaiveDate> {
        self.metadata.publication_date
    }

    pub fn word_count(&self) -> usize {
        self.end_word - self.start_word
    }
}

/// Inclusive publication-date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    from: NaiveDate,
    to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(Error::InvalidArgument(format!("date range start {from} is after end {to}")));
        }
        Ok(Self { from, to })
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    /// Undated chunks never fall inside a range.
    pub fn contains(&self, date: Option<NaiveDate>) -> bool {
        date.is_some_and(|d| self.from <= d && d <= self.to)
    }
}

/// Indicates which index produced a ranking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Lexical,
    Vector,
}

/// The minimal surface returned by both indexes.
///
/// `score` is index-specific (BM25 or cosine) but higher is always better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: ChunkId,
    pub score: f32,
    pub source: SourceKind,
}

/// One fused, filtered and hydrated result handed to consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub chunk_id: ChunkId,
    pub score: f32,
    pub document_id: String,
    pub source: String,
    pub publication_date: Option<NaiveDate>,
    pub page_number: Option<u32>,
    pub text: String,
    /// 1-based rank in the lexical candidate list, if present there.
    pub lexical_rank: Option<usize>,
    /// 1-based rank in the vector candidate list, if present there.
    pub vector_rank: Option<usize>,
}

impl RetrievalResult {
    /// e.g. `Daily Worker, June 01, 1945, p. 3`
    pub fn citation(&self) -> String {
        let date = self
            .publication_date
            .map_or_else(|| "undated".to_string(), |d| d.format("%B %d, %Y").to_string());
        let page = self.page_number.map_or_else(|| "N/A".to_string(), |p| p.to_string());
        format!("{}, {}, p. {}", self.source, date, page)
    }
}

/// Attached to an otherwise successful response when filtering left fewer
/// results than requested after exhausting the allowed breadth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialResults {
    pub requested: usize,
    pub returned: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn chunk_id_orders_numerically_within_document() {
        let mut ids = vec![ChunkId::new("a", 10), ChunkId::new("b", 0), ChunkId::new("a", 2)];
        ids.sort();
        let rendered: Vec<String> = ids.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["a:2", "a:10", "b:0"]);
    }

    #[test]
    fn chunk_id_parses_with_colons_in_document_id() {
        let id: ChunkId = "per:daily-worker:7".parse().unwrap();
        assert_eq!(id.document_id(), "per:daily-worker");
        assert_eq!(id.sequence(), 7);
        assert!("nocolon".parse::<ChunkId>().is_err());
        assert!(":3".parse::<ChunkId>().is_err());
        assert!("doc:x".parse::<ChunkId>().is_err());
    }

    #[test]
    fn chunk_id_serialises_as_string() {
        let id = ChunkId::new("paper_1945-06-01", 3);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"paper_1945-06-01:3\"");
        let back: ChunkId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn date_range_is_inclusive_and_rejects_undated() {
        let range = DateRange::new(date(1940, 1, 1), date(1950, 1, 1)).unwrap();
        assert!(range.contains(Some(date(1940, 1, 1))));
        assert!(range.contains(Some(date(1950, 1, 1))));
        assert!(range.contains(Some(date(1945, 6, 1))));
        assert!(!range.contains(Some(date(1939, 12, 31))));
        assert!(!range.contains(None));
        assert!(DateRange::new(date(1950, 1, 1), date(1940, 1, 1)).is_err());
    }

    #[test]
    fn citation_format() {
        let mut result = RetrievalResult {
            chunk_id: ChunkId::new("dw", 0),
            score: 0.5,
            document_id: "dw".into(),
            source: "Daily Worker".into(),
            publication_date: Some(date(1945, 6, 1)),
            page_number: Some(3),
            text: String::new(),
            lexical_rank: None,
            vector_rank: Some(1),
        };
        assert_eq!(result.citation(), "Daily Worker, June 01, 1945, p. 3");
        result.publication_date = None;
        result.page_number = None;
        assert_eq!(result.citation(), "Daily Worker, undated, p. N/A");
    }
}
