use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use newsrag_core::types::{Chunk, DateRange};

/// Metadata predicates applied to fused candidates before truncation.
///
/// An empty filter admits every chunk. With a date range, undated chunks
/// are always excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    pub date_range: Option<DateRange>,
    /// Newspaper titles to keep; `None` keeps all.
    pub sources: Option<BTreeSet<String>>,
}

impl SearchFilter {
    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = Some(sources.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.date_range.is_none() && self.sources.is_none()
    }

    pub fn matches(&self, chunk: &Chunk) -> bool {
        if let Some(range) = &self.date_range {
            if !range.contains(chunk.publication_date()) {
                return false;
            }
        }
        if let Some(sources) = &self.sources {
            if !sources.contains(&chunk.metadata.source) {
                return false;
            }
        }
        true
    }
}
