use tantivy::tokenizer::{LowerCaser, RemoveLongFilter, SimpleTokenizer, StopWordFilter, TextAnalyzer};

/// English function words dropped when `bm25.remove_stopwords` is on.
pub const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it", "its", "of", "on",
    "that", "the", "to", "was", "will", "with", "or", "but", "not", "this", "these", "they", "them", "their", "there",
    "then", "than", "so", "if", "when", "where", "why", "how", "what", "which", "who", "whom", "whose", "can", "could",
    "should", "would", "may", "might", "must", "shall", "do", "does", "did", "have", "had", "having",
];

/// OCR noise produces very long garbage tokens; they never match a query.
const MAX_TOKEN_LEN: usize = 40;

/// The single tokenizer shared by index build and query.
#[derive(Clone)]
pub struct Analyzer {
    inner: TextAnalyzer,
    remove_stopwords: bool,
}

impl Analyzer {
    pub fn new(remove_stopwords: bool) -> Self {
        let inner = if remove_stopwords {
            TextAnalyzer::builder(SimpleTokenizer::default())
                .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
                .filter(LowerCaser)
                .filter(StopWordFilter::remove(STOP_WORDS.iter().map(|s| s.to_string())))
                .build()
        } else {
            TextAnalyzer::builder(SimpleTokenizer::default())
                .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
                .filter(LowerCaser)
                .build()
        };
        Self { inner, remove_stopwords }
    }

    pub fn removes_stopwords(&self) -> bool {
        self.remove_stopwords
    }

    /// Lower-cased alphanumeric terms in text order, duplicates kept.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        // token_stream needs &mut; analyzers are cheap to clone.
        let mut analyzer = self.inner.clone();
        let mut stream = analyzer.token_stream(text);
        let mut tokens = Vec::new();
        while stream.advance() {
            tokens.push(stream.token().text.clone());
        }
        tokens
    }
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer").field("remove_stopwords", &self.remove_stopwords).finish()
    }
}
