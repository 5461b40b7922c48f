//! Closed-vocabulary TF-IDF vectorizer
//!
//! The vocabulary is fit exactly once, at startup, against a small seed
//! corpus and never grows afterwards. Stored values are projected onto that
//! fixed vocabulary, so words the corpus never saw contribute nothing. That
//! keeps writes free of any re-indexing work; search quality for genuinely
//! novel vocabulary is the price.
//!
//! Vectorization follows the usual scikit-learn defaults for this setup:
//! tokens of two or more word characters, English stop words removed,
//! unigrams plus bigrams, `max_df = 0.95`, smoothed idf
//! (`ln((1 + n) / (1 + df)) + 1`), raw term counts. Every vector is padded to
//! the configured dimension `D` and L2-normalized, so cosine similarity is a
//! plain dot product.

use crate::error::{MemoryError, Result};
use crate::search::normalize::normalize_text;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

/// Terms appearing in more than this share of seed documents are dropped
const MAX_DF: f64 = 0.95;

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("static regex is valid"));

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and",
        "any", "are", "as", "at", "be", "because", "been", "before", "being", "below", "between",
        "both", "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during",
        "each", "either", "etc", "every", "few", "for", "from", "further", "had", "has", "have",
        "having", "he", "her", "here", "hers", "herself", "him", "himself", "his", "how", "however",
        "i", "if", "in", "into", "is", "it", "its", "itself", "just", "me", "more", "most", "my",
        "myself", "no", "nor", "not", "now", "of", "off", "on", "once", "only", "or", "other",
        "our", "ours", "ourselves", "out", "over", "own", "same", "she", "should", "so", "some",
        "such", "than", "that", "the", "their", "theirs", "them", "themselves", "then", "there",
        "these", "they", "this", "those", "through", "to", "too", "under", "until", "up", "very",
        "was", "we", "were", "what", "when", "where", "which", "while", "who", "whom", "why",
        "will", "with", "would", "you", "your", "yours", "yourself", "yourselves",
    ]
    .into_iter()
    .collect()
});

/// Built-in seed corpus: the vocabulary of a coding-assistant CLI session
pub const DEFAULT_SEED_CORPUS: &[&str] = &[
    "Store the project configuration in a TOML file under the home directory",
    "The coder agent asks the model for code and runs it in a subprocess with a timeout",
    "Search previous conversations for the error message and the stack trace",
    "Refactor the Python script to use async functions and await network calls",
    "The Rust crate exposes a library API and a command line binary",
    "Write unit tests for the parser and run them before every commit",
    "Fix the bug where the database connection is never closed",
    "Summarize the pull request and list the files that changed",
    "The API key is read from an environment variable at startup",
    "Cache model responses by prompt hash to save tokens and cost",
    "Export the memory namespace to a JSON document and import it later",
    "Explain the difference between a thread pool and an event loop",
    "The web scraper downloads the page and extracts links with CSS selectors",
    "Use git to create a branch, commit the patch and open a pull request",
    "Log every request and response with a timestamp and a session id",
    "Check the docker container logs and the GPU memory usage",
    "Generate a SQL query that counts users grouped by signup date",
    "Remember that the user prefers short answers with code examples",
    "Install the package dependencies and build the release binary",
    "The function returns an error when the input file is missing",
    "Deploy the server behind a reverse proxy with TLS enabled",
    "Convert the JavaScript module to TypeScript with strict types",
    "Profile the slow endpoint and add an index to the database table",
    "Review the code for security issues such as SQL injection and leaked secrets",
];

/// A fitted, immutable TF-IDF model
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f32>,
    dimension: usize,
    max_text_len: usize,
    fingerprint: String,
}

impl TfidfVectorizer {
    /// Fit the vocabulary against `corpus`, keeping at most `dimension` terms
    pub fn fit<S: AsRef<str>>(corpus: &[S], dimension: usize, max_text_len: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(MemoryError::Validation("TF-IDF dimension must be positive".into()));
        }

        let docs: Vec<Vec<String>> = corpus
            .iter()
            .map(|doc| analyze(&normalize_text(doc.as_ref(), max_text_len)))
            .filter(|terms| !terms.is_empty())
            .collect();

        let n_docs = docs.len();
        let mut doc_freq: BTreeMap<&str, usize> = BTreeMap::new();
        let mut term_freq: BTreeMap<&str, usize> = BTreeMap::new();

        for terms in &docs {
            let mut seen = HashSet::new();
            for term in terms {
                *term_freq.entry(term.as_str()).or_default() += 1;
                if seen.insert(term.as_str()) {
                    *doc_freq.entry(term.as_str()).or_default() += 1;
                }
            }
        }

        let max_doc_count = MAX_DF * n_docs as f64;
        let mut candidates: Vec<(&str, usize)> = term_freq
            .into_iter()
            .filter(|(term, _)| doc_freq[term] as f64 <= max_doc_count)
            .collect();

        if candidates.is_empty() {
            return Err(MemoryError::Validation(
                "seed corpus produced an empty vocabulary".into(),
            ));
        }

        // Most frequent terms win; alphabetical within equal frequency
        candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        candidates.truncate(dimension);

        let mut terms: Vec<&str> = candidates.into_iter().map(|(term, _)| term).collect();
        terms.sort_unstable();

        let vocabulary: HashMap<String, usize> = terms
            .iter()
            .enumerate()
            .map(|(idx, term)| (term.to_string(), idx))
            .collect();

        let idf: Vec<f32> = terms
            .iter()
            .map(|term| {
                let df = doc_freq[term] as f64;
                (((1.0 + n_docs as f64) / (1.0 + df)).ln() + 1.0) as f32
            })
            .collect();

        let fingerprint = fingerprint(&terms, &idf, dimension);

        info!(
            "TF-IDF vectorizer fit on {} documents ({} terms, dimension {})",
            n_docs,
            terms.len(),
            dimension
        );

        Ok(Self {
            vocabulary,
            idf,
            dimension,
            max_text_len,
            fingerprint,
        })
    }

    /// Fit against [`DEFAULT_SEED_CORPUS`]
    pub fn with_default_corpus(dimension: usize, max_text_len: usize) -> Result<Self> {
        Self::fit(DEFAULT_SEED_CORPUS, dimension, max_text_len)
    }

    /// Fit against a file holding one seed document per line
    pub fn from_seed_file(path: &Path, dimension: usize, max_text_len: usize) -> Result<Self> {
        debug!("Reading TF-IDF seed corpus from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        let docs: Vec<&str> = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        Self::fit(&docs, dimension, max_text_len)
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Identifies this exact model; cached vectors from another model are stale
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn normalize(&self, text: &str) -> String {
        normalize_text(text, self.max_text_len)
    }

    /// Normalize and vectorize raw text
    pub fn transform(&self, text: &str) -> Vec<f32> {
        self.transform_normalized(&self.normalize(text))
    }

    /// Vectorize text that already went through [`TfidfVectorizer::normalize`]
    pub fn transform_normalized(&self, normalized: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for term in analyze(normalized) {
            if let Some(&idx) = self.vocabulary.get(&term) {
                vector[idx] += self.idf[idx];
            }
        }

        l2_normalize(&mut vector);
        vector
    }
}

/// Cosine similarity; 0.0 for zero vectors or mismatched lengths
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Unigrams and bigrams after stop-word removal
fn analyze(normalized: &str) -> Vec<String> {
    let words: Vec<&str> = TOKEN
        .find_iter(normalized)
        .map(|m| m.as_str())
        .filter(|w| !STOP_WORDS.contains(w))
        .collect();

    let mut terms: Vec<String> = words.iter().map(|w| w.to_string()).collect();
    terms.extend(words.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])));
    terms
}

fn fingerprint(terms: &[&str], idf: &[f32], dimension: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update((dimension as u64).to_le_bytes());
    for (term, weight) in terms.iter().zip(idf) {
        hasher.update(term.as_bytes());
        hasher.update([0u8]);
        hasher.update(weight.to_le_bytes());
    }
    format!("{:x}", hasher.finalize())
}
