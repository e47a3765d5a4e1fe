//! TF-IDF vocabulary fitting.
//!
//! A [`VocabularyModel`] maps each retained term to a dense index
//! `0..k-1` and an IDF weight. Models are immutable: a refit builds a new
//! model and the [`ModelRegistry`](crate::registry::ModelRegistry)
//! publishes it in place of the old one.
//!
//! # Algorithm
//!
//! 1. Tokenize every document of the corpus.
//! 2. Count per term the total occurrences and the number of documents
//!    containing it (document frequency).
//! 3. Rank terms by total occurrences, descending; ties by term, ascending.
//! 4. Keep the top `max_features` and index them in ranked order.
//! 5. `idf = log10((N + 1) / (df + 1)) + 1` for a corpus of `N` documents.
//!
//! The smoothing keeps every weight strictly positive: a term present in
//! every document gets exactly `1.0`.

use std::collections::{HashMap, HashSet};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::models::{now_millis, CorpusEntry};
use crate::tokenize::tokenize;

/// Default vocabulary width, matching the 384-dim output of MiniLM-class
/// sentence embedders so downstream consumers see a familiar shape.
pub const MAX_FEATURES: usize = 384;

/// A fitted term → (index, IDF) mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct VocabularyModel {
    terms: Vec<String>,
    idf: Vec<f64>,
    index: HashMap<String, usize>,
    version: u64,
    corpus_fingerprint: String,
    corpus_size: usize,
    fitted_at: i64,
}

impl Default for VocabularyModel {
    fn default() -> Self {
        Self::empty()
    }
}

impl VocabularyModel {
    /// The "never fit" model: no terms, version 0.
    pub fn empty() -> Self {
        Self {
            terms: Vec::new(),
            idf: Vec::new(),
            index: HashMap::new(),
            version: 0,
            corpus_fingerprint: String::new(),
            corpus_size: 0,
            fitted_at: 0,
        }
    }

    /// Fit a vocabulary on `corpus`, retaining at most `max_features` terms.
    ///
    /// The returned model is unversioned (`version == 0`); publishing it
    /// through the registry assigns its version.
    pub fn fit<S: AsRef<str>>(corpus: &[S], max_features: usize) -> Self {
        let mut model = Self::empty();
        model.fitted_at = now_millis();
        model.corpus_size = corpus.len();

        if corpus.is_empty() {
            debug!("fit on empty corpus; vocabulary is empty");
            return model;
        }

        let mut total_freq: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for doc in corpus {
            let tokens = tokenize(doc.as_ref());
            let mut seen: HashSet<&str> = HashSet::new();
            for token in &tokens {
                *total_freq.entry(token.clone()).or_insert(0) += 1;
                if seen.insert(token.as_str()) {
                    *doc_freq.entry(token.clone()).or_insert(0) += 1;
                }
            }
        }

        let mut ranked: Vec<(String, usize)> = total_freq.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        debug!(
            "top terms by frequency: {:?}",
            ranked
                .iter()
                .take(15)
                .map(|(t, c)| format!("{}({})", t, c))
                .collect::<Vec<_>>()
        );

        ranked.truncate(max_features);

        let n = corpus.len() as f64;
        for (i, (term, _)) in ranked.into_iter().enumerate() {
            let df = doc_freq.get(&term).copied().unwrap_or(1) as f64;
            model.idf.push(((n + 1.0) / (df + 1.0)).log10() + 1.0);
            model.index.insert(term.clone(), i);
            model.terms.push(term);
        }

        debug!(
            "fit on {} documents: {} terms, most discriminative: {:?}",
            corpus.len(),
            model.len(),
            model
                .top_by_idf(10)
                .iter()
                .map(|(t, w)| format!("{}({:.2})", t, w))
                .collect::<Vec<_>>()
        );

        model
    }

    /// Rebuild a model from persisted `(term, idf)` pairs in index order.
    pub fn from_parts(
        terms: Vec<(String, f64)>,
        version: u64,
        corpus_fingerprint: String,
        corpus_size: usize,
        fitted_at: i64,
    ) -> Self {
        let mut model = Self {
            version,
            corpus_fingerprint,
            corpus_size,
            fitted_at,
            ..Self::empty()
        };
        for (i, (term, idf)) in terms.into_iter().enumerate() {
            model.index.insert(term.clone(), i);
            model.terms.push(term);
            model.idf.push(idf);
        }
        model
    }

    /// Record the fingerprint of the corpus this model was fit on.
    pub fn with_fingerprint(mut self, fingerprint: String) -> Self {
        self.corpus_fingerprint = fingerprint;
        self
    }

    pub(crate) fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Number of retained terms (the vector dimensionality).
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// True once a non-empty vocabulary has been fit.
    pub fn is_fit(&self) -> bool {
        !self.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn corpus_fingerprint(&self) -> &str {
        &self.corpus_fingerprint
    }

    pub fn corpus_size(&self) -> usize {
        self.corpus_size
    }

    pub fn fitted_at(&self) -> i64 {
        self.fitted_at
    }

    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.index_of(term).map(|i| self.idf[i])
    }

    pub fn idf_at(&self, index: usize) -> f64 {
        self.idf[index]
    }

    pub fn contains(&self, term: &str) -> bool {
        self.index.contains_key(term)
    }

    /// Terms with their IDF, in index order.
    pub fn terms(&self) -> impl Iterator<Item = (&str, f64)> {
        self.terms
            .iter()
            .map(String::as_str)
            .zip(self.idf.iter().copied())
    }

    /// The `n` terms with the highest IDF (most discriminative).
    pub fn top_by_idf(&self, n: usize) -> Vec<(&str, f64)> {
        let mut all: Vec<(&str, f64)> = self.terms().collect();
        all.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        all.truncate(n);
        all
    }
}

/// SHA-256 over the ordered `(document_id, text)` pairs of a corpus.
///
/// Two corpora with the same fingerprint produce the same model, so a
/// refit is only needed when the fingerprint changes.
pub fn corpus_fingerprint(corpus: &[CorpusEntry]) -> String {
    let mut hasher = Sha256::new();
    for entry in corpus {
        hasher.update(entry.document_id.as_bytes());
        hasher.update([0u8]);
        hasher.update((entry.text.len() as u64).to_le_bytes());
        hasher.update(entry.text.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
