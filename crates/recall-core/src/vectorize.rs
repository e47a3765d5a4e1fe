//! TF-IDF vectorization against a fitted [`VocabularyModel`].
//!
//! `weight(term) = (count(term) / total_tokens) * idf(term)`, where
//! `total_tokens` counts every token of the input, in-vocabulary or not,
//! so long noisy texts weigh less than short precise ones. The vector is
//! then L2-normalized; a vector with no matched terms stays all-zero.
//!
//! An all-zero vector is "unrepresentable" and must never be treated as a
//! nearest-neighbor candidate.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::embedding::l2_normalize;
use crate::error::{RecallError, Result};
use crate::tokenize::tokenize;
use crate::vocabulary::VocabularyModel;

/// Length of the zero vector returned when no model has been fit.
pub const DEFAULT_DIMENSIONS: usize = crate::vocabulary::MAX_FEATURES;

/// Transform `text` into a unit-length vector of `model.len()` dimensions.
///
/// Fails with [`RecallError::ModelNotFit`] if `model` is empty.
pub fn try_transform(text: &str, model: &VocabularyModel) -> Result<Vec<f32>> {
    if !model.is_fit() {
        return Err(RecallError::ModelNotFit);
    }

    let tokens = tokenize(text);
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for token in &tokens {
        if let Some(i) = model.index_of(token) {
            *counts.entry(i).or_insert(0) += 1;
        }
    }

    let mut vector = vec![0.0f32; model.len()];
    let total = tokens.len() as f64;
    for (&i, &count) in &counts {
        vector[i] = ((count as f64 / total) * model.idf_at(i)) as f32;
    }

    debug!(
        tokens = tokens.len(),
        matched = counts.len(),
        "transformed text under model v{}",
        model.version()
    );

    l2_normalize(&mut vector);
    Ok(vector)
}

/// Like [`try_transform`], but degrades to a zero vector of
/// [`DEFAULT_DIMENSIONS`] when no model has been fit.
pub fn transform(text: &str, model: &VocabularyModel) -> Vec<f32> {
    try_transform(text, model).unwrap_or_else(|_| {
        warn!("vocabulary not fit; returning zero vector");
        vec![0.0; DEFAULT_DIMENSIONS]
    })
}

/// Fit a model on `corpus` and transform every document with it.
pub fn fit_transform<S: AsRef<str>>(
    corpus: &[S],
    max_features: usize,
) -> (VocabularyModel, Vec<Vec<f32>>) {
    let model = VocabularyModel::fit(corpus, max_features);
    let vectors = corpus
        .iter()
        .map(|doc| transform(doc.as_ref(), &model))
        .collect();
    (model, vectors)
}
