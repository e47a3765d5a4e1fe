//! Process-wide holder of the current vocabulary model.
//!
//! The registry stores an `Arc<VocabularyModel>` behind a lock. Readers
//! take a snapshot (an `Arc` clone) and keep using that exact model for
//! the whole operation; a refit publishes a new `Arc` with the next
//! version number. The old model stays alive for as long as a reader
//! still holds it.
//!
//! A refit that must persist its model first uses [`ModelRegistry::prepare`]
//! and [`ModelRegistry::publish_prepared`], so a failed save never leaves
//! an unpersisted model current.

use std::sync::{Arc, RwLock, RwLockWriteGuard};

use tracing::info;

use crate::error::{RecallError, Result};
use crate::vocabulary::VocabularyModel;

pub struct ModelRegistry {
    current: RwLock<Arc<VocabularyModel>>,
}

impl ModelRegistry {
    /// A registry holding the empty, never-fit model.
    pub fn new() -> Self {
        Self::with_model(VocabularyModel::empty())
    }

    /// A registry seeded with a previously persisted model.
    pub fn with_model(model: VocabularyModel) -> Self {
        Self {
            current: RwLock::new(Arc::new(model)),
        }
    }

    /// The current model.
    pub fn snapshot(&self) -> Arc<VocabularyModel> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Version of the current model (0 if never fit).
    pub fn version(&self) -> u64 {
        self.snapshot().version()
    }

    /// Vocabulary size of the current model.
    pub fn vocabulary_size(&self) -> usize {
        self.snapshot().len()
    }

    /// Replace the current model with `model`, stamped with the next
    /// version number. Returns the published snapshot.
    pub fn publish(&self, model: VocabularyModel) -> Arc<VocabularyModel> {
        let mut guard = self.write();
        let published = Arc::new(model.with_version(guard.version() + 1));
        *guard = Arc::clone(&published);
        log_published(&published);
        published
    }

    /// Stamp `model` with the version the next publish would assign,
    /// without making it current. Pair with
    /// [`publish_prepared`](Self::publish_prepared) once the model has been
    /// persisted.
    pub fn prepare(&self, model: VocabularyModel) -> VocabularyModel {
        model.with_version(self.version() + 1)
    }

    /// Make a [`prepare`](Self::prepare)d model current.
    ///
    /// Fails with [`RecallError::ModelChanged`] if another model was
    /// published in between; the registry is left untouched.
    pub fn publish_prepared(&self, model: VocabularyModel) -> Result<Arc<VocabularyModel>> {
        let mut guard = self.write();
        let current = guard.version();
        if model.version() != current + 1 {
            return Err(RecallError::ModelChanged {
                expected: model.version().saturating_sub(1),
                actual: current,
            });
        }
        let published = Arc::new(model);
        *guard = Arc::clone(&published);
        log_published(&published);
        Ok(published)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Arc<VocabularyModel>> {
        match self.current.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn log_published(model: &VocabularyModel) {
    info!(
        "published vocabulary v{} ({} terms, {} documents)",
        model.version(),
        model.len(),
        model.corpus_size()
    );
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::MAX_FEATURES;

    #[test]
    fn test_new_registry_is_unfit() {
        let registry = ModelRegistry::new();
        assert_eq!(registry.version(), 0);
        assert_eq!(registry.vocabulary_size(), 0);
        assert!(!registry.snapshot().is_fit());
    }

    #[test]
    fn test_publish_bumps_version() {
        let registry = ModelRegistry::new();
        let v1 = registry.publish(VocabularyModel::fit(&["alpha beta"], MAX_FEATURES));
        assert_eq!(v1.version(), 1);
        let v2 = registry.publish(VocabularyModel::fit(&["gamma"], MAX_FEATURES));
        assert_eq!(v2.version(), 2);
        assert_eq!(registry.version(), 2);
        assert_eq!(registry.vocabulary_size(), 1);
    }

    #[test]
    fn test_snapshot_outlives_publish() {
        let registry = ModelRegistry::new();
        registry.publish(VocabularyModel::fit(&["alpha beta"], MAX_FEATURES));
        let snapshot = registry.snapshot();
        registry.publish(VocabularyModel::fit(&["gamma delta epsilon"], MAX_FEATURES));
        assert_eq!(snapshot.version(), 1);
        assert!(snapshot.contains("alpha"));
        assert_eq!(registry.snapshot().version(), 2);
        assert!(!registry.snapshot().contains("alpha"));
    }

    #[test]
    fn test_seeded_registry_continues_versioning() {
        let persisted = VocabularyModel::from_parts(
            vec![("alpha".to_string(), 1.0)],
            41,
            "fp".to_string(),
            1,
            0,
        );
        let registry = ModelRegistry::with_model(persisted);
        assert_eq!(registry.version(), 41);
        let next = registry.publish(VocabularyModel::fit(&["beta"], MAX_FEATURES));
        assert_eq!(next.version(), 42);
    }

    #[test]
    fn test_prepared_model_is_not_current_until_published() {
        let registry = ModelRegistry::new();
        let prepared = registry.prepare(VocabularyModel::fit(&["alpha beta"], MAX_FEATURES));
        assert_eq!(prepared.version(), 1);
        assert_eq!(registry.version(), 0);
        assert!(!registry.snapshot().is_fit());

        let published = registry.publish_prepared(prepared).unwrap();
        assert_eq!(published.version(), 1);
        assert_eq!(registry.version(), 1);
        assert!(registry.snapshot().contains("alpha"));
    }

    #[test]
    fn test_dropped_prepared_model_leaves_version_free() {
        let registry = ModelRegistry::new();
        let abandoned = registry.prepare(VocabularyModel::fit(&["alpha"], MAX_FEATURES));
        drop(abandoned);
        let retried = registry.prepare(VocabularyModel::fit(&["alpha"], MAX_FEATURES));
        assert_eq!(retried.version(), 1);
    }

    #[test]
    fn test_publish_prepared_rejects_outdated_model() {
        let registry = ModelRegistry::new();
        let prepared = registry.prepare(VocabularyModel::fit(&["alpha"], MAX_FEATURES));
        registry.publish(VocabularyModel::fit(&["beta"], MAX_FEATURES));

        let err = registry.publish_prepared(prepared).unwrap_err();
        assert!(matches!(
            err,
            RecallError::ModelChanged {
                expected: 0,
                actual: 1
            }
        ));
        assert!(registry.snapshot().contains("beta"));
    }
}
