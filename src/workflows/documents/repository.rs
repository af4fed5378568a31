use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::domain::{Document, DocumentId, MatchOutcome};

/// Storage abstraction so the service facade can be exercised in isolation.
///
/// `update` is compare-and-swap on the document's version token: the incoming
/// document must carry exactly `stored.version + 1`, otherwise the write is
/// stale and fails with [`RepositoryError::Conflict`].
pub trait DocumentRepository: Send + Sync {
    fn insert(&self, document: Document) -> Result<Document, RepositoryError>;
    fn update(&self, document: Document) -> Result<Document, RepositoryError>;
    fn fetch(&self, id: &DocumentId) -> Result<Option<Document>, RepositoryError>;
    /// Earliest-accepted non-deleted document sharing the counterparty key
    /// and clean invoice number inside the lookback window, excluding the
    /// document under test.
    fn find_collision(
        &self,
        counterparty_key: &str,
        invoice_number: &str,
        accepted_after: DateTime<Utc>,
        exclude: &DocumentId,
    ) -> Result<Option<Document>, RepositoryError>;
    /// Record the latest matching outcome for a document. One entry per
    /// document: re-evaluation replaces the earlier entry, so the readiness
    /// window counts documents, not evaluation runs.
    fn record_outcome(&self, outcome: MatchOutcome) -> Result<(), RepositoryError>;
    /// Most recent outcomes, newest last, capped at `limit`.
    fn recent_outcomes(&self, limit: usize) -> Result<Vec<MatchOutcome>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("document already exists")]
    AlreadyExists,
    #[error("stale write: stored document version does not match")]
    Conflict,
    #[error("document not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Default)]
struct Store {
    documents: BTreeMap<DocumentId, Document>,
    outcomes: Vec<MatchOutcome>,
}

/// In-memory repository backing the service, demos, and tests.
#[derive(Debug, Default)]
pub struct InMemoryDocumentRepository {
    store: Mutex<Store>,
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentRepository for InMemoryDocumentRepository {
    fn insert(&self, document: Document) -> Result<Document, RepositoryError> {
        let mut store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        if store.documents.contains_key(&document.id) {
            return Err(RepositoryError::AlreadyExists);
        }
        store.documents.insert(document.id.clone(), document.clone());
        Ok(document)
    }

    fn update(&self, document: Document) -> Result<Document, RepositoryError> {
        let mut store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        let stored = store
            .documents
            .get(&document.id)
            .ok_or(RepositoryError::NotFound)?;
        if document.version != stored.version + 1 {
            return Err(RepositoryError::Conflict);
        }
        store.documents.insert(document.id.clone(), document.clone());
        Ok(document)
    }

    fn fetch(&self, id: &DocumentId) -> Result<Option<Document>, RepositoryError> {
        let store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        Ok(store.documents.get(id).cloned())
    }

    fn find_collision(
        &self,
        counterparty_key: &str,
        invoice_number: &str,
        accepted_after: DateTime<Utc>,
        exclude: &DocumentId,
    ) -> Result<Option<Document>, RepositoryError> {
        let store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        let mut earliest: Option<&Document> = None;
        for document in store.documents.values() {
            if document.deleted
                || &document.id == exclude
                || document.accepted_at < accepted_after
                || document.counterparty_key() != Some(counterparty_key)
                || document.normalized.invoice_number.as_deref() != Some(invoice_number)
            {
                continue;
            }
            earliest = match earliest {
                Some(current) if current.accepted_at <= document.accepted_at => Some(current),
                _ => Some(document),
            };
        }
        Ok(earliest.cloned())
    }

    fn record_outcome(&self, outcome: MatchOutcome) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        store
            .outcomes
            .retain(|existing| existing.document_id != outcome.document_id);
        store.outcomes.push(outcome);
        Ok(())
    }

    fn recent_outcomes(&self, limit: usize) -> Result<Vec<MatchOutcome>, RepositoryError> {
        let store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        let start = store.outcomes.len().saturating_sub(limit);
        Ok(store.outcomes[start..].to_vec())
    }
}
