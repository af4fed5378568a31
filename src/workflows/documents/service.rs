use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use super::automation::{self, AutomationConfig, AutomationFlags, GateDecision, GateMode};
use super::domain::{
    Document, DocumentId, DocumentSubmission, DocumentType, MatchMethod, MatchOutcome, MatchResult,
    NormalizedFields, TransactionAction, ValidationCode, WarningCode, WorkflowEvent,
};
use super::duplicates;
use super::engine::{WorkflowError, WorkflowRegistry};
use super::matcher::{match_counterparty, AliasDirectory, CounterpartyDirectory, MatchHints};
use super::normalizer;
use super::readiness::{ReadinessConfig, ReadinessReport, ReadinessScorer};
use super::repository::{DocumentRepository, RepositoryError};

/// Outcomes window handed to the readiness scorer.
const OUTCOME_WINDOW: usize = 500;

static DOCUMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_document_id() -> DocumentId {
    let id = DOCUMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    DocumentId(format!("doc-{id:06}"))
}

/// Everything `process` produced, for callers that act on the verdict.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessReport {
    pub document: Document,
    pub match_result: MatchResult,
    pub decision: GateDecision,
}

/// Facade composing normalizer, matcher, duplicate detector, workflow
/// engine, and automation gate over an injected repository and directory.
pub struct DocumentIntakeService<R, D> {
    repository: Arc<R>,
    directory: Arc<D>,
    aliases: Arc<AliasDirectory>,
    registry: Arc<WorkflowRegistry>,
    flags: AutomationFlags,
    automation: AutomationConfig,
    scorer: ReadinessScorer,
}

impl<R, D> DocumentIntakeService<R, D>
where
    R: DocumentRepository + 'static,
    D: CounterpartyDirectory + 'static,
{
    pub fn new(
        repository: Arc<R>,
        directory: Arc<D>,
        aliases: Arc<AliasDirectory>,
        flags: AutomationFlags,
        automation: AutomationConfig,
        readiness: ReadinessConfig,
    ) -> Self {
        Self {
            repository,
            directory,
            aliases,
            registry: Arc::new(WorkflowRegistry::standard()),
            flags,
            automation,
            scorer: ReadinessScorer::new(readiness),
        }
    }

    /// Accept a classified document and store it in its type's initial
    /// state with normalized fields populated.
    pub fn ingest(
        &self,
        submission: DocumentSubmission,
    ) -> Result<Document, DocumentServiceError> {
        let initial = self.registry.initial_state(submission.doc_type)?;
        let normalized = normalize_fields(&submission);

        let document = Document {
            id: next_document_id(),
            doc_type: submission.doc_type,
            source_system: submission.source_system,
            capture_channel: submission.capture_channel,
            raw: submission.raw,
            normalized,
            ai_confidence: submission.ai_confidence,
            vendor_canonical: None,
            vendor_match_method: MatchMethod::Unmatched,
            match_score: 0.0,
            possible_duplicate: false,
            duplicate_of: None,
            validation_errors: Default::default(),
            validation_warnings: Default::default(),
            draft_candidate: false,
            workflow_status: initial,
            workflow_history: Vec::new(),
            transaction_action: TransactionAction::None,
            bc_record_id: None,
            version: 1,
            accepted_at: Utc::now(),
            deleted: false,
        };

        let stored = self.repository.insert(document)?;
        info!(document_id = %stored.id, doc_type = stored.doc_type.label(), "document ingested");
        Ok(stored)
    }

    /// Resolve the counterparty, check for duplicates, validate, and run the
    /// automation gate. Idempotent: re-running never double-applies a side
    /// effect thanks to the `bc_record_id` guard and the action latch.
    pub fn process(&self, id: &DocumentId) -> Result<ProcessReport, DocumentServiceError> {
        self.process_with_mode(id, GateMode::Standard)
    }

    /// Manual reprocess entry point: the gate runs with draft creation
    /// categorically disabled, so a previously-touched document can only
    /// ever be linked.
    pub fn reprocess(&self, id: &DocumentId) -> Result<ProcessReport, DocumentServiceError> {
        self.process_with_mode(id, GateMode::Reprocess)
    }

    fn process_with_mode(
        &self,
        id: &DocumentId,
        mode: GateMode,
    ) -> Result<ProcessReport, DocumentServiceError> {
        let mut document = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        let now = Utc::now();

        let hints = MatchHints {
            vendor_number: document.raw.vendor_number.as_deref(),
        };
        let match_result = match_counterparty(
            document.normalized.vendor.as_deref(),
            hints,
            self.directory.as_ref(),
            self.aliases.as_ref(),
            self.automation.fuzzy_floor,
            now,
        );

        document.vendor_canonical = match_result.canonical_id.clone();
        document.vendor_match_method = match_result.method;
        document.match_score = match_result.score;

        let duplicate_of = duplicates::find_duplicate(
            &document,
            self.repository.as_ref(),
            self.automation.duplicate_lookback_days,
            now,
        )?;
        document.possible_duplicate = duplicate_of.is_some();
        document.duplicate_of = duplicate_of;

        validate(&mut document, &self.automation);

        let decision = automation::evaluate(
            &document,
            &match_result,
            &self.flags,
            &self.automation,
            mode,
        );
        apply_verdict(&mut document, &decision);

        document.version += 1;
        let stored = match self.repository.update(document) {
            Ok(stored) => stored,
            Err(RepositoryError::Conflict) => {
                return Err(WorkflowError::ConcurrentModification { id: id.clone() }.into())
            }
            Err(other) => return Err(other.into()),
        };

        // Recorded only once the write has won the version race; a stale
        // evaluation leaves no trace in the readiness window.
        self.repository.record_outcome(MatchOutcome {
            document_id: stored.id.clone(),
            counterparty_id: match_result.canonical_id.clone(),
            method: match_result.method,
            score: match_result.score,
            observed_at: now,
        })?;

        info!(
            document_id = %stored.id,
            action = decision.action.label(),
            method = match_result.method.label(),
            "document processed"
        );

        Ok(ProcessReport {
            document: stored,
            match_result,
            decision,
        })
    }

    /// Apply a workflow event through the engine and persist the result
    /// under optimistic concurrency.
    pub fn apply_event(
        &self,
        id: &DocumentId,
        event: WorkflowEvent,
        actor: &str,
    ) -> Result<Document, DocumentServiceError> {
        let document = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        let updated = self.registry.apply(&document, event, actor, Utc::now())?;

        match self.repository.update(updated) {
            Ok(stored) => {
                info!(
                    document_id = %stored.id,
                    event = event.label(),
                    status = stored.workflow_status.label(),
                    "workflow event applied"
                );
                Ok(stored)
            }
            Err(RepositoryError::Conflict) => {
                Err(WorkflowError::ConcurrentModification { id: id.clone() }.into())
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Record the ERP record id once downstream code has created it. The
    /// guard is permanent: a different id for a document that already has
    /// one is a conflict, re-recording the same id is a no-op.
    pub fn record_bc_reference(
        &self,
        id: &DocumentId,
        bc_record_id: &str,
    ) -> Result<Document, DocumentServiceError> {
        let mut document = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;

        if let Some(existing) = &document.bc_record_id {
            if existing == bc_record_id {
                return Ok(document);
            }
            return Err(DocumentServiceError::BcReferenceConflict {
                id: id.clone(),
                existing: existing.clone(),
            });
        }

        document.bc_record_id = Some(bc_record_id.to_string());
        document.version += 1;
        match self.repository.update(document) {
            Ok(stored) => Ok(stored),
            Err(RepositoryError::Conflict) => {
                Err(WorkflowError::ConcurrentModification { id: id.clone() }.into())
            }
            Err(other) => Err(other.into()),
        }
    }

    pub fn get(&self, id: &DocumentId) -> Result<Document, DocumentServiceError> {
        let document = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(document)
    }

    /// Readiness report over the recent outcome window.
    pub fn readiness(&self) -> Result<ReadinessReport, DocumentServiceError> {
        let outcomes = self.repository.recent_outcomes(OUTCOME_WINDOW)?;
        Ok(self.scorer.score(&outcomes, Utc::now()))
    }
}

fn normalize_fields(submission: &DocumentSubmission) -> NormalizedFields {
    let raw = &submission.raw;
    NormalizedFields {
        vendor: raw
            .vendor
            .as_deref()
            .and_then(normalizer::normalize_vendor_name),
        invoice_number: raw
            .invoice_number
            .as_deref()
            .and_then(normalizer::normalize_invoice_number),
        amount: raw.amount.as_deref().and_then(normalizer::normalize_amount),
        due_date: raw
            .due_date
            .as_deref()
            .and_then(normalizer::normalize_date),
        po_number: raw
            .po_number
            .as_deref()
            .and_then(normalizer::normalize_po_number),
    }
}

/// Derive validation errors and warnings from the current field state.
/// Validation failures block approval-ready progression; they never crash
/// processing.
fn validate(document: &mut Document, config: &AutomationConfig) {
    document.validation_errors.clear();
    document.validation_warnings.clear();

    let monetary = matches!(
        document.doc_type,
        DocumentType::PurchaseInvoice | DocumentType::SalesInvoice | DocumentType::CreditMemo
    );

    if monetary {
        if document.normalized.invoice_number.is_none() {
            document
                .validation_errors
                .insert(ValidationCode::MissingInvoiceNumber);
        }
        match (&document.raw.amount, &document.normalized.amount) {
            (None, _) => {
                document
                    .validation_errors
                    .insert(ValidationCode::MissingAmount);
            }
            (Some(_), None) => {
                document
                    .validation_errors
                    .insert(ValidationCode::UnparseableAmount);
            }
            _ => {}
        }
        if document.vendor_match_method == MatchMethod::Unmatched {
            document
                .validation_errors
                .insert(ValidationCode::VendorUnmatched);
        }
    }

    if config.po_required_types.contains(&document.doc_type)
        && document.normalized.po_number.is_none()
    {
        document
            .validation_errors
            .insert(ValidationCode::MissingPurchaseOrder);
    }

    if document.raw.due_date.is_some() && document.normalized.due_date.is_none() {
        document
            .validation_warnings
            .insert(WarningCode::AmbiguousDate);
    }
    if document.ai_confidence < config.min_ai_confidence {
        document
            .validation_warnings
            .insert(WarningCode::LowExtractionConfidence);
    }
    if document.vendor_match_method == MatchMethod::Fuzzy {
        document
            .validation_warnings
            .insert(WarningCode::FuzzyVendorMatch);
    }
}

/// Fold the gate verdict into the document. The action only ever moves
/// upward; `DraftCreated` is reached at most once and never downgraded.
fn apply_verdict(document: &mut Document, decision: &GateDecision) {
    match (document.transaction_action, decision.action) {
        (TransactionAction::DraftCreated, _) => {}
        (_, TransactionAction::DraftCreated) => {
            document.transaction_action = TransactionAction::DraftCreated;
            document.draft_candidate = true;
        }
        (TransactionAction::None, TransactionAction::LinkedOnly) => {
            document.transaction_action = TransactionAction::LinkedOnly;
        }
        _ => {}
    }
}

/// Error raised by the document intake service.
#[derive(Debug, thiserror::Error)]
pub enum DocumentServiceError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("ERP record '{existing}' already registered for document {id}")]
    BcReferenceConflict { id: DocumentId, existing: String },
}
