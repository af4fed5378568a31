//! Per-document-type state machines, expressed as transition tables.
//!
//! Each [`DocumentType`] owns a declarative `(state, event) -> state` table;
//! adding a document type means adding a table here, not editing a
//! dispatcher. Tables are built once and immutable at runtime.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use super::domain::{
    Document, DocumentId, DocumentType, TransitionRecord, WorkflowEvent, WorkflowState,
};

use WorkflowEvent as E;
use WorkflowState as S;

/// Errors the engine surfaces to callers; everything else in the pipeline
/// degrades into document fields instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("event '{}' is not valid from state '{}' for {}", event.label(), state.label(), doc_type.label())]
    InvalidTransition {
        doc_type: DocumentType,
        state: WorkflowState,
        event: WorkflowEvent,
    },
    #[error("document {id} was modified concurrently; re-read and retry")]
    ConcurrentModification { id: DocumentId },
    #[error("no workflow is defined for document type {}", .0.label())]
    UndefinedWorkflow(DocumentType),
}

/// Static, versioned transition table for one document type.
#[derive(Debug, Clone)]
pub struct WorkflowDefinition {
    doc_type: DocumentType,
    initial: WorkflowState,
    terminals: BTreeSet<WorkflowState>,
    transitions: BTreeMap<(WorkflowState, WorkflowEvent), WorkflowState>,
}

impl WorkflowDefinition {
    fn new(
        doc_type: DocumentType,
        initial: WorkflowState,
        terminals: &[WorkflowState],
        edges: &[(WorkflowState, WorkflowEvent, WorkflowState)],
    ) -> Self {
        let transitions = edges
            .iter()
            .map(|(from, event, to)| ((*from, *event), *to))
            .collect();
        Self {
            doc_type,
            initial,
            terminals: terminals.iter().copied().collect(),
            transitions,
        }
    }

    pub fn doc_type(&self) -> DocumentType {
        self.doc_type
    }

    pub fn initial_state(&self) -> WorkflowState {
        self.initial
    }

    pub fn is_terminal(&self, state: WorkflowState) -> bool {
        self.terminals.contains(&state)
    }

    pub fn transition(&self, state: WorkflowState, event: WorkflowEvent) -> Option<WorkflowState> {
        self.transitions.get(&(state, event)).copied()
    }

    /// Events accepted from `state`.
    pub fn events_from(&self, state: WorkflowState) -> BTreeSet<WorkflowEvent> {
        self.transitions
            .keys()
            .filter(|(from, _)| *from == state)
            .map(|(_, event)| *event)
            .collect()
    }

    /// Every state mentioned by the table, for graph sanity checks.
    pub fn states(&self) -> BTreeSet<WorkflowState> {
        let mut states: BTreeSet<WorkflowState> = self.terminals.clone();
        states.insert(self.initial);
        for ((from, _), to) in &self.transitions {
            states.insert(*from);
            states.insert(*to);
        }
        states
    }
}

/// One immutable definition per document type, loaded once at startup.
#[derive(Debug)]
pub struct WorkflowRegistry {
    definitions: BTreeMap<DocumentType, WorkflowDefinition>,
}

impl WorkflowRegistry {
    /// The standard production graphs.
    pub fn standard() -> Self {
        let mut definitions = BTreeMap::new();
        for doc_type in DocumentType::ordered() {
            definitions.insert(doc_type, standard_definition(doc_type));
        }
        Self { definitions }
    }

    pub fn definition(&self, doc_type: DocumentType) -> Option<&WorkflowDefinition> {
        self.definitions.get(&doc_type)
    }

    pub fn initial_state(&self, doc_type: DocumentType) -> Result<WorkflowState, WorkflowError> {
        self.definition(doc_type)
            .map(WorkflowDefinition::initial_state)
            .ok_or(WorkflowError::UndefinedWorkflow(doc_type))
    }

    /// Apply `event` to the document, returning the advanced copy.
    ///
    /// Status change, history append, and version bump happen on a single
    /// returned value, so a caller never observes one without the others.
    /// An undefined `(state, event)` pair leaves the input untouched and
    /// fails with [`WorkflowError::InvalidTransition`].
    pub fn apply(
        &self,
        document: &Document,
        event: WorkflowEvent,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Document, WorkflowError> {
        let definition = self
            .definition(document.doc_type)
            .ok_or(WorkflowError::UndefinedWorkflow(document.doc_type))?;
        let next = definition
            .transition(document.workflow_status, event)
            .ok_or(WorkflowError::InvalidTransition {
                doc_type: document.doc_type,
                state: document.workflow_status,
                event,
            })?;

        let mut updated = document.clone();
        updated.workflow_history.push(TransitionRecord {
            from: document.workflow_status,
            to: next,
            event,
            actor: actor.to_string(),
            occurred_at: now,
            note: None,
        });
        updated.workflow_status = next;
        updated.version += 1;
        Ok(updated)
    }
}

fn standard_definition(doc_type: DocumentType) -> WorkflowDefinition {
    match doc_type {
        DocumentType::PurchaseInvoice | DocumentType::SalesInvoice => {
            approval_definition(doc_type)
        }
        DocumentType::PurchaseOrder | DocumentType::OrderConfirmation => {
            validation_definition(doc_type)
        }
        DocumentType::CreditMemo => linkage_definition(doc_type),
        DocumentType::DeliveryNote
        | DocumentType::Statement
        | DocumentType::PaymentReminder
        | DocumentType::QualityCertificate => review_definition(doc_type),
        DocumentType::Uncategorized => triage_definition(doc_type),
    }
}

/// Invoices run the full vendor-resolution, ERP-validation, and approval
/// chain before export.
fn approval_definition(doc_type: DocumentType) -> WorkflowDefinition {
    WorkflowDefinition::new(
        doc_type,
        S::Captured,
        &[S::Archived],
        &[
            (S::Captured, E::Classify, S::Classified),
            (S::Classified, E::Extract, S::Extracted),
            (S::Extracted, E::RequestVendor, S::VendorPending),
            (S::Extracted, E::StartBcValidation, S::BcValidationPending),
            (S::VendorPending, E::VendorResolved, S::BcValidationPending),
            (S::BcValidationPending, E::BcValidationPassed, S::ReadyForApproval),
            (S::BcValidationPending, E::BcValidationFailed, S::BcValidationFailed),
            (S::BcValidationFailed, E::RequestCorrection, S::DataCorrectionPending),
            (S::DataCorrectionPending, E::SubmitCorrection, S::BcValidationPending),
            (S::ReadyForApproval, E::StartApproval, S::ApprovalInProgress),
            (S::ReadyForApproval, E::Approve, S::Approved),
            (S::ReadyForApproval, E::Reject, S::Rejected),
            (S::ApprovalInProgress, E::Approve, S::Approved),
            (S::ApprovalInProgress, E::Reject, S::Rejected),
            (S::Approved, E::Export, S::Exported),
            (S::Exported, E::Archive, S::Archived),
            // Corrective override, modeled as an ordinary event.
            (S::Rejected, E::Reopen, S::DataCorrectionPending),
        ],
    )
}

/// Purchase orders and confirmations pass a validation sub-path before the
/// approval chain.
fn validation_definition(doc_type: DocumentType) -> WorkflowDefinition {
    WorkflowDefinition::new(
        doc_type,
        S::Captured,
        &[S::Archived],
        &[
            (S::Captured, E::Classify, S::Classified),
            (S::Classified, E::Extract, S::Extracted),
            (S::Extracted, E::StartValidation, S::ValidationPending),
            (S::ValidationPending, E::ValidationPassed, S::ReadyForApproval),
            (S::ValidationPending, E::ValidationFailed, S::ValidationFailed),
            (S::ValidationFailed, E::RequestCorrection, S::DataCorrectionPending),
            (S::DataCorrectionPending, E::SubmitCorrection, S::ValidationPending),
            (S::ReadyForApproval, E::StartApproval, S::ApprovalInProgress),
            (S::ReadyForApproval, E::Approve, S::Approved),
            (S::ReadyForApproval, E::Reject, S::Rejected),
            (S::ApprovalInProgress, E::Approve, S::Approved),
            (S::ApprovalInProgress, E::Reject, S::Rejected),
            (S::Approved, E::Export, S::Exported),
            (S::Exported, E::Archive, S::Archived),
            (S::Rejected, E::Reopen, S::DataCorrectionPending),
        ],
    )
}

/// Credit memos link to an existing invoice; the linked state is reachable
/// only from classified or extracted.
fn linkage_definition(doc_type: DocumentType) -> WorkflowDefinition {
    WorkflowDefinition::new(
        doc_type,
        S::Captured,
        &[S::Archived],
        &[
            (S::Captured, E::Classify, S::Classified),
            (S::Classified, E::Extract, S::Extracted),
            (S::Classified, E::LinkToInvoice, S::LinkedToInvoice),
            (S::Extracted, E::LinkToInvoice, S::LinkedToInvoice),
            (S::LinkedToInvoice, E::Archive, S::Archived),
            (S::Extracted, E::Archive, S::Archived),
        ],
    )
}

/// Statements, reminders, delivery notes, and quality records take the fast
/// review path with no approval branch.
fn review_definition(doc_type: DocumentType) -> WorkflowDefinition {
    WorkflowDefinition::new(
        doc_type,
        S::Captured,
        &[S::Archived],
        &[
            (S::Captured, E::Classify, S::ReadyForReview),
            (S::ReadyForReview, E::MarkReviewed, S::Reviewed),
            (S::Reviewed, E::Archive, S::Archived),
        ],
    )
}

fn triage_definition(doc_type: DocumentType) -> WorkflowDefinition {
    WorkflowDefinition::new(
        doc_type,
        S::TriagePending,
        &[S::TriageCompleted],
        &[(S::TriagePending, E::CompleteTriage, S::TriageCompleted)],
    )
}
