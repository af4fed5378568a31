//! Document intake workflow core: normalization, counterparty matching,
//! duplicate detection, per-type state machines, and the automation safety
//! gate, composed behind [`service::DocumentIntakeService`].

pub mod automation;
pub mod domain;
pub mod duplicates;
pub mod engine;
pub mod matcher;
pub mod normalizer;
pub mod readiness;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use automation::{AutomationConfig, AutomationFlags, GateCheck, GateDecision, GateMode};
pub use domain::{
    CaptureChannel, Document, DocumentId, DocumentStatusView, DocumentSubmission, DocumentType,
    MatchMethod, MatchOutcome, MatchResult, NormalizedFields, RawExtraction, TransactionAction,
    TransitionRecord, ValidationCode, WarningCode, WorkflowEvent, WorkflowState,
};
pub use engine::{WorkflowDefinition, WorkflowError, WorkflowRegistry};
pub use matcher::{
    match_counterparty, AliasDirectory, Counterparty, CounterpartyDirectory,
    InMemoryCounterpartyDirectory, MatchHints,
};
pub use readiness::{
    ReadinessConfig, ReadinessFactor, ReadinessGate, ReadinessReport, ReadinessScorer,
    ReadinessWeights,
};
pub use repository::{DocumentRepository, InMemoryDocumentRepository, RepositoryError};
pub use router::document_router;
pub use service::{DocumentIntakeService, DocumentServiceError, ProcessReport};
