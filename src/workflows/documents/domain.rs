use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for documents moving through the intake pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The ten document classes the intake channels deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    PurchaseInvoice,
    SalesInvoice,
    CreditMemo,
    PurchaseOrder,
    OrderConfirmation,
    DeliveryNote,
    Statement,
    PaymentReminder,
    QualityCertificate,
    Uncategorized,
}

impl DocumentType {
    pub const fn ordered() -> [Self; 10] {
        [
            Self::PurchaseInvoice,
            Self::SalesInvoice,
            Self::CreditMemo,
            Self::PurchaseOrder,
            Self::OrderConfirmation,
            Self::DeliveryNote,
            Self::Statement,
            Self::PaymentReminder,
            Self::QualityCertificate,
            Self::Uncategorized,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::PurchaseInvoice => "purchase_invoice",
            Self::SalesInvoice => "sales_invoice",
            Self::CreditMemo => "credit_memo",
            Self::PurchaseOrder => "purchase_order",
            Self::OrderConfirmation => "order_confirmation",
            Self::DeliveryNote => "delivery_note",
            Self::Statement => "statement",
            Self::PaymentReminder => "payment_reminder",
            Self::QualityCertificate => "quality_certificate",
            Self::Uncategorized => "uncategorized",
        }
    }
}

/// Where a document entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureChannel {
    Mailbox,
    SharePoint,
    Upload,
    Api,
}

impl CaptureChannel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Mailbox => "mailbox",
            Self::SharePoint => "share_point",
            Self::Upload => "upload",
            Self::Api => "api",
        }
    }
}

/// Union of the workflow states across all document-type graphs.
///
/// Each [`DocumentType`] only ever occupies the subset its transition table
/// defines; the engine rejects events outside that table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Captured,
    Classified,
    Extracted,
    VendorPending,
    BcValidationPending,
    BcValidationFailed,
    DataCorrectionPending,
    ReadyForApproval,
    ApprovalInProgress,
    Approved,
    Rejected,
    Exported,
    Archived,
    ValidationPending,
    ValidationFailed,
    LinkedToInvoice,
    ReadyForReview,
    Reviewed,
    TriagePending,
    TriageCompleted,
}

impl WorkflowState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Captured => "captured",
            Self::Classified => "classified",
            Self::Extracted => "extracted",
            Self::VendorPending => "vendor_pending",
            Self::BcValidationPending => "bc_validation_pending",
            Self::BcValidationFailed => "bc_validation_failed",
            Self::DataCorrectionPending => "data_correction_pending",
            Self::ReadyForApproval => "ready_for_approval",
            Self::ApprovalInProgress => "approval_in_progress",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Exported => "exported",
            Self::Archived => "archived",
            Self::ValidationPending => "validation_pending",
            Self::ValidationFailed => "validation_failed",
            Self::LinkedToInvoice => "linked_to_invoice",
            Self::ReadyForReview => "ready_for_review",
            Self::Reviewed => "reviewed",
            Self::TriagePending => "triage_pending",
            Self::TriageCompleted => "triage_completed",
        }
    }

    /// States in which a document is already attached to an ERP record and
    /// must not be linked again by automation.
    pub const fn is_linked_terminal(self) -> bool {
        matches!(self, Self::LinkedToInvoice | Self::Exported | Self::Archived)
    }
}

/// Events the workflow engine understands across all graphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowEvent {
    Classify,
    Extract,
    RequestVendor,
    VendorResolved,
    StartBcValidation,
    BcValidationPassed,
    BcValidationFailed,
    RequestCorrection,
    SubmitCorrection,
    StartApproval,
    Approve,
    Reject,
    Export,
    Archive,
    StartValidation,
    ValidationPassed,
    ValidationFailed,
    LinkToInvoice,
    MarkReviewed,
    CompleteTriage,
    Reopen,
}

impl WorkflowEvent {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Classify => "classify",
            Self::Extract => "extract",
            Self::RequestVendor => "request_vendor",
            Self::VendorResolved => "vendor_resolved",
            Self::StartBcValidation => "start_bc_validation",
            Self::BcValidationPassed => "bc_validation_passed",
            Self::BcValidationFailed => "bc_validation_failed",
            Self::RequestCorrection => "request_correction",
            Self::SubmitCorrection => "submit_correction",
            Self::StartApproval => "start_approval",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Export => "export",
            Self::Archive => "archive",
            Self::StartValidation => "start_validation",
            Self::ValidationPassed => "validation_passed",
            Self::ValidationFailed => "validation_failed",
            Self::LinkToInvoice => "link_to_invoice",
            Self::MarkReviewed => "mark_reviewed",
            Self::CompleteTriage => "complete_triage",
            Self::Reopen => "reopen",
        }
    }
}

/// How a counterparty was resolved, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MatchMethod {
    #[serde(rename = "exact_no")]
    ExactNumber,
    #[serde(rename = "exact_name")]
    ExactName,
    #[serde(rename = "normalized")]
    Normalized,
    #[serde(rename = "alias")]
    Alias,
    #[serde(rename = "fuzzy")]
    Fuzzy,
    #[serde(rename = "none")]
    Unmatched,
}

impl MatchMethod {
    pub const fn label(self) -> &'static str {
        match self {
            Self::ExactNumber => "exact_no",
            Self::ExactName => "exact_name",
            Self::Normalized => "normalized",
            Self::Alias => "alias",
            Self::Fuzzy => "fuzzy",
            Self::Unmatched => "none",
        }
    }

    /// Exact, normalized, and alias hits carry no guesswork; fuzzy and
    /// unmatched results never qualify for write automation.
    pub const fn is_deterministic(self) -> bool {
        matches!(
            self,
            Self::ExactNumber | Self::ExactName | Self::Normalized | Self::Alias
        )
    }
}

/// Verdict the automation gate writes back onto the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionAction {
    None,
    LinkedOnly,
    DraftCreated,
}

impl TransactionAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::LinkedOnly => "linked_only",
            Self::DraftCreated => "draft_created",
        }
    }
}

/// Transient result of a counterparty resolution; folded into the document,
/// never persisted on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub method: MatchMethod,
    pub canonical_id: Option<String>,
    pub score: f32,
}

impl MatchResult {
    pub fn unmatched() -> Self {
        Self {
            method: MatchMethod::Unmatched,
            canonical_id: None,
            score: 0.0,
        }
    }
}

/// Validation failures that block progression toward approval-ready states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationCode {
    MissingInvoiceNumber,
    MissingAmount,
    UnparseableAmount,
    UnparseableDate,
    MissingPurchaseOrder,
    VendorUnmatched,
}

/// Non-blocking observations surfaced to reviewers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningCode {
    FuzzyVendorMatch,
    LowExtractionConfidence,
    AmbiguousDate,
}

/// Raw field strings exactly as extraction delivered them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawExtraction {
    pub vendor: Option<String>,
    /// Vendor/customer number when extraction finds one; lets the matcher
    /// short-circuit name matching entirely.
    pub vendor_number: Option<String>,
    pub invoice_number: Option<String>,
    pub amount: Option<String>,
    pub due_date: Option<String>,
    pub po_number: Option<String>,
}

/// Canonical comparable forms produced by the normalizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedFields {
    pub vendor: Option<String>,
    pub invoice_number: Option<String>,
    pub amount: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
    pub po_number: Option<String>,
}

/// One applied workflow transition; history is append-only and never
/// reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: WorkflowState,
    pub to: WorkflowState,
    pub event: WorkflowEvent,
    pub actor: String,
    pub occurred_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Intake payload handed over by the classification collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSubmission {
    pub doc_type: DocumentType,
    pub source_system: String,
    pub capture_channel: CaptureChannel,
    pub raw: RawExtraction,
    pub ai_confidence: f32,
}

/// The unit of work tracked through its per-type workflow graph.
///
/// Mutated exclusively through engine transitions and the service facade;
/// `version` backs the optimistic-concurrency writes in the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub doc_type: DocumentType,
    pub source_system: String,
    pub capture_channel: CaptureChannel,
    pub raw: RawExtraction,
    pub normalized: NormalizedFields,
    pub ai_confidence: f32,
    pub vendor_canonical: Option<String>,
    pub vendor_match_method: MatchMethod,
    pub match_score: f32,
    pub possible_duplicate: bool,
    pub duplicate_of: Option<DocumentId>,
    pub validation_errors: BTreeSet<ValidationCode>,
    pub validation_warnings: BTreeSet<WarningCode>,
    pub draft_candidate: bool,
    pub workflow_status: WorkflowState,
    pub workflow_history: Vec<TransitionRecord>,
    pub transaction_action: TransactionAction,
    /// Permanent idempotency guard: once set it never reverts, and the
    /// automation gate short-circuits to `None` for the document.
    pub bc_record_id: Option<String>,
    pub version: u64,
    pub accepted_at: DateTime<Utc>,
    pub deleted: bool,
}

impl Document {
    /// Key used for duplicate detection: the canonical counterparty when
    /// resolved, otherwise the normalized vendor string.
    pub fn counterparty_key(&self) -> Option<&str> {
        self.vendor_canonical
            .as_deref()
            .or(self.normalized.vendor.as_deref())
    }

    pub fn status_view(&self) -> DocumentStatusView {
        DocumentStatusView {
            document_id: self.id.clone(),
            doc_type: self.doc_type.label(),
            status: self.workflow_status.label(),
            match_method: self.vendor_match_method.label(),
            match_score: self.match_score,
            vendor_canonical: self.vendor_canonical.clone(),
            possible_duplicate: self.possible_duplicate,
            transaction_action: self.transaction_action.label(),
            validation_errors: self.validation_errors.iter().copied().collect(),
            validation_warnings: self.validation_warnings.iter().copied().collect(),
            version: self.version,
        }
    }
}

/// Sanitized summary exposed through the HTTP surface.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentStatusView {
    pub document_id: DocumentId,
    pub doc_type: &'static str,
    pub status: &'static str,
    pub match_method: &'static str,
    pub match_score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_canonical: Option<String>,
    pub possible_duplicate: bool,
    pub transaction_action: &'static str,
    pub validation_errors: Vec<ValidationCode>,
    pub validation_warnings: Vec<WarningCode>,
    pub version: u64,
}

/// Completed matching outcome consumed by the readiness scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub document_id: DocumentId,
    pub counterparty_id: Option<String>,
    pub method: MatchMethod,
    pub score: f32,
    pub observed_at: DateTime<Utc>,
}
