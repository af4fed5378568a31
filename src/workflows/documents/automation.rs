//! The multi-condition safety gate deciding what automation may do with a
//! document: nothing, link it to an existing ERP record, or create a draft.
//!
//! The gate is a pure function over the document, its match result, and the
//! feature flags; callers act on the verdict, the gate itself never writes
//! anywhere.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::domain::{
    Document, DocumentType, MatchMethod, MatchResult, TransactionAction, ValidationCode,
};

/// Feature switches controlled by operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationFlags {
    pub auto_link: bool,
    pub auto_create_draft: bool,
}

impl Default for AutomationFlags {
    fn default() -> Self {
        Self {
            auto_link: true,
            auto_create_draft: true,
        }
    }
}

/// Thresholds and eligibility sets backing the gate. Product defaults are
/// carried here; deployments may override through configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationConfig {
    pub min_match_score: f32,
    pub min_ai_confidence: f32,
    pub fuzzy_floor: f32,
    pub duplicate_lookback_days: i64,
    /// Types for which automation may create a downstream draft record.
    pub draft_types: BTreeSet<DocumentType>,
    /// Types for which automation may link to an existing ERP record.
    pub link_types: BTreeSet<DocumentType>,
    /// Types that must carry a purchase-order reference before any draft.
    pub po_required_types: BTreeSet<DocumentType>,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            min_match_score: 0.92,
            min_ai_confidence: 0.92,
            fuzzy_floor: 0.80,
            duplicate_lookback_days: 365,
            draft_types: [DocumentType::PurchaseInvoice, DocumentType::SalesInvoice]
                .into_iter()
                .collect(),
            link_types: [
                DocumentType::PurchaseInvoice,
                DocumentType::SalesInvoice,
                DocumentType::CreditMemo,
                DocumentType::PurchaseOrder,
                DocumentType::OrderConfirmation,
            ]
            .into_iter()
            .collect(),
            po_required_types: [DocumentType::OrderConfirmation].into_iter().collect(),
        }
    }
}

/// Whether the gate runs for a fresh document or a manual reprocess.
///
/// Reprocessing a previously-touched document can only ever link, never
/// create a new downstream record, regardless of flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    Standard,
    Reprocess,
}

/// Individual precondition that blocked a stronger verdict, kept for audit
/// trails and reviewer surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateCheck {
    RecordAlreadyCreated,
    DraftAutomationDisabled,
    LinkAutomationDisabled,
    TypeNotDraftEligible,
    TypeNotLinkEligible,
    FuzzyMatchExcluded,
    NoMatch,
    MatchScoreBelowThreshold,
    ConfidenceBelowThreshold,
    PossibleDuplicate,
    ValidationErrorsPresent,
    PurchaseOrderMissing,
    AlreadyLinked,
    ReprocessDraftBarred,
}

/// Gate output: the verdict plus every check that kept it from going higher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateDecision {
    pub action: TransactionAction,
    pub blocked: Vec<GateCheck>,
}

/// Evaluate the safety gate.
///
/// Short-circuits to `None` when `bc_record_id` is already set — the
/// permanent idempotency guard — and otherwise works down from the draft
/// verdict to linking to nothing, collecting the failed preconditions.
pub fn evaluate(
    document: &Document,
    match_result: &MatchResult,
    flags: &AutomationFlags,
    config: &AutomationConfig,
    mode: GateMode,
) -> GateDecision {
    if document.bc_record_id.is_some() {
        return GateDecision {
            action: TransactionAction::None,
            blocked: vec![GateCheck::RecordAlreadyCreated],
        };
    }

    let mut blocked = Vec::new();

    if document.workflow_status.is_linked_terminal() {
        blocked.push(GateCheck::AlreadyLinked);
    }
    if document.possible_duplicate {
        blocked.push(GateCheck::PossibleDuplicate);
    }
    if match_result.method == MatchMethod::Unmatched {
        blocked.push(GateCheck::NoMatch);
    }

    let draft_blocked = draft_checks(document, match_result, flags, config, mode, &mut blocked);

    if !draft_blocked && blocked.is_empty() {
        return GateDecision {
            action: TransactionAction::DraftCreated,
            blocked,
        };
    }

    let mut link_blocked = blocked.clone();
    if !flags.auto_link {
        link_blocked.push(GateCheck::LinkAutomationDisabled);
    }
    if !config.link_types.contains(&document.doc_type) {
        link_blocked.push(GateCheck::TypeNotLinkEligible);
    }

    let link_vetoed = link_blocked.iter().any(|check| {
        matches!(
            check,
            GateCheck::AlreadyLinked
                | GateCheck::PossibleDuplicate
                | GateCheck::NoMatch
                | GateCheck::LinkAutomationDisabled
                | GateCheck::TypeNotLinkEligible
        )
    });

    if !link_vetoed {
        return GateDecision {
            action: TransactionAction::LinkedOnly,
            blocked,
        };
    }

    GateDecision {
        action: TransactionAction::None,
        blocked: link_blocked,
    }
}

/// Record every failed draft precondition; returns true if any failed.
fn draft_checks(
    document: &Document,
    match_result: &MatchResult,
    flags: &AutomationFlags,
    config: &AutomationConfig,
    mode: GateMode,
    blocked: &mut Vec<GateCheck>,
) -> bool {
    let before = blocked.len();

    if mode == GateMode::Reprocess {
        blocked.push(GateCheck::ReprocessDraftBarred);
    }
    if !flags.auto_create_draft {
        blocked.push(GateCheck::DraftAutomationDisabled);
    }
    if !config.draft_types.contains(&document.doc_type) {
        blocked.push(GateCheck::TypeNotDraftEligible);
    }
    if match_result.method == MatchMethod::Fuzzy {
        blocked.push(GateCheck::FuzzyMatchExcluded);
    }
    if match_result.method.is_deterministic() && match_result.score < config.min_match_score {
        blocked.push(GateCheck::MatchScoreBelowThreshold);
    }
    if document.ai_confidence < config.min_ai_confidence {
        blocked.push(GateCheck::ConfidenceBelowThreshold);
    }
    if !document.validation_errors.is_empty() {
        blocked.push(GateCheck::ValidationErrorsPresent);
    }
    if config.po_required_types.contains(&document.doc_type)
        && document.normalized.po_number.is_none()
        && !document
            .validation_errors
            .contains(&ValidationCode::MissingPurchaseOrder)
    {
        blocked.push(GateCheck::PurchaseOrderMissing);
    }

    blocked.len() > before
}
