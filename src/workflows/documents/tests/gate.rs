use super::common::*;
use crate::workflows::documents::automation::{
    evaluate, AutomationConfig, AutomationFlags, GateCheck, GateMode,
};
use crate::workflows::documents::domain::{
    DocumentType, MatchMethod, TransactionAction, ValidationCode, WorkflowState,
};

#[test]
fn high_scoring_deterministic_match_creates_a_draft() {
    let mut document = gate_document(DocumentType::PurchaseInvoice, WorkflowState::Captured);
    document.ai_confidence = 0.93;
    let result = match_result(MatchMethod::Normalized, "V-1001", 0.95);

    let decision = evaluate(
        &document,
        &result,
        &AutomationFlags::default(),
        &AutomationConfig::default(),
        GateMode::Standard,
    );

    assert_eq!(decision.action, TransactionAction::DraftCreated);
    assert!(decision.blocked.is_empty());
}

#[test]
fn score_below_threshold_degrades_to_linking() {
    let document = gate_document(DocumentType::PurchaseInvoice, WorkflowState::Captured);
    let result = match_result(MatchMethod::Normalized, "V-1001", 0.89);

    let decision = evaluate(
        &document,
        &result,
        &AutomationFlags::default(),
        &AutomationConfig::default(),
        GateMode::Standard,
    );

    assert_eq!(decision.action, TransactionAction::LinkedOnly);
    assert!(decision
        .blocked
        .contains(&GateCheck::MatchScoreBelowThreshold));
}

#[test]
fn low_extraction_confidence_degrades_to_linking() {
    let mut document = gate_document(DocumentType::PurchaseInvoice, WorkflowState::Captured);
    document.ai_confidence = 0.90;
    let result = match_result(MatchMethod::ExactNumber, "V-1001", 1.0);

    let decision = evaluate(
        &document,
        &result,
        &AutomationFlags::default(),
        &AutomationConfig::default(),
        GateMode::Standard,
    );

    assert_eq!(decision.action, TransactionAction::LinkedOnly);
    assert!(decision
        .blocked
        .contains(&GateCheck::ConfidenceBelowThreshold));
}

#[test]
fn fuzzy_matches_never_create_drafts_at_any_score() {
    let document = gate_document(DocumentType::PurchaseInvoice, WorkflowState::Captured);
    let result = match_result(MatchMethod::Fuzzy, "V-1001", 0.99);

    let decision = evaluate(
        &document,
        &result,
        &AutomationFlags::default(),
        &AutomationConfig::default(),
        GateMode::Standard,
    );

    assert_eq!(decision.action, TransactionAction::LinkedOnly);
    assert!(decision.blocked.contains(&GateCheck::FuzzyMatchExcluded));
}

#[test]
fn existing_erp_record_short_circuits_to_none() {
    let mut document = gate_document(DocumentType::PurchaseInvoice, WorkflowState::Captured);
    document.bc_record_id = Some("BC-0001".to_string());
    let result = match_result(MatchMethod::ExactNumber, "V-1001", 1.0);

    let decision = evaluate(
        &document,
        &result,
        &AutomationFlags::default(),
        &AutomationConfig::default(),
        GateMode::Standard,
    );

    assert_eq!(decision.action, TransactionAction::None);
    assert_eq!(decision.blocked, vec![GateCheck::RecordAlreadyCreated]);
}

#[test]
fn reprocess_mode_caps_a_perfect_document_at_linking() {
    let document = gate_document(DocumentType::PurchaseInvoice, WorkflowState::Captured);
    let result = match_result(MatchMethod::ExactNumber, "V-1001", 1.0);

    let decision = evaluate(
        &document,
        &result,
        &AutomationFlags::default(),
        &AutomationConfig::default(),
        GateMode::Reprocess,
    );

    assert_eq!(decision.action, TransactionAction::LinkedOnly);
    assert!(decision.blocked.contains(&GateCheck::ReprocessDraftBarred));
}

#[test]
fn possible_duplicate_blocks_all_automation() {
    let mut document = gate_document(DocumentType::PurchaseInvoice, WorkflowState::Captured);
    document.possible_duplicate = true;
    let result = match_result(MatchMethod::ExactNumber, "V-1001", 1.0);

    let decision = evaluate(
        &document,
        &result,
        &AutomationFlags::default(),
        &AutomationConfig::default(),
        GateMode::Standard,
    );

    assert_eq!(decision.action, TransactionAction::None);
    assert!(decision.blocked.contains(&GateCheck::PossibleDuplicate));
}

#[test]
fn unmatched_documents_get_no_automation() {
    let mut document = gate_document(DocumentType::PurchaseInvoice, WorkflowState::Captured);
    document.vendor_canonical = None;
    document.vendor_match_method = MatchMethod::Unmatched;
    let result = crate::workflows::documents::domain::MatchResult::unmatched();

    let decision = evaluate(
        &document,
        &result,
        &AutomationFlags::default(),
        &AutomationConfig::default(),
        GateMode::Standard,
    );

    assert_eq!(decision.action, TransactionAction::None);
    assert!(decision.blocked.contains(&GateCheck::NoMatch));
}

#[test]
fn disabled_link_flag_turns_a_weak_match_into_none() {
    let document = gate_document(DocumentType::PurchaseInvoice, WorkflowState::Captured);
    let result = match_result(MatchMethod::Normalized, "V-1001", 0.89);
    let flags = AutomationFlags {
        auto_link: false,
        auto_create_draft: true,
    };

    let decision = evaluate(
        &document,
        &result,
        &flags,
        &AutomationConfig::default(),
        GateMode::Standard,
    );

    assert_eq!(decision.action, TransactionAction::None);
    assert!(decision
        .blocked
        .contains(&GateCheck::LinkAutomationDisabled));
}

#[test]
fn disabled_draft_flag_still_allows_linking() {
    let document = gate_document(DocumentType::PurchaseInvoice, WorkflowState::Captured);
    let result = match_result(MatchMethod::ExactNumber, "V-1001", 1.0);
    let flags = AutomationFlags {
        auto_link: true,
        auto_create_draft: false,
    };

    let decision = evaluate(
        &document,
        &result,
        &flags,
        &AutomationConfig::default(),
        GateMode::Standard,
    );

    assert_eq!(decision.action, TransactionAction::LinkedOnly);
    assert!(decision
        .blocked
        .contains(&GateCheck::DraftAutomationDisabled));
}

#[test]
fn validation_errors_block_drafts_but_not_linking() {
    let mut document = gate_document(DocumentType::PurchaseInvoice, WorkflowState::Captured);
    document
        .validation_errors
        .insert(ValidationCode::MissingAmount);
    let result = match_result(MatchMethod::ExactNumber, "V-1001", 1.0);

    let decision = evaluate(
        &document,
        &result,
        &AutomationFlags::default(),
        &AutomationConfig::default(),
        GateMode::Standard,
    );

    assert_eq!(decision.action, TransactionAction::LinkedOnly);
    assert!(decision
        .blocked
        .contains(&GateCheck::ValidationErrorsPresent));
}

#[test]
fn missing_purchase_order_blocks_drafts_for_required_types() {
    let mut config = AutomationConfig::default();
    config.draft_types.insert(DocumentType::OrderConfirmation);

    let mut document = gate_document(DocumentType::OrderConfirmation, WorkflowState::Captured);
    document.normalized.po_number = None;
    let result = match_result(MatchMethod::ExactNumber, "V-1001", 1.0);

    let decision = evaluate(
        &document,
        &result,
        &AutomationFlags::default(),
        &config,
        GateMode::Standard,
    );

    assert_eq!(decision.action, TransactionAction::LinkedOnly);
    assert!(decision.blocked.contains(&GateCheck::PurchaseOrderMissing));
}

#[test]
fn ineligible_types_get_no_automation_at_all() {
    let document = gate_document(DocumentType::Statement, WorkflowState::Captured);
    let result = match_result(MatchMethod::ExactNumber, "V-1001", 1.0);

    let decision = evaluate(
        &document,
        &result,
        &AutomationFlags::default(),
        &AutomationConfig::default(),
        GateMode::Standard,
    );

    assert_eq!(decision.action, TransactionAction::None);
    assert!(decision.blocked.contains(&GateCheck::TypeNotDraftEligible));
    assert!(decision.blocked.contains(&GateCheck::TypeNotLinkEligible));
}

#[test]
fn already_linked_documents_are_left_alone() {
    let document = gate_document(DocumentType::CreditMemo, WorkflowState::LinkedToInvoice);
    let result = match_result(MatchMethod::ExactNumber, "V-1001", 1.0);

    let decision = evaluate(
        &document,
        &result,
        &AutomationFlags::default(),
        &AutomationConfig::default(),
        GateMode::Standard,
    );

    assert_eq!(decision.action, TransactionAction::None);
    assert!(decision.blocked.contains(&GateCheck::AlreadyLinked));
}
