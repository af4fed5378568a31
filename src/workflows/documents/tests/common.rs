use std::collections::BTreeSet;
use std::sync::Arc;

use axum::response::Response;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::workflows::documents::domain::{
    CaptureChannel, Document, DocumentId, DocumentSubmission, DocumentType, MatchMethod,
    MatchResult, NormalizedFields, RawExtraction, TransactionAction, WorkflowState,
};
use crate::workflows::documents::matcher::{AliasDirectory, Counterparty, InMemoryCounterpartyDirectory};
use crate::workflows::documents::readiness::ReadinessConfig;
use crate::workflows::documents::repository::InMemoryDocumentRepository;
use crate::workflows::documents::{AutomationConfig, AutomationFlags, DocumentIntakeService};

pub(super) type TestService =
    DocumentIntakeService<InMemoryDocumentRepository, InMemoryCounterpartyDirectory>;

pub(super) fn counterparty(canonical_id: &str, number: &str, display_name: &str) -> Counterparty {
    Counterparty {
        canonical_id: canonical_id.to_string(),
        number: number.to_string(),
        display_name: display_name.to_string(),
        normalized_name: display_name
            .replace([',', '.'], "")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase(),
        last_matched_at: None,
    }
}

pub(super) fn directory() -> Arc<InMemoryCounterpartyDirectory> {
    Arc::new(InMemoryCounterpartyDirectory::new(vec![
        counterparty("V-1001", "10010", "Acme Supply Corporation"),
        counterparty("V-1002", "10020", "Northwind Traders"),
        counterparty("V-1003", "10030", "Contoso Logistics GmbH"),
    ]))
}

pub(super) fn aliases() -> Arc<AliasDirectory> {
    let aliases = AliasDirectory::new();
    aliases.upsert("acme supplies inc", "V-1001", "Acme Supplies, Inc.");
    Arc::new(aliases)
}

pub(super) fn build_service() -> (
    Arc<TestService>,
    Arc<InMemoryDocumentRepository>,
    Arc<AliasDirectory>,
) {
    build_service_with_flags(AutomationFlags::default())
}

pub(super) fn build_service_with_flags(
    flags: AutomationFlags,
) -> (
    Arc<TestService>,
    Arc<InMemoryDocumentRepository>,
    Arc<AliasDirectory>,
) {
    let repository = Arc::new(InMemoryDocumentRepository::new());
    let aliases = aliases();
    let service = Arc::new(DocumentIntakeService::new(
        repository.clone(),
        directory(),
        aliases.clone(),
        flags,
        AutomationConfig::default(),
        ReadinessConfig::default(),
    ));
    (service, repository, aliases)
}

/// A purchase invoice with messy but fully recoverable extraction output.
pub(super) fn invoice_submission(vendor: &str, invoice_number: &str) -> DocumentSubmission {
    DocumentSubmission {
        doc_type: DocumentType::PurchaseInvoice,
        source_system: "mailroom".to_string(),
        capture_channel: CaptureChannel::Mailbox,
        raw: RawExtraction {
            vendor: Some(vendor.to_string()),
            vendor_number: None,
            invoice_number: Some(invoice_number.to_string()),
            amount: Some("1.234,56".to_string()),
            due_date: Some("2026-09-30".to_string()),
            po_number: Some("PO-7781".to_string()),
        },
        ai_confidence: 0.95,
    }
}

/// A document as it looks right before the gate runs: matched, validated,
/// and untouched by automation. Tests override individual fields.
pub(super) fn gate_document(doc_type: DocumentType, state: WorkflowState) -> Document {
    Document {
        id: DocumentId("doc-gate-01".to_string()),
        doc_type,
        source_system: "mailroom".to_string(),
        capture_channel: CaptureChannel::Upload,
        raw: RawExtraction {
            vendor: Some("Acme Supply Corporation".to_string()),
            vendor_number: None,
            invoice_number: Some("INV-100".to_string()),
            amount: Some("100.00".to_string()),
            due_date: None,
            po_number: Some("PO-1".to_string()),
        },
        normalized: NormalizedFields {
            vendor: Some("acme supply corporation".to_string()),
            invoice_number: Some("INV-100".to_string()),
            amount: Some(Decimal::new(10000, 2)),
            due_date: None,
            po_number: Some("PO-1".to_string()),
        },
        ai_confidence: 0.95,
        vendor_canonical: Some("V-1001".to_string()),
        vendor_match_method: MatchMethod::Normalized,
        match_score: 1.0,
        possible_duplicate: false,
        duplicate_of: None,
        validation_errors: BTreeSet::new(),
        validation_warnings: BTreeSet::new(),
        draft_candidate: false,
        workflow_status: state,
        workflow_history: Vec::new(),
        transaction_action: TransactionAction::None,
        bc_record_id: None,
        version: 1,
        accepted_at: Utc::now(),
        deleted: false,
    }
}

pub(super) fn match_result(method: MatchMethod, canonical_id: &str, score: f32) -> MatchResult {
    MatchResult {
        method,
        canonical_id: Some(canonical_id.to_string()),
        score,
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
