use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::{Duration, Utc};
use clap::{Args, Parser, Subcommand};
use docuflow::config::AppConfig;
use docuflow::error::AppError;
use docuflow::telemetry;
use docuflow::workflows::documents::{
    document_router, AliasDirectory, AutomationConfig, AutomationFlags, CaptureChannel,
    Counterparty, DocumentId, DocumentIntakeService, DocumentSubmission, DocumentType,
    InMemoryCounterpartyDirectory, InMemoryDocumentRepository, MatchMethod, MatchOutcome,
    RawExtraction, ReadinessConfig,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

type Service = DocumentIntakeService<InMemoryDocumentRepository, InMemoryCounterpartyDirectory>;

#[derive(Clone)]
struct OpsState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Document Workflow Orchestrator",
    about = "Demonstrate and run the document workflow orchestrator from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Walk through core decisions for stakeholder demos
    Demo {
        #[command(subcommand)]
        command: DemoCommand,
    },
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum DemoCommand {
    /// Ingest and process a sample invoice, printing the gate verdict
    Gate,
    /// Score a synthetic outcome window and print the readiness gates
    Readiness,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Demo {
            command: DemoCommand::Gate,
        } => run_gate_demo(),
        Command::Demo {
            command: DemoCommand::Readiness,
        } => run_readiness_demo(),
    }
}

fn build_service(
    flags: AutomationFlags,
    automation: AutomationConfig,
    readiness: ReadinessConfig,
) -> Arc<Service> {
    let directory = Arc::new(sample_directory());
    let aliases = Arc::new(AliasDirectory::new());
    aliases.upsert("acme supplies inc", "V-1001", "Acme Supplies, Inc.");

    Arc::new(DocumentIntakeService::new(
        Arc::new(InMemoryDocumentRepository::new()),
        directory,
        aliases,
        flags,
        automation,
        readiness,
    ))
}

/// Stand-in counterparty directory; the ERP sync collaborator owns the real
/// one.
fn sample_directory() -> InMemoryCounterpartyDirectory {
    InMemoryCounterpartyDirectory::new(vec![
        Counterparty {
            canonical_id: "V-1001".to_string(),
            number: "10010".to_string(),
            display_name: "Acme Supply Corporation".to_string(),
            normalized_name: "acme supply corporation".to_string(),
            last_matched_at: None,
        },
        Counterparty {
            canonical_id: "V-1002".to_string(),
            number: "10020".to_string(),
            display_name: "Northwind Traders".to_string(),
            normalized_name: "northwind traders".to_string(),
            last_matched_at: None,
        },
        Counterparty {
            canonical_id: "V-1003".to_string(),
            number: "10030".to_string(),
            display_name: "Contoso Logistics GmbH".to_string(),
            normalized_name: "contoso logistics gmbh".to_string(),
            last_matched_at: None,
        },
    ])
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let service = build_service(
        config.automation_flags,
        config.automation.clone(),
        config.readiness.clone(),
    );

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let ops_state = OpsState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let ops = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(ops_state);

    let app = document_router(service).merge(ops).layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "document workflow orchestrator ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_gate_demo() -> Result<(), AppError> {
    let service = build_service(
        AutomationFlags::default(),
        AutomationConfig::default(),
        ReadinessConfig::default(),
    );

    let submission = DocumentSubmission {
        doc_type: DocumentType::PurchaseInvoice,
        source_system: "demo".to_string(),
        capture_channel: CaptureChannel::Mailbox,
        raw: RawExtraction {
            vendor: Some("  Acme Supplies, Inc.  ".to_string()),
            vendor_number: None,
            invoice_number: Some("inv-2026-0042".to_string()),
            amount: Some("$1,234.56".to_string()),
            due_date: Some("2026-09-30".to_string()),
            po_number: Some("PO-7781".to_string()),
        },
        ai_confidence: 0.95,
    };

    let document = service.ingest(submission).map_err(AppError::from)?;
    let report = service.process(&document.id).map_err(AppError::from)?;

    println!("Automation gate demo");
    println!(
        "Document {} ({}) in state '{}'",
        report.document.id,
        report.document.doc_type.label(),
        report.document.workflow_status.label()
    );
    println!(
        "Match: method {}, counterparty {}, score {:.2}",
        report.match_result.method.label(),
        report
            .match_result
            .canonical_id
            .as_deref()
            .unwrap_or("<none>"),
        report.match_result.score
    );
    println!("Verdict: {}", report.decision.action.label());

    if report.decision.blocked.is_empty() {
        println!("Blocked checks: none");
    } else {
        println!("Blocked checks:");
        for check in &report.decision.blocked {
            println!("- {check:?}");
        }
    }

    Ok(())
}

fn run_readiness_demo() -> Result<(), AppError> {
    let scorer = docuflow::workflows::documents::ReadinessScorer::new(ReadinessConfig::default());
    let now = Utc::now();

    let mut outcomes = Vec::new();
    for index in 0..60 {
        let vendor = format!("V-10{:02}", index % 6 + 1);
        let method = if index % 15 == 0 {
            MatchMethod::Fuzzy
        } else {
            MatchMethod::Normalized
        };
        let score = if method == MatchMethod::Fuzzy { 0.86 } else { 1.0 };
        outcomes.push(MatchOutcome {
            document_id: DocumentId(format!("doc-{index:06}")),
            counterparty_id: Some(vendor),
            method,
            score,
            observed_at: now - Duration::days((index % 20) as i64),
        });
    }

    let report = scorer.score(&outcomes, now);

    println!("Readiness demo over {} synthetic outcomes", report.window_size);
    println!("Weighted score: {:.2}", report.score);
    for gate in &report.gates {
        println!(
            "- {:?}: observed {:.2}, threshold {:.2}, {} ({})",
            gate.factor,
            gate.observed,
            gate.threshold,
            if gate.passed { "pass" } else { "fail" },
            gate.notes
        );
    }
    println!(
        "Recommendation: {}",
        if report.recommendation {
            "enable broader automation"
        } else {
            "keep automation narrow"
        }
    );

    Ok(())
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<OpsState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<OpsState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
