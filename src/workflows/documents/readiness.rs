//! Advisory go/no-go score for unlocking broader automation.
//!
//! Aggregates recent matching outcomes into four weighted factors; the
//! recommendation requires every factor's gate to pass, not merely the
//! weighted sum clearing a bar. Read-only: nothing here mutates documents.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{MatchMethod, MatchOutcome};

/// Factor weights; the documented contract is 35/20/25/20.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadinessWeights {
    pub high_confidence_share: f32,
    pub alias_exception_rate: f32,
    pub stable_counterparties: f32,
    pub document_volume: f32,
}

impl Default for ReadinessWeights {
    fn default() -> Self {
        Self {
            high_confidence_share: 0.35,
            alias_exception_rate: 0.20,
            stable_counterparties: 0.25,
            document_volume: 0.20,
        }
    }
}

/// Thresholds with the product constants as defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessConfig {
    /// Match score at or above which an outcome counts as high confidence.
    pub min_confidence: f32,
    /// Gate: share of high-confidence outcomes required.
    pub high_confidence_share_gate: f32,
    /// Gate: exception rate (fuzzy matches and stuck unmatched documents)
    /// must stay at or below this.
    pub exception_rate_gate: f32,
    /// Outcomes a counterparty needs before it can count as stable.
    pub stable_counterparty_documents: usize,
    /// Gate: stable counterparties required.
    pub stable_counterparty_gate: usize,
    /// Gate: outcomes required in the window.
    pub volume_gate: usize,
    /// An unmatched document older than this counts as stuck.
    pub stuck_after_days: i64,
    pub weights: ReadinessWeights,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.92,
            high_confidence_share_gate: 0.80,
            exception_rate_gate: 0.10,
            stable_counterparty_documents: 5,
            stable_counterparty_gate: 5,
            volume_gate: 50,
            stuck_after_days: 5,
            weights: ReadinessWeights::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessFactor {
    HighConfidenceShare,
    AliasExceptionRate,
    StableCounterparties,
    DocumentVolume,
}

/// One pass/fail gate with its observed value, for transparent audits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessGate {
    pub factor: ReadinessFactor,
    pub observed: f32,
    pub threshold: f32,
    pub passed: bool,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessReport {
    pub score: f32,
    pub gates: Vec<ReadinessGate>,
    pub recommendation: bool,
    pub window_size: usize,
}

/// Stateless scorer applying the configured thresholds to a window of
/// outcomes.
#[derive(Debug, Clone)]
pub struct ReadinessScorer {
    config: ReadinessConfig,
}

impl ReadinessScorer {
    pub fn new(config: ReadinessConfig) -> Self {
        Self { config }
    }

    pub fn score(&self, outcomes: &[MatchOutcome], now: DateTime<Utc>) -> ReadinessReport {
        let config = &self.config;
        let total = outcomes.len();

        let high_confidence = outcomes
            .iter()
            .filter(|outcome| {
                outcome.method != MatchMethod::Unmatched && outcome.score >= config.min_confidence
            })
            .count();

        let stuck_cutoff = now - Duration::days(config.stuck_after_days);
        let exceptions = outcomes
            .iter()
            .filter(|outcome| match outcome.method {
                MatchMethod::Fuzzy => true,
                MatchMethod::Unmatched => outcome.observed_at < stuck_cutoff,
                _ => false,
            })
            .count();

        let stable = stable_counterparties(outcomes, config);

        let high_share = ratio(high_confidence, total);
        let exception_rate = ratio(exceptions, total);

        let gates = vec![
            ReadinessGate {
                factor: ReadinessFactor::HighConfidenceShare,
                observed: high_share,
                threshold: config.high_confidence_share_gate,
                passed: total > 0 && high_share >= config.high_confidence_share_gate,
                notes: format!("{high_confidence} of {total} outcomes at high confidence"),
            },
            ReadinessGate {
                factor: ReadinessFactor::AliasExceptionRate,
                observed: exception_rate,
                threshold: config.exception_rate_gate,
                passed: total > 0 && exception_rate <= config.exception_rate_gate,
                notes: format!("{exceptions} exception(s) across {total} outcomes"),
            },
            ReadinessGate {
                factor: ReadinessFactor::StableCounterparties,
                observed: stable as f32,
                threshold: config.stable_counterparty_gate as f32,
                passed: stable >= config.stable_counterparty_gate,
                notes: format!(
                    "{stable} counterparties with >= {} sustained high-quality matches",
                    config.stable_counterparty_documents
                ),
            },
            ReadinessGate {
                factor: ReadinessFactor::DocumentVolume,
                observed: total as f32,
                threshold: config.volume_gate as f32,
                passed: total >= config.volume_gate,
                notes: format!("{total} documents observed in the window"),
            },
        ];

        let weights = &config.weights;
        let score = weights.high_confidence_share * high_share
            + weights.alias_exception_rate * (1.0 - exception_rate)
            + weights.stable_counterparties
                * capped_ratio(stable, config.stable_counterparty_gate)
            + weights.document_volume * capped_ratio(total, config.volume_gate);

        ReadinessReport {
            score,
            recommendation: gates.iter().all(|gate| gate.passed),
            gates,
            window_size: total,
        }
    }
}

/// Counterparties with enough outcomes, every one deterministic and at high
/// confidence.
fn stable_counterparties(outcomes: &[MatchOutcome], config: &ReadinessConfig) -> usize {
    let mut per_counterparty: BTreeMap<&str, (usize, bool)> = BTreeMap::new();
    for outcome in outcomes {
        let Some(id) = outcome.counterparty_id.as_deref() else {
            continue;
        };
        let entry = per_counterparty.entry(id).or_insert((0, true));
        entry.0 += 1;
        entry.1 &= outcome.method.is_deterministic() && outcome.score >= config.min_confidence;
    }

    per_counterparty
        .values()
        .filter(|(count, sustained)| *count >= config.stable_counterparty_documents && *sustained)
        .count()
}

fn ratio(part: usize, total: usize) -> f32 {
    if total == 0 {
        0.0
    } else {
        part as f32 / total as f32
    }
}

fn capped_ratio(observed: usize, target: usize) -> f32 {
    if target == 0 {
        1.0
    } else {
        (observed as f32 / target as f32).min(1.0)
    }
}
