//! Counterparty resolution with a fixed precedence order.
//!
//! The order is a contract, not an optimization: an alias hit must never be
//! downgraded by a coincidentally higher-scoring fuzzy candidate, and exact
//! hits are never re-scored by fuzzy logic.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{MatchMethod, MatchResult};

/// A vendor or customer record mirrored from the ERP directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Counterparty {
    pub canonical_id: String,
    pub number: String,
    pub display_name: String,
    pub normalized_name: String,
    pub last_matched_at: Option<DateTime<Utc>>,
}

/// Read-mostly lookup capability the matcher is injected with.
pub trait CounterpartyDirectory: Send + Sync {
    fn find_by_number(&self, number: &str) -> Option<Counterparty>;
    fn find_by_display_name(&self, normalized_name: &str) -> Option<Counterparty>;
    fn find_by_normalized_name(&self, normalized_name: &str) -> Option<Counterparty>;
    /// Full candidate set for the fuzzy tier.
    fn candidates(&self) -> Vec<Counterparty>;
    /// Record that a counterparty resolved a match, for recency tie-breaks.
    fn touch(&self, canonical_id: &str, at: DateTime<Utc>);
}

/// In-memory directory used by the service, demos, and tests.
#[derive(Debug, Default)]
pub struct InMemoryCounterpartyDirectory {
    entries: Mutex<BTreeMap<String, Counterparty>>,
}

impl InMemoryCounterpartyDirectory {
    pub fn new(counterparties: Vec<Counterparty>) -> Self {
        let entries = counterparties
            .into_iter()
            .map(|record| (record.canonical_id.clone(), record))
            .collect();
        Self {
            entries: Mutex::new(entries),
        }
    }

    fn find<F>(&self, predicate: F) -> Option<Counterparty>
    where
        F: Fn(&Counterparty) -> bool,
    {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.values().find(|record| predicate(record)).cloned()
    }
}

impl CounterpartyDirectory for InMemoryCounterpartyDirectory {
    fn find_by_number(&self, number: &str) -> Option<Counterparty> {
        self.find(|record| record.number == number)
    }

    fn find_by_display_name(&self, normalized_name: &str) -> Option<Counterparty> {
        self.find(|record| {
            let collapsed = record
                .display_name
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase();
            collapsed == normalized_name
        })
    }

    fn find_by_normalized_name(&self, normalized_name: &str) -> Option<Counterparty> {
        self.find(|record| record.normalized_name == normalized_name)
    }

    fn candidates(&self) -> Vec<Counterparty> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.values().cloned().collect()
    }

    fn touch(&self, canonical_id: &str, at: DateTime<Utc>) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(record) = entries.get_mut(canonical_id) {
            record.last_matched_at = Some(at);
        }
    }
}

#[derive(Debug)]
struct AliasEntry {
    canonical_id: String,
    raw_spellings: Vec<String>,
    usage: AtomicU64,
}

/// Shared alias directory: `normalized_name -> canonical_id` with an atomic
/// usage counter incremented on every resolution.
#[derive(Debug, Default)]
pub struct AliasDirectory {
    entries: RwLock<BTreeMap<String, AliasEntry>>,
}

impl AliasDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or extend) an alias mapping a normalized vendor string to a
    /// canonical counterparty id.
    pub fn upsert(&self, normalized_name: &str, canonical_id: &str, raw_spelling: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let entry = entries
            .entry(normalized_name.to_string())
            .or_insert_with(|| AliasEntry {
                canonical_id: canonical_id.to_string(),
                raw_spellings: Vec::new(),
                usage: AtomicU64::new(0),
            });
        entry.canonical_id = canonical_id.to_string();
        if !entry.raw_spellings.iter().any(|s| s == raw_spelling) {
            entry.raw_spellings.push(raw_spelling.to_string());
        }
    }

    /// Resolve an alias, incrementing its usage counter as an observable
    /// side effect. Increment-by-one on an atomic, never read-modify-write.
    pub fn resolve(&self, normalized_name: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(normalized_name).map(|entry| {
            entry.usage.fetch_add(1, Ordering::Relaxed);
            entry.canonical_id.clone()
        })
    }

    pub fn usage(&self, normalized_name: &str) -> u64 {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(normalized_name)
            .map(|entry| entry.usage.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn known_spellings(&self, normalized_name: &str) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(normalized_name)
            .map(|entry| entry.raw_spellings.clone())
            .unwrap_or_default()
    }
}

/// Optional extraction hints that can short-circuit name matching.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchHints<'a> {
    pub vendor_number: Option<&'a str>,
}

/// Resolve a normalized vendor string to a counterparty.
///
/// Precedence, first hit wins: verbatim number, exact display name,
/// normalized name, alias, then the best fuzzy candidate at or above
/// `fuzzy_floor`. Fuzzy ties break by score, then most recently used, then
/// lexicographic id.
pub fn match_counterparty(
    normalized_vendor: Option<&str>,
    hints: MatchHints<'_>,
    directory: &dyn CounterpartyDirectory,
    aliases: &AliasDirectory,
    fuzzy_floor: f32,
    now: DateTime<Utc>,
) -> MatchResult {
    if let Some(number) = hints.vendor_number {
        if let Some(record) = directory.find_by_number(number) {
            directory.touch(&record.canonical_id, now);
            return MatchResult {
                method: MatchMethod::ExactNumber,
                canonical_id: Some(record.canonical_id),
                score: 1.0,
            };
        }
    }

    let Some(name) = normalized_vendor.filter(|name| !name.is_empty()) else {
        return MatchResult::unmatched();
    };

    if let Some(record) = directory.find_by_display_name(name) {
        directory.touch(&record.canonical_id, now);
        return MatchResult {
            method: MatchMethod::ExactName,
            canonical_id: Some(record.canonical_id),
            score: 1.0,
        };
    }

    if let Some(record) = directory.find_by_normalized_name(name) {
        directory.touch(&record.canonical_id, now);
        return MatchResult {
            method: MatchMethod::Normalized,
            canonical_id: Some(record.canonical_id),
            score: 1.0,
        };
    }

    if let Some(canonical_id) = aliases.resolve(name) {
        directory.touch(&canonical_id, now);
        return MatchResult {
            method: MatchMethod::Alias,
            canonical_id: Some(canonical_id),
            score: 1.0,
        };
    }

    let mut best: Option<(f32, Counterparty)> = None;
    for candidate in directory.candidates() {
        let score = strsim::jaro_winkler(name, &candidate.normalized_name) as f32;
        if score < fuzzy_floor {
            continue;
        }
        let challenger = (score, candidate);
        best = match best {
            None => Some(challenger),
            Some(current) => Some(pick_fuzzy_winner(current, challenger)),
        };
    }

    match best {
        Some((score, record)) => {
            directory.touch(&record.canonical_id, now);
            MatchResult {
                method: MatchMethod::Fuzzy,
                canonical_id: Some(record.canonical_id),
                score,
            }
        }
        None => MatchResult::unmatched(),
    }
}

fn pick_fuzzy_winner(
    current: (f32, Counterparty),
    challenger: (f32, Counterparty),
) -> (f32, Counterparty) {
    let ordering = challenger
        .0
        .partial_cmp(&current.0)
        .unwrap_or(CmpOrdering::Equal)
        .then_with(|| challenger.1.last_matched_at.cmp(&current.1.last_matched_at))
        .then_with(|| current.1.canonical_id.cmp(&challenger.1.canonical_id));

    if ordering == CmpOrdering::Greater {
        challenger
    } else {
        current
    }
}
