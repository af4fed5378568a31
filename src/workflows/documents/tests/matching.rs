use chrono::{Duration, Utc};

use super::common::*;
use crate::workflows::documents::domain::MatchMethod;
use crate::workflows::documents::matcher::{
    match_counterparty, AliasDirectory, Counterparty, CounterpartyDirectory,
    InMemoryCounterpartyDirectory, MatchHints,
};

const FUZZY_FLOOR: f32 = 0.80;

fn resolve(
    vendor: Option<&str>,
    hints: MatchHints<'_>,
    directory: &InMemoryCounterpartyDirectory,
    aliases: &AliasDirectory,
) -> crate::workflows::documents::domain::MatchResult {
    match_counterparty(vendor, hints, directory, aliases, FUZZY_FLOOR, Utc::now())
}

#[test]
fn vendor_number_hint_short_circuits_name_matching() {
    let directory = directory();
    let aliases = AliasDirectory::new();

    let result = resolve(
        Some("completely wrong name"),
        MatchHints {
            vendor_number: Some("10020"),
        },
        &directory,
        &aliases,
    );

    assert_eq!(result.method, MatchMethod::ExactNumber);
    assert_eq!(result.canonical_id.as_deref(), Some("V-1002"));
    assert_eq!(result.score, 1.0);
}

#[test]
fn exact_display_name_beats_normalized_lookup() {
    let directory = directory();
    let aliases = AliasDirectory::new();

    let result = resolve(
        Some("northwind traders"),
        MatchHints::default(),
        &directory,
        &aliases,
    );

    assert_eq!(result.method, MatchMethod::ExactName);
    assert_eq!(result.canonical_id.as_deref(), Some("V-1002"));
}

#[test]
fn normalized_name_matches_when_display_form_differs() {
    // Punctuation in the display name keeps the exact-name tier from firing.
    let directory = InMemoryCounterpartyDirectory::new(vec![counterparty(
        "V-2001",
        "20010",
        "Contoso Logistics GmbH.",
    )]);
    let aliases = AliasDirectory::new();

    let result = resolve(
        Some("contoso logistics gmbh"),
        MatchHints::default(),
        &directory,
        &aliases,
    );

    assert_eq!(result.method, MatchMethod::Normalized);
    assert_eq!(result.canonical_id.as_deref(), Some("V-2001"));
    assert_eq!(result.score, 1.0);
}

#[test]
fn alias_outranks_a_higher_scoring_fuzzy_candidate() {
    let directory = directory();
    let aliases = AliasDirectory::new();

    // Without the alias the same spelling resolves through the fuzzy tier.
    let fuzzy = resolve(
        Some("acme supplies inc"),
        MatchHints::default(),
        &directory,
        &aliases,
    );
    assert_eq!(fuzzy.method, MatchMethod::Fuzzy);
    assert_eq!(fuzzy.canonical_id.as_deref(), Some("V-1001"));
    assert!(fuzzy.score < 1.0);

    aliases.upsert("acme supplies inc", "V-1003", "Acme Supplies, Inc.");
    let aliased = resolve(
        Some("acme supplies inc"),
        MatchHints::default(),
        &directory,
        &aliases,
    );
    assert_eq!(aliased.method, MatchMethod::Alias);
    assert_eq!(aliased.canonical_id.as_deref(), Some("V-1003"));
    assert_eq!(aliased.score, 1.0);
}

#[test]
fn alias_resolution_counts_usage() {
    let directory = directory();
    let aliases = AliasDirectory::new();
    aliases.upsert("acme supplies inc", "V-1001", "Acme Supplies Inc");
    aliases.upsert("acme supplies inc", "V-1001", "ACME SUPPLIES, INC.");

    assert_eq!(aliases.usage("acme supplies inc"), 0);
    for _ in 0..3 {
        let result = resolve(
            Some("acme supplies inc"),
            MatchHints::default(),
            &directory,
            &aliases,
        );
        assert_eq!(result.method, MatchMethod::Alias);
    }
    assert_eq!(aliases.usage("acme supplies inc"), 3);
    assert_eq!(aliases.known_spellings("acme supplies inc").len(), 2);
}

#[test]
fn fuzzy_ties_prefer_the_most_recently_matched_counterparty() {
    let now = Utc::now();
    let mut older = counterparty("V-3001", "30010", "Nordic Freight Partners");
    older.last_matched_at = Some(now - Duration::days(30));
    let mut newer = counterparty("V-3002", "30020", "Nordic Freight Partners");
    newer.last_matched_at = Some(now - Duration::days(1));

    // Identical normalized names give identical fuzzy scores.
    let directory = InMemoryCounterpartyDirectory::new(vec![older, newer]);
    let aliases = AliasDirectory::new();

    let result = resolve(
        Some("nordic frieght partners"),
        MatchHints::default(),
        &directory,
        &aliases,
    );

    assert_eq!(result.method, MatchMethod::Fuzzy);
    assert_eq!(result.canonical_id.as_deref(), Some("V-3002"));
}

#[test]
fn fuzzy_ties_without_recency_break_lexicographically() {
    let directory = InMemoryCounterpartyDirectory::new(vec![
        counterparty("V-3002", "30020", "Nordic Freight Partners"),
        counterparty("V-3001", "30010", "Nordic Freight Partners"),
    ]);
    let aliases = AliasDirectory::new();

    let result = resolve(
        Some("nordic frieght partners"),
        MatchHints::default(),
        &directory,
        &aliases,
    );

    assert_eq!(result.canonical_id.as_deref(), Some("V-3001"));
}

#[test]
fn vendors_below_the_fuzzy_floor_stay_unmatched() {
    let directory = directory();
    let aliases = AliasDirectory::new();

    let result = resolve(
        Some("zurich reinsurance group"),
        MatchHints::default(),
        &directory,
        &aliases,
    );

    assert_eq!(result.method, MatchMethod::Unmatched);
    assert_eq!(result.canonical_id, None);
    assert_eq!(result.score, 0.0);
}

#[test]
fn missing_vendor_is_unmatched() {
    let directory = directory();
    let aliases = AliasDirectory::new();

    let result = resolve(None, MatchHints::default(), &directory, &aliases);
    assert_eq!(result.method, MatchMethod::Unmatched);
}

#[test]
fn successful_matches_update_directory_recency() {
    let directory = directory();
    let aliases = AliasDirectory::new();

    resolve(
        Some("northwind traders"),
        MatchHints::default(),
        &directory,
        &aliases,
    );

    let refreshed: Vec<Counterparty> = CounterpartyDirectory::candidates(&*directory);
    let northwind = refreshed
        .iter()
        .find(|record| record.canonical_id == "V-1002")
        .expect("northwind present");
    assert!(northwind.last_matched_at.is_some());
}
