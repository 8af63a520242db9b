// Behavioural properties of the reconciliation engine, exercised through the
// public API only.

use rosterlink_core::{
    CandidateIndex, CanonicalPlayer, ExceptionTable, FuzzyMatcher, NameNormalizer, Reconciler,
    Reconciliation, ScrapedRecord, ShortenRule, Threshold,
};

// ===========================================================================
// Helpers
// ===========================================================================

fn salah_roster() -> Vec<CanonicalPlayer> {
    vec![CanonicalPlayer::new("Mohamed Salah").with_attribute("Team", "Liverpool")]
}

fn league_roster() -> Vec<CanonicalPlayer> {
    [
        ("Mohamed Salah", "Liverpool", "FW"),
        ("Bukayo Saka", "Arsenal", "FW,MF"),
        ("Martin Ødegaard", "Arsenal", "MF"),
        ("Manuel Ugarte Ribeiro", "Manchester Utd", "MF"),
        ("Kevin De Bruyne", "Manchester City", "MF"),
        ("Bruno Borges Fernandes", "Manchester Utd", "MF"),
        ("Jordan Pickford", "Everton", "GK"),
        ("William Saliba", "Arsenal", "DF"),
    ]
    .into_iter()
    .map(|(name, team, pos)| {
        CanonicalPlayer::new(name)
            .with_attribute("Team", team)
            .with_attribute("Position", pos)
    })
    .collect()
}

fn scraped_batch() -> Vec<ScrapedRecord> {
    [
        ("M. Salah", "€15M"),
        ("Bukayo Saka", "€120M"),
        ("Martin Odegaard", "€90M"),
        ("Manuel Ugarte", "€45M"),
        ("Kevin De Bruyne", "€30M"),
        ("Bruno Fernandes", "€50M"),
        ("Jordan Pickford", "N/A"),
        ("Erling Haaland", "€180M"),
        ("", "€1M"),
        ("John Smith", "£500K"),
    ]
    .into_iter()
    .map(|(name, value)| ScrapedRecord::new(name).with_value("Value", value))
    .collect()
}

fn reconcile(
    roster: Vec<CanonicalPlayer>,
    records: Vec<ScrapedRecord>,
    normalizer: &NameNormalizer,
    threshold: u32,
) -> Reconciliation {
    let index = CandidateIndex::build(roster, normalizer);
    let matcher = FuzzyMatcher::new(Threshold::new(threshold).unwrap());
    Reconciler::new(&index, normalizer, &matcher).reconcile(records)
}

/// Renames seen on Premier League scraping sites.
fn league_exceptions() -> ExceptionTable {
    [
        ("Manuel Ugarte Ribeiro", "Manuel Ugarte"),
        ("Igor Júlio", "Igor"),
        ("Igor Thiago", "Thiago"),
        ("Felipe Morato", "Morato"),
        ("Nathan Wood-Gordon", "Nathan Wood"),
        ("Bobby Reid", "Bobby Cordova-Reid"),
        ("J. Philogene", "Jaden Philogene Bidace"),
    ]
    .into_iter()
    .collect()
}

fn two_token() -> NameNormalizer {
    NameNormalizer::new(ShortenRule::LeadingTokens(2))
}

// ===========================================================================
// Scenarios
// ===========================================================================

#[test]
fn abbreviated_name_joins_with_parsed_value() {
    let out = reconcile(
        salah_roster(),
        vec![ScrapedRecord::new("M. Salah").with_value("Value", "€15M")],
        &two_token(),
        85,
    );

    assert_eq!(out.matched_count(), 1);
    assert_eq!(out.unmatched_count(), 0);
    let row = &out.joined[0];
    assert_eq!(row.player.name, "Mohamed Salah");
    assert_eq!(row.player.attribute("Team"), Some("Liverpool"));
    assert_eq!(row.value("Value"), Some(15_000_000.0));
}

#[test]
fn unrelated_name_is_rejected() {
    let out = reconcile(
        salah_roster(),
        vec![ScrapedRecord::new("John Smith").with_value("Value", "€1M")],
        &two_token(),
        85,
    );

    assert_eq!(out.matched_count(), 0);
    assert_eq!(out.unmatched_count(), 1);
    assert_eq!(out.unmatched[0].record.name, "John Smith");
}

#[test]
fn empty_roster_matches_nothing() {
    let out = reconcile(Vec::new(), scraped_batch(), &two_token(), 0);
    assert_eq!(out.matched_count(), 0);
    assert_eq!(out.unmatched_count(), scraped_batch().len());
}

// ===========================================================================
// Properties
// ===========================================================================

#[test]
fn partition_covers_every_record_once() {
    for threshold in [0, 80, 85, 90, 100] {
        let batch = scraped_batch();
        let n = batch.len();
        let out = reconcile(league_roster(), batch, &two_token(), threshold);
        assert_eq!(out.total(), n, "threshold {threshold}");

        let mut seen: Vec<&str> = out
            .joined
            .iter()
            .map(|r| r.scraped_name.as_str())
            .chain(out.unmatched.iter().map(|u| u.record.name.as_str()))
            .collect();
        seen.sort_unstable();
        let mut expected: Vec<String> = scraped_batch().into_iter().map(|r| r.name).collect();
        expected.sort_unstable();
        assert_eq!(seen, expected, "threshold {threshold}");
    }
}

#[test]
fn repeated_runs_are_identical() {
    let normalizer = NameNormalizer::new(ShortenRule::FirstLast)
        .with_exceptions(league_exceptions());
    let first = reconcile(league_roster(), scraped_batch(), &normalizer, 80);
    let second = reconcile(league_roster(), scraped_batch(), &normalizer, 80);
    assert_eq!(first, second);
}

#[test]
fn exception_table_links_renamed_player() {
    let normalizer = NameNormalizer::new(ShortenRule::FirstLast)
        .with_exceptions(league_exceptions());
    let out = reconcile(
        league_roster(),
        vec![ScrapedRecord::new("Manuel Ugarte").with_value("Value", "€45M")],
        &normalizer,
        90,
    );
    assert_eq!(out.matched_count(), 1);
    assert_eq!(out.joined[0].player.name, "Manuel Ugarte Ribeiro");
}

#[test]
fn every_exception_entry_wins_over_generic_rule() {
    let table = league_exceptions();
    for rule in [ShortenRule::LeadingTokens(2), ShortenRule::FirstLast] {
        let normalizer = NameNormalizer::new(rule).with_exceptions(table.clone());
        for (raw, expected) in table.iter() {
            assert_eq!(normalizer.normalize(raw), expected, "rule {rule:?}");
        }
    }
}

#[test]
fn missing_value_still_joins() {
    let out = reconcile(league_roster(), scraped_batch(), &two_token(), 85);
    let pickford = out
        .joined
        .iter()
        .find(|r| r.player.name == "Jordan Pickford")
        .expect("Pickford should match");
    assert_eq!(pickford.value("Value"), None);
}

#[test]
fn diacritics_do_not_block_a_match() {
    let out = reconcile(league_roster(), scraped_batch(), &two_token(), 90);
    assert!(out.joined.iter().any(|r| r.player.name == "Martin Ødegaard"));
}
