// Unified library integration tests
//
// End-to-end behavior of GameLibrary across detection, identification,
// merge, and split, including the invariants that must hold after every
// operation:
// - each (source plugin, source game) pair is owned by exactly one game
// - every unified game keeps at least one source
// - derived fields always reflect the current source/identification sets

use ludex_common::config::{MatchConfig, MatchStrategy};
use ludex_common::model::{DetectedGame, GameMetadata, IdentificationResult};
use ludex_unify::{AddOutcome, GameLibrary, GameState, SplitOutcome};
use std::collections::HashSet;

fn library(strategy: MatchStrategy) -> GameLibrary {
    GameLibrary::new(MatchConfig {
        strategy,
        fuzzy_threshold: 0.85,
    })
}

fn detection(id: &str, title: &str) -> DetectedGame {
    DetectedGame::new(id, title)
}

fn identification(identifier_id: &str, confidence: f32, title: &str) -> IdentificationResult {
    IdentificationResult::new(identifier_id, confidence, GameMetadata::with_title(title))
}

/// Source pairs across all games, asserting each is owned exactly once
fn assert_disjoint_ownership(library: &GameLibrary) -> HashSet<(String, String)> {
    let mut seen = HashSet::new();
    for game in library.all_games() {
        assert!(
            !game.sources.is_empty(),
            "unified game {} has no sources",
            game.id
        );
        for source in &game.sources {
            let pair = (source.source_id.clone(), source.source_game_id.clone());
            assert!(
                seen.insert(pair.clone()),
                "source pair {:?} owned by more than one unified game",
                pair
            );
            assert_eq!(
                library.owner_of(&source.source_id, &source.source_game_id),
                Some(game.id),
                "ownership index out of sync for {:?}",
                pair
            );
        }
    }
    seen
}

// ============================================================================
// Lifecycle walkthrough
// ============================================================================
//
// **Test Objective:**
// Walk one game through the full unify lifecycle: detection on Steam,
// cross-store match from Epic, identification, identification replacement,
// split, and the merge that reverses it.
//
// **Expected Outcome:**
// Every intermediate state matches the documented derivation rules, and
// the ownership invariants hold after every step.

#[test]
fn unified_lifecycle_walkthrough() {
    let mut lib = library(MatchStrategy::NormalizedTitle);

    // Step 1: Steam detects the game
    let mut steam = detection("440", "Team Fortress 2");
    steam.installed = true;
    let u1 = match lib.add_detected_game("steam", steam).unwrap() {
        AddOutcome::Created(id) => id,
        other => panic!("expected Created, got {:?}", other),
    };
    {
        let game = lib.game(u1).unwrap();
        assert_eq!(game.sources.len(), 1);
        assert!(game.is_installed);
        assert_eq!(game.title, "Team Fortress 2");
        assert_eq!(game.state(), GameState::Provisional);
    }
    assert_disjoint_ownership(&lib);

    // Step 2: Epic reports the same game; normalized titles fold it in
    let outcome = lib
        .add_detected_game("epic", detection("tf2-epic", "Team Fortress 2"))
        .unwrap();
    assert_eq!(outcome, AddOutcome::Matched(u1));
    {
        let game = lib.game(u1).unwrap();
        assert_eq!(game.sources.len(), 2);
        assert!(game.is_installed, "OR of installed=true and installed=false");
        assert_eq!(game.total_playtime_minutes, 0);
    }
    assert_disjoint_ownership(&lib);

    // Step 3: an identification overrides the raw title
    lib.add_identification(u1, identification("launchbox", 0.9, "Team Fortress 2 (2007)"))
        .unwrap();
    assert_eq!(lib.game(u1).unwrap().title, "Team Fortress 2 (2007)");

    // Step 4: the same identifier reports again; its result is replaced,
    // not accumulated
    lib.add_identification(u1, identification("launchbox", 0.4, "TF2 Beta"))
        .unwrap();
    {
        let game = lib.game(u1).unwrap();
        assert_eq!(game.identifications.len(), 1);
        assert_eq!(
            game.title, "TF2 Beta",
            "the replacement is now the only identification, so it wins"
        );
    }

    // Step 5: split the epic source back out; identifications stay behind
    let u2 = match lib.split_source(u1, "epic").unwrap() {
        SplitOutcome::Split { new_id, .. } => new_id,
        SplitOutcome::Unsplit(_) => panic!("expected a real split"),
    };
    {
        let original = lib.game(u1).unwrap();
        assert_eq!(original.sources.len(), 1);
        assert_eq!(original.sources[0].source_id, "steam");
        assert_eq!(original.title, "TF2 Beta", "identification stays with the original");

        let split_off = lib.game(u2).unwrap();
        assert_eq!(split_off.sources.len(), 1);
        assert_eq!(split_off.sources[0].source_id, "epic");
        assert!(split_off.identifications.is_empty());
        assert_eq!(
            split_off.title, "Team Fortress 2",
            "the split-off game falls back to its raw detected title"
        );
    }
    assert_disjoint_ownership(&lib);

    // Step 6: merging the split-off game back reverses the split
    lib.merge_games(u1, u2).unwrap();
    let game = lib.game(u1).unwrap();
    assert_eq!(game.sources.len(), 2);
    assert_eq!(game.state(), GameState::Merged);
    assert!(lib.game(u2).is_none());
    assert_disjoint_ownership(&lib);
}

// ============================================================================
// Idempotent re-scan
// ============================================================================
//
// **Test Objective:**
// Feeding the same (source, id) pair through add_detected_game repeatedly
// must never create a second game or a second source entry; later calls
// only refresh volatile fields.

#[test]
fn rescan_is_idempotent_for_source_pairs() {
    let mut lib = library(MatchStrategy::FuzzyTitle);

    let mut first = detection("440", "Team Fortress 2");
    first.installed = true;
    first.playtime_minutes = Some(100);
    let created = lib.add_detected_game("steam", first).unwrap();

    for pass in 0..3 {
        let mut rescan = detection("440", "Team Fortress 2");
        rescan.installed = false;
        rescan.playtime_minutes = Some(100 + pass);
        let outcome = lib.add_detected_game("steam", rescan).unwrap();
        assert_eq!(outcome, AddOutcome::Refreshed(created.game_id()));
    }

    assert_eq!(lib.len(), 1);
    let game = lib.game(created.game_id()).unwrap();
    assert_eq!(game.sources.len(), 1);
    assert!(!game.is_installed, "latest scan reported uninstalled");
    assert_eq!(game.total_playtime_minutes, 102);
    assert_disjoint_ownership(&lib);
}

// ============================================================================
// Derived field correctness
// ============================================================================
//
// **Test Objective:**
// isInstalled is exactly the OR of source flags, totalPlaytime exactly the
// sum (absent = 0), lastPlayed exactly the max (absent = not contributing).

#[test]
fn derived_fields_are_or_sum_and_max_across_sources() {
    use chrono::TimeZone;

    let mut lib = library(MatchStrategy::Manual);

    let mut steam = detection("440", "Team Fortress 2");
    steam.installed = false;
    steam.playtime_minutes = Some(100);
    steam.last_played = Some(chrono::Utc.with_ymd_and_hms(2024, 1, 15, 20, 0, 0).unwrap());
    let u1 = lib.add_detected_game("steam", steam).unwrap().game_id();

    let mut epic = detection("tf2-epic", "Team Fortress 2");
    epic.installed = true;
    let u2 = lib.add_detected_game("epic", epic).unwrap().game_id();

    let mut gog = detection("tf2-gog", "Team Fortress 2");
    gog.playtime_minutes = Some(40);
    gog.last_played = Some(chrono::Utc.with_ymd_and_hms(2024, 6, 2, 9, 30, 0).unwrap());
    let u3 = lib.add_detected_game("gog", gog).unwrap().game_id();

    lib.merge_games(u1, u2).unwrap();
    lib.merge_games(u1, u3).unwrap();

    let game = lib.game(u1).unwrap();
    assert!(game.is_installed, "only epic reports installed, OR holds");
    assert_eq!(game.total_playtime_minutes, 140, "100 + absent(0) + 40");
    assert_eq!(
        game.last_played,
        Some(chrono::Utc.with_ymd_and_hms(2024, 6, 2, 9, 30, 0).unwrap()),
        "gog played most recently"
    );
}

// ============================================================================
// Merge/split inverse property
// ============================================================================
//
// **Test Objective:**
// Merging game B into A and then splitting A by B's source plugin yields a
// game with exactly B's original source set. Titles and identification
// history may differ; only source-set equality is guaranteed.

#[test]
fn merge_then_split_returns_original_source_set() {
    let mut lib = library(MatchStrategy::Manual);

    let a = lib
        .add_detected_game("steam", detection("440", "Team Fortress 2"))
        .unwrap()
        .game_id();
    let b = lib
        .add_detected_game("epic", detection("tf2-epic", "TF2"))
        .unwrap()
        .game_id();
    let original_b_sources: HashSet<(String, String)> = lib
        .game(b)
        .unwrap()
        .sources
        .iter()
        .map(|s| (s.source_id.clone(), s.source_game_id.clone()))
        .collect();

    lib.merge_games(a, b).unwrap();
    let new_id = match lib.split_source(a, "epic").unwrap() {
        SplitOutcome::Split { new_id, .. } => new_id,
        SplitOutcome::Unsplit(_) => panic!("expected a real split"),
    };

    let restored: HashSet<(String, String)> = lib
        .game(new_id)
        .unwrap()
        .sources
        .iter()
        .map(|s| (s.source_id.clone(), s.source_game_id.clone()))
        .collect();
    assert_eq!(restored, original_b_sources);
    assert_disjoint_ownership(&lib);
}

// ============================================================================
// Rejected operations leave no partial state
// ============================================================================
//
// **Test Objective:**
// A merge that fails validation (self-merge, unknown id) must leave every
// game, source, and ownership entry exactly as it was.

#[test]
fn failed_merge_leaves_library_untouched() {
    let mut lib = library(MatchStrategy::Manual);
    let a = lib
        .add_detected_game("steam", detection("440", "Team Fortress 2"))
        .unwrap()
        .game_id();
    let b = lib
        .add_detected_game("epic", detection("tf2-epic", "TF2"))
        .unwrap()
        .game_id();
    let pairs_before = assert_disjoint_ownership(&lib);

    assert!(lib.merge_games(a, a).is_err());
    assert!(lib.merge_games(a, uuid::Uuid::new_v4()).is_err());
    assert!(lib.merge_games(uuid::Uuid::new_v4(), b).is_err());

    assert_eq!(lib.len(), 2);
    assert_eq!(lib.game(a).unwrap().sources.len(), 1);
    assert_eq!(lib.game(b).unwrap().sources.len(), 1);
    let pairs_after = assert_disjoint_ownership(&lib);
    assert_eq!(pairs_before, pairs_after);
}

// ============================================================================
// Fuzzy threshold boundary
// ============================================================================
//
// **Test Objective:**
// With strategy = fuzzy title and threshold 0.85, two titles whose computed
// similarity is exactly 0.85 must fold together, while similarity just
// below must not.

#[test]
fn fuzzy_threshold_boundary_is_inclusive() {
    // 20 characters, 3 substitutions: similarity = 1 - 3/20 = 0.85 exactly
    let mut lib = library(MatchStrategy::FuzzyTitle);
    let first = lib
        .add_detected_game("steam", detection("a1", "aaaaaaaaaaaaaaaaaaaa"))
        .unwrap();
    let at_threshold = lib
        .add_detected_game("epic", detection("a2", "aaaaaaaaaaaaaaaaabbb"))
        .unwrap();
    assert_eq!(
        at_threshold,
        AddOutcome::Matched(first.game_id()),
        "similarity exactly at the threshold must match"
    );

    // 1000 characters, 151 substitutions: similarity = 0.849
    let mut lib = library(MatchStrategy::FuzzyTitle);
    lib.add_detected_game("steam", detection("b1", &"a".repeat(1000)))
        .unwrap();
    let below = lib
        .add_detected_game(
            "epic",
            detection("b2", &format!("{}{}", "a".repeat(849), "b".repeat(151))),
        )
        .unwrap();
    assert!(
        matches!(below, AddOutcome::Created(_)),
        "similarity below the threshold must not match"
    );
    assert_eq!(lib.len(), 2);
}
