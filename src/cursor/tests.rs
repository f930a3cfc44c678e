//! Tests for cursor strategies

use super::*;
use crate::error::Error;
use crate::testing::records;
use crate::types::{Destination, Direction, FetchMode, Query};
use pretty_assertions::assert_eq;
use test_case::test_case;

fn base() -> Query {
    Query::new(100).with_term("rust")
}

fn subjects(names: &[&str]) -> Vec<String> {
    names.iter().map(ToString::to_string).collect()
}

// ============================================================================
// NewCursor Tests
// ============================================================================

#[test]
fn test_new_cursor_without_cursor_is_unbounded() {
    let mut strategy = NewCursor::default();
    let query = strategy.derive_query(&base()).unwrap();
    assert!(!query.has_cursor());
    assert_eq!(strategy.mode(), FetchMode::Search);
}

#[test]
fn test_new_cursor_derives_forward_bound() {
    let mut strategy = NewCursor::new(Some(100));
    let query = strategy.derive_query(&base()).unwrap();
    assert_eq!(query.since_id(), Some(101));
    assert_eq!(query.max_id(), None);
}

#[test]
fn test_new_cursor_clears_backward_bound_from_base() {
    let mut strategy = NewCursor::new(Some(100));
    let query = strategy
        .derive_query(&base().with_param("max_id", "50"))
        .unwrap();
    assert_eq!(query.max_id(), None);
}

#[test_case(&[5, 9, 7], 10 ; "max of page")]
#[test_case(&[42], 43 ; "single record")]
fn test_new_cursor_after_cycle(ids: &[u64], next_since: u64) {
    let mut strategy = NewCursor::default();
    assert_eq!(strategy.advance(&records(ids)), Progress::Advanced);
    let query = strategy.derive_query(&base()).unwrap();
    assert_eq!(query.since_id(), Some(next_since));
}

#[test]
fn test_new_cursor_never_moves_back() {
    let mut strategy = NewCursor::new(Some(500));
    strategy.advance(&records(&[100]));
    assert_eq!(strategy.cursor(), Some(500));
}

#[test]
fn test_new_cursor_empty_is_idle() {
    let mut strategy = NewCursor::new(Some(100));
    assert_eq!(strategy.advance(&[]), Progress::Idle);
    assert_eq!(strategy.cursor(), Some(100));
}

// ============================================================================
// BackfillCursor Tests
// ============================================================================

#[test]
fn test_backfill_derives_backward_bound() {
    let mut strategy = BackfillCursor::default();
    strategy.advance(&records(&[30, 20, 25]));

    let query = strategy.derive_query(&base()).unwrap();
    assert_eq!(query.max_id(), Some(19));
    assert_eq!(query.since_id(), None);
}

#[test]
fn test_backfill_terminates_only_on_empty() {
    let mut strategy = BackfillCursor::new(Some(1000));
    assert_eq!(strategy.advance(&records(&[999])), Progress::Advanced);
    assert!(!strategy.advance(&records(&[5])).is_terminal());
    assert_eq!(strategy.advance(&[]), Progress::Exhausted);
}

#[test]
fn test_backfill_at_zero_has_nothing_left() {
    let mut strategy = BackfillCursor::new(Some(0));
    assert!(strategy.derive_query(&base()).is_none());
}

// ============================================================================
// SubjectRotation Tests
// ============================================================================

#[test]
fn test_rotation_cycles_subjects() {
    let mut strategy = SubjectRotation::new(subjects(&["a", "b", "c"]));
    let seen: Vec<_> = (0..4)
        .map(|_| {
            strategy
                .derive_query(&base())
                .unwrap()
                .subject()
                .unwrap()
                .to_string()
        })
        .collect();
    assert_eq!(seen, vec!["a", "b", "c", "a"]);
    assert_eq!(strategy.mode(), FetchMode::Timeline);
}

#[test_case(0, &["b", "c", "d"], "b" ; "first")]
#[test_case(1, &["a", "c", "d"], "c" ; "middle")]
#[test_case(3, &["a", "b", "c"], "a" ; "last wraps")]
fn test_rotation_invalid_target_removes_just_used(
    used: usize,
    remaining: &[&str],
    next: &str,
) {
    let mut strategy = SubjectRotation::new(subjects(&["a", "b", "c", "d"]));
    for _ in 0..=used {
        strategy.derive_query(&base()).unwrap();
    }

    let progress = strategy
        .on_invalid_target(Error::invalid_target("gone"))
        .unwrap();

    assert_eq!(progress, Progress::TargetDropped);
    assert_eq!(strategy.subjects(), subjects(remaining).as_slice());
    let query = strategy.derive_query(&base()).unwrap();
    assert_eq!(query.subject(), Some(next));
}

#[test]
fn test_rotation_last_subject_removed_is_exhausted() {
    let mut strategy = SubjectRotation::new(subjects(&["only"]));
    strategy.derive_query(&base()).unwrap();

    let progress = strategy
        .on_invalid_target(Error::invalid_target("only"))
        .unwrap();
    assert_eq!(progress, Progress::Exhausted);
    assert!(strategy.derive_query(&base()).is_none());
}

#[test]
fn test_rotation_other_errors_propagate() {
    let mut strategy = SubjectRotation::new(subjects(&["a"]));
    strategy.derive_query(&base()).unwrap();

    let err = strategy.on_invalid_target(Error::decode("bad")).unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
    assert_eq!(strategy.subjects().len(), 1);
}

#[test]
fn test_rotation_empty_result_is_exhausted() {
    let mut strategy = SubjectRotation::new(subjects(&["a", "b"]));
    strategy.derive_query(&base()).unwrap();
    assert_eq!(strategy.advance(&[]), Progress::Exhausted);
}

#[test_case(Direction::New, &[10, 30], Some(31), None ; "new")]
#[test_case(Direction::Past, &[10, 30], None, Some(9) ; "past")]
#[test_case(Direction::All, &[10, 30], None, None ; "all")]
fn test_rotation_limit_follows_direction(
    direction: Direction,
    ids: &[u64],
    since_id: Option<u64>,
    max_id: Option<u64>,
) {
    let mut strategy =
        SubjectRotation::new(subjects(&["a", "b"])).with_limit(direction, Some(20));
    strategy.derive_query(&base()).unwrap();
    strategy.advance(&records(ids));

    let query = strategy.derive_query(&base()).unwrap();
    assert_eq!(query.since_id(), since_id);
    assert_eq!(query.max_id(), max_id);
}

#[test]
fn test_rotation_without_limit_stays_unbounded() {
    let mut strategy = SubjectRotation::new(subjects(&["a"])).with_limit(Direction::New, None);
    strategy.derive_query(&base()).unwrap();
    strategy.advance(&records(&[5]));
    assert!(!strategy.derive_query(&base()).unwrap().has_cursor());
}

#[test]
fn test_rotation_stance_label() {
    let strategy = SubjectRotation::new(subjects(&["a"])).with_stance(Stance::Negative);
    let destination = strategy.destination(&Destination::new("climate", "climate"));
    assert_eq!(destination.label, "climate-Negative");
    assert_eq!(destination.collection, "climate");
}

// ============================================================================
// Snapshot Tests
// ============================================================================

#[test]
fn test_rotation_snapshot_restore() {
    let mut strategy =
        SubjectRotation::new(subjects(&["a", "b", "c"])).with_limit(Direction::Past, Some(90));
    strategy.derive_query(&base()).unwrap();
    strategy.on_invalid_target(Error::invalid_target("a")).unwrap();
    strategy.derive_query(&base()).unwrap();

    let snapshot = strategy.snapshot();
    assert_eq!(snapshot.subjects, Some(subjects(&["b", "c"])));
    assert_eq!(snapshot.index, 1);

    let mut restored = SubjectRotation::new(subjects(&["a", "b", "c"]))
        .with_limit(Direction::Past, None);
    restored.restore(&snapshot);
    assert_eq!(restored.subjects(), strategy.subjects());
    assert_eq!(restored.limit(), Some(90));
    assert_eq!(
        restored.derive_query(&base()).unwrap().subject(),
        Some("c")
    );
}

#[test]
fn test_cursor_snapshot_serde() {
    let snapshot = CursorSnapshot::with_cursor(Some(7));
    let json = serde_json::to_string(&snapshot).unwrap();
    assert_eq!(json, r#"{"cursor":7,"index":0,"exhausted":false}"#);

    let parsed: CursorSnapshot = serde_json::from_str("{}").unwrap();
    assert_eq!(parsed, CursorSnapshot::default());
}
