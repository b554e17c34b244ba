//! Budget Semantics Tests
//!
//! Tests for the slot budget:
//! - Exceeding the budget clears the flag for the rest of the walk
//! - Two-slot nodes are parameterized fully or not at all
//! - A forest shares one id space and one budget

use matchparam::matcher::{parse_filter, MatchExpr};
use matchparam::parameterization::{
    parameterize, parameterize_forest, ParameterizationConfig, ParameterizationContext,
};
use matchparam::plan_cache::PlanCacheKey;
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn budget(max: usize) -> ParameterizationConfig {
    ParameterizationConfig::unlimited().with_max_param_count(max)
}

fn comparison_slot(expr: &MatchExpr) -> Option<usize> {
    expr.comparison().and_then(|c| c.input_param_id())
}

// =============================================================================
// Sticky Failure
// =============================================================================

/// Budget 2 with three leaves: 0, 1, then nothing for the rest.
#[test]
fn test_third_leaf_trips_budget() {
    let t = parse_filter(&json!({"a": 1, "b": 2, "c": 3, "d": 4})).unwrap();
    let outcome = parameterize(&t, &budget(2));

    assert!(!outcome.parameterized);
    let slots: Vec<_> = t.children().iter().map(comparison_slot).collect();
    assert_eq!(slots, vec![Some(0), Some(1), None, None]);
    assert_eq!(outcome.next_param_id, 2);
    assert_eq!(outcome.slot_count(), 2);
}

/// Once exhausted, even a leaf that could reuse an existing slot gets none.
#[test]
fn test_no_reuse_after_failure() {
    let t = parse_filter(&json!({"$or": [{"a": 1}, {"b": 2}, {"a": 1}]})).unwrap();
    let outcome = parameterize(&t, &budget(1));

    assert!(!outcome.parameterized);
    let slots: Vec<_> = t.children().iter().map(comparison_slot).collect();
    assert_eq!(slots, vec![Some(0), None, None]);
}

/// Reuse consumes no budget.
#[test]
fn test_reuse_fits_tight_budget() {
    let t = parse_filter(&json!({"$or": [{"a": 1}, {"a": 1, "b": 2}]})).unwrap();
    let outcome = parameterize(&t, &budget(2));

    assert!(outcome.parameterized);
    assert_eq!(outcome.slot_count(), 2);
}

/// Budget exactly equal to the need succeeds.
#[test]
fn test_exact_budget_succeeds() {
    let t = parse_filter(&json!({"a": 1, "b": 2})).unwrap();
    let outcome = parameterize(&t, &budget(2));
    assert!(outcome.parameterized);
}

/// A zero budget fails on the first eligible leaf.
#[test]
fn test_zero_budget() {
    let t = parse_filter(&json!({"a": 1})).unwrap();
    let outcome = parameterize(&t, &budget(0));

    assert!(!outcome.parameterized);
    assert_eq!(comparison_slot(&t), None);
}

/// A tree with no eligible leaf is parameterized under any budget.
#[test]
fn test_nothing_eligible_is_success() {
    let t = parse_filter(&json!({"a": null, "b": {"$exists": true}})).unwrap();
    let outcome = parameterize(&t, &budget(0));

    assert!(outcome.parameterized);
    assert_eq!(outcome.slot_count(), 0);
}

// =============================================================================
// All-Or-Nothing Groups
// =============================================================================

/// Budget 1 and a bit test first: zero slots, flag cleared.
#[test]
fn test_bit_test_gets_zero_not_one() {
    let t = parse_filter(&json!({"f": {"$bitsAllSet": [1, 2]}})).unwrap();
    let outcome = parameterize(&t, &budget(1));

    assert!(!outcome.parameterized);
    assert_eq!(outcome.slot_count(), 0);
    let bits = t.bit_test().unwrap();
    assert_eq!(bits.bit_positions_param_id(), None);
    assert_eq!(bits.bitmask_param_id(), None);

    // The key builder would reject a half-assigned group; here there is none
    assert!(PlanCacheKey::build(&t).is_ok());
}

/// The group check clears the flag even though one slot was still free.
#[test]
fn test_group_check_blocks_later_single_slot() {
    let t = parse_filter(&json!({"n": {"$mod": [5, 0]}, "a": 1})).unwrap();
    let outcome = parameterize(&t, &budget(1));

    assert!(!outcome.parameterized);
    assert_eq!(comparison_slot(&t.children()[1]), None);
    assert_eq!(outcome.slot_count(), 0);
}

/// A regex after one comparison with budget 2 stays whole-or-nothing.
#[test]
fn test_regex_group_after_single() {
    let t = parse_filter(&json!({"a": 1, "s": {"$regex": "^p"}})).unwrap();
    let outcome = parameterize(&t, &budget(2));

    assert!(!outcome.parameterized);
    assert_eq!(outcome.slot_count(), 1);
    match &t.children()[1] {
        MatchExpr::Regex(r) => {
            assert_eq!(r.source_regex_param_id(), None);
            assert_eq!(r.compiled_regex_param_id(), None);
        }
        other => panic!("expected regex, got {}", other.kind()),
    }
}

// =============================================================================
// Context Contract
// =============================================================================

/// `available_param_ids` is a check, not a reservation.
#[test]
fn test_available_param_ids_reserves_nothing() {
    let a = MatchExpr::eq("a", 1);
    let mut ctx = ParameterizationContext::new(Some(3), 0);

    assert!(ctx.available_param_ids(3));
    assert_eq!(ctx.next_param_id(), 0);
    assert_eq!(ctx.next_input_param_id(&a), Some(0));
    assert!(!ctx.available_param_ids(3));
    assert!(!ctx.parameterized());
}

// =============================================================================
// Forests
// =============================================================================

/// Later trees continue the id sequence of earlier ones.
#[test]
fn test_forest_ids_unique() {
    let roots = vec![
        parse_filter(&json!({"a": 1, "b": 2})).unwrap(),
        parse_filter(&json!({"a": 1})).unwrap(),
        parse_filter(&json!({"n": {"$mod": [2, 1]}})).unwrap(),
    ];
    let forest = parameterize_forest(&roots, &ParameterizationConfig::unlimited());

    assert!(forest.parameterized());
    assert_eq!(comparison_slot(&roots[1]), Some(2));
    assert_eq!(forest.trees[2].starting_param_id, 3);
    assert_eq!(forest.next_param_id(), Some(5));
}

/// The budget caps the whole forest, not each tree.
#[test]
fn test_forest_budget_is_total() {
    let roots = vec![
        parse_filter(&json!({"a": 1, "b": 2})).unwrap(),
        parse_filter(&json!({"c": 3, "d": 4})).unwrap(),
    ];
    let forest = parameterize_forest(&roots, &budget(3));

    assert!(forest.trees[0].parameterized);
    assert!(!forest.trees[1].parameterized);
    assert!(!forest.parameterized());
    assert_eq!(forest.slot_count(), 3);
}
