//! Exclusion Table Tests
//!
//! Every operand the engine refuses to parameterize, checked through the
//! filter parser so the cases read like real queries.

use matchparam::matcher::{parse_filter, ComparisonExpr, MatchExpr};
use matchparam::parameterization::{
    excluded_comparison_operand, parameterize, ExcludedLiteral, ParameterizationConfig,
    COMPARISON_EXCLUSIONS,
};
use serde_json::{json, Value};

fn walk(filter: Value) -> (MatchExpr, usize) {
    let t = parse_filter(&filter).unwrap();
    let slots = parameterize(&t, &ParameterizationConfig::unlimited()).slot_count();
    (t, slots)
}

// =============================================================================
// Comparison Operands
// =============================================================================

/// The table holds exactly the five documented operands.
#[test]
fn test_table_contents() {
    assert_eq!(
        COMPARISON_EXCLUSIONS,
        [
            ExcludedLiteral::MinKey,
            ExcludedLiteral::MaxKey,
            ExcludedLiteral::Null,
            ExcludedLiteral::NaN,
            ExcludedLiteral::Array,
        ]
    );
}

/// Each excluded operand leaves every comparison kind unparameterized.
#[test]
fn test_excluded_operands_keep_literal() {
    let operands = [
        json!({"$minKey": 1}),
        json!({"$maxKey": 1}),
        json!(null),
        json!({"$numberDouble": "NaN"}),
        json!([1, 2]),
    ];
    for operand in operands {
        for op in ["$eq", "$gt", "$gte", "$lt", "$lte"] {
            let (t, slots) = walk(json!({"a": {op: operand.clone()}}));
            assert_eq!(slots, 0, "{} {}", op, operand);
            assert_eq!(t.comparison().unwrap().input_param_id(), None);
            assert!(excluded_comparison_operand(t.comparison().unwrap().rhs()).is_some());
        }
    }
}

/// Ordinary operands are parameterized.
#[test]
fn test_ordinary_operands_parameterized() {
    for operand in [json!(0), json!(-2.5), json!("x"), json!(true), json!({"k": 1})] {
        let (t, slots) = walk(json!({"a": operand.clone()}));
        assert_eq!(slots, 1, "{}", operand);
        assert_eq!(t.comparison().unwrap().input_param_id(), Some(0));
    }
}

/// An excluded leaf does not disturb its neighbours' ids.
#[test]
fn test_excluded_leaf_skipped_silently() {
    let (t, slots) = walk(json!({"a": 1, "b": null, "c": 2}));
    assert_eq!(slots, 2);
    let ids: Vec<_> = t
        .children()
        .iter()
        .map(|c| c.comparison().and_then(ComparisonExpr::input_param_id))
        .collect();
    assert_eq!(ids, vec![Some(0), None, Some(1)]);
}

// =============================================================================
// Membership Lists
// =============================================================================

/// One array member keeps the whole list literal.
#[test]
fn test_in_with_array_member() {
    let (t, slots) = walk(json!({"a": {"$in": [1, [2, 3], 4]}}));
    assert_eq!(slots, 0);
    match &t {
        MatchExpr::In(e) => assert_eq!(e.input_param_id(), None),
        other => panic!("expected in, got {}", other.kind()),
    }
}

/// Null or regex members also keep the list literal.
#[test]
fn test_in_with_null_or_regex_member() {
    let (_, slots) = walk(json!({"a": {"$in": [1, null]}}));
    assert_eq!(slots, 0);

    let (_, slots) = walk(json!({"a": {"$in": [1, {"$regex": "^z"}]}}));
    assert_eq!(slots, 0);
}

/// A plain list is one slot, not one per member.
#[test]
fn test_in_plain_list_single_slot() {
    let (_, slots) = walk(json!({"a": {"$in": [1, 2, 3, 4, 5]}}));
    assert_eq!(slots, 1);
}

// =============================================================================
// Kind-Level Exclusions
// =============================================================================

/// The hashed-key equality never takes a slot.
#[test]
fn test_hashed_key_never_parameterized() {
    let t = MatchExpr::InternalEqHashedKey(ComparisonExpr::new("a", 12345));
    let outcome = parameterize(&t, &ParameterizationConfig::unlimited());
    assert_eq!(outcome.slot_count(), 0);
    assert!(outcome.parameterized);
}

/// `$type` including array stays literal.
#[test]
fn test_type_array_excluded() {
    let (_, slots) = walk(json!({"a": {"$type": ["string", "array"]}}));
    assert_eq!(slots, 0);

    let (_, slots) = walk(json!({"a": {"$type": "number"}}));
    assert_eq!(slots, 1);
}

/// Structural and search predicates never take slots.
#[test]
fn test_structural_predicates_unparameterized() {
    let (_, slots) = walk(json!({
        "a": {"$exists": true},
        "$text": {"$search": "coffee"},
        "$expr": {"$gt": ["$x", "$y"]}
    }));
    assert_eq!(slots, 0);
}
