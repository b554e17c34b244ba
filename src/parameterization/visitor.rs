//! Per-kind parameterization policy
//!
//! `ParameterizationVisitor::visit` is one exhaustive match over `MatchExpr`.
//! A new node kind does not compile until it is given a policy here.
//!
//! Policies:
//!
//! - never: logical combinators, `$exists`, geo, text, `$expr`, `$elemMatch`,
//!   the internal expression comparisons, the hashed-key equality, and every
//!   internal schema kind
//! - one reusable slot: comparisons (see [`COMPARISON_EXCLUSIONS`]), `$in`
//!   without array, null, or regex members, `$size`, `$type` without `array`,
//!   `$where`
//! - two fresh slots assigned as a unit: bit tests, `$mod`, `$regex`

use crate::matcher::{BsonType, ComparisonExpr, Literal, MatchExpr};

use super::context::ParameterizationContext;

/// Comparison operands that keep a comparison unparameterized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExcludedLiteral {
    MinKey,
    MaxKey,
    Null,
    NaN,
    Array,
}

impl ExcludedLiteral {
    pub fn matches(&self, literal: &Literal) -> bool {
        match self {
            ExcludedLiteral::MinKey => literal.is_min_key(),
            ExcludedLiteral::MaxKey => literal.is_max_key(),
            ExcludedLiteral::Null => literal.is_null(),
            ExcludedLiteral::NaN => literal.is_nan(),
            ExcludedLiteral::Array => literal.is_array(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExcludedLiteral::MinKey => "minKey",
            ExcludedLiteral::MaxKey => "maxKey",
            ExcludedLiteral::Null => "null",
            ExcludedLiteral::NaN => "NaN",
            ExcludedLiteral::Array => "array",
        }
    }
}

/// Operands a comparison may not be parameterized over.
///
/// Bound sentinels and null select index bounds that differ from those of an
/// ordinary value, NaN compares unlike every other number, and an array
/// operand also matches the array as a whole. A cached plan built for one
/// value would be wrong for these.
pub const COMPARISON_EXCLUSIONS: [ExcludedLiteral; 5] = [
    ExcludedLiteral::MinKey,
    ExcludedLiteral::MaxKey,
    ExcludedLiteral::Null,
    ExcludedLiteral::NaN,
    ExcludedLiteral::Array,
];

/// First exclusion entry matching `rhs`, if any
pub fn excluded_comparison_operand(rhs: &Literal) -> Option<ExcludedLiteral> {
    COMPARISON_EXCLUSIONS
        .iter()
        .copied()
        .find(|excluded| excluded.matches(rhs))
}

/// Attaches slot ids to eligible leaves, drawing them from a shared context
pub struct ParameterizationVisitor<'c, 'a> {
    context: &'c mut ParameterizationContext<'a>,
}

impl<'c, 'a> ParameterizationVisitor<'c, 'a> {
    pub fn new(context: &'c mut ParameterizationContext<'a>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &ParameterizationContext<'a> {
        self.context
    }

    /// Applies the policy for `expr`'s kind. Children are not visited.
    pub fn visit(&mut self, expr: &'a MatchExpr) {
        match expr {
            MatchExpr::AlwaysFalse
            | MatchExpr::AlwaysTrue
            | MatchExpr::And(_)
            | MatchExpr::Or(_)
            | MatchExpr::Nor(_)
            | MatchExpr::Not(_) => {}

            MatchExpr::Eq(c)
            | MatchExpr::Gt(c)
            | MatchExpr::Gte(c)
            | MatchExpr::Lt(c)
            | MatchExpr::Lte(c) => self.visit_comparison(expr, c),

            MatchExpr::BitsAllClear(b)
            | MatchExpr::BitsAllSet(b)
            | MatchExpr::BitsAnyClear(b)
            | MatchExpr::BitsAnySet(b) => {
                if self.context.available_param_ids(2) {
                    b.set_bit_positions_param_id(self.context.next_input_param_id(expr));
                    b.set_bitmask_param_id(self.context.next_input_param_id(expr));
                }
            }

            MatchExpr::In(e) => {
                if !e.has_array() && !e.has_null() && !e.has_regex() {
                    e.set_input_param_id(self.context.next_reusable_input_param_id(expr));
                }
            }

            MatchExpr::Mod(e) => {
                if self.context.available_param_ids(2) {
                    e.set_divisor_param_id(self.context.next_input_param_id(expr));
                    e.set_remainder_param_id(self.context.next_input_param_id(expr));
                }
            }

            MatchExpr::Regex(e) => {
                if self.context.available_param_ids(2) {
                    e.set_source_regex_param_id(self.context.next_input_param_id(expr));
                    e.set_compiled_regex_param_id(self.context.next_input_param_id(expr));
                }
            }

            MatchExpr::Size(e) => {
                e.set_input_param_id(self.context.next_reusable_input_param_id(expr));
            }

            MatchExpr::Type(e) => {
                if !e.type_set().has_type(BsonType::Array) {
                    e.set_input_param_id(self.context.next_reusable_input_param_id(expr));
                }
            }

            MatchExpr::Where(e) => {
                e.set_input_param_id(self.context.next_reusable_input_param_id(expr));
            }

            MatchExpr::WhereNoOp(_)
            | MatchExpr::ElemMatchObject(_)
            | MatchExpr::ElemMatchValue(_)
            | MatchExpr::Exists(_)
            | MatchExpr::Expr(_)
            | MatchExpr::Geo(_)
            | MatchExpr::GeoNear(_)
            | MatchExpr::Text(_)
            | MatchExpr::TextNoOp(_)
            | MatchExpr::TwoDPtInAnnulus(_)
            | MatchExpr::InternalBucketGeoWithin(_) => {}

            MatchExpr::InternalExprEq(_)
            | MatchExpr::InternalExprGt(_)
            | MatchExpr::InternalExprGte(_)
            | MatchExpr::InternalExprLt(_)
            | MatchExpr::InternalExprLte(_) => {}

            // No parameterized evaluation exists downstream for hashed keys
            MatchExpr::InternalEqHashedKey(_) => {}

            MatchExpr::InternalSchemaAllElemMatchFromIndex(_)
            | MatchExpr::InternalSchemaAllowedProperties(_)
            | MatchExpr::InternalSchemaBinDataEncryptedType(_)
            | MatchExpr::InternalSchemaBinDataFle2EncryptedType(_)
            | MatchExpr::InternalSchemaBinDataSubType(_)
            | MatchExpr::InternalSchemaCond(_)
            | MatchExpr::InternalSchemaEq(_)
            | MatchExpr::InternalSchemaFmod(_)
            | MatchExpr::InternalSchemaMatchArrayIndex(_)
            | MatchExpr::InternalSchemaMaxItems(_)
            | MatchExpr::InternalSchemaMaxLength(_)
            | MatchExpr::InternalSchemaMaxProperties(_)
            | MatchExpr::InternalSchemaMinItems(_)
            | MatchExpr::InternalSchemaMinLength(_)
            | MatchExpr::InternalSchemaMinProperties(_)
            | MatchExpr::InternalSchemaObject(_)
            | MatchExpr::InternalSchemaRootDocEq(_)
            | MatchExpr::InternalSchemaType(_)
            | MatchExpr::InternalSchemaUniqueItems(_)
            | MatchExpr::InternalSchemaXor(_) => {}
        }
    }

    fn visit_comparison(&mut self, expr: &'a MatchExpr, comparison: &ComparisonExpr) {
        if excluded_comparison_operand(comparison.rhs()).is_some() {
            return;
        }
        comparison.set_input_param_id(self.context.next_reusable_input_param_id(expr));
    }
}
