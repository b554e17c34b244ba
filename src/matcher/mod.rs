//! Match expression subsystem
//!
//! Provides the predicate tree the parameterization engine runs over:
//!
//! - `Literal`: operand values with a total cross-type order
//! - `MatchExpr`: the closed set of node kinds
//! - `tree_walker`: pre-order traversal with visitor hooks
//! - `FilterParser`: JSON filter documents to trees
//!
//! # Mutation contract
//!
//! Trees are immutable in shape once built. Leaves expose slot annotations
//! through interior mutability so a walk over `&MatchExpr` can attach slot
//! ids without being able to add, remove, or reorder nodes.

mod errors;
mod expression;
mod parser;
mod value;

pub mod tree_walker;

pub use errors::{ParseError, ParseResult};
pub use expression::{
    BitTestExpr, BsonType, ComparisonExpr, ElemMatchObjectExpr, ElemMatchValueExpr, ExprExpr,
    GeoExpr, InExpr, InputParamId, MatchExpr, MatchKind, ModExpr, PathExpr, RegexExpr,
    SchemaExpr, SizeExpr, TextExpr, TypeExpr, TypeSet, WhereExpr,
};
pub use parser::{parse_filter, FilterParser};
pub use value::Literal;
