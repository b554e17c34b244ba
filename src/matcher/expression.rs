//! Match expression tree
//!
//! `MatchExpr` is the closed set of node kinds a filter is built from.
//! Trees are finite and acyclic; interior nodes own their children.
//!
//! Leaves that can stand in for a parameter slot carry their slot id(s) in
//! a `Cell`, next to the literal they replace. Annotation therefore only
//! needs a shared reference, and code holding `&MatchExpr` can never change
//! the shape of the tree.

use std::cell::Cell;
use std::collections::BTreeSet;
use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::Serialize;

use super::errors::{ParseError, ParseResult};
use super::value::Literal;

/// Identifier of a parameter slot
pub type InputParamId = usize;

/// Slot annotation attached to a leaf
pub type ParamSlot = Cell<Option<InputParamId>>;

// =============================================================================
// Value types
// =============================================================================

/// Value types understood by `$type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BsonType {
    MinKey,
    Double,
    String,
    Object,
    Array,
    BinData,
    ObjectId,
    Bool,
    Date,
    Null,
    Regex,
    Int,
    Timestamp,
    Long,
    Decimal,
    MaxKey,
}

impl BsonType {
    /// Resolves a `$type` string alias
    pub fn from_alias(alias: &str) -> Option<BsonType> {
        let ty = match alias {
            "minKey" => BsonType::MinKey,
            "double" => BsonType::Double,
            "string" => BsonType::String,
            "object" => BsonType::Object,
            "array" => BsonType::Array,
            "binData" => BsonType::BinData,
            "objectId" => BsonType::ObjectId,
            "bool" => BsonType::Bool,
            "date" => BsonType::Date,
            "null" => BsonType::Null,
            "regex" => BsonType::Regex,
            "int" => BsonType::Int,
            "timestamp" => BsonType::Timestamp,
            "long" => BsonType::Long,
            "decimal" => BsonType::Decimal,
            "maxKey" => BsonType::MaxKey,
            _ => return None,
        };
        Some(ty)
    }

    /// Resolves a `$type` numeric code
    pub fn from_code(code: i64) -> Option<BsonType> {
        let ty = match code {
            -1 => BsonType::MinKey,
            1 => BsonType::Double,
            2 => BsonType::String,
            3 => BsonType::Object,
            4 => BsonType::Array,
            5 => BsonType::BinData,
            7 => BsonType::ObjectId,
            8 => BsonType::Bool,
            9 => BsonType::Date,
            10 => BsonType::Null,
            11 => BsonType::Regex,
            16 => BsonType::Int,
            17 => BsonType::Timestamp,
            18 => BsonType::Long,
            19 => BsonType::Decimal,
            127 => BsonType::MaxKey,
            _ => return None,
        };
        Some(ty)
    }

    pub fn alias(&self) -> &'static str {
        match self {
            BsonType::MinKey => "minKey",
            BsonType::Double => "double",
            BsonType::String => "string",
            BsonType::Object => "object",
            BsonType::Array => "array",
            BsonType::BinData => "binData",
            BsonType::ObjectId => "objectId",
            BsonType::Bool => "bool",
            BsonType::Date => "date",
            BsonType::Null => "null",
            BsonType::Regex => "regex",
            BsonType::Int => "int",
            BsonType::Timestamp => "timestamp",
            BsonType::Long => "long",
            BsonType::Decimal => "decimal",
            BsonType::MaxKey => "maxKey",
        }
    }
}

/// Operand of `$type`: a set of types, optionally with the `"number"` alias
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeSet {
    pub types: BTreeSet<BsonType>,
    /// Matches every numeric type
    pub all_numbers: bool,
}

impl TypeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(types: impl IntoIterator<Item = BsonType>) -> Self {
        Self {
            types: types.into_iter().collect(),
            all_numbers: false,
        }
    }

    pub fn numbers() -> Self {
        Self {
            types: BTreeSet::new(),
            all_numbers: true,
        }
    }

    pub fn has_type(&self, ty: BsonType) -> bool {
        self.types.contains(&ty)
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && !self.all_numbers
    }
}

impl fmt::Display for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        let mut first = true;
        if self.all_numbers {
            write!(f, "number")?;
            first = false;
        }
        for ty in &self.types {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{}", ty.alias())?;
            first = false;
        }
        write!(f, "]")
    }
}

// =============================================================================
// Node payloads
// =============================================================================

/// Path comparison against a single literal
#[derive(Debug, Clone)]
pub struct ComparisonExpr {
    path: String,
    rhs: Literal,
    input_param_id: ParamSlot,
}

impl ComparisonExpr {
    pub fn new(path: impl Into<String>, rhs: impl Into<Literal>) -> Self {
        Self {
            path: path.into(),
            rhs: rhs.into(),
            input_param_id: Cell::new(None),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn rhs(&self) -> &Literal {
        &self.rhs
    }

    pub fn input_param_id(&self) -> Option<InputParamId> {
        self.input_param_id.get()
    }

    pub fn set_input_param_id(&self, id: Option<InputParamId>) {
        self.input_param_id.set(id);
    }

    pub fn equivalent(&self, other: &ComparisonExpr) -> bool {
        self.path == other.path && self.rhs.equivalent(&other.rhs)
    }
}

/// `$bitsAllSet` / `$bitsAllClear` / `$bitsAnySet` / `$bitsAnyClear`
#[derive(Debug, Clone)]
pub struct BitTestExpr {
    path: String,
    bit_positions: Vec<u32>,
    bit_positions_param_id: ParamSlot,
    bitmask_param_id: ParamSlot,
}

impl BitTestExpr {
    pub fn new(path: impl Into<String>, bit_positions: Vec<u32>) -> Self {
        Self {
            path: path.into(),
            bit_positions,
            bit_positions_param_id: Cell::new(None),
            bitmask_param_id: Cell::new(None),
        }
    }

    /// Builds from a numeric mask, one position per set bit
    pub fn from_mask(path: impl Into<String>, mask: u64) -> Self {
        let positions = (0..64u32).filter(|bit| mask & (1u64 << *bit) != 0).collect();
        Self::new(path, positions)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn bit_positions(&self) -> &[u32] {
        &self.bit_positions
    }

    /// Mask of the positions below 64
    pub fn bit_mask(&self) -> u64 {
        self.bit_positions
            .iter()
            .filter(|&&bit| bit < 64)
            .fold(0u64, |mask, &bit| mask | (1u64 << bit))
    }

    pub fn bit_positions_param_id(&self) -> Option<InputParamId> {
        self.bit_positions_param_id.get()
    }

    pub fn set_bit_positions_param_id(&self, id: Option<InputParamId>) {
        self.bit_positions_param_id.set(id);
    }

    pub fn bitmask_param_id(&self) -> Option<InputParamId> {
        self.bitmask_param_id.get()
    }

    pub fn set_bitmask_param_id(&self, id: Option<InputParamId>) {
        self.bitmask_param_id.set(id);
    }

    pub fn equivalent(&self, other: &BitTestExpr) -> bool {
        self.path == other.path && self.bit_positions == other.bit_positions
    }
}

/// `$mod: [divisor, remainder]`
#[derive(Debug, Clone)]
pub struct ModExpr {
    path: String,
    divisor: i64,
    remainder: i64,
    divisor_param_id: ParamSlot,
    remainder_param_id: ParamSlot,
}

impl ModExpr {
    pub fn new(path: impl Into<String>, divisor: i64, remainder: i64) -> ParseResult<Self> {
        if divisor == 0 {
            return Err(ParseError::ZeroDivisor);
        }
        Ok(Self {
            path: path.into(),
            divisor,
            remainder,
            divisor_param_id: Cell::new(None),
            remainder_param_id: Cell::new(None),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn divisor(&self) -> i64 {
        self.divisor
    }

    pub fn remainder(&self) -> i64 {
        self.remainder
    }

    pub fn divisor_param_id(&self) -> Option<InputParamId> {
        self.divisor_param_id.get()
    }

    pub fn set_divisor_param_id(&self, id: Option<InputParamId>) {
        self.divisor_param_id.set(id);
    }

    pub fn remainder_param_id(&self) -> Option<InputParamId> {
        self.remainder_param_id.get()
    }

    pub fn set_remainder_param_id(&self, id: Option<InputParamId>) {
        self.remainder_param_id.set(id);
    }

    pub fn equivalent(&self, other: &ModExpr) -> bool {
        self.path == other.path
            && self.divisor == other.divisor
            && self.remainder == other.remainder
    }
}

/// `$regex` with its compiled form
#[derive(Debug, Clone)]
pub struct RegexExpr {
    path: String,
    pattern: String,
    flags: String,
    compiled: Regex,
    source_regex_param_id: ParamSlot,
    compiled_regex_param_id: ParamSlot,
}

impl RegexExpr {
    /// Compiles `pattern`. Options: `i` case-insensitive, `m` multi-line,
    /// `s` dot matches newline, `x` extended, `u` accepted and ignored.
    pub fn new(
        path: impl Into<String>,
        pattern: impl Into<String>,
        flags: impl Into<String>,
    ) -> ParseResult<Self> {
        let pattern = pattern.into();
        let flags = flags.into();

        let mut builder = RegexBuilder::new(&pattern);
        for flag in flags.chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                'm' => builder.multi_line(true),
                's' => builder.dot_matches_new_line(true),
                'x' => builder.ignore_whitespace(true),
                'u' => &mut builder,
                _ => return Err(ParseError::InvalidRegexOptions(flags.clone())),
            };
        }
        let compiled = builder.build().map_err(|e| ParseError::InvalidRegex {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            path: path.into(),
            pattern,
            flags,
            compiled,
            source_regex_param_id: Cell::new(None),
            compiled_regex_param_id: Cell::new(None),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn flags(&self) -> &str {
        &self.flags
    }

    pub fn compiled(&self) -> &Regex {
        &self.compiled
    }

    pub fn source_regex_param_id(&self) -> Option<InputParamId> {
        self.source_regex_param_id.get()
    }

    pub fn set_source_regex_param_id(&self, id: Option<InputParamId>) {
        self.source_regex_param_id.set(id);
    }

    pub fn compiled_regex_param_id(&self) -> Option<InputParamId> {
        self.compiled_regex_param_id.get()
    }

    pub fn set_compiled_regex_param_id(&self, id: Option<InputParamId>) {
        self.compiled_regex_param_id.set(id);
    }

    pub fn equivalent(&self, other: &RegexExpr) -> bool {
        self.path == other.path && self.pattern == other.pattern && self.flags == other.flags
    }
}

/// `$in`: equality literals plus regexes
#[derive(Debug, Clone)]
pub struct InExpr {
    path: String,
    equalities: Vec<Literal>,
    regexes: Vec<RegexExpr>,
    input_param_id: ParamSlot,
}

impl InExpr {
    /// Splits `values` into regexes and equalities. Equalities are sorted and
    /// deduplicated so that list order does not affect equivalence.
    pub fn new(path: impl Into<String>, values: Vec<Literal>) -> ParseResult<Self> {
        let path = path.into();
        let mut equalities = Vec::new();
        let mut regexes = Vec::new();

        for value in values {
            match value {
                Literal::Regex { pattern, flags } => {
                    regexes.push(RegexExpr::new("", pattern, flags)?);
                }
                other => equalities.push(other),
            }
        }

        equalities.sort_by(|a, b| a.compare(b));
        equalities.dedup_by(|a, b| a.equivalent(b));

        Ok(Self {
            path,
            equalities,
            regexes,
            input_param_id: Cell::new(None),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn equalities(&self) -> &[Literal] {
        &self.equalities
    }

    pub fn regexes(&self) -> &[RegexExpr] {
        &self.regexes
    }

    pub fn has_null(&self) -> bool {
        self.equalities.iter().any(Literal::is_null)
    }

    pub fn has_array(&self) -> bool {
        self.equalities.iter().any(Literal::is_array)
    }

    pub fn has_regex(&self) -> bool {
        !self.regexes.is_empty()
    }

    pub fn input_param_id(&self) -> Option<InputParamId> {
        self.input_param_id.get()
    }

    pub fn set_input_param_id(&self, id: Option<InputParamId>) {
        self.input_param_id.set(id);
    }

    pub fn equivalent(&self, other: &InExpr) -> bool {
        self.path == other.path
            && self.equalities.len() == other.equalities.len()
            && self
                .equalities
                .iter()
                .zip(&other.equalities)
                .all(|(a, b)| a.equivalent(b))
            && self.regexes.len() == other.regexes.len()
            && self
                .regexes
                .iter()
                .zip(&other.regexes)
                .all(|(a, b)| a.equivalent(b))
    }
}

/// `$size`
#[derive(Debug, Clone)]
pub struct SizeExpr {
    path: String,
    size: i64,
    input_param_id: ParamSlot,
}

impl SizeExpr {
    pub fn new(path: impl Into<String>, size: i64) -> Self {
        Self {
            path: path.into(),
            size,
            input_param_id: Cell::new(None),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn size(&self) -> i64 {
        self.size
    }

    pub fn input_param_id(&self) -> Option<InputParamId> {
        self.input_param_id.get()
    }

    pub fn set_input_param_id(&self, id: Option<InputParamId>) {
        self.input_param_id.set(id);
    }

    pub fn equivalent(&self, other: &SizeExpr) -> bool {
        self.path == other.path && self.size == other.size
    }
}

/// `$type`
#[derive(Debug, Clone)]
pub struct TypeExpr {
    path: String,
    type_set: TypeSet,
    input_param_id: ParamSlot,
}

impl TypeExpr {
    pub fn new(path: impl Into<String>, type_set: TypeSet) -> Self {
        Self {
            path: path.into(),
            type_set,
            input_param_id: Cell::new(None),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn type_set(&self) -> &TypeSet {
        &self.type_set
    }

    pub fn input_param_id(&self) -> Option<InputParamId> {
        self.input_param_id.get()
    }

    pub fn set_input_param_id(&self, id: Option<InputParamId>) {
        self.input_param_id.set(id);
    }

    pub fn equivalent(&self, other: &TypeExpr) -> bool {
        self.path == other.path && self.type_set == other.type_set
    }
}

/// `$where` code predicate
#[derive(Debug, Clone)]
pub struct WhereExpr {
    code: String,
    input_param_id: ParamSlot,
}

impl WhereExpr {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            input_param_id: Cell::new(None),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn input_param_id(&self) -> Option<InputParamId> {
        self.input_param_id.get()
    }

    pub fn set_input_param_id(&self, id: Option<InputParamId>) {
        self.input_param_id.set(id);
    }

    pub fn equivalent(&self, other: &WhereExpr) -> bool {
        self.code == other.code
    }
}

/// Path-only predicate (`$exists`)
#[derive(Debug, Clone)]
pub struct PathExpr {
    pub path: String,
}

impl PathExpr {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// `$elemMatch` over embedded documents
#[derive(Debug, Clone)]
pub struct ElemMatchObjectExpr {
    pub path: String,
    pub child: Box<MatchExpr>,
}

/// `$elemMatch` over scalar array elements
#[derive(Debug, Clone)]
pub struct ElemMatchValueExpr {
    pub path: String,
    pub children: Vec<MatchExpr>,
}

/// Geospatial predicate
#[derive(Debug, Clone)]
pub struct GeoExpr {
    pub path: String,
    pub operator: String,
    pub geometry: Literal,
}

/// `$text` search
#[derive(Debug, Clone)]
pub struct TextExpr {
    pub search: String,
    pub language: Option<String>,
    pub case_sensitive: bool,
    pub diacritic_sensitive: bool,
}

/// `$expr` aggregation expression, kept opaque
#[derive(Debug, Clone)]
pub struct ExprExpr {
    pub expression: Literal,
}

/// Internal schema predicate. `path` is absent for document-level kinds.
#[derive(Debug, Clone)]
pub struct SchemaExpr {
    pub path: Option<String>,
    pub operand: Literal,
    pub children: Vec<MatchExpr>,
}

impl SchemaExpr {
    pub fn new(path: Option<String>, operand: Literal, children: Vec<MatchExpr>) -> Self {
        Self {
            path,
            operand,
            children,
        }
    }

    fn equivalent(&self, other: &SchemaExpr) -> bool {
        self.path == other.path
            && self.operand.equivalent(&other.operand)
            && children_equivalent(&self.children, &other.children)
    }
}

// =============================================================================
// MatchExpr
// =============================================================================

/// A node of a match expression tree
#[derive(Debug, Clone)]
pub enum MatchExpr {
    AlwaysFalse,
    AlwaysTrue,
    And(Vec<MatchExpr>),
    Or(Vec<MatchExpr>),
    Nor(Vec<MatchExpr>),
    Not(Box<MatchExpr>),

    Eq(ComparisonExpr),
    Gt(ComparisonExpr),
    Gte(ComparisonExpr),
    Lt(ComparisonExpr),
    Lte(ComparisonExpr),

    BitsAllClear(BitTestExpr),
    BitsAllSet(BitTestExpr),
    BitsAnyClear(BitTestExpr),
    BitsAnySet(BitTestExpr),

    In(InExpr),
    Mod(ModExpr),
    Regex(RegexExpr),
    Size(SizeExpr),
    Type(TypeExpr),
    Where(WhereExpr),
    WhereNoOp(WhereExpr),

    ElemMatchObject(ElemMatchObjectExpr),
    ElemMatchValue(ElemMatchValueExpr),
    Exists(PathExpr),
    Expr(ExprExpr),
    Geo(GeoExpr),
    GeoNear(GeoExpr),
    Text(TextExpr),
    TextNoOp(TextExpr),
    TwoDPtInAnnulus(GeoExpr),

    InternalBucketGeoWithin(GeoExpr),
    InternalExprEq(ComparisonExpr),
    InternalExprGt(ComparisonExpr),
    InternalExprGte(ComparisonExpr),
    InternalExprLt(ComparisonExpr),
    InternalExprLte(ComparisonExpr),
    /// Equality on a hashed index key
    InternalEqHashedKey(ComparisonExpr),

    InternalSchemaAllElemMatchFromIndex(SchemaExpr),
    InternalSchemaAllowedProperties(SchemaExpr),
    InternalSchemaBinDataEncryptedType(SchemaExpr),
    InternalSchemaBinDataFle2EncryptedType(SchemaExpr),
    InternalSchemaBinDataSubType(SchemaExpr),
    InternalSchemaCond(SchemaExpr),
    InternalSchemaEq(SchemaExpr),
    InternalSchemaFmod(SchemaExpr),
    InternalSchemaMatchArrayIndex(SchemaExpr),
    InternalSchemaMaxItems(SchemaExpr),
    InternalSchemaMaxLength(SchemaExpr),
    InternalSchemaMaxProperties(SchemaExpr),
    InternalSchemaMinItems(SchemaExpr),
    InternalSchemaMinLength(SchemaExpr),
    InternalSchemaMinProperties(SchemaExpr),
    InternalSchemaObject(SchemaExpr),
    InternalSchemaRootDocEq(SchemaExpr),
    InternalSchemaType(SchemaExpr),
    InternalSchemaUniqueItems(SchemaExpr),
    InternalSchemaXor(SchemaExpr),
}

/// Fieldless tag of a `MatchExpr` variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchKind {
    AlwaysFalse,
    AlwaysTrue,
    And,
    Or,
    Nor,
    Not,
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    BitsAllClear,
    BitsAllSet,
    BitsAnyClear,
    BitsAnySet,
    In,
    Mod,
    Regex,
    Size,
    Type,
    Where,
    WhereNoOp,
    ElemMatchObject,
    ElemMatchValue,
    Exists,
    Expr,
    Geo,
    GeoNear,
    Text,
    TextNoOp,
    TwoDPtInAnnulus,
    InternalBucketGeoWithin,
    InternalExprEq,
    InternalExprGt,
    InternalExprGte,
    InternalExprLt,
    InternalExprLte,
    InternalEqHashedKey,
    InternalSchemaAllElemMatchFromIndex,
    InternalSchemaAllowedProperties,
    InternalSchemaBinDataEncryptedType,
    InternalSchemaBinDataFle2EncryptedType,
    InternalSchemaBinDataSubType,
    InternalSchemaCond,
    InternalSchemaEq,
    InternalSchemaFmod,
    InternalSchemaMatchArrayIndex,
    InternalSchemaMaxItems,
    InternalSchemaMaxLength,
    InternalSchemaMaxProperties,
    InternalSchemaMinItems,
    InternalSchemaMinLength,
    InternalSchemaMinProperties,
    InternalSchemaObject,
    InternalSchemaRootDocEq,
    InternalSchemaType,
    InternalSchemaUniqueItems,
    InternalSchemaXor,
}

impl MatchKind {
    /// Short name used in shape keys and logs
    pub fn name(&self) -> &'static str {
        match self {
            MatchKind::AlwaysFalse => "alwaysFalse",
            MatchKind::AlwaysTrue => "alwaysTrue",
            MatchKind::And => "and",
            MatchKind::Or => "or",
            MatchKind::Nor => "nor",
            MatchKind::Not => "not",
            MatchKind::Eq => "eq",
            MatchKind::Gt => "gt",
            MatchKind::Gte => "gte",
            MatchKind::Lt => "lt",
            MatchKind::Lte => "lte",
            MatchKind::BitsAllClear => "bitsAllClear",
            MatchKind::BitsAllSet => "bitsAllSet",
            MatchKind::BitsAnyClear => "bitsAnyClear",
            MatchKind::BitsAnySet => "bitsAnySet",
            MatchKind::In => "in",
            MatchKind::Mod => "mod",
            MatchKind::Regex => "regex",
            MatchKind::Size => "size",
            MatchKind::Type => "type",
            MatchKind::Where => "where",
            MatchKind::WhereNoOp => "whereNoOp",
            MatchKind::ElemMatchObject => "elemMatchObject",
            MatchKind::ElemMatchValue => "elemMatchValue",
            MatchKind::Exists => "exists",
            MatchKind::Expr => "expr",
            MatchKind::Geo => "geo",
            MatchKind::GeoNear => "geoNear",
            MatchKind::Text => "text",
            MatchKind::TextNoOp => "textNoOp",
            MatchKind::TwoDPtInAnnulus => "twoDPtInAnnulus",
            MatchKind::InternalBucketGeoWithin => "internalBucketGeoWithin",
            MatchKind::InternalExprEq => "internalExprEq",
            MatchKind::InternalExprGt => "internalExprGt",
            MatchKind::InternalExprGte => "internalExprGte",
            MatchKind::InternalExprLt => "internalExprLt",
            MatchKind::InternalExprLte => "internalExprLte",
            MatchKind::InternalEqHashedKey => "internalEqHashedKey",
            MatchKind::InternalSchemaAllElemMatchFromIndex => "internalSchemaAllElemMatchFromIndex",
            MatchKind::InternalSchemaAllowedProperties => "internalSchemaAllowedProperties",
            MatchKind::InternalSchemaBinDataEncryptedType => "internalSchemaBinDataEncryptedType",
            MatchKind::InternalSchemaBinDataFle2EncryptedType => {
                "internalSchemaBinDataFLE2EncryptedType"
            }
            MatchKind::InternalSchemaBinDataSubType => "internalSchemaBinDataSubType",
            MatchKind::InternalSchemaCond => "internalSchemaCond",
            MatchKind::InternalSchemaEq => "internalSchemaEq",
            MatchKind::InternalSchemaFmod => "internalSchemaFmod",
            MatchKind::InternalSchemaMatchArrayIndex => "internalSchemaMatchArrayIndex",
            MatchKind::InternalSchemaMaxItems => "internalSchemaMaxItems",
            MatchKind::InternalSchemaMaxLength => "internalSchemaMaxLength",
            MatchKind::InternalSchemaMaxProperties => "internalSchemaMaxProperties",
            MatchKind::InternalSchemaMinItems => "internalSchemaMinItems",
            MatchKind::InternalSchemaMinLength => "internalSchemaMinLength",
            MatchKind::InternalSchemaMinProperties => "internalSchemaMinProperties",
            MatchKind::InternalSchemaObject => "internalSchemaObject",
            MatchKind::InternalSchemaRootDocEq => "internalSchemaRootDocEq",
            MatchKind::InternalSchemaType => "internalSchemaType",
            MatchKind::InternalSchemaUniqueItems => "internalSchemaUniqueItems",
            MatchKind::InternalSchemaXor => "internalSchemaXor",
        }
    }
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl MatchExpr {
    // -------------------------------------------------------------------------
    // Constructors
    // -------------------------------------------------------------------------

    pub fn eq(path: impl Into<String>, rhs: impl Into<Literal>) -> Self {
        MatchExpr::Eq(ComparisonExpr::new(path, rhs))
    }

    pub fn gt(path: impl Into<String>, rhs: impl Into<Literal>) -> Self {
        MatchExpr::Gt(ComparisonExpr::new(path, rhs))
    }

    pub fn gte(path: impl Into<String>, rhs: impl Into<Literal>) -> Self {
        MatchExpr::Gte(ComparisonExpr::new(path, rhs))
    }

    pub fn lt(path: impl Into<String>, rhs: impl Into<Literal>) -> Self {
        MatchExpr::Lt(ComparisonExpr::new(path, rhs))
    }

    pub fn lte(path: impl Into<String>, rhs: impl Into<Literal>) -> Self {
        MatchExpr::Lte(ComparisonExpr::new(path, rhs))
    }

    pub fn and(children: Vec<MatchExpr>) -> Self {
        MatchExpr::And(children)
    }

    pub fn or(children: Vec<MatchExpr>) -> Self {
        MatchExpr::Or(children)
    }

    pub fn nor(children: Vec<MatchExpr>) -> Self {
        MatchExpr::Nor(children)
    }

    pub fn not(child: MatchExpr) -> Self {
        MatchExpr::Not(Box::new(child))
    }

    pub fn exists(path: impl Into<String>) -> Self {
        MatchExpr::Exists(PathExpr::new(path))
    }

    pub fn in_list(path: impl Into<String>, values: Vec<Literal>) -> ParseResult<Self> {
        InExpr::new(path, values).map(MatchExpr::In)
    }

    pub fn regex(
        path: impl Into<String>,
        pattern: impl Into<String>,
        flags: impl Into<String>,
    ) -> ParseResult<Self> {
        RegexExpr::new(path, pattern, flags).map(MatchExpr::Regex)
    }

    pub fn modulo(path: impl Into<String>, divisor: i64, remainder: i64) -> ParseResult<Self> {
        ModExpr::new(path, divisor, remainder).map(MatchExpr::Mod)
    }

    pub fn size(path: impl Into<String>, size: i64) -> Self {
        MatchExpr::Size(SizeExpr::new(path, size))
    }

    pub fn type_of(path: impl Into<String>, type_set: TypeSet) -> Self {
        MatchExpr::Type(TypeExpr::new(path, type_set))
    }

    pub fn where_code(code: impl Into<String>) -> Self {
        MatchExpr::Where(WhereExpr::new(code))
    }

    pub fn bits_all_set(path: impl Into<String>, positions: Vec<u32>) -> Self {
        MatchExpr::BitsAllSet(BitTestExpr::new(path, positions))
    }

    pub fn bits_all_clear(path: impl Into<String>, positions: Vec<u32>) -> Self {
        MatchExpr::BitsAllClear(BitTestExpr::new(path, positions))
    }

    pub fn bits_any_set(path: impl Into<String>, positions: Vec<u32>) -> Self {
        MatchExpr::BitsAnySet(BitTestExpr::new(path, positions))
    }

    pub fn bits_any_clear(path: impl Into<String>, positions: Vec<u32>) -> Self {
        MatchExpr::BitsAnyClear(BitTestExpr::new(path, positions))
    }

    // -------------------------------------------------------------------------
    // Structure
    // -------------------------------------------------------------------------

    /// Kind tag of this node
    pub fn kind(&self) -> MatchKind {
        match self {
            MatchExpr::AlwaysFalse => MatchKind::AlwaysFalse,
            MatchExpr::AlwaysTrue => MatchKind::AlwaysTrue,
            MatchExpr::And(_) => MatchKind::And,
            MatchExpr::Or(_) => MatchKind::Or,
            MatchExpr::Nor(_) => MatchKind::Nor,
            MatchExpr::Not(_) => MatchKind::Not,
            MatchExpr::Eq(_) => MatchKind::Eq,
            MatchExpr::Gt(_) => MatchKind::Gt,
            MatchExpr::Gte(_) => MatchKind::Gte,
            MatchExpr::Lt(_) => MatchKind::Lt,
            MatchExpr::Lte(_) => MatchKind::Lte,
            MatchExpr::BitsAllClear(_) => MatchKind::BitsAllClear,
            MatchExpr::BitsAllSet(_) => MatchKind::BitsAllSet,
            MatchExpr::BitsAnyClear(_) => MatchKind::BitsAnyClear,
            MatchExpr::BitsAnySet(_) => MatchKind::BitsAnySet,
            MatchExpr::In(_) => MatchKind::In,
            MatchExpr::Mod(_) => MatchKind::Mod,
            MatchExpr::Regex(_) => MatchKind::Regex,
            MatchExpr::Size(_) => MatchKind::Size,
            MatchExpr::Type(_) => MatchKind::Type,
            MatchExpr::Where(_) => MatchKind::Where,
            MatchExpr::WhereNoOp(_) => MatchKind::WhereNoOp,
            MatchExpr::ElemMatchObject(_) => MatchKind::ElemMatchObject,
            MatchExpr::ElemMatchValue(_) => MatchKind::ElemMatchValue,
            MatchExpr::Exists(_) => MatchKind::Exists,
            MatchExpr::Expr(_) => MatchKind::Expr,
            MatchExpr::Geo(_) => MatchKind::Geo,
            MatchExpr::GeoNear(_) => MatchKind::GeoNear,
            MatchExpr::Text(_) => MatchKind::Text,
            MatchExpr::TextNoOp(_) => MatchKind::TextNoOp,
            MatchExpr::TwoDPtInAnnulus(_) => MatchKind::TwoDPtInAnnulus,
            MatchExpr::InternalBucketGeoWithin(_) => MatchKind::InternalBucketGeoWithin,
            MatchExpr::InternalExprEq(_) => MatchKind::InternalExprEq,
            MatchExpr::InternalExprGt(_) => MatchKind::InternalExprGt,
            MatchExpr::InternalExprGte(_) => MatchKind::InternalExprGte,
            MatchExpr::InternalExprLt(_) => MatchKind::InternalExprLt,
            MatchExpr::InternalExprLte(_) => MatchKind::InternalExprLte,
            MatchExpr::InternalEqHashedKey(_) => MatchKind::InternalEqHashedKey,
            MatchExpr::InternalSchemaAllElemMatchFromIndex(_) => {
                MatchKind::InternalSchemaAllElemMatchFromIndex
            }
            MatchExpr::InternalSchemaAllowedProperties(_) => {
                MatchKind::InternalSchemaAllowedProperties
            }
            MatchExpr::InternalSchemaBinDataEncryptedType(_) => {
                MatchKind::InternalSchemaBinDataEncryptedType
            }
            MatchExpr::InternalSchemaBinDataFle2EncryptedType(_) => {
                MatchKind::InternalSchemaBinDataFle2EncryptedType
            }
            MatchExpr::InternalSchemaBinDataSubType(_) => MatchKind::InternalSchemaBinDataSubType,
            MatchExpr::InternalSchemaCond(_) => MatchKind::InternalSchemaCond,
            MatchExpr::InternalSchemaEq(_) => MatchKind::InternalSchemaEq,
            MatchExpr::InternalSchemaFmod(_) => MatchKind::InternalSchemaFmod,
            MatchExpr::InternalSchemaMatchArrayIndex(_) => MatchKind::InternalSchemaMatchArrayIndex,
            MatchExpr::InternalSchemaMaxItems(_) => MatchKind::InternalSchemaMaxItems,
            MatchExpr::InternalSchemaMaxLength(_) => MatchKind::InternalSchemaMaxLength,
            MatchExpr::InternalSchemaMaxProperties(_) => MatchKind::InternalSchemaMaxProperties,
            MatchExpr::InternalSchemaMinItems(_) => MatchKind::InternalSchemaMinItems,
            MatchExpr::InternalSchemaMinLength(_) => MatchKind::InternalSchemaMinLength,
            MatchExpr::InternalSchemaMinProperties(_) => MatchKind::InternalSchemaMinProperties,
            MatchExpr::InternalSchemaObject(_) => MatchKind::InternalSchemaObject,
            MatchExpr::InternalSchemaRootDocEq(_) => MatchKind::InternalSchemaRootDocEq,
            MatchExpr::InternalSchemaType(_) => MatchKind::InternalSchemaType,
            MatchExpr::InternalSchemaUniqueItems(_) => MatchKind::InternalSchemaUniqueItems,
            MatchExpr::InternalSchemaXor(_) => MatchKind::InternalSchemaXor,
        }
    }

    /// Internal schema payload, for the internal schema kinds
    pub fn schema(&self) -> Option<&SchemaExpr> {
        match self {
            MatchExpr::InternalSchemaAllElemMatchFromIndex(s)
            | MatchExpr::InternalSchemaAllowedProperties(s)
            | MatchExpr::InternalSchemaBinDataEncryptedType(s)
            | MatchExpr::InternalSchemaBinDataFle2EncryptedType(s)
            | MatchExpr::InternalSchemaBinDataSubType(s)
            | MatchExpr::InternalSchemaCond(s)
            | MatchExpr::InternalSchemaEq(s)
            | MatchExpr::InternalSchemaFmod(s)
            | MatchExpr::InternalSchemaMatchArrayIndex(s)
            | MatchExpr::InternalSchemaMaxItems(s)
            | MatchExpr::InternalSchemaMaxLength(s)
            | MatchExpr::InternalSchemaMaxProperties(s)
            | MatchExpr::InternalSchemaMinItems(s)
            | MatchExpr::InternalSchemaMinLength(s)
            | MatchExpr::InternalSchemaMinProperties(s)
            | MatchExpr::InternalSchemaObject(s)
            | MatchExpr::InternalSchemaRootDocEq(s)
            | MatchExpr::InternalSchemaType(s)
            | MatchExpr::InternalSchemaUniqueItems(s)
            | MatchExpr::InternalSchemaXor(s) => Some(s),
            _ => None,
        }
    }

    /// Comparison payload, for every kind carrying a `ComparisonExpr`
    pub fn comparison(&self) -> Option<&ComparisonExpr> {
        match self {
            MatchExpr::Eq(c)
            | MatchExpr::Gt(c)
            | MatchExpr::Gte(c)
            | MatchExpr::Lt(c)
            | MatchExpr::Lte(c)
            | MatchExpr::InternalExprEq(c)
            | MatchExpr::InternalExprGt(c)
            | MatchExpr::InternalExprGte(c)
            | MatchExpr::InternalExprLt(c)
            | MatchExpr::InternalExprLte(c)
            | MatchExpr::InternalEqHashedKey(c) => Some(c),
            _ => None,
        }
    }

    /// Bit-test payload
    pub fn bit_test(&self) -> Option<&BitTestExpr> {
        match self {
            MatchExpr::BitsAllClear(b)
            | MatchExpr::BitsAllSet(b)
            | MatchExpr::BitsAnyClear(b)
            | MatchExpr::BitsAnySet(b) => Some(b),
            _ => None,
        }
    }

    /// Geo payload
    fn geo(&self) -> Option<&GeoExpr> {
        match self {
            MatchExpr::Geo(g)
            | MatchExpr::GeoNear(g)
            | MatchExpr::TwoDPtInAnnulus(g)
            | MatchExpr::InternalBucketGeoWithin(g) => Some(g),
            _ => None,
        }
    }

    /// Field path the node applies to, if any
    pub fn path(&self) -> Option<&str> {
        if let Some(c) = self.comparison() {
            return Some(c.path());
        }
        if let Some(b) = self.bit_test() {
            return Some(b.path());
        }
        if let Some(g) = self.geo() {
            return Some(&g.path);
        }
        if let Some(s) = self.schema() {
            return s.path.as_deref();
        }
        match self {
            MatchExpr::In(e) => Some(e.path()),
            MatchExpr::Mod(e) => Some(e.path()),
            MatchExpr::Regex(e) => Some(e.path()),
            MatchExpr::Size(e) => Some(e.path()),
            MatchExpr::Type(e) => Some(e.path()),
            MatchExpr::Exists(e) => Some(&e.path),
            MatchExpr::ElemMatchObject(e) => Some(&e.path),
            MatchExpr::ElemMatchValue(e) => Some(&e.path),
            _ => None,
        }
    }

    /// Children in stored order
    pub fn children(&self) -> &[MatchExpr] {
        if let Some(s) = self.schema() {
            return &s.children;
        }
        match self {
            MatchExpr::And(children) | MatchExpr::Or(children) | MatchExpr::Nor(children) => {
                children.as_slice()
            }
            MatchExpr::Not(child) => std::slice::from_ref(child.as_ref()),
            MatchExpr::ElemMatchObject(e) => std::slice::from_ref(e.child.as_ref()),
            MatchExpr::ElemMatchValue(e) => e.children.as_slice(),
            _ => &[],
        }
    }

    /// Number of nodes in the tree rooted here
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(MatchExpr::node_count).sum::<usize>()
    }

    /// Semantic equivalence: same kind, same path, equivalent operands, and
    /// pairwise equivalent children. Slot annotations are ignored.
    pub fn equivalent(&self, other: &MatchExpr) -> bool {
        if self.kind() != other.kind() {
            return false;
        }
        if let (Some(a), Some(b)) = (self.comparison(), other.comparison()) {
            return a.equivalent(b);
        }
        if let (Some(a), Some(b)) = (self.bit_test(), other.bit_test()) {
            return a.equivalent(b);
        }
        if let (Some(a), Some(b)) = (self.geo(), other.geo()) {
            return a.path == b.path
                && a.operator == b.operator
                && a.geometry.equivalent(&b.geometry);
        }
        if let (Some(a), Some(b)) = (self.schema(), other.schema()) {
            return a.equivalent(b);
        }

        match (self, other) {
            (MatchExpr::AlwaysFalse, MatchExpr::AlwaysFalse)
            | (MatchExpr::AlwaysTrue, MatchExpr::AlwaysTrue) => true,
            (MatchExpr::And(a), MatchExpr::And(b))
            | (MatchExpr::Or(a), MatchExpr::Or(b))
            | (MatchExpr::Nor(a), MatchExpr::Nor(b)) => children_equivalent(a, b),
            (MatchExpr::Not(a), MatchExpr::Not(b)) => a.equivalent(b),
            (MatchExpr::In(a), MatchExpr::In(b)) => a.equivalent(b),
            (MatchExpr::Mod(a), MatchExpr::Mod(b)) => a.equivalent(b),
            (MatchExpr::Regex(a), MatchExpr::Regex(b)) => a.equivalent(b),
            (MatchExpr::Size(a), MatchExpr::Size(b)) => a.equivalent(b),
            (MatchExpr::Type(a), MatchExpr::Type(b)) => a.equivalent(b),
            (MatchExpr::Where(a), MatchExpr::Where(b))
            | (MatchExpr::WhereNoOp(a), MatchExpr::WhereNoOp(b)) => a.equivalent(b),
            (MatchExpr::Exists(a), MatchExpr::Exists(b)) => a.path == b.path,
            (MatchExpr::ElemMatchObject(a), MatchExpr::ElemMatchObject(b)) => {
                a.path == b.path && a.child.equivalent(&b.child)
            }
            (MatchExpr::ElemMatchValue(a), MatchExpr::ElemMatchValue(b)) => {
                a.path == b.path && children_equivalent(&a.children, &b.children)
            }
            (MatchExpr::Expr(a), MatchExpr::Expr(b)) => a.expression.equivalent(&b.expression),
            (MatchExpr::Text(a), MatchExpr::Text(b))
            | (MatchExpr::TextNoOp(a), MatchExpr::TextNoOp(b)) => {
                a.search == b.search
                    && a.language == b.language
                    && a.case_sensitive == b.case_sensitive
                    && a.diacritic_sensitive == b.diacritic_sensitive
            }
            _ => false,
        }
    }
}

fn children_equivalent(a: &[MatchExpr], b: &[MatchExpr]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equivalent(y))
}
