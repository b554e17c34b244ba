//! Filter document parser
//!
//! Turns a JSON filter document into a `MatchExpr` tree:
//!
//! - `{"a": 1}` → `eq(a, 1)`
//! - `{"a": 1, "b": {"$gt": 2}}` → `and(eq(a, 1), gt(b, 2))`
//! - `{"$or": [{"a": 1}, {"b": 2}]}` → `or(eq(a, 1), eq(b, 2))`
//!
//! Field order is preserved, so the tree (and the slot order assigned to
//! it later) follows the order the filter was written in.

use serde_json::{Map, Value};

use super::errors::{ParseError, ParseResult};
use super::expression::{
    BitTestExpr, BsonType, ComparisonExpr, ElemMatchObjectExpr, ElemMatchValueExpr, ExprExpr,
    GeoExpr, InExpr, MatchExpr, ModExpr, RegexExpr, SchemaExpr, SizeExpr, TextExpr, TypeExpr,
    TypeSet, WhereExpr,
};
use super::value::Literal;

/// Single-key objects that denote a literal rather than an operator clause
const LITERAL_WRAPPERS: &[&str] = &[
    "$minKey",
    "$maxKey",
    "$numberDouble",
    "$numberLong",
    "$numberInt",
    "$regularExpression",
];

/// Parses filter documents into match expressions
pub struct FilterParser;

impl FilterParser {
    /// Parses a filter document
    pub fn parse(filter: &Value) -> ParseResult<MatchExpr> {
        let map = filter.as_object().ok_or(ParseError::NotAnObject)?;
        let clauses = Self::parse_document(map)?;
        Ok(Self::combine(clauses))
    }

    /// Parses a filter given as JSON text
    pub fn parse_str(text: &str) -> ParseResult<MatchExpr> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
        Self::parse(&value)
    }

    fn combine(mut clauses: Vec<MatchExpr>) -> MatchExpr {
        match clauses.len() {
            0 => MatchExpr::AlwaysTrue,
            1 => clauses.pop().unwrap_or(MatchExpr::AlwaysTrue),
            _ => MatchExpr::And(clauses),
        }
    }

    fn parse_document(map: &Map<String, Value>) -> ParseResult<Vec<MatchExpr>> {
        let mut clauses = Vec::with_capacity(map.len());
        for (key, value) in map {
            if key.starts_with('$') {
                if let Some(expr) = Self::parse_top_level(key, value)? {
                    clauses.push(expr);
                }
            } else {
                clauses.extend(Self::parse_path(key, value)?);
            }
        }
        Ok(clauses)
    }

    fn parse_sub_filters(op: &str, value: &Value) -> ParseResult<Vec<MatchExpr>> {
        let items = value
            .as_array()
            .ok_or_else(|| ParseError::bad_operand(op, "an array of filter documents"))?;
        if items.is_empty() {
            return Err(ParseError::EmptyClauseList(op.to_string()));
        }
        items
            .iter()
            .map(|item| match item {
                Value::Object(_) => Self::parse(item),
                _ => Err(ParseError::bad_operand(op, "an array of filter documents")),
            })
            .collect()
    }

    // -------------------------------------------------------------------------
    // Document-level operators
    // -------------------------------------------------------------------------

    fn parse_top_level(op: &str, value: &Value) -> ParseResult<Option<MatchExpr>> {
        let expr = match op {
            "$and" => MatchExpr::And(Self::parse_sub_filters(op, value)?),
            "$or" => MatchExpr::Or(Self::parse_sub_filters(op, value)?),
            "$nor" => MatchExpr::Nor(Self::parse_sub_filters(op, value)?),
            "$where" => {
                let code = value
                    .as_str()
                    .ok_or_else(|| ParseError::bad_operand(op, "a string"))?;
                MatchExpr::Where(WhereExpr::new(code))
            }
            "$expr" => MatchExpr::Expr(ExprExpr {
                expression: Literal::from_json(value)?,
            }),
            "$text" => MatchExpr::Text(Self::parse_text(value)?),
            "$alwaysTrue" => MatchExpr::AlwaysTrue,
            "$alwaysFalse" => MatchExpr::AlwaysFalse,
            "$comment" => return Ok(None),
            "$_internalSchemaMinProperties" => MatchExpr::InternalSchemaMinProperties(
                SchemaExpr::new(None, Literal::Int(expect_count(op, value)?), Vec::new()),
            ),
            "$_internalSchemaMaxProperties" => MatchExpr::InternalSchemaMaxProperties(
                SchemaExpr::new(None, Literal::Int(expect_count(op, value)?), Vec::new()),
            ),
            "$_internalSchemaRootDocEq" => {
                if !value.is_object() {
                    return Err(ParseError::bad_operand(op, "an object"));
                }
                MatchExpr::InternalSchemaRootDocEq(SchemaExpr::new(
                    None,
                    Literal::from_json(value)?,
                    Vec::new(),
                ))
            }
            "$_internalSchemaXor" => MatchExpr::InternalSchemaXor(SchemaExpr::new(
                None,
                Literal::Null,
                Self::parse_sub_filters(op, value)?,
            )),
            "$_internalSchemaCond" => {
                let children = Self::parse_sub_filters(op, value)?;
                if children.len() != 3 {
                    return Err(ParseError::bad_operand(op, "exactly three filters"));
                }
                MatchExpr::InternalSchemaCond(SchemaExpr::new(None, Literal::Null, children))
            }
            "$_internalSchemaAllowedProperties" => {
                if !value.is_object() {
                    return Err(ParseError::bad_operand(op, "an object"));
                }
                MatchExpr::InternalSchemaAllowedProperties(SchemaExpr::new(
                    None,
                    Literal::from_json(value)?,
                    Vec::new(),
                ))
            }
            _ => return Err(ParseError::UnknownOperator(op.to_string())),
        };
        Ok(Some(expr))
    }

    fn parse_text(value: &Value) -> ParseResult<TextExpr> {
        let map = value
            .as_object()
            .ok_or_else(|| ParseError::bad_operand("$text", "an object"))?;
        let search = map
            .get("$search")
            .and_then(Value::as_str)
            .ok_or_else(|| ParseError::bad_operand("$text", "a $search string"))?;
        Ok(TextExpr {
            search: search.to_string(),
            language: map
                .get("$language")
                .and_then(Value::as_str)
                .map(str::to_string),
            case_sensitive: map
                .get("$caseSensitive")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            diacritic_sensitive: map
                .get("$diacriticSensitive")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        })
    }

    // -------------------------------------------------------------------------
    // Path-level clauses
    // -------------------------------------------------------------------------

    fn parse_path(path: &str, value: &Value) -> ParseResult<Vec<MatchExpr>> {
        match value {
            Value::Object(map) if is_operator_object(map) => Self::parse_operators(path, map),
            _ => Ok(vec![Self::literal_match(path, Literal::from_json(value)?)?]),
        }
    }

    /// Equality, or a regex match when the literal is a regex
    fn literal_match(path: &str, literal: Literal) -> ParseResult<MatchExpr> {
        match literal {
            Literal::Regex { pattern, flags } => {
                Ok(MatchExpr::Regex(RegexExpr::new(path, pattern, flags)?))
            }
            other => Ok(MatchExpr::Eq(ComparisonExpr::new(path, other))),
        }
    }

    fn parse_operators(path: &str, map: &Map<String, Value>) -> ParseResult<Vec<MatchExpr>> {
        let mut clauses = Vec::with_capacity(map.len());

        if map.contains_key("$options") && !map.contains_key("$regex") {
            return Err(ParseError::OptionsWithoutRegex);
        }

        for (op, operand) in map {
            match op.as_str() {
                "$options" => continue,
                "$regex" => clauses.push(Self::parse_regex_operator(path, operand, map)?),
                _ => clauses.push(Self::parse_operator(path, op, operand)?),
            }
        }
        Ok(clauses)
    }

    fn parse_regex_operator(
        path: &str,
        operand: &Value,
        map: &Map<String, Value>,
    ) -> ParseResult<MatchExpr> {
        let options = match map.get("$options") {
            Some(Value::String(options)) => Some(options.as_str()),
            Some(_) => return Err(ParseError::bad_operand("$options", "a string")),
            None => None,
        };

        let (pattern, flags) = match operand {
            Value::String(pattern) => (pattern.clone(), options.unwrap_or("").to_string()),
            other => match Literal::from_json(other)? {
                Literal::Regex { pattern, flags } => {
                    (pattern, options.map(str::to_string).unwrap_or(flags))
                }
                _ => return Err(ParseError::bad_operand("$regex", "a string or regex")),
            },
        };
        Ok(MatchExpr::Regex(RegexExpr::new(path, pattern, flags)?))
    }

    fn parse_operator(path: &str, op: &str, operand: &Value) -> ParseResult<MatchExpr> {
        let expr = match op {
            "$eq" => MatchExpr::Eq(ComparisonExpr::new(path, Literal::from_json(operand)?)),
            "$ne" => MatchExpr::not(MatchExpr::Eq(ComparisonExpr::new(
                path,
                Literal::from_json(operand)?,
            ))),
            "$gt" => MatchExpr::Gt(ComparisonExpr::new(path, Literal::from_json(operand)?)),
            "$gte" => MatchExpr::Gte(ComparisonExpr::new(path, Literal::from_json(operand)?)),
            "$lt" => MatchExpr::Lt(ComparisonExpr::new(path, Literal::from_json(operand)?)),
            "$lte" => MatchExpr::Lte(ComparisonExpr::new(path, Literal::from_json(operand)?)),
            "$in" => MatchExpr::In(Self::parse_in(op, path, operand)?),
            "$nin" => MatchExpr::not(MatchExpr::In(Self::parse_in(op, path, operand)?)),
            "$exists" => {
                let exists = MatchExpr::exists(path);
                if is_truthy(operand) {
                    exists
                } else {
                    MatchExpr::not(exists)
                }
            }
            "$type" => MatchExpr::Type(TypeExpr::new(path, parse_type_set(op, operand)?)),
            "$size" => MatchExpr::Size(SizeExpr::new(path, expect_count(op, operand)?)),
            "$mod" => MatchExpr::Mod(Self::parse_mod(path, operand)?),
            "$not" => Self::parse_not(path, operand)?,
            "$elemMatch" => Self::parse_elem_match(path, operand)?,
            "$bitsAllSet" => MatchExpr::BitsAllSet(parse_bit_test(op, path, operand)?),
            "$bitsAllClear" => MatchExpr::BitsAllClear(parse_bit_test(op, path, operand)?),
            "$bitsAnySet" => MatchExpr::BitsAnySet(parse_bit_test(op, path, operand)?),
            "$bitsAnyClear" => MatchExpr::BitsAnyClear(parse_bit_test(op, path, operand)?),
            "$geoWithin" | "$geoIntersects" => MatchExpr::Geo(parse_geo(op, path, operand)?),
            "$near" | "$nearSphere" => MatchExpr::GeoNear(parse_geo(op, path, operand)?),
            "$_internalExprEq" => MatchExpr::InternalExprEq(ComparisonExpr::new(
                path,
                Literal::from_json(operand)?,
            )),
            "$_internalExprGt" => MatchExpr::InternalExprGt(ComparisonExpr::new(
                path,
                Literal::from_json(operand)?,
            )),
            "$_internalExprGte" => MatchExpr::InternalExprGte(ComparisonExpr::new(
                path,
                Literal::from_json(operand)?,
            )),
            "$_internalExprLt" => MatchExpr::InternalExprLt(ComparisonExpr::new(
                path,
                Literal::from_json(operand)?,
            )),
            "$_internalExprLte" => MatchExpr::InternalExprLte(ComparisonExpr::new(
                path,
                Literal::from_json(operand)?,
            )),
            "$_internalEqHash" => MatchExpr::InternalEqHashedKey(ComparisonExpr::new(
                path,
                Literal::Int(expect_integer(op, operand)?),
            )),
            "$_internalSchemaMinItems" => {
                MatchExpr::InternalSchemaMinItems(count_schema(op, path, operand)?)
            }
            "$_internalSchemaMaxItems" => {
                MatchExpr::InternalSchemaMaxItems(count_schema(op, path, operand)?)
            }
            "$_internalSchemaMinLength" => {
                MatchExpr::InternalSchemaMinLength(count_schema(op, path, operand)?)
            }
            "$_internalSchemaMaxLength" => {
                MatchExpr::InternalSchemaMaxLength(count_schema(op, path, operand)?)
            }
            "$_internalSchemaUniqueItems" => {
                let unique = operand
                    .as_bool()
                    .ok_or_else(|| ParseError::bad_operand(op, "a boolean"))?;
                MatchExpr::InternalSchemaUniqueItems(literal_schema(path, Literal::Bool(unique)))
            }
            "$_internalSchemaFmod" => {
                let args = operand
                    .as_array()
                    .filter(|args| args.len() == 2 && args.iter().all(Value::is_number))
                    .ok_or_else(|| ParseError::bad_operand(op, "[divisor, remainder]"))?;
                MatchExpr::InternalSchemaFmod(literal_schema(
                    path,
                    Literal::from_json(&Value::Array(args.clone()))?,
                ))
            }
            "$_internalSchemaEq" => {
                MatchExpr::InternalSchemaEq(literal_schema(path, Literal::from_json(operand)?))
            }
            "$_internalSchemaType" => {
                // Validated like $type, stored as written
                parse_type_set(op, operand)?;
                MatchExpr::InternalSchemaType(literal_schema(path, Literal::from_json(operand)?))
            }
            "$_internalSchemaBinDataSubType" => MatchExpr::InternalSchemaBinDataSubType(
                literal_schema(path, Literal::Int(expect_count(op, operand)?)),
            ),
            "$_internalSchemaBinDataEncryptedType" => {
                parse_type_set(op, operand)?;
                MatchExpr::InternalSchemaBinDataEncryptedType(literal_schema(
                    path,
                    Literal::from_json(operand)?,
                ))
            }
            "$_internalSchemaBinDataFLE2EncryptedType" => {
                parse_type_set(op, operand)?;
                MatchExpr::InternalSchemaBinDataFle2EncryptedType(literal_schema(
                    path,
                    Literal::from_json(operand)?,
                ))
            }
            "$_internalSchemaObjectMatch" => {
                if !operand.is_object() {
                    return Err(ParseError::bad_operand(op, "a filter document"));
                }
                MatchExpr::InternalSchemaObject(SchemaExpr::new(
                    Some(path.to_string()),
                    Literal::Null,
                    vec![Self::parse(operand)?],
                ))
            }
            "$_internalSchemaMatchArrayIndex" => {
                let index = operand
                    .get("index")
                    .ok_or_else(|| ParseError::bad_operand(op, "an index"))?;
                let filter = operand
                    .get("expression")
                    .filter(|filter| filter.is_object())
                    .ok_or_else(|| ParseError::bad_operand(op, "an expression document"))?;
                MatchExpr::InternalSchemaMatchArrayIndex(SchemaExpr::new(
                    Some(path.to_string()),
                    Literal::Int(expect_count(op, index)?),
                    vec![Self::parse(filter)?],
                ))
            }
            "$_internalSchemaAllElemMatchFromIndex" => {
                let args = operand
                    .as_array()
                    .filter(|args| args.len() == 2 && args[1].is_object())
                    .ok_or_else(|| ParseError::bad_operand(op, "[index, filter]"))?;
                MatchExpr::InternalSchemaAllElemMatchFromIndex(SchemaExpr::new(
                    Some(path.to_string()),
                    Literal::Int(expect_count(op, &args[0])?),
                    vec![Self::parse(&args[1])?],
                ))
            }
            _ => return Err(ParseError::UnknownOperator(op.to_string())),
        };
        Ok(expr)
    }

    fn parse_in(op: &str, path: &str, operand: &Value) -> ParseResult<InExpr> {
        let items = operand
            .as_array()
            .ok_or_else(|| ParseError::bad_operand(op, "an array"))?;
        let values = items
            .iter()
            .map(Literal::from_json)
            .collect::<ParseResult<Vec<_>>>()?;
        InExpr::new(path, values)
    }

    fn parse_mod(path: &str, operand: &Value) -> ParseResult<ModExpr> {
        let args = operand.as_array().ok_or(ParseError::BadModArity)?;
        if args.len() != 2 {
            return Err(ParseError::BadModArity);
        }
        let divisor = truncate_number("$mod", &args[0])?;
        let remainder = truncate_number("$mod", &args[1])?;
        ModExpr::new(path, divisor, remainder)
    }

    fn parse_not(path: &str, operand: &Value) -> ParseResult<MatchExpr> {
        match operand {
            Value::Object(map) if is_operator_object(map) => {
                let clauses = Self::parse_operators(path, map)?;
                Ok(MatchExpr::not(Self::combine(clauses)))
            }
            other => match Literal::from_json(other)? {
                Literal::Regex { pattern, flags } => Ok(MatchExpr::not(MatchExpr::Regex(
                    RegexExpr::new(path, pattern, flags)?,
                ))),
                _ => Err(ParseError::bad_operand("$not", "a regex or operator document")),
            },
        }
    }

    /// `$elemMatch` whose keys are all path operators matches array values;
    /// otherwise it matches embedded documents.
    fn parse_elem_match(path: &str, operand: &Value) -> ParseResult<MatchExpr> {
        let map = operand
            .as_object()
            .ok_or_else(|| ParseError::bad_operand("$elemMatch", "an object"))?;

        let value_form = !map.is_empty()
            && map
                .keys()
                .all(|k| k.starts_with('$') && !is_document_operator(k));

        if value_form {
            Ok(MatchExpr::ElemMatchValue(ElemMatchValueExpr {
                path: path.to_string(),
                children: Self::parse_operators("", map)?,
            }))
        } else {
            Ok(MatchExpr::ElemMatchObject(ElemMatchObjectExpr {
                path: path.to_string(),
                child: Box::new(Self::parse(operand)?),
            }))
        }
    }
}

/// Parses a filter document. Shorthand for `FilterParser::parse`.
pub fn parse_filter(filter: &Value) -> ParseResult<MatchExpr> {
    FilterParser::parse(filter)
}

fn is_operator_object(map: &Map<String, Value>) -> bool {
    match map.keys().next() {
        Some(first) if first.starts_with('$') => {
            !(map.len() == 1 && LITERAL_WRAPPERS.contains(&first.as_str()))
        }
        _ => false,
    }
}

fn is_document_operator(op: &str) -> bool {
    matches!(op, "$and" | "$or" | "$nor" | "$where" | "$expr" | "$text" | "$comment")
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        _ => true,
    }
}

/// Integral number, allowing doubles with no fractional part
fn expect_integer(op: &str, value: &Value) -> ParseResult<i64> {
    Literal::from_json(value)
        .ok()
        .filter(Literal::is_number)
        .and_then(|lit| lit.as_i64())
        .ok_or_else(|| ParseError::bad_operand(op, "an integer"))
}

/// Non-negative integer
fn expect_count(op: &str, value: &Value) -> ParseResult<i64> {
    match expect_integer(op, value) {
        Ok(n) if n >= 0 => Ok(n),
        _ => Err(ParseError::bad_operand(op, "a non-negative integer")),
    }
}

/// Number truncated toward zero
fn truncate_number(op: &str, value: &Value) -> ParseResult<i64> {
    match Literal::from_json(value)? {
        Literal::Int(i) => Ok(i),
        Literal::Double(d) if d.is_finite() && d.abs() < i64::MAX as f64 => Ok(d.trunc() as i64),
        _ => Err(ParseError::bad_operand(op, "finite numbers")),
    }
}

fn parse_type_set(op: &str, operand: &Value) -> ParseResult<TypeSet> {
    let mut set = TypeSet::new();
    let entries: Vec<&Value> = match operand {
        Value::Array(items) => items.iter().collect(),
        single => vec![single],
    };
    if entries.is_empty() {
        return Err(ParseError::bad_operand(op, "at least one type"));
    }

    for entry in entries {
        match entry {
            Value::String(alias) if alias == "number" => set.all_numbers = true,
            Value::String(alias) => {
                let ty = BsonType::from_alias(alias)
                    .ok_or_else(|| ParseError::UnknownType(alias.clone()))?;
                set.types.insert(ty);
            }
            Value::Number(_) => {
                let code = expect_integer(op, entry)?;
                let ty = BsonType::from_code(code)
                    .ok_or_else(|| ParseError::UnknownType(code.to_string()))?;
                set.types.insert(ty);
            }
            _ => return Err(ParseError::bad_operand(op, "a type alias or code")),
        }
    }
    Ok(set)
}

fn parse_bit_test(op: &str, path: &str, operand: &Value) -> ParseResult<BitTestExpr> {
    match operand {
        Value::Array(items) => {
            let positions = items
                .iter()
                .map(|item| {
                    expect_count(op, item).and_then(|bit| {
                        u32::try_from(bit)
                            .map_err(|_| ParseError::bad_operand(op, "bit positions"))
                    })
                })
                .collect::<ParseResult<Vec<u32>>>()?;
            Ok(BitTestExpr::new(path, positions))
        }
        Value::Number(_) => {
            let mask = expect_count(op, operand)?;
            Ok(BitTestExpr::from_mask(path, mask as u64))
        }
        _ => Err(ParseError::bad_operand(op, "a bitmask or array of positions")),
    }
}

fn parse_geo(op: &str, path: &str, operand: &Value) -> ParseResult<GeoExpr> {
    if !operand.is_object() && !operand.is_array() {
        return Err(ParseError::bad_operand(op, "a geometry"));
    }
    Ok(GeoExpr {
        path: path.to_string(),
        operator: op.trim_start_matches('$').to_string(),
        geometry: Literal::from_json(operand)?,
    })
}

fn count_schema(op: &str, path: &str, operand: &Value) -> ParseResult<SchemaExpr> {
    Ok(literal_schema(path, Literal::Int(expect_count(op, operand)?)))
}

fn literal_schema(path: &str, operand: Literal) -> SchemaExpr {
    SchemaExpr::new(Some(path.to_string()), operand, Vec::new())
}
