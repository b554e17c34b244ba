//! Shape keys for cached plans
//!
//! A key is a canonical rendering of a tree with every attached slot printed
//! as `?<id>` and every other operand printed as its literal:
//!
//! ```text
//! {$or: [{a: 1}, {a: 1, b: 2}]}  ->  or(eq(a,?0),and(eq(a,?0),eq(b,?1)))
//! ```
//!
//! Two queries that differ only in parameterized literals get the same key.

use std::fmt;

use thiserror::Error;

use crate::matcher::{InputParamId, Literal, MatchExpr, MatchKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// A two-slot node carries only one of its slots
    #[error("{kind} on '{path}' is partially parameterized")]
    PartiallyParameterized { kind: MatchKind, path: String },
}

impl KeyError {
    pub fn code(&self) -> &'static str {
        match self {
            KeyError::PartiallyParameterized { .. } => "MATCHPARAM_KEY_PARTIAL",
        }
    }
}

/// Canonical shape of a tree
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlanCacheKey {
    shape: String,
}

impl PlanCacheKey {
    /// Key over the tree as annotated by a walk
    pub fn build(root: &MatchExpr) -> Result<Self, KeyError> {
        let mut shape = String::new();
        ShapeWriter {
            out: &mut shape,
            use_slots: true,
        }
        .write(root)?;
        Ok(Self { shape })
    }

    /// Key with every operand printed as its literal, for trees whose walk
    /// ran out of budget
    pub fn build_unparameterized(root: &MatchExpr) -> Self {
        let mut shape = String::new();
        // Slots are never read, so the atomic-group check cannot fail
        let _ = ShapeWriter {
            out: &mut shape,
            use_slots: false,
        }
        .write(root);
        Self { shape }
    }

    pub fn shape(&self) -> &str {
        &self.shape
    }

    /// CRC32 of the shape as 8 upper-case hex digits
    pub fn query_hash(&self) -> String {
        format!("{:08X}", crc32fast::hash(self.shape.as_bytes()))
    }
}

impl fmt::Display for PlanCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.shape)
    }
}

struct ShapeWriter<'s> {
    out: &'s mut String,
    use_slots: bool,
}

impl ShapeWriter<'_> {
    fn write(&mut self, expr: &MatchExpr) -> Result<(), KeyError> {
        self.out.push_str(expr.kind().name());
        self.out.push('(');

        match expr {
            MatchExpr::AlwaysFalse | MatchExpr::AlwaysTrue => {}

            MatchExpr::And(children) | MatchExpr::Or(children) | MatchExpr::Nor(children) => {
                self.children(children)?;
            }
            MatchExpr::Not(child) => self.write(child)?,

            MatchExpr::Eq(c)
            | MatchExpr::Gt(c)
            | MatchExpr::Gte(c)
            | MatchExpr::Lt(c)
            | MatchExpr::Lte(c) => {
                self.out.push_str(c.path());
                self.out.push(',');
                self.operand(c.input_param_id(), c.rhs());
            }

            MatchExpr::BitsAllClear(b)
            | MatchExpr::BitsAllSet(b)
            | MatchExpr::BitsAnyClear(b)
            | MatchExpr::BitsAnySet(b) => {
                self.out.push_str(b.path());
                self.out.push(',');
                let pair = self.slot_pair(
                    expr,
                    b.path(),
                    b.bit_positions_param_id(),
                    b.bitmask_param_id(),
                )?;
                match pair {
                    Some((positions, mask)) => self.slots(positions, mask),
                    None => {
                        let positions: Vec<Literal> = b
                            .bit_positions()
                            .iter()
                            .map(|bit| Literal::Int(i64::from(*bit)))
                            .collect();
                        self.out.push_str(&Literal::Array(positions).to_string());
                    }
                }
            }

            MatchExpr::In(e) => {
                self.out.push_str(e.path());
                self.out.push(',');
                match self.slot(e.input_param_id()) {
                    Some(id) => self.placeholder(id),
                    None => {
                        let mut members = e.equalities().to_vec();
                        members.extend(e.regexes().iter().map(|r| Literal::Regex {
                            pattern: r.pattern().to_string(),
                            flags: r.flags().to_string(),
                        }));
                        self.out.push_str(&Literal::Array(members).to_string());
                    }
                }
            }

            MatchExpr::Mod(e) => {
                self.out.push_str(e.path());
                self.out.push(',');
                match self.slot_pair(
                    expr,
                    e.path(),
                    e.divisor_param_id(),
                    e.remainder_param_id(),
                )? {
                    Some((divisor, remainder)) => self.slots(divisor, remainder),
                    None => self
                        .out
                        .push_str(&format!("{},{}", e.divisor(), e.remainder())),
                }
            }

            MatchExpr::Regex(e) => {
                self.out.push_str(e.path());
                self.out.push(',');
                match self.slot_pair(
                    expr,
                    e.path(),
                    e.source_regex_param_id(),
                    e.compiled_regex_param_id(),
                )? {
                    Some((source, compiled)) => self.slots(source, compiled),
                    None => self.out.push_str(&format!("/{}/{}", e.pattern(), e.flags())),
                }
            }

            MatchExpr::Size(e) => {
                self.out.push_str(e.path());
                self.out.push(',');
                match self.slot(e.input_param_id()) {
                    Some(id) => self.placeholder(id),
                    None => self.out.push_str(&e.size().to_string()),
                }
            }

            MatchExpr::Type(e) => {
                self.out.push_str(e.path());
                self.out.push(',');
                match self.slot(e.input_param_id()) {
                    Some(id) => self.placeholder(id),
                    None => self.out.push_str(&e.type_set().to_string()),
                }
            }

            MatchExpr::Where(e) => match self.slot(e.input_param_id()) {
                Some(id) => self.placeholder(id),
                None => self.out.push_str(&Literal::from(e.code()).to_string()),
            },
            MatchExpr::WhereNoOp(e) => {
                self.out.push_str(&Literal::from(e.code()).to_string());
            }

            MatchExpr::ElemMatchObject(e) => {
                self.out.push_str(&e.path);
                self.out.push(',');
                self.write(&e.child)?;
            }
            MatchExpr::ElemMatchValue(e) => {
                self.out.push_str(&e.path);
                self.out.push(',');
                self.children(&e.children)?;
            }

            MatchExpr::Exists(e) => self.out.push_str(&e.path),

            MatchExpr::Expr(e) => self.out.push_str(&e.expression.to_string()),

            MatchExpr::Geo(g)
            | MatchExpr::GeoNear(g)
            | MatchExpr::TwoDPtInAnnulus(g)
            | MatchExpr::InternalBucketGeoWithin(g) => {
                self.out
                    .push_str(&format!("{},{},{}", g.path, g.operator, g.geometry));
            }

            MatchExpr::Text(t) | MatchExpr::TextNoOp(t) => {
                self.out.push_str(&Literal::from(t.search.as_str()).to_string());
                if let Some(language) = &t.language {
                    self.out.push(',');
                    self.out.push_str(language);
                }
                if t.case_sensitive {
                    self.out.push_str(",case");
                }
                if t.diacritic_sensitive {
                    self.out.push_str(",diacritic");
                }
            }

            MatchExpr::InternalExprEq(c)
            | MatchExpr::InternalExprGt(c)
            | MatchExpr::InternalExprGte(c)
            | MatchExpr::InternalExprLt(c)
            | MatchExpr::InternalExprLte(c)
            | MatchExpr::InternalEqHashedKey(c) => {
                self.out.push_str(&format!("{},{}", c.path(), c.rhs()));
            }

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
            | MatchExpr::InternalSchemaXor(s) => {
                if let Some(path) = &s.path {
                    self.out.push_str(path);
                    self.out.push(',');
                }
                self.out.push_str(&s.operand.to_string());
                if !s.children.is_empty() {
                    self.out.push(',');
                    self.children(&s.children)?;
                }
            }
        }

        self.out.push(')');
        Ok(())
    }

    fn children(&mut self, children: &[MatchExpr]) -> Result<(), KeyError> {
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            self.write(child)?;
        }
        Ok(())
    }

    fn slot(&self, id: Option<InputParamId>) -> Option<InputParamId> {
        if self.use_slots {
            id
        } else {
            None
        }
    }

    /// Both slots of a two-slot node, or neither
    fn slot_pair(
        &self,
        expr: &MatchExpr,
        path: &str,
        first: Option<InputParamId>,
        second: Option<InputParamId>,
    ) -> Result<Option<(InputParamId, InputParamId)>, KeyError> {
        match (self.slot(first), self.slot(second)) {
            (Some(a), Some(b)) => Ok(Some((a, b))),
            (None, None) => Ok(None),
            _ => Err(KeyError::PartiallyParameterized {
                kind: expr.kind(),
                path: path.to_string(),
            }),
        }
    }

    fn operand(&mut self, id: Option<InputParamId>, literal: &Literal) {
        match self.slot(id) {
            Some(id) => self.placeholder(id),
            None => self.out.push_str(&literal.to_string()),
        }
    }

    fn placeholder(&mut self, id: InputParamId) {
        self.out.push('?');
        self.out.push_str(&id.to_string());
    }

    fn slots(&mut self, first: InputParamId, second: InputParamId) {
        self.placeholder(first);
        self.out.push(',');
        self.placeholder(second);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameterization::{parameterize, ParameterizationConfig};

    fn key_after_walk(tree: &MatchExpr) -> PlanCacheKey {
        parameterize(tree, &ParameterizationConfig::unlimited());
        PlanCacheKey::build(tree).unwrap()
    }

    #[test]
    fn test_shape_shares_linked_slots() {
        let tree = MatchExpr::or(vec![
            MatchExpr::eq("a", 1),
            MatchExpr::and(vec![MatchExpr::eq("a", 1), MatchExpr::eq("b", 2)]),
        ]);

        let key = key_after_walk(&tree);
        assert_eq!(key.shape(), "or(eq(a,?0),and(eq(a,?0),eq(b,?1)))");
    }

    #[test]
    fn test_different_literals_same_key() {
        let first = MatchExpr::and(vec![MatchExpr::gt("a", 5), MatchExpr::size("t", 2)]);
        let second = MatchExpr::and(vec![MatchExpr::gt("a", 99), MatchExpr::size("t", 7)]);

        let a = key_after_walk(&first);
        let b = key_after_walk(&second);
        assert_eq!(a, b);
        assert_eq!(a.query_hash(), b.query_hash());
    }

    #[test]
    fn test_excluded_literal_stays_in_shape() {
        let tree = MatchExpr::and(vec![MatchExpr::eq("a", Literal::Null), MatchExpr::eq("b", 1)]);
        let key = key_after_walk(&tree);
        assert_eq!(key.shape(), "and(eq(a,null),eq(b,?0))");
    }

    #[test]
    fn test_two_slot_nodes() {
        let tree = MatchExpr::and(vec![
            MatchExpr::bits_any_set("f", vec![1]),
            MatchExpr::modulo("n", 4, 0).unwrap(),
            MatchExpr::regex("s", "^x", "").unwrap(),
        ]);
        let key = key_after_walk(&tree);
        assert_eq!(
            key.shape(),
            "and(bitsAnySet(f,?0,?1),mod(n,?2,?3),regex(s,?4,?5))"
        );
    }

    #[test]
    fn test_partial_group_is_rejected() {
        let tree = MatchExpr::modulo("n", 4, 0).unwrap();
        if let MatchExpr::Mod(m) = &tree {
            m.set_divisor_param_id(Some(0));
        }

        let err = PlanCacheKey::build(&tree).unwrap_err();
        assert_eq!(
            err,
            KeyError::PartiallyParameterized {
                kind: MatchKind::Mod,
                path: "n".to_string()
            }
        );
        assert_eq!(err.code(), "MATCHPARAM_KEY_PARTIAL");
    }

    #[test]
    fn test_unparameterized_key_ignores_slots() {
        let tree = MatchExpr::eq("a", 3);
        parameterize(&tree, &ParameterizationConfig::unlimited());

        let key = PlanCacheKey::build_unparameterized(&tree);
        assert_eq!(key.shape(), "eq(a,3)");
    }

    #[test]
    fn test_query_hash_format() {
        let key = PlanCacheKey::build(&MatchExpr::exists("a")).unwrap();
        let hash = key.query_hash();
        assert_eq!(hash.len(), 8);
        assert!(hash
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        assert_eq!(hash, format!("{:08X}", crc32fast::hash(b"exists(a)")));
    }
}
