//! Slot bindings
//!
//! After a walk, each slot id stands for one operand of one node. A binding
//! names that operand and carries its current value, which is what an executor
//! would substitute when running a cached plan.

use serde::Serialize;
use thiserror::Error;

use crate::matcher::{InputParamId, Literal, MatchExpr, MatchKind, TypeSet};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    /// The table points at a node that carries no annotation for this id
    #[error("slot {param_id} points at a {kind} node that does not carry it")]
    UnboundSlot {
        param_id: InputParamId,
        kind: MatchKind,
    },
}

/// The operand a slot stands for
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "operand", content = "value", rename_all = "snake_case")]
pub enum ParamValue {
    /// Comparison right-hand side
    Literal(Literal),
    /// Sorted, deduplicated `$in` members
    List(Vec<Literal>),
    BitPositions(Vec<u32>),
    BitMask(u64),
    Divisor(i64),
    Remainder(i64),
    RegexSource { pattern: String, flags: String },
    CompiledRegex { pattern: String, flags: String },
    TypeSet(TypeSet),
    Size(i64),
    /// `$where` source
    Code(String),
}

/// One resolved slot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamBinding {
    pub param_id: InputParamId,
    pub kind: MatchKind,
    pub path: Option<String>,
    pub value: ParamValue,
}

/// Resolves every slot in `slot_table`, whose first entry has id `starting_param_id`
pub fn resolve_bindings(
    slot_table: &[&MatchExpr],
    starting_param_id: InputParamId,
) -> Result<Vec<ParamBinding>, BindingError> {
    slot_table
        .iter()
        .enumerate()
        .map(|(index, expr)| resolve(starting_param_id + index, expr))
        .collect()
}

fn resolve(param_id: InputParamId, expr: &MatchExpr) -> Result<ParamBinding, BindingError> {
    let value = operand_for(param_id, expr).ok_or(BindingError::UnboundSlot {
        param_id,
        kind: expr.kind(),
    })?;

    Ok(ParamBinding {
        param_id,
        kind: expr.kind(),
        path: expr.path().map(str::to_string),
        value,
    })
}

fn operand_for(id: InputParamId, expr: &MatchExpr) -> Option<ParamValue> {
    let slot = Some(id);
    match expr {
        MatchExpr::Eq(c)
        | MatchExpr::Gt(c)
        | MatchExpr::Gte(c)
        | MatchExpr::Lt(c)
        | MatchExpr::Lte(c)
            if c.input_param_id() == slot =>
        {
            Some(ParamValue::Literal(c.rhs().clone()))
        }
        MatchExpr::BitsAllClear(b)
        | MatchExpr::BitsAllSet(b)
        | MatchExpr::BitsAnyClear(b)
        | MatchExpr::BitsAnySet(b) => {
            if b.bit_positions_param_id() == slot {
                Some(ParamValue::BitPositions(b.bit_positions().to_vec()))
            } else if b.bitmask_param_id() == slot {
                Some(ParamValue::BitMask(b.bit_mask()))
            } else {
                None
            }
        }
        MatchExpr::In(e) if e.input_param_id() == slot => {
            Some(ParamValue::List(e.equalities().to_vec()))
        }
        MatchExpr::Mod(e) => {
            if e.divisor_param_id() == slot {
                Some(ParamValue::Divisor(e.divisor()))
            } else if e.remainder_param_id() == slot {
                Some(ParamValue::Remainder(e.remainder()))
            } else {
                None
            }
        }
        MatchExpr::Regex(e) => {
            let pattern = e.pattern().to_string();
            let flags = e.flags().to_string();
            if e.source_regex_param_id() == slot {
                Some(ParamValue::RegexSource { pattern, flags })
            } else if e.compiled_regex_param_id() == slot {
                Some(ParamValue::CompiledRegex { pattern, flags })
            } else {
                None
            }
        }
        MatchExpr::Size(e) if e.input_param_id() == slot => Some(ParamValue::Size(e.size())),
        MatchExpr::Type(e) if e.input_param_id() == slot => {
            Some(ParamValue::TypeSet(e.type_set().clone()))
        }
        MatchExpr::Where(e) if e.input_param_id() == slot => {
            Some(ParamValue::Code(e.code().to_string()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_comparison_and_mod() {
        let eq = MatchExpr::eq("a", 7);
        let modulo = MatchExpr::modulo("n", 3, 2).unwrap();
        if let Some(c) = eq.comparison() {
            c.set_input_param_id(Some(0));
        }
        if let MatchExpr::Mod(m) = &modulo {
            m.set_divisor_param_id(Some(1));
            m.set_remainder_param_id(Some(2));
        }

        let bindings = resolve_bindings(&[&eq, &modulo, &modulo], 0).unwrap();
        assert_eq!(bindings.len(), 3);
        assert_eq!(bindings[0].value, ParamValue::Literal(Literal::Int(7)));
        assert_eq!(bindings[0].path.as_deref(), Some("a"));
        assert_eq!(bindings[1].value, ParamValue::Divisor(3));
        assert_eq!(bindings[2].value, ParamValue::Remainder(2));
        assert_eq!(bindings[2].kind, MatchKind::Mod);
    }

    #[test]
    fn test_resolves_with_offset_base() {
        let bits = MatchExpr::bits_all_set("f", vec![0, 2]);
        if let Some(b) = bits.bit_test() {
            b.set_bit_positions_param_id(Some(10));
            b.set_bitmask_param_id(Some(11));
        }

        let bindings = resolve_bindings(&[&bits, &bits], 10).unwrap();
        assert_eq!(bindings[0].param_id, 10);
        assert_eq!(bindings[0].value, ParamValue::BitPositions(vec![0, 2]));
        assert_eq!(bindings[1].value, ParamValue::BitMask(0b101));
    }

    #[test]
    fn test_unannotated_node_is_unbound() {
        let eq = MatchExpr::eq("a", 1);
        let err = resolve_bindings(&[&eq], 0).unwrap_err();
        assert_eq!(
            err,
            BindingError::UnboundSlot {
                param_id: 0,
                kind: MatchKind::Eq
            }
        );
    }

    #[test]
    fn test_where_has_no_path() {
        let code = MatchExpr::where_code("return true");
        if let MatchExpr::Where(w) = &code {
            w.set_input_param_id(Some(0));
        }

        let bindings = resolve_bindings(&[&code], 0).unwrap();
        assert_eq!(bindings[0].path, None);
        assert_eq!(bindings[0].value, ParamValue::Code("return true".to_string()));
    }

    #[test]
    fn test_binding_serializes_tagged() {
        let size = MatchExpr::size("tags", 2);
        if let MatchExpr::Size(s) = &size {
            s.set_input_param_id(Some(0));
        }

        let bindings = resolve_bindings(&[&size], 0).unwrap();
        let json = serde_json::to_value(&bindings[0]).unwrap();
        assert_eq!(json["param_id"], 0);
        assert_eq!(json["path"], "tags");
        assert_eq!(json["value"]["operand"], "size");
        assert_eq!(json["value"]["value"], 2);
    }
}
