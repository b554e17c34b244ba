//! Slot allocation state for one walk
//!
//! A context is built fresh for every tree and discarded afterwards. It owns
//! the budget, the next slot id, the sticky `parameterized` flag, and the
//! slot table of back-references used for equivalence lookups.
//!
//! # State machine
//!
//! The context starts active. The first request that would push the next slot
//! id past `max_param_count` clears `parameterized`; from then on every request
//! answers "no slot" and the table never grows again.

use crate::matcher::{InputParamId, MatchExpr};

/// Per-walk slot allocator
#[derive(Debug)]
pub struct ParameterizationContext<'a> {
    /// Slot table. Entry `i` is the node that received id `starting_param_id + i`.
    slot_table: Vec<&'a MatchExpr>,
    /// `None` means unlimited
    max_param_count: Option<usize>,
    starting_param_id: InputParamId,
    next_param_id: InputParamId,
    /// Cleared on the first request that exceeds the budget. Never set again.
    parameterized: bool,
    reused: usize,
}

impl<'a> ParameterizationContext<'a> {
    /// Creates a context whose first slot id is `starting_param_id`
    pub fn new(max_param_count: Option<usize>, starting_param_id: InputParamId) -> Self {
        Self {
            slot_table: Vec::new(),
            max_param_count,
            starting_param_id,
            next_param_id: starting_param_id,
            parameterized: true,
            reused: 0,
        }
    }

    /// Whether `count` more slots fit in the budget.
    ///
    /// Used before assigning a group of slots that must be all present or all
    /// absent. A `false` answer clears the flag, because the caller will leave
    /// the whole group unparameterized.
    pub fn available_param_ids(&mut self, count: usize) -> bool {
        if !self.parameterized {
            return false;
        }
        if let Some(max) = self.max_param_count {
            if self.next_param_id.saturating_add(count) > max {
                self.parameterized = false;
                return false;
            }
        }
        true
    }

    /// Issues a fresh slot id for `expr`
    pub fn next_input_param_id(&mut self, expr: &'a MatchExpr) -> Option<InputParamId> {
        if !self.parameterized {
            return None;
        }
        if let Some(max) = self.max_param_count {
            if self.next_param_id >= max {
                self.parameterized = false;
                return None;
            }
        }

        self.slot_table.push(expr);
        let id = self.next_param_id;
        self.next_param_id += 1;
        Some(id)
    }

    /// Returns the slot of the first table entry equivalent to `expr`, or
    /// issues a fresh one.
    ///
    /// The scan is linear in the table size. Trees are bounded by the query
    /// nesting limit, so a walk stays quadratic in a small number.
    pub fn next_reusable_input_param_id(&mut self, expr: &'a MatchExpr) -> Option<InputParamId> {
        if !self.parameterized {
            return None;
        }

        match self
            .slot_table
            .iter()
            .position(|seen| seen.equivalent(expr))
        {
            Some(index) => {
                self.reused += 1;
                Some(self.starting_param_id + index)
            }
            None => self.next_input_param_id(expr),
        }
    }

    /// False once any request has exceeded the budget
    pub fn parameterized(&self) -> bool {
        self.parameterized
    }

    pub fn slot_table(&self) -> &[&'a MatchExpr] {
        &self.slot_table
    }

    pub fn next_param_id(&self) -> InputParamId {
        self.next_param_id
    }

    pub fn starting_param_id(&self) -> InputParamId {
        self.starting_param_id
    }

    pub fn max_param_count(&self) -> Option<usize> {
        self.max_param_count
    }

    /// Number of reusable requests answered by an existing slot
    pub fn reused_count(&self) -> usize {
        self.reused
    }

    pub fn into_slot_table(self) -> Vec<&'a MatchExpr> {
        self.slot_table
    }
}

impl Default for ParameterizationContext<'_> {
    fn default() -> Self {
        Self::new(None, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unlimited_from_zero() {
        let ctx = ParameterizationContext::default();
        assert!(ctx.parameterized());
        assert_eq!(ctx.next_param_id(), 0);
        assert_eq!(ctx.starting_param_id(), 0);
        assert_eq!(ctx.max_param_count(), None);
        assert!(ctx.slot_table().is_empty());
    }

    #[test]
    fn test_ids_are_contiguous() {
        let a = MatchExpr::eq("a", 1);
        let b = MatchExpr::eq("b", 2);
        let c = MatchExpr::eq("c", 3);

        let mut ctx = ParameterizationContext::default();
        assert_eq!(ctx.next_input_param_id(&a), Some(0));
        assert_eq!(ctx.next_input_param_id(&b), Some(1));
        assert_eq!(ctx.next_input_param_id(&c), Some(2));
        assert_eq!(ctx.next_param_id(), 3);
        assert_eq!(ctx.slot_table().len(), 3);
        assert!(std::ptr::eq(ctx.slot_table()[1], &b));
    }

    #[test]
    fn test_reusable_returns_existing_slot() {
        let first = MatchExpr::eq("a", 1);
        let second = MatchExpr::eq("a", 1);
        let other = MatchExpr::eq("a", 2);

        let mut ctx = ParameterizationContext::default();
        assert_eq!(ctx.next_reusable_input_param_id(&first), Some(0));
        assert_eq!(ctx.next_reusable_input_param_id(&second), Some(0));
        assert_eq!(ctx.next_reusable_input_param_id(&other), Some(1));
        assert_eq!(ctx.slot_table().len(), 2);
        assert_eq!(ctx.reused_count(), 1);
    }

    #[test]
    fn test_plain_request_never_reuses() {
        let first = MatchExpr::eq("a", 1);
        let second = MatchExpr::eq("a", 1);

        let mut ctx = ParameterizationContext::default();
        assert_eq!(ctx.next_input_param_id(&first), Some(0));
        assert_eq!(ctx.next_input_param_id(&second), Some(1));
    }

    #[test]
    fn test_budget_failure_is_sticky() {
        let a = MatchExpr::eq("a", 1);
        let b = MatchExpr::eq("b", 2);
        let c = MatchExpr::eq("c", 3);
        let d = MatchExpr::eq("d", 4);

        let mut ctx = ParameterizationContext::new(Some(2), 0);
        assert_eq!(ctx.next_reusable_input_param_id(&a), Some(0));
        assert_eq!(ctx.next_reusable_input_param_id(&b), Some(1));
        assert_eq!(ctx.next_reusable_input_param_id(&c), None);
        assert!(!ctx.parameterized());

        // Even a request that could be answered by reuse is refused now
        assert_eq!(ctx.next_reusable_input_param_id(&a), None);
        assert_eq!(ctx.next_input_param_id(&d), None);
        assert_eq!(ctx.next_param_id(), 2);
        assert_eq!(ctx.slot_table().len(), 2);
    }

    #[test]
    fn test_available_param_ids_trips_flag() {
        let a = MatchExpr::eq("a", 1);

        let mut ctx = ParameterizationContext::new(Some(1), 0);
        assert!(ctx.available_param_ids(1));
        assert!(ctx.parameterized());
        assert!(!ctx.available_param_ids(2));
        assert!(!ctx.parameterized());
        assert_eq!(ctx.next_input_param_id(&a), None);
        assert!(ctx.slot_table().is_empty());
    }

    #[test]
    fn test_available_param_ids_exact_fit() {
        let mut ctx = ParameterizationContext::new(Some(2), 0);
        assert!(ctx.available_param_ids(2));
        assert!(ctx.parameterized());
    }

    #[test]
    fn test_zero_budget_refuses_first_request() {
        let a = MatchExpr::eq("a", 1);

        let mut ctx = ParameterizationContext::new(Some(0), 0);
        assert!(ctx.available_param_ids(0));
        assert_eq!(ctx.next_input_param_id(&a), None);
        assert!(!ctx.parameterized());
    }

    #[test]
    fn test_starting_id_offsets_issued_and_reused_ids() {
        let a = MatchExpr::eq("a", 1);
        let b = MatchExpr::eq("b", 2);
        let a_again = MatchExpr::eq("a", 1);

        let mut ctx = ParameterizationContext::new(None, 5);
        assert_eq!(ctx.next_reusable_input_param_id(&a), Some(5));
        assert_eq!(ctx.next_reusable_input_param_id(&b), Some(6));
        assert_eq!(ctx.next_reusable_input_param_id(&a_again), Some(5));
        assert_eq!(ctx.next_param_id(), 7);
    }

    #[test]
    fn test_budget_counts_absolute_ids() {
        let a = MatchExpr::eq("a", 1);
        let b = MatchExpr::eq("b", 2);

        let mut ctx = ParameterizationContext::new(Some(4), 3);
        assert_eq!(ctx.next_input_param_id(&a), Some(3));
        assert_eq!(ctx.next_input_param_id(&b), None);
        assert!(!ctx.parameterized());
    }

    #[test]
    fn test_into_slot_table() {
        let a = MatchExpr::eq("a", 1);

        let mut ctx = ParameterizationContext::default();
        ctx.next_input_param_id(&a);
        let table = ctx.into_slot_table();
        assert_eq!(table.len(), 1);
        assert!(std::ptr::eq(table[0], &a));
    }
}
