//! Tree walker that feeds every node to a `ParameterizationVisitor`

use crate::matcher::tree_walker::TreeWalker;
use crate::matcher::MatchExpr;

use super::visitor::ParameterizationVisitor;

/// Forwards `pre_visit` to the visitor. The other hooks do nothing.
///
/// The walk is never cut short after the budget trips: the remaining visits
/// are no-ops on an exhausted context, and callers see every node visited.
pub struct ParameterizationWalker<'v, 'c, 'a> {
    visitor: &'v mut ParameterizationVisitor<'c, 'a>,
}

impl<'v, 'c, 'a> ParameterizationWalker<'v, 'c, 'a> {
    pub fn new(visitor: &'v mut ParameterizationVisitor<'c, 'a>) -> Self {
        Self { visitor }
    }
}

impl<'a> TreeWalker<'a> for ParameterizationWalker<'_, '_, 'a> {
    fn pre_visit(&mut self, expr: &'a MatchExpr) {
        self.visitor.visit(expr);
    }
}
