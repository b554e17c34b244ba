//! Generic match expression traversal
//!
//! `walk` drives a `TreeWalker` over a tree: `pre_visit` on a node, then each
//! child in stored order with `in_visit` between consecutive children, then
//! `post_visit`. Walkers receive shared references only.

use super::expression::MatchExpr;

/// Traversal hooks. All hooks default to no-ops.
pub trait TreeWalker<'a> {
    fn pre_visit(&mut self, _expr: &'a MatchExpr) {}

    /// Called after `count` children of `expr` have been walked, when more remain
    fn in_visit(&mut self, _count: usize, _expr: &'a MatchExpr) {}

    fn post_visit(&mut self, _expr: &'a MatchExpr) {}
}

/// Walks the tree rooted at `expr`
pub fn walk<'a, W>(expr: &'a MatchExpr, walker: &mut W)
where
    W: TreeWalker<'a> + ?Sized,
{
    walker.pre_visit(expr);

    let children = expr.children();
    for (i, child) in children.iter().enumerate() {
        walk(child, walker);
        if i + 1 < children.len() {
            walker.in_visit(i + 1, expr);
        }
    }

    walker.post_visit(expr);
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records hook calls as strings
    struct Recorder {
        calls: Vec<String>,
    }

    impl<'a> TreeWalker<'a> for Recorder {
        fn pre_visit(&mut self, expr: &'a MatchExpr) {
            self.calls.push(format!("pre:{}", label(expr)));
        }

        fn in_visit(&mut self, count: usize, expr: &'a MatchExpr) {
            self.calls.push(format!("in{}:{}", count, label(expr)));
        }

        fn post_visit(&mut self, expr: &'a MatchExpr) {
            self.calls.push(format!("post:{}", label(expr)));
        }
    }

    fn label(expr: &MatchExpr) -> String {
        match expr.path() {
            Some(path) => format!("{}({})", expr.kind(), path),
            None => expr.kind().to_string(),
        }
    }

    #[test]
    fn test_pre_order_with_in_visits() {
        let tree = MatchExpr::or(vec![
            MatchExpr::eq("a", 1),
            MatchExpr::and(vec![MatchExpr::eq("b", 2), MatchExpr::eq("c", 3)]),
        ]);

        let mut recorder = Recorder { calls: Vec::new() };
        walk(&tree, &mut recorder);

        assert_eq!(
            recorder.calls,
            vec![
                "pre:or",
                "pre:eq(a)",
                "post:eq(a)",
                "in1:or",
                "pre:and",
                "pre:eq(b)",
                "post:eq(b)",
                "in1:and",
                "pre:eq(c)",
                "post:eq(c)",
                "post:and",
                "post:or",
            ]
        );
    }

    #[test]
    fn test_leaf_only() {
        let tree = MatchExpr::exists("x");
        let mut recorder = Recorder { calls: Vec::new() };
        walk(&tree, &mut recorder);
        assert_eq!(recorder.calls, vec!["pre:exists(x)", "post:exists(x)"]);
    }
}
