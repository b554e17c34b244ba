//! matchparam - deterministic auto-parameterization of match expressions
//!
//! Turns a query filter into a tree, replaces eligible literals with
//! parameter slots, and derives a shape key that plan caches can share
//! across queries differing only in those literals.

pub mod cli;
pub mod matcher;
pub mod observability;
pub mod parameterization;
pub mod plan_cache;
