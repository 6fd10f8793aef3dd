// Domain model for Invoke Link: records, entry points and call trees.

pub mod annotation;
pub mod callgraph;
pub mod cycle_guard;
pub mod entry_point;
pub mod impact;
pub mod method;
