//! Conference query compilation and execution.

/// Client filter parsing and the single-inequality-field compiler.
pub mod filter;
/// Query plans, predicates and typed values.
pub mod plan;
