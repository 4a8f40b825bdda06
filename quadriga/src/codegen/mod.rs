//! AST to quadruple lowering.
//!
//! The generator walks a semantically accepted syntax tree and emits an
//! ordered instruction list. Storage is a flat single-level store: every
//! identifier maps to a synthetic `(name, 0)` cell on first sight. Virtual
//! temporaries and labels come from monotonically increasing counters owned
//! by the generator instance, so separate runs never interfere.

pub mod lowering;

pub use lowering::{generate, Generator};
