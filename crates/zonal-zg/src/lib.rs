//! Symbolic semantics of networks of synchronized timed automata.
//!
//! Layered bottom-up: the synchronized product enumerates joint edges, the
//! evaluator applies integer guards and statements, the TA step stitches
//! both together with location invariants, and the zone graph lifts the
//! result to symbolic states `⟨vloc, intval, zone⟩` with extrapolation.

pub mod eval;
pub mod sts;
pub mod syncprod;
pub mod ta;
pub mod zg;

pub use eval::{ClockConstraints, ClockResets, EvalOutcome, ModelError, VedgeEffect};
pub use sts::{Sst, Sts};
pub use ta::{StateStatus, StepOutcome, TaInit, TaNext};
pub use zg::{Extrapolation, SymState, ZgTransition, ZoneGraph};
