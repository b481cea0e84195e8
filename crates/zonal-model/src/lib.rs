//! System model for the Zonal reachability core.
//!
//! A `System` is the pre-parsed product of the external front-end: a set of
//! timed processes with locations, edges, bounded integer variables, clocks
//! and synchronization vectors, plus the clock-bound maps computed by
//! static analysis. The checker layers above only ever read it.

pub mod expr;
pub mod system;
pub mod values;

pub use expr::{ArithOp, Atom, BoolExpr, ClockConstraintExpr, CmpOp, IntExpr};
pub use system::{
    BuildError, Edge, IntVar, Location, LocationDecl, Process, SyncSlot, SyncVector, System,
    SystemBuilder,
};
pub use values::{IntVal, LabelSet, VEdge, VLoc};

/// Process identifier, dense in `[0, process_count)`.
pub type ProcessId = usize;

/// Edge identifier, dense across the whole system.
pub type EdgeId = usize;

/// Event identifier, dense across the whole system.
pub type EventId = usize;

/// Bounded integer variable identifier, dense in `[0, intvar_count)`.
pub type VarId = usize;

/// Label identifier, dense in `[0, 64)`.
pub type LabelId = usize;
