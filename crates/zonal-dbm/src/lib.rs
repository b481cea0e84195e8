//! Difference bound matrices and clock-bound maps.
//!
//! This crate is the zone layer of the Zonal model checker: canonical DBM
//! representations of convex clock regions, the operators needed by the
//! symbolic semantics (constrain, reset, time elapse, extrapolation,
//! abstract inclusion), and the per-location / global clock-bound maps the
//! extrapolations are driven by.

pub mod bound;
pub mod clockbounds;
pub mod dbm;

pub use bound::Bound;
pub use clockbounds::{
    BoundMap, ClockBounds, GlobalLuMap, GlobalMMap, LocalLuMap, LocalMMap, Scope, NO_BOUND,
};
pub use dbm::{ClockConstraint, ClockReset, Dbm, ZoneStatus};

/// Clock identifier: a dense index in `[0, dim)`. Clock 0 is the reference
/// clock, constant zero.
pub type ClockId = usize;

/// Location identifier assigned by the front-end, dense per system.
pub type LocId = usize;
