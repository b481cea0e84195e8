//! Reachability analysis over symbolic transition systems.
//!
//! The driver walks any [`zonal_zg::Sts`] with a pluggable waiting-list
//! policy, interning symbolic states in a reachability graph that supports
//! equality-based and subsumption-based deduplication, and reports run
//! statistics the way external tooling expects them.

pub mod graph;
pub mod reach;
pub mod stats;
pub mod waiting;

pub use graph::{GraphEdge, Inclusion, Node, NodeId, ReachabilityGraph, StateOrder, ZgStateOrder};
pub use reach::{run, run_with_waiting};
pub use stats::Stats;
pub use waiting::{waiting_factory, FifoWaiting, LifoWaiting, Policy, PriorityWaiting, Waiting};
