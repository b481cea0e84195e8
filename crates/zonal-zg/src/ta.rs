//! Timed-automaton step: synchronized product plus invariants and the
//! integer-variable evaluator, below the zone layer.
//!
//! The evaluation order is contractual and tells the failure modes apart:
//! source invariant, then guard, then statement, then target invariant.

use crate::eval::{self, ClockConstraints, ClockResets, EvalOutcome, ModelError};
use std::fmt;
use zonal_dbm::LocId;
use zonal_model::{IntVal, ProcessId, System, VEdge, VLoc};

/// Step-local outcome attached to every produced state. Only `Ok` states
/// ever reach the exploration; the rest name the first check that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateStatus {
    Ok,
    IncompatibleEdge,
    SrcInvariantViolated,
    GuardViolated,
    StatementFailed,
    TgtInvariantViolated,
    ClocksSrcInvariantViolated,
    ClocksGuardViolated,
    ClocksTgtInvariantViolated,
    EmptyZone,
}

impl fmt::Display for StateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StateStatus::Ok => "OK",
            StateStatus::IncompatibleEdge => "INCOMPATIBLE_EDGE",
            StateStatus::SrcInvariantViolated => "SRC_INVARIANT_VIOLATED",
            StateStatus::GuardViolated => "GUARD_VIOLATED",
            StateStatus::StatementFailed => "STATEMENT_FAILED",
            StateStatus::TgtInvariantViolated => "TGT_INVARIANT_VIOLATED",
            StateStatus::ClocksSrcInvariantViolated => "CLOCKS_SRC_INVARIANT_VIOLATED",
            StateStatus::ClocksGuardViolated => "CLOCKS_GUARD_VIOLATED",
            StateStatus::ClocksTgtInvariantViolated => "CLOCKS_TGT_INVARIANT_VIOLATED",
            StateStatus::EmptyZone => "EMPTY_ZONE",
        };
        f.write_str(s)
    }
}

/// A step that either happened or was pruned with a status.
#[derive(Debug)]
pub enum StepOutcome<T> {
    Taken(T),
    Pruned(StateStatus),
}

/// Result of initializing from a joint initial location choice.
#[derive(Debug)]
pub struct TaInit {
    pub vloc: VLoc,
    pub intval: IntVal,
    pub vedge: VEdge,
    /// Invariant of the initial location tuple, over clocks.
    pub tgt_invariant: ClockConstraints,
}

/// Result of one discrete step.
#[derive(Debug)]
pub struct TaNext {
    pub vloc: VLoc,
    pub intval: IntVal,
    pub src_invariant: ClockConstraints,
    pub guard: ClockConstraints,
    pub resets: ClockResets,
    pub tgt_invariant: ClockConstraints,
}

/// Initialize from a tuple of initial locations: the initial integer
/// valuation must satisfy the invariant of every component location.
pub fn initialize(system: &System, vloc: &VLoc) -> Result<StepOutcome<TaInit>, ModelError> {
    let mut vals = system.initial_intval_values();
    let mut tgt_invariant = ClockConstraints::new();
    for &loc in vloc.locs() {
        if !eval::run_invariant(system, loc, &mut vals, &mut tgt_invariant)? {
            return Ok(StepOutcome::Pruned(StateStatus::SrcInvariantViolated));
        }
    }
    Ok(StepOutcome::Taken(TaInit {
        vloc: vloc.clone(),
        intval: IntVal::new(vals),
        vedge: VEdge::empty(system.process_count()),
        tgt_invariant,
    }))
}

/// One discrete step from `⟨vloc, intval⟩` through `vedge`.
///
/// Evaluation order: source-location compatibility, source invariant,
/// guards, statements, target invariant. A vedge whose shape disagrees
/// with the system (wrong slot count, edge filed under the wrong process)
/// is malformed input, not a pruned step.
pub fn next(
    system: &System,
    vloc: &VLoc,
    intval: &IntVal,
    vedge: &VEdge,
) -> Result<StepOutcome<TaNext>, ModelError> {
    if vedge.len() != system.process_count() {
        return Err(ModelError::VEdgeLength {
            expected: system.process_count(),
            found: vedge.len(),
        });
    }
    for (slot, eid) in vedge.iter_present() {
        let edge = system.edge(eid);
        if edge.pid != slot {
            return Err(ModelError::EdgeProcessMismatch {
                edge: eid,
                pid: edge.pid,
                slot,
            });
        }
    }

    for (pid, eid) in vedge.iter_present() {
        if system.edge(eid).src != vloc.loc(pid) {
            return Ok(StepOutcome::Pruned(StateStatus::IncompatibleEdge));
        }
    }

    let mut vals: Vec<i64> = intval.values().to_vec();
    let mut src_invariant = ClockConstraints::new();
    for &loc in vloc.locs() {
        if !eval::run_invariant(system, loc, &mut vals, &mut src_invariant)? {
            return Ok(StepOutcome::Pruned(StateStatus::SrcInvariantViolated));
        }
    }

    let effect = match eval::apply_vedge(system, vedge, intval)? {
        EvalOutcome::GuardViolated => {
            return Ok(StepOutcome::Pruned(StateStatus::GuardViolated))
        }
        EvalOutcome::StatementFailed => {
            return Ok(StepOutcome::Pruned(StateStatus::StatementFailed))
        }
        EvalOutcome::Ok(effect) => effect,
    };

    let updates: Vec<(ProcessId, LocId)> = vedge
        .iter_present()
        .map(|(pid, eid)| (pid, system.edge(eid).tgt))
        .collect();
    let new_vloc = vloc.with_updates(&updates);

    let mut new_vals: Vec<i64> = effect.intval.values().to_vec();
    let mut tgt_invariant = ClockConstraints::new();
    for &loc in new_vloc.locs() {
        if !eval::run_invariant(system, loc, &mut new_vals, &mut tgt_invariant)? {
            return Ok(StepOutcome::Pruned(StateStatus::TgtInvariantViolated));
        }
    }

    Ok(StepOutcome::Taken(TaNext {
        vloc: new_vloc,
        intval: effect.intval,
        src_invariant,
        guard: effect.guard,
        resets: effect.resets,
        tgt_invariant,
    }))
}

/// True iff time may elapse in every component location of `vloc`.
pub fn delay_allowed(system: &System, vloc: &VLoc) -> bool {
    vloc.locs()
        .iter()
        .all(|&loc| system.location(loc).delay_allowed())
}

/// Bit per process: whether that component location permits delay. Systems
/// with more than 64 processes must use [`delay_allowed`] directly.
pub fn delay_allowed_mask(system: &System, vloc: &VLoc) -> u64 {
    debug_assert!(vloc.len() <= 64);
    let mut mask = 0u64;
    for (pid, &loc) in vloc.locs().iter().enumerate() {
        if system.location(loc).delay_allowed() {
            mask |= 1u64 << pid;
        }
    }
    mask
}

/// Union of the label sets of the component locations.
pub fn labels(system: &System, vloc: &VLoc) -> zonal_model::LabelSet {
    vloc.locs()
        .iter()
        .fold(zonal_model::LabelSet::EMPTY, |acc, &loc| {
            acc.union(system.location(loc).labels)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use zonal_model::{Atom, BoolExpr, IntExpr, LocationDecl, System, SystemBuilder};

    fn initial_decl() -> LocationDecl {
        LocationDecl {
            initial: true,
            ..LocationDecl::default()
        }
    }

    /// One process with locations l0 → l1, one clock, one intvar i ∈ [0,3].
    fn chain_system(
        invariant0: Vec<Atom>,
        guard: Vec<Atom>,
        statement: Vec<Atom>,
    ) -> (System, VEdge) {
        let mut b = SystemBuilder::new("chain");
        let p0 = b.add_process("P");
        b.add_clock("x");
        b.add_intvar("i", 0, 3, 0).unwrap();
        let tau = b.add_event("tau");
        let l0 = b
            .add_location(
                p0,
                "l0",
                LocationDecl {
                    initial: true,
                    invariant: invariant0,
                    ..LocationDecl::default()
                },
            )
            .unwrap();
        let l1 = b.add_location(p0, "l1", LocationDecl::default()).unwrap();
        let e = b.add_edge(p0, l0, l1, tau, guard, statement).unwrap();
        let system = b.build().unwrap();
        (system, VEdge::new(vec![Some(e)]))
    }

    #[test]
    fn test_initialize_collects_invariant() {
        let (s, _) = chain_system(vec![Atom::clock_le(1, 5)], vec![], vec![]);
        match initialize(&s, &VLoc::new(vec![0])).unwrap() {
            StepOutcome::Taken(init) => {
                assert_eq!(init.vloc.locs(), &[0]);
                assert_eq!(init.intval.values(), &[0]);
                assert!(init.vedge.is_empty());
                assert_eq!(init.tgt_invariant.len(), 1);
            }
            StepOutcome::Pruned(status) => panic!("pruned with {}", status),
        }
    }

    #[test]
    fn test_initialize_rejects_violated_int_invariant() {
        let (s, _) = chain_system(
            vec![Atom::Guard(BoolExpr::ge(IntExpr::var(0), IntExpr::lit(1)))],
            vec![],
            vec![],
        );
        match initialize(&s, &VLoc::new(vec![0])).unwrap() {
            StepOutcome::Pruned(StateStatus::SrcInvariantViolated) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_next_moves_location_and_updates_intval() {
        let inc = Atom::Assign {
            var: 0,
            value: IntExpr::add(IntExpr::var(0), IntExpr::lit(1)),
        };
        let (s, vedge) = chain_system(vec![], vec![], vec![inc]);
        match next(&s, &VLoc::new(vec![0]), &IntVal::new(vec![0]), &vedge).unwrap() {
            StepOutcome::Taken(step) => {
                assert_eq!(step.vloc.locs(), &[1]);
                assert_eq!(step.intval.values(), &[1]);
            }
            StepOutcome::Pruned(status) => panic!("pruned with {}", status),
        }
    }

    #[test]
    fn test_next_incompatible_edge() {
        let (s, vedge) = chain_system(vec![], vec![], vec![]);
        // Current location is l1; the only edge leaves l0.
        match next(&s, &VLoc::new(vec![1]), &IntVal::new(vec![0]), &vedge).unwrap() {
            StepOutcome::Pruned(StateStatus::IncompatibleEdge) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_failure_order_src_invariant_before_guard() {
        // Both the source invariant and the guard are false on i = 0; the
        // invariant wins per the evaluation contract.
        let (s, vedge) = chain_system(
            vec![Atom::Guard(BoolExpr::ge(IntExpr::var(0), IntExpr::lit(1)))],
            vec![Atom::Guard(BoolExpr::Const(false))],
            vec![],
        );
        match next(&s, &VLoc::new(vec![0]), &IntVal::new(vec![0]), &vedge).unwrap() {
            StepOutcome::Pruned(StateStatus::SrcInvariantViolated) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_failure_order_guard_before_statement() {
        let bad_assign = Atom::Assign {
            var: 0,
            value: IntExpr::lit(99),
        };
        let (s, vedge) = chain_system(
            vec![],
            vec![Atom::Guard(BoolExpr::Const(false))],
            vec![bad_assign],
        );
        match next(&s, &VLoc::new(vec![0]), &IntVal::new(vec![0]), &vedge).unwrap() {
            StepOutcome::Pruned(StateStatus::GuardViolated) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_tgt_invariant_checked_after_statement() {
        // Target invariant requires i ≥ 2, statement sets i to 1.
        let mut b = SystemBuilder::new("tgt");
        let p0 = b.add_process("P");
        b.add_intvar("i", 0, 3, 0).unwrap();
        let tau = b.add_event("tau");
        let l0 = b.add_location(p0, "l0", initial_decl()).unwrap();
        let l1 = b
            .add_location(
                p0,
                "l1",
                LocationDecl {
                    invariant: vec![Atom::Guard(BoolExpr::ge(
                        IntExpr::var(0),
                        IntExpr::lit(2),
                    ))],
                    ..LocationDecl::default()
                },
            )
            .unwrap();
        let e = b
            .add_edge(
                p0,
                l0,
                l1,
                tau,
                vec![],
                vec![Atom::Assign {
                    var: 0,
                    value: IntExpr::lit(1),
                }],
            )
            .unwrap();
        let s = b.build().unwrap();
        let vedge = VEdge::new(vec![Some(e)]);
        match next(&s, &VLoc::new(vec![0]), &IntVal::new(vec![0]), &vedge).unwrap() {
            StepOutcome::Pruned(StateStatus::TgtInvariantViolated) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_vedge_length_mismatch_is_fatal() {
        let (s, _) = chain_system(vec![], vec![], vec![]);
        let bad = VEdge::new(vec![None, None]);
        let err = next(&s, &VLoc::new(vec![0]), &IntVal::new(vec![0]), &bad).unwrap_err();
        assert!(matches!(err, ModelError::VEdgeLength { expected: 1, found: 2 }));
    }

    #[test]
    fn test_delay_allowed() {
        let mut b = SystemBuilder::new("delay");
        let p0 = b.add_process("P0");
        let p1 = b.add_process("P1");
        let l0 = b.add_location(p0, "l0", initial_decl()).unwrap();
        let m0 = b
            .add_location(
                p1,
                "m0",
                LocationDecl {
                    initial: true,
                    urgent: true,
                    ..LocationDecl::default()
                },
            )
            .unwrap();
        let m1 = b.add_location(p1, "m1", LocationDecl::default()).unwrap();
        let s = b.build().unwrap();

        assert!(!delay_allowed(&s, &VLoc::new(vec![l0, m0])));
        assert!(delay_allowed(&s, &VLoc::new(vec![l0, m1])));
        assert_eq!(delay_allowed_mask(&s, &VLoc::new(vec![l0, m0])), 0b01);
        assert_eq!(delay_allowed_mask(&s, &VLoc::new(vec![l0, m1])), 0b11);
    }

    #[test]
    fn test_labels_union() {
        let mut b = SystemBuilder::new("labels");
        let p0 = b.add_process("P0");
        let p1 = b.add_process("P1");
        let la = b.add_label("a").unwrap();
        let lb = b.add_label("b").unwrap();
        let l0 = b
            .add_location(
                p0,
                "l0",
                LocationDecl {
                    initial: true,
                    labels: vec![la],
                    ..LocationDecl::default()
                },
            )
            .unwrap();
        let m0 = b
            .add_location(
                p1,
                "m0",
                LocationDecl {
                    initial: true,
                    labels: vec![lb],
                    ..LocationDecl::default()
                },
            )
            .unwrap();
        let s = b.build().unwrap();
        let set = labels(&s, &VLoc::new(vec![l0, m0]));
        assert!(set.contains(la));
        assert!(set.contains(lb));
    }
}
