//! Integer-variable evaluator: applies the guard and statement programs of
//! a vedge to a valuation, collecting clock constraints and resets.
//!
//! Outcomes come in two very different flavors. A false guard or a failed
//! assignment is a *pruned transition*, reported as a value. A program that
//! emits the wrong kind of atom for its context (a reset inside a guard, a
//! clock constraint inside a statement, a reset inside an invariant) is
//! *malformed input* and aborts the whole run.

use smallvec::SmallVec;
use thiserror::Error;
use zonal_dbm::{Bound, ClockConstraint, ClockReset, LocId};
use zonal_model::{Atom, EdgeId, IntVal, System, VEdge};

/// Collected clock constraints of one step.
pub type ClockConstraints = SmallVec<[ClockConstraint; 4]>;

/// Collected clock resets of one step.
pub type ClockResets = SmallVec<[ClockReset; 2]>;

/// Fatal malformed-input error. The driver surfaces these to the caller
/// without rollback.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("clock reset in guard of edge {edge}")]
    ResetInGuard { edge: EdgeId },

    #[error("assignment in guard of edge {edge}")]
    AssignmentInGuard { edge: EdgeId },

    #[error("clock constraint in statement of edge {edge}")]
    ClockConstraintInStatement { edge: EdgeId },

    #[error("boolean guard in statement of edge {edge}")]
    GuardInStatement { edge: EdgeId },

    #[error("clock reset in invariant of location {loc}")]
    ResetInInvariant { loc: LocId },

    #[error("assignment in invariant of location {loc}")]
    AssignmentInInvariant { loc: LocId },

    #[error("clock reset to negative value {value} on edge {edge}")]
    NegativeReset { edge: EdgeId, value: i64 },

    #[error("vedge has {found} slots but the system has {expected} processes")]
    VEdgeLength { expected: usize, found: usize },

    #[error("edge {edge} of process {pid} sits in slot {slot} of the vedge")]
    EdgeProcessMismatch {
        edge: EdgeId,
        pid: usize,
        slot: usize,
    },
}

/// Result of applying a vedge to an integer valuation.
#[derive(Debug)]
pub enum EvalOutcome {
    Ok(VedgeEffect),
    GuardViolated,
    StatementFailed,
}

/// The effect of a taken vedge: the updated valuation plus the collected
/// clock guard and resets, in emission order.
#[derive(Debug)]
pub struct VedgeEffect {
    pub intval: IntVal,
    pub guard: ClockConstraints,
    pub resets: ClockResets,
}

#[derive(Clone, Copy)]
enum Ctx {
    Guard(EdgeId),
    Statement(EdgeId),
    Invariant(LocId),
}

/// Largest clock-bound magnitude the DBM encoding can absorb. Values
/// outside prune the transition rather than wrap.
const MAX_CLOCK_BOUND: i64 = i64::MAX >> 2;

fn clock_bound(value: i64, strict: bool) -> Option<Bound> {
    if value.checked_abs()? > MAX_CLOCK_BOUND {
        return None;
    }
    Some(Bound::new(value, strict))
}

/// Run one program. Returns `Ok(false)` when the step is pruned (guard
/// false, assignment out of domain, arithmetic failure).
fn run_atoms(
    system: &System,
    atoms: &[Atom],
    ctx: Ctx,
    vals: &mut [i64],
    constraints: &mut ClockConstraints,
    resets: &mut ClockResets,
) -> Result<bool, ModelError> {
    for atom in atoms {
        match atom {
            Atom::Guard(b) => {
                if let Ctx::Statement(edge) = ctx {
                    return Err(ModelError::GuardInStatement { edge });
                }
                match b.eval(vals) {
                    Some(true) => {}
                    _ => return Ok(false),
                }
            }
            Atom::ClockGuard(c) => {
                if let Ctx::Statement(edge) = ctx {
                    return Err(ModelError::ClockConstraintInStatement { edge });
                }
                let bound = match c.bound.eval(vals).and_then(|v| clock_bound(v, c.strict)) {
                    Some(b) => b,
                    None => return Ok(false),
                };
                constraints.push(ClockConstraint {
                    i: c.left,
                    j: c.right,
                    bound,
                });
            }
            Atom::Assign { var, value } => {
                match ctx {
                    Ctx::Guard(edge) => return Err(ModelError::AssignmentInGuard { edge }),
                    Ctx::Invariant(loc) => {
                        return Err(ModelError::AssignmentInInvariant { loc })
                    }
                    Ctx::Statement(_) => {}
                }
                let v = match value.eval(vals) {
                    Some(v) => v,
                    None => return Ok(false),
                };
                if !system.intvar(*var).contains(v) {
                    return Ok(false);
                }
                vals[*var] = v;
            }
            Atom::ClockReset { clock, value } => {
                let edge = match ctx {
                    Ctx::Guard(edge) => return Err(ModelError::ResetInGuard { edge }),
                    Ctx::Invariant(loc) => return Err(ModelError::ResetInInvariant { loc }),
                    Ctx::Statement(edge) => edge,
                };
                let v = match value.eval(vals) {
                    Some(v) => v,
                    None => return Ok(false),
                };
                if v < 0 {
                    return Err(ModelError::NegativeReset { edge, value: v });
                }
                if v > MAX_CLOCK_BOUND {
                    return Ok(false);
                }
                resets.push(ClockReset { clock: *clock, value: v });
            }
            Atom::If { cond, then, orelse } => {
                let branch = match cond.eval(vals) {
                    Some(true) => then,
                    Some(false) => orelse,
                    None => return Ok(false),
                };
                if !run_atoms(system, branch, ctx, vals, constraints, resets)? {
                    return Ok(false);
                }
            }
        }
    }
    Ok(true)
}

/// Evaluate the invariant program of one location: the integer part must
/// hold, clock constraints are appended to `constraints`.
pub fn run_invariant(
    system: &System,
    loc: LocId,
    vals: &mut [i64],
    constraints: &mut ClockConstraints,
) -> Result<bool, ModelError> {
    let mut no_resets = ClockResets::new();
    run_atoms(
        system,
        &system.location(loc).invariant,
        Ctx::Invariant(loc),
        vals,
        constraints,
        &mut no_resets,
    )
}

/// Apply a vedge to an integer valuation: first every edge's guard against
/// the pre-state, then every edge's statement sequentially. Clock guards
/// and resets are collected on the way.
pub fn apply_vedge(
    system: &System,
    vedge: &VEdge,
    intval: &IntVal,
) -> Result<EvalOutcome, ModelError> {
    let mut vals: Vec<i64> = intval.values().to_vec();
    let mut guard = ClockConstraints::new();
    let mut resets = ClockResets::new();

    for (_, eid) in vedge.iter_present() {
        let edge = system.edge(eid);
        if !run_atoms(
            system,
            &edge.guard,
            Ctx::Guard(eid),
            &mut vals,
            &mut guard,
            &mut resets,
        )? {
            return Ok(EvalOutcome::GuardViolated);
        }
    }

    for (_, eid) in vedge.iter_present() {
        let edge = system.edge(eid);
        if !run_atoms(
            system,
            &edge.statement,
            Ctx::Statement(eid),
            &mut vals,
            &mut guard,
            &mut resets,
        )? {
            return Ok(EvalOutcome::StatementFailed);
        }
    }

    Ok(EvalOutcome::Ok(VedgeEffect {
        intval: IntVal::new(vals),
        guard,
        resets,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use zonal_model::{
        ArithOp, BoolExpr, ClockConstraintExpr, IntExpr, LocationDecl, System, SystemBuilder,
    };

    /// One process, one intvar i ∈ [0, 3] starting at 0, one clock x, and a
    /// single self-loop edge with the given guard and statement.
    fn one_edge_system(guard: Vec<Atom>, statement: Vec<Atom>) -> (System, VEdge) {
        let mut b = SystemBuilder::new("eval");
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
                    ..LocationDecl::default()
                },
            )
            .unwrap();
        let e = b.add_edge(p0, l0, l0, tau, guard, statement).unwrap();
        let system = b.build().unwrap();
        (system, VEdge::new(vec![Some(e)]))
    }

    #[test]
    fn test_guard_violated() {
        let (s, vedge) = one_edge_system(
            vec![Atom::Guard(BoolExpr::ge(IntExpr::var(0), IntExpr::lit(5)))],
            vec![],
        );
        let out = apply_vedge(&s, &vedge, &IntVal::new(vec![0])).unwrap();
        assert!(matches!(out, EvalOutcome::GuardViolated));
    }

    #[test]
    fn test_statement_updates_and_domain_check() {
        let inc = Atom::Assign {
            var: 0,
            value: IntExpr::add(IntExpr::var(0), IntExpr::lit(1)),
        };
        let (s, vedge) = one_edge_system(vec![], vec![inc]);
        match apply_vedge(&s, &vedge, &IntVal::new(vec![2])).unwrap() {
            EvalOutcome::Ok(effect) => assert_eq!(effect.intval.values(), &[3]),
            other => panic!("unexpected outcome {:?}", other),
        }
        // One more increment leaves the declared domain [0, 3].
        let out = apply_vedge(&s, &vedge, &IntVal::new(vec![3])).unwrap();
        assert!(matches!(out, EvalOutcome::StatementFailed));
    }

    #[test]
    fn test_clock_guard_collected_with_evaluated_bound() {
        let (s, vedge) = one_edge_system(
            vec![Atom::ClockGuard(ClockConstraintExpr::upper(
                1,
                false,
                IntExpr::add(IntExpr::var(0), IntExpr::lit(2)),
            ))],
            vec![],
        );
        match apply_vedge(&s, &vedge, &IntVal::new(vec![1])).unwrap() {
            EvalOutcome::Ok(effect) => {
                assert_eq!(effect.guard.len(), 1);
                assert_eq!(effect.guard[0].i, 1);
                assert_eq!(effect.guard[0].j, 0);
                assert_eq!(effect.guard[0].bound, Bound::le(3));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_conditional_assignment() {
        let stmt = Atom::If {
            cond: BoolExpr::eq(IntExpr::var(0), IntExpr::lit(0)),
            then: vec![Atom::Assign {
                var: 0,
                value: IntExpr::lit(2),
            }],
            orelse: vec![Atom::Assign {
                var: 0,
                value: IntExpr::lit(1),
            }],
        };
        let (s, vedge) = one_edge_system(vec![], vec![stmt]);
        match apply_vedge(&s, &vedge, &IntVal::new(vec![0])).unwrap() {
            EvalOutcome::Ok(effect) => assert_eq!(effect.intval.values(), &[2]),
            other => panic!("unexpected outcome {:?}", other),
        }
        match apply_vedge(&s, &vedge, &IntVal::new(vec![3])).unwrap() {
            EvalOutcome::Ok(effect) => assert_eq!(effect.intval.values(), &[1]),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_reset_in_guard_is_fatal() {
        let (s, vedge) = one_edge_system(vec![Atom::reset(1, 0)], vec![]);
        let err = apply_vedge(&s, &vedge, &IntVal::new(vec![0])).unwrap_err();
        assert!(matches!(err, ModelError::ResetInGuard { .. }));
    }

    #[test]
    fn test_clock_constraint_in_statement_is_fatal() {
        let (s, vedge) = one_edge_system(vec![], vec![Atom::clock_le(1, 4)]);
        let err = apply_vedge(&s, &vedge, &IntVal::new(vec![0])).unwrap_err();
        assert!(matches!(err, ModelError::ClockConstraintInStatement { .. }));
    }

    #[test]
    fn test_negative_reset_is_fatal() {
        let (s, vedge) = one_edge_system(
            vec![],
            vec![Atom::ClockReset {
                clock: 1,
                value: IntExpr::lit(-1),
            }],
        );
        let err = apply_vedge(&s, &vedge, &IntVal::new(vec![0])).unwrap_err();
        assert!(matches!(err, ModelError::NegativeReset { value: -1, .. }));
    }

    #[test]
    fn test_reset_in_invariant_is_fatal() {
        let mut b = SystemBuilder::new("inv");
        let p0 = b.add_process("P");
        b.add_clock("x");
        let l0 = b
            .add_location(
                p0,
                "l0",
                LocationDecl {
                    initial: true,
                    invariant: vec![Atom::reset(1, 0)],
                    ..LocationDecl::default()
                },
            )
            .unwrap();
        let s = b.build().unwrap();
        let mut vals: Vec<i64> = vec![];
        let mut constraints = ClockConstraints::new();
        let err = run_invariant(&s, l0, &mut vals, &mut constraints).unwrap_err();
        assert!(matches!(err, ModelError::ResetInInvariant { loc: 0 }));
    }

    #[test]
    fn test_division_by_zero_prunes() {
        let (s, vedge) = one_edge_system(
            vec![Atom::Guard(BoolExpr::eq(
                IntExpr::bin(ArithOp::Div, IntExpr::lit(1), IntExpr::var(0)),
                IntExpr::lit(1),
            ))],
            vec![],
        );
        let out = apply_vedge(&s, &vedge, &IntVal::new(vec![0])).unwrap();
        assert!(matches!(out, EvalOutcome::GuardViolated));
    }

    #[test]
    fn test_statements_sequential_across_edges() {
        // Two processes, both incrementing the same variable; the second
        // edge sees the first edge's write.
        let mut b = SystemBuilder::new("seq");
        let p0 = b.add_process("P0");
        let p1 = b.add_process("P1");
        b.add_intvar("i", 0, 3, 0).unwrap();
        let a = b.add_event("a");
        let l0 = b
            .add_location(
                p0,
                "l0",
                LocationDecl {
                    initial: true,
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
                    ..LocationDecl::default()
                },
            )
            .unwrap();
        let inc = Atom::Assign {
            var: 0,
            value: IntExpr::add(IntExpr::var(0), IntExpr::lit(1)),
        };
        let e0 = b.add_edge(p0, l0, l0, a, vec![], vec![inc.clone()]).unwrap();
        let e1 = b.add_edge(p1, m0, m0, a, vec![], vec![inc]).unwrap();
        b.add_sync(vec![(p0, a, false), (p1, a, false)]).unwrap();
        let s = b.build().unwrap();

        let vedge = VEdge::new(vec![Some(e0), Some(e1)]);
        match apply_vedge(&s, &vedge, &IntVal::new(vec![0])).unwrap() {
            EvalOutcome::Ok(effect) => assert_eq!(effect.intval.values(), &[2]),
            other => panic!("unexpected outcome {:?}", other),
        }
    }
}
