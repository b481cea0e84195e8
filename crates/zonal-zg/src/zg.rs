//! Zone graph: the symbolic transition system over states
//! `⟨vloc, intval, zone⟩`.

use crate::eval::ModelError;
use crate::sts::{Sst, Sts};
use crate::syncprod;
use crate::ta::{self, StateStatus, StepOutcome};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::debug;
use zonal_dbm::{BoundMap, Dbm, Scope, ZoneStatus};
use zonal_model::{LabelSet, System, VEdge};

/// A symbolic state. The zone is shared and never mutated once built;
/// successor computation always produces a fresh zone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymState {
    pub vloc: zonal_model::VLoc,
    pub intval: zonal_model::IntVal,
    pub zone: Arc<Dbm>,
}

impl SymState {
    /// Structural hash: discrete part and zone, by content. Pairs with
    /// `==`/`Hash` for interning un-shared states.
    pub fn structural_hash(&self) -> u64 {
        let mut h = ahash::AHasher::default();
        self.hash(&mut h);
        h.finish()
    }

    /// Hash of the discrete part only (vloc and intval). Pairs with
    /// discrete equality for subsumption bucketing.
    pub fn discrete_hash(&self) -> u64 {
        let mut h = ahash::AHasher::default();
        self.vloc.hash(&mut h);
        self.intval.hash(&mut h);
        h.finish()
    }

    /// Handle-based hash: discrete content plus the zone's address. Valid
    /// only once zones are interned; pairs with [`SymState::shared_eq`].
    pub fn shared_hash(&self) -> u64 {
        let mut h = ahash::AHasher::default();
        self.vloc.hash(&mut h);
        self.intval.hash(&mut h);
        (Arc::as_ptr(&self.zone) as usize).hash(&mut h);
        h.finish()
    }

    /// Handle-based equality: discrete content plus zone identity.
    pub fn shared_eq(&self, other: &SymState) -> bool {
        self.vloc == other.vloc
            && self.intval == other.intval
            && Arc::ptr_eq(&self.zone, &other.zone)
    }

    /// Discrete equality, ignoring the zone.
    pub fn same_discrete(&self, other: &SymState) -> bool {
        self.vloc == other.vloc && self.intval == other.intval
    }
}

impl fmt::Display for SymState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.vloc, self.intval, self.zone)
    }
}

/// The transition label of the zone graph: the joint edge that was fired.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ZgTransition {
    pub vedge: VEdge,
}

impl fmt::Display for ZgTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.vedge)
    }
}

/// Which extrapolation the zone graph applies to fresh zones, resolved
/// against the system's clock-bound maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extrapolation {
    None,
    ExtraLuGlobal,
    ExtraLuLocal,
    ExtraMGlobal,
    ExtraMLocal,
}

/// The symbolic semantics of a system: initial symbolic states and the
/// successor relation, applying source invariant, guard, resets, target
/// invariant, optional delay and extrapolation in that order.
pub struct ZoneGraph {
    system: Arc<System>,
    extrapolation: Extrapolation,
}

impl ZoneGraph {
    pub fn new(system: Arc<System>, extrapolation: Extrapolation) -> ZoneGraph {
        debug!(
            system = system.name(),
            clocks = system.clock_count(),
            processes = system.process_count(),
            ?extrapolation,
            "zone graph created"
        );
        ZoneGraph {
            system,
            extrapolation,
        }
    }

    pub fn system(&self) -> &Arc<System> {
        &self.system
    }

    pub fn extrapolation(&self) -> Extrapolation {
        self.extrapolation
    }

    fn dim(&self) -> usize {
        self.system.clock_count()
    }

    fn extrapolate(&self, dbm: &mut Dbm, vloc: &zonal_model::VLoc) {
        let bounds = self.system.clock_bounds();
        let dim = self.dim();
        match self.extrapolation {
            Extrapolation::None => {}
            Extrapolation::ExtraLuGlobal | Extrapolation::ExtraLuLocal => {
                let scope = match self.extrapolation {
                    Extrapolation::ExtraLuGlobal => Scope::Global,
                    _ => Scope::VLoc(vloc.locs()),
                };
                let mut l = BoundMap::new(dim);
                let mut u = BoundMap::new(dim);
                bounds.lu_into(scope, &mut l, &mut u);
                dbm.extrapolate_lu(&l, &u);
            }
            Extrapolation::ExtraMGlobal | Extrapolation::ExtraMLocal => {
                let scope = match self.extrapolation {
                    Extrapolation::ExtraMGlobal => Scope::Global,
                    _ => Scope::VLoc(vloc.locs()),
                };
                let mut m = BoundMap::new(dim);
                bounds.m_into(scope, &mut m);
                dbm.extrapolate_m(&m);
            }
        }
    }

    /// Initial symbolic states: one per joint initial location choice that
    /// survives its invariant, with zone `elapse(zero) ∩ invariant` when
    /// delay is allowed (plain `zero ∩ invariant` otherwise).
    pub fn initial_states(&self) -> Result<Vec<Sst<SymState, ZgTransition>>, ModelError> {
        let mut out = Vec::new();
        for vloc in syncprod::initial_vlocs(&self.system) {
            let init = match ta::initialize(&self.system, &vloc)? {
                StepOutcome::Pruned(_) => continue,
                StepOutcome::Taken(init) => init,
            };
            let mut dbm = Dbm::zero(self.dim());
            if dbm.constrain_all(&init.tgt_invariant) == ZoneStatus::Empty {
                continue;
            }
            if ta::delay_allowed(&self.system, &init.vloc) {
                dbm.time_elapse();
                if dbm.constrain_all(&init.tgt_invariant) == ZoneStatus::Empty {
                    continue;
                }
            }
            self.extrapolate(&mut dbm, &init.vloc);
            out.push((
                StateStatus::Ok,
                SymState {
                    vloc: init.vloc,
                    intval: init.intval,
                    zone: Arc::new(dbm),
                },
                ZgTransition { vedge: init.vedge },
            ));
        }
        Ok(out)
    }

    /// Successors of a symbolic state under every outgoing vedge. Pruned
    /// steps are dropped; every emitted triple has status `Ok`.
    pub fn next_states(
        &self,
        state: &SymState,
    ) -> Result<Vec<Sst<SymState, ZgTransition>>, ModelError> {
        let mut out = Vec::new();
        for vedge in syncprod::outgoing_vedges(&self.system, &state.vloc) {
            if let Some(sst) = self.successor(state, vedge)? {
                out.push(sst);
            }
        }
        Ok(out)
    }

    /// One successor; `None` when the step was pruned. The status of a
    /// pruned step is available through [`ZoneGraph::successor_status`].
    fn successor(
        &self,
        state: &SymState,
        vedge: VEdge,
    ) -> Result<Option<Sst<SymState, ZgTransition>>, ModelError> {
        match self.successor_status(state, vedge)? {
            (StateStatus::Ok, Some(sst)) => Ok(Some(sst)),
            _ => Ok(None),
        }
    }

    /// Compute a successor and report the first failed check; exposed for
    /// tests and diagnostic tooling.
    pub fn successor_status(
        &self,
        state: &SymState,
        vedge: VEdge,
    ) -> Result<(StateStatus, Option<Sst<SymState, ZgTransition>>), ModelError> {
        let step = match ta::next(&self.system, &state.vloc, &state.intval, &vedge)? {
            StepOutcome::Pruned(status) => return Ok((status, None)),
            StepOutcome::Taken(step) => step,
        };

        let mut dbm = (*state.zone).clone();
        if dbm.constrain_all(&step.src_invariant) == ZoneStatus::Empty {
            return Ok((StateStatus::ClocksSrcInvariantViolated, None));
        }
        if dbm.constrain_all(&step.guard) == ZoneStatus::Empty {
            return Ok((StateStatus::ClocksGuardViolated, None));
        }
        for reset in &step.resets {
            dbm.reset_to(reset.clock, reset.value);
        }
        if dbm.constrain_all(&step.tgt_invariant) == ZoneStatus::Empty {
            return Ok((StateStatus::ClocksTgtInvariantViolated, None));
        }
        if ta::delay_allowed(&self.system, &step.vloc) {
            dbm.time_elapse();
            if dbm.constrain_all(&step.tgt_invariant) == ZoneStatus::Empty {
                return Ok((StateStatus::ClocksTgtInvariantViolated, None));
            }
        }
        self.extrapolate(&mut dbm, &step.vloc);

        let sst = (
            StateStatus::Ok,
            SymState {
                vloc: step.vloc,
                intval: step.intval,
                zone: Arc::new(dbm),
            },
            ZgTransition { vedge },
        );
        Ok((StateStatus::Ok, Some(sst)))
    }

    /// Labels of a symbolic state: union over component locations.
    pub fn state_labels(&self, state: &SymState) -> LabelSet {
        ta::labels(&self.system, &state.vloc)
    }

    /// A state is a valid final state iff its zone is non-empty.
    pub fn state_is_valid_final(&self, state: &SymState) -> bool {
        !state.zone.is_empty()
    }

    /// True iff the state is an initial state of the semantics: initial
    /// locations, initial integer values, and a zone containing the origin.
    pub fn is_initial(&self, state: &SymState) -> bool {
        state
            .vloc
            .locs()
            .iter()
            .all(|&loc| self.system.location(loc).initial)
            && self.system.initial_intval_values() == state.intval.values()
            && state.zone.contains_zero()
    }

    /// Human-readable attributes of a state, with names resolved against
    /// the system.
    pub fn attributes(&self, state: &SymState) -> BTreeMap<String, String> {
        let mut m = BTreeMap::new();
        let vloc_names: Vec<&str> = state
            .vloc
            .locs()
            .iter()
            .map(|&loc| self.system.location(loc).name.as_str())
            .collect();
        m.insert("vloc".to_string(), format!("<{}>", vloc_names.join(",")));
        let intval_parts: Vec<String> = state
            .intval
            .values()
            .iter()
            .enumerate()
            .map(|(var, v)| format!("{}={}", self.system.intvar(var).name, v))
            .collect();
        m.insert("intval".to_string(), intval_parts.join(","));
        m.insert(
            "zone".to_string(),
            state.zone.display_with(&self.system.clock_names()),
        );
        m
    }
}

impl Sts for ZoneGraph {
    type State = SymState;
    type Transition = ZgTransition;

    fn initial(&self) -> Result<Vec<Sst<SymState, ZgTransition>>, ModelError> {
        self.initial_states()
    }

    fn next(&self, state: &SymState) -> Result<Vec<Sst<SymState, ZgTransition>>, ModelError> {
        self.next_states(state)
    }

    fn labels(&self, state: &SymState) -> LabelSet {
        self.state_labels(state)
    }

    fn is_valid_final(&self, state: &SymState) -> bool {
        self.state_is_valid_final(state)
    }
}
