//! The *System* object: a network of synchronized timed processes, built by
//! a validating builder and immutable afterwards.

use crate::expr::{Atom, BoolExpr, ClockConstraintExpr, IntExpr};
use crate::values::LabelSet;
use crate::{EdgeId, EventId, LabelId, ProcessId, VarId};
use thiserror::Error;
use zonal_dbm::{ClockBounds, ClockId, LocId};

/// Validation error raised while assembling a system.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("unknown process id {0}")]
    UnknownProcess(ProcessId),

    #[error("unknown location id {0}")]
    UnknownLocation(LocId),

    #[error("unknown event id {0}")]
    UnknownEvent(EventId),

    #[error("unknown integer variable id {0}")]
    UnknownVar(VarId),

    #[error("unknown clock id {0}")]
    UnknownClock(ClockId),

    #[error("location {loc} does not belong to process {pid}")]
    ForeignLocation { pid: ProcessId, loc: LocId },

    #[error("integer variable '{name}' has empty domain [{lo}, {hi}]")]
    EmptyDomain { name: String, lo: i64, hi: i64 },

    #[error("initial value {value} of '{name}' outside domain [{lo}, {hi}]")]
    InitialOutOfDomain {
        name: String,
        value: i64,
        lo: i64,
        hi: i64,
    },

    #[error("unknown label id {0}")]
    UnknownLabel(LabelId),

    #[error("at most 64 labels are supported")]
    TooManyLabels,

    #[error("synchronization vector has no slots")]
    EmptySync,

    #[error("process {0} appears twice in a synchronization vector")]
    DuplicateSyncProcess(ProcessId),
}

/// A timed process: a named automaton over a slice of the location table.
#[derive(Debug, Clone)]
pub struct Process {
    pub name: String,
    pub locations: Vec<LocId>,
}

/// Front-end attributes of a location, consumed by
/// [`SystemBuilder::add_location`].
#[derive(Debug, Clone, Default)]
pub struct LocationDecl {
    pub initial: bool,
    /// Urgent or committed locations both forbid delay.
    pub urgent: bool,
    pub committed: bool,
    pub invariant: Vec<Atom>,
    pub labels: Vec<LabelId>,
}

/// A location of one process.
#[derive(Debug, Clone)]
pub struct Location {
    pub id: LocId,
    pub pid: ProcessId,
    pub name: String,
    pub initial: bool,
    pub urgent: bool,
    pub committed: bool,
    pub invariant: Vec<Atom>,
    pub labels: LabelSet,
    /// Outgoing edges, in insertion order.
    pub edges: Vec<EdgeId>,
}

impl Location {
    /// True iff time may elapse in this location.
    #[inline]
    pub fn delay_allowed(&self) -> bool {
        !self.urgent && !self.committed
    }
}

/// An edge of one process.
#[derive(Debug, Clone)]
pub struct Edge {
    pub id: EdgeId,
    pub pid: ProcessId,
    pub src: LocId,
    pub tgt: LocId,
    pub event: EventId,
    pub guard: Vec<Atom>,
    pub statement: Vec<Atom>,
}

/// A bounded integer variable declaration.
#[derive(Debug, Clone)]
pub struct IntVar {
    pub name: String,
    pub lo: i64,
    pub hi: i64,
    pub initial: i64,
}

impl IntVar {
    #[inline]
    pub fn contains(&self, value: i64) -> bool {
        self.lo <= value && value <= self.hi
    }
}

/// One slot of a synchronization vector.
#[derive(Debug, Clone, Copy)]
pub struct SyncSlot {
    pub pid: ProcessId,
    pub event: EventId,
    /// Weak slots may stay empty when the process has no enabled edge.
    pub weak: bool,
}

/// A synchronization vector: the processes that must (or, when weak, may)
/// jointly fire edges with the given events.
#[derive(Debug, Clone)]
pub struct SyncVector {
    pub slots: Vec<SyncSlot>,
}

/// An immutable network of synchronized timed processes.
#[derive(Debug)]
pub struct System {
    name: String,
    processes: Vec<Process>,
    locations: Vec<Location>,
    edges: Vec<Edge>,
    events: Vec<String>,
    clocks: Vec<String>,
    intvars: Vec<IntVar>,
    syncs: Vec<SyncVector>,
    labels: Vec<String>,
    /// `synchronized[pid * events + event]`: the pair occurs in some
    /// synchronization vector, so its edges never fire asynchronously.
    synchronized: Vec<bool>,
    initial_locations: Vec<Vec<LocId>>,
    clock_bounds: ClockBounds,
}

impl System {
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    /// Number of clocks including the reference clock; the DBM dimension.
    #[inline]
    pub fn clock_count(&self) -> usize {
        self.clocks.len()
    }

    #[inline]
    pub fn intvar_count(&self) -> usize {
        self.intvars.len()
    }

    pub fn process(&self, pid: ProcessId) -> &Process {
        &self.processes[pid]
    }

    pub fn location(&self, loc: LocId) -> &Location {
        &self.locations[loc]
    }

    pub fn location_count(&self) -> usize {
        self.locations.len()
    }

    pub fn edge(&self, edge: EdgeId) -> &Edge {
        &self.edges[edge]
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn event_name(&self, event: EventId) -> &str {
        &self.events[event]
    }

    pub fn clock_name(&self, clock: ClockId) -> &str {
        &self.clocks[clock]
    }

    pub fn clock_names(&self) -> Vec<&str> {
        self.clocks.iter().map(|s| s.as_str()).collect()
    }

    pub fn intvar(&self, var: VarId) -> &IntVar {
        &self.intvars[var]
    }

    pub fn label_name(&self, label: LabelId) -> &str {
        &self.labels[label]
    }

    /// Resolve a label name; used by callers that configure the accepting
    /// predicate from user input.
    pub fn label_id(&self, name: &str) -> Option<LabelId> {
        self.labels.iter().position(|l| l == name)
    }

    pub fn sync_vectors(&self) -> &[SyncVector] {
        &self.syncs
    }

    /// Initial locations of a process, in declaration order.
    pub fn initial_locations(&self, pid: ProcessId) -> &[LocId] {
        &self.initial_locations[pid]
    }

    /// True iff `(pid, event)` occurs in some synchronization vector.
    #[inline]
    pub fn is_synchronized(&self, pid: ProcessId, event: EventId) -> bool {
        self.synchronized[pid * self.events.len() + event]
    }

    /// The initial valuation of the bounded integer variables.
    pub fn initial_intval_values(&self) -> Vec<i64> {
        self.intvars.iter().map(|v| v.initial).collect()
    }

    pub fn clock_bounds(&self) -> &ClockBounds {
        &self.clock_bounds
    }
}

/// Builder assembling a [`System`] with dense identifier assignment, the
/// way the front-end hands it over.
pub struct SystemBuilder {
    name: String,
    processes: Vec<Process>,
    locations: Vec<Location>,
    edges: Vec<Edge>,
    events: Vec<String>,
    clocks: Vec<String>,
    intvars: Vec<IntVar>,
    syncs: Vec<SyncVector>,
    labels: Vec<String>,
    clock_bounds: Option<ClockBounds>,
}

impl SystemBuilder {
    pub fn new(name: impl Into<String>) -> SystemBuilder {
        SystemBuilder {
            name: name.into(),
            processes: Vec::new(),
            locations: Vec::new(),
            edges: Vec::new(),
            events: Vec::new(),
            // Clock 0 is the reference clock.
            clocks: vec!["0".to_string()],
            intvars: Vec::new(),
            syncs: Vec::new(),
            labels: Vec::new(),
            clock_bounds: None,
        }
    }

    pub fn add_process(&mut self, name: impl Into<String>) -> ProcessId {
        self.processes.push(Process {
            name: name.into(),
            locations: Vec::new(),
        });
        self.processes.len() - 1
    }

    pub fn add_clock(&mut self, name: impl Into<String>) -> ClockId {
        self.clocks.push(name.into());
        self.clocks.len() - 1
    }

    pub fn add_event(&mut self, name: impl Into<String>) -> EventId {
        self.events.push(name.into());
        self.events.len() - 1
    }

    pub fn add_label(&mut self, name: impl Into<String>) -> Result<LabelId, BuildError> {
        if self.labels.len() >= 64 {
            return Err(BuildError::TooManyLabels);
        }
        self.labels.push(name.into());
        Ok(self.labels.len() - 1)
    }

    pub fn add_intvar(
        &mut self,
        name: impl Into<String>,
        lo: i64,
        hi: i64,
        initial: i64,
    ) -> Result<VarId, BuildError> {
        let name = name.into();
        if lo > hi {
            return Err(BuildError::EmptyDomain { name, lo, hi });
        }
        if initial < lo || initial > hi {
            return Err(BuildError::InitialOutOfDomain {
                name,
                value: initial,
                lo,
                hi,
            });
        }
        self.intvars.push(IntVar {
            name,
            lo,
            hi,
            initial,
        });
        Ok(self.intvars.len() - 1)
    }

    pub fn add_location(
        &mut self,
        pid: ProcessId,
        name: impl Into<String>,
        decl: LocationDecl,
    ) -> Result<LocId, BuildError> {
        if pid >= self.processes.len() {
            return Err(BuildError::UnknownProcess(pid));
        }
        let mut labels = LabelSet::EMPTY;
        for label in &decl.labels {
            if *label >= self.labels.len() {
                return Err(BuildError::UnknownLabel(*label));
            }
            labels.insert(*label);
        }
        let id = self.locations.len();
        self.locations.push(Location {
            id,
            pid,
            name: name.into(),
            initial: decl.initial,
            urgent: decl.urgent,
            committed: decl.committed,
            invariant: decl.invariant,
            labels,
            edges: Vec::new(),
        });
        self.processes[pid].locations.push(id);
        Ok(id)
    }

    pub fn add_edge(
        &mut self,
        pid: ProcessId,
        src: LocId,
        tgt: LocId,
        event: EventId,
        guard: Vec<Atom>,
        statement: Vec<Atom>,
    ) -> Result<EdgeId, BuildError> {
        if pid >= self.processes.len() {
            return Err(BuildError::UnknownProcess(pid));
        }
        if event >= self.events.len() {
            return Err(BuildError::UnknownEvent(event));
        }
        for loc in [src, tgt] {
            match self.locations.get(loc) {
                None => return Err(BuildError::UnknownLocation(loc)),
                Some(l) if l.pid != pid => return Err(BuildError::ForeignLocation { pid, loc }),
                Some(_) => {}
            }
        }
        let id = self.edges.len();
        self.edges.push(Edge {
            id,
            pid,
            src,
            tgt,
            event,
            guard,
            statement,
        });
        self.locations[src].edges.push(id);
        Ok(id)
    }

    pub fn add_sync(&mut self, slots: Vec<(ProcessId, EventId, bool)>) -> Result<(), BuildError> {
        if slots.is_empty() {
            return Err(BuildError::EmptySync);
        }
        let mut seen = vec![false; self.processes.len()];
        let mut vec_slots = Vec::with_capacity(slots.len());
        for (pid, event, weak) in slots {
            if pid >= self.processes.len() {
                return Err(BuildError::UnknownProcess(pid));
            }
            if event >= self.events.len() {
                return Err(BuildError::UnknownEvent(event));
            }
            if seen[pid] {
                return Err(BuildError::DuplicateSyncProcess(pid));
            }
            seen[pid] = true;
            vec_slots.push(SyncSlot { pid, event, weak });
        }
        self.syncs.push(SyncVector { slots: vec_slots });
        Ok(())
    }

    /// Attach the clock-bound maps produced by static analysis. When never
    /// called, the system carries all-`NO_BOUND` maps.
    pub fn set_clock_bounds(&mut self, bounds: ClockBounds) {
        self.clock_bounds = Some(bounds);
    }

    fn check_int_expr(&self, e: &IntExpr) -> Result<(), BuildError> {
        match e.max_var() {
            Some(v) if v >= self.intvars.len() => Err(BuildError::UnknownVar(v)),
            _ => Ok(()),
        }
    }

    fn check_bool_expr(&self, e: &BoolExpr) -> Result<(), BuildError> {
        match e.max_var() {
            Some(v) if v >= self.intvars.len() => Err(BuildError::UnknownVar(v)),
            _ => Ok(()),
        }
    }

    fn check_clock(&self, clock: ClockId) -> Result<(), BuildError> {
        if clock >= self.clocks.len() {
            Err(BuildError::UnknownClock(clock))
        } else {
            Ok(())
        }
    }

    fn check_atoms(&self, atoms: &[Atom]) -> Result<(), BuildError> {
        for atom in atoms {
            match atom {
                Atom::Guard(b) => self.check_bool_expr(b)?,
                Atom::ClockGuard(ClockConstraintExpr {
                    left,
                    right,
                    bound,
                    ..
                }) => {
                    self.check_clock(*left)?;
                    self.check_clock(*right)?;
                    self.check_int_expr(bound)?;
                }
                Atom::Assign { var, value } => {
                    if *var >= self.intvars.len() {
                        return Err(BuildError::UnknownVar(*var));
                    }
                    self.check_int_expr(value)?;
                }
                Atom::ClockReset { clock, value } => {
                    self.check_clock(*clock)?;
                    self.check_int_expr(value)?;
                }
                Atom::If { cond, then, orelse } => {
                    self.check_bool_expr(cond)?;
                    self.check_atoms(then)?;
                    self.check_atoms(orelse)?;
                }
            }
        }
        Ok(())
    }

    pub fn build(self) -> Result<System, BuildError> {
        for loc in &self.locations {
            self.check_atoms(&loc.invariant)?;
        }
        for edge in &self.edges {
            self.check_atoms(&edge.guard)?;
            self.check_atoms(&edge.statement)?;
        }

        let mut synchronized = vec![false; self.processes.len() * self.events.len()];
        for sync in &self.syncs {
            for slot in &sync.slots {
                synchronized[slot.pid * self.events.len() + slot.event] = true;
            }
        }

        let initial_locations = self
            .processes
            .iter()
            .map(|p| {
                p.locations
                    .iter()
                    .copied()
                    .filter(|&l| self.locations[l].initial)
                    .collect()
            })
            .collect();

        let clock_bounds = self
            .clock_bounds
            .unwrap_or_else(|| ClockBounds::new(self.locations.len(), self.clocks.len()));

        Ok(System {
            name: self.name,
            processes: self.processes,
            locations: self.locations,
            edges: self.edges,
            events: self.events,
            clocks: self.clocks,
            intvars: self.intvars,
            syncs: self.syncs,
            labels: self.labels,
            synchronized,
            initial_locations,
            clock_bounds,
        })
    }
}
