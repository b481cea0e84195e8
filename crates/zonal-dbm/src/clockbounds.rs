//! Clock-bound maps driving extrapolation: global/local, LU/M variants.

use crate::{ClockId, LocId};
use std::fmt;

/// Absence of a bound. Strictly smaller than every integer, so it is the
/// identity of pointwise maximum.
pub const NO_BOUND: i64 = i64::MIN;

/// A per-clock bound map `Clock → ℤ ∪ {NO_BOUND}`. Entry 0 belongs to the
/// reference clock and is never consulted. Mutation is monotone: bounds
/// only grow.
#[derive(Clone, PartialEq, Eq)]
pub struct BoundMap {
    bounds: Box<[i64]>,
}

impl BoundMap {
    pub fn new(clock_count: usize) -> BoundMap {
        BoundMap {
            bounds: vec![NO_BOUND; clock_count].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    #[inline]
    pub fn bound(&self, clock: ClockId) -> i64 {
        self.bounds[clock]
    }

    /// Monotone update; returns true when the stored bound grew.
    pub fn update(&mut self, clock: ClockId, bound: i64) -> bool {
        if bound <= self.bounds[clock] {
            return false;
        }
        self.bounds[clock] = bound;
        true
    }

    /// Pointwise maximum with another map; returns true on any growth.
    pub fn max_with(&mut self, other: &BoundMap) -> bool {
        debug_assert_eq!(self.len(), other.len());
        let mut modified = false;
        for clock in 0..self.bounds.len() {
            if self.update(clock, other.bounds[clock]) {
                modified = true;
            }
        }
        modified
    }

    /// Reset every entry to `NO_BOUND`.
    pub fn clear(&mut self) {
        self.bounds.fill(NO_BOUND);
    }
}

impl fmt::Debug for BoundMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoundMap[{}]", self)
    }
}

impl fmt::Display for BoundMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.bounds.iter().enumerate() {
            if i != 0 {
                write!(f, ",")?;
            }
            if *b == NO_BOUND {
                write!(f, ".")?;
            } else {
                write!(f, "{}", b)?;
            }
        }
        Ok(())
    }
}

/// Scope of a clock-bound query.
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    Global,
    Loc(LocId),
    VLoc(&'a [LocId]),
}

/// Global L and U maps, location-insensitive.
#[derive(Debug, Clone)]
pub struct GlobalLuMap {
    l: BoundMap,
    u: BoundMap,
}

impl GlobalLuMap {
    pub fn new(clock_count: usize) -> GlobalLuMap {
        GlobalLuMap {
            l: BoundMap::new(clock_count),
            u: BoundMap::new(clock_count),
        }
    }

    pub fn l(&self) -> &BoundMap {
        &self.l
    }

    pub fn u(&self) -> &BoundMap {
        &self.u
    }

    pub fn update_l(&mut self, clock: ClockId, bound: i64) -> bool {
        self.l.update(clock, bound)
    }

    pub fn update_u(&mut self, clock: ClockId, bound: i64) -> bool {
        self.u.update(clock, bound)
    }

    /// Write the bounds into `l`/`u`, ignoring the scope.
    pub fn bounds_into(&self, l: &mut BoundMap, u: &mut BoundMap) {
        l.clear();
        u.clear();
        l.max_with(&self.l);
        u.max_with(&self.u);
    }
}

/// Global M map, location-insensitive.
#[derive(Debug, Clone)]
pub struct GlobalMMap {
    m: BoundMap,
}

impl GlobalMMap {
    pub fn new(clock_count: usize) -> GlobalMMap {
        GlobalMMap {
            m: BoundMap::new(clock_count),
        }
    }

    pub fn m(&self) -> &BoundMap {
        &self.m
    }

    pub fn update(&mut self, clock: ClockId, bound: i64) -> bool {
        self.m.update(clock, bound)
    }

    pub fn bounds_into(&self, m: &mut BoundMap) {
        m.clear();
        m.max_with(&self.m);
    }
}

/// Per-location L and U maps. The vloc query is the pointwise maximum over
/// component locations; `NO_BOUND` behaves as −∞ under max.
#[derive(Debug, Clone)]
pub struct LocalLuMap {
    l: Vec<BoundMap>,
    u: Vec<BoundMap>,
    clock_count: usize,
}

impl LocalLuMap {
    pub fn new(loc_count: usize, clock_count: usize) -> LocalLuMap {
        LocalLuMap {
            l: vec![BoundMap::new(clock_count); loc_count],
            u: vec![BoundMap::new(clock_count); loc_count],
            clock_count,
        }
    }

    pub fn loc_count(&self) -> usize {
        self.l.len()
    }

    pub fn clock_count(&self) -> usize {
        self.clock_count
    }

    pub fn l(&self, loc: LocId) -> &BoundMap {
        &self.l[loc]
    }

    pub fn u(&self, loc: LocId) -> &BoundMap {
        &self.u[loc]
    }

    pub fn update_l(&mut self, loc: LocId, clock: ClockId, bound: i64) -> bool {
        self.l[loc].update(clock, bound)
    }

    pub fn update_u(&mut self, loc: LocId, clock: ClockId, bound: i64) -> bool {
        self.u[loc].update(clock, bound)
    }

    /// Bounds of a single location.
    pub fn bounds_of_loc_into(&self, loc: LocId, l: &mut BoundMap, u: &mut BoundMap) {
        l.clear();
        u.clear();
        l.max_with(&self.l[loc]);
        u.max_with(&self.u[loc]);
    }

    /// Bounds of a tuple of locations: pointwise maximum of the components.
    pub fn bounds_of_vloc_into(&self, vloc: &[LocId], l: &mut BoundMap, u: &mut BoundMap) {
        l.clear();
        u.clear();
        for &loc in vloc {
            l.max_with(&self.l[loc]);
            u.max_with(&self.u[loc]);
        }
    }
}

/// Per-location M maps.
#[derive(Debug, Clone)]
pub struct LocalMMap {
    m: Vec<BoundMap>,
    clock_count: usize,
}

impl LocalMMap {
    pub fn new(loc_count: usize, clock_count: usize) -> LocalMMap {
        LocalMMap {
            m: vec![BoundMap::new(clock_count); loc_count],
            clock_count,
        }
    }

    pub fn loc_count(&self) -> usize {
        self.m.len()
    }

    pub fn clock_count(&self) -> usize {
        self.clock_count
    }

    pub fn m(&self, loc: LocId) -> &BoundMap {
        &self.m[loc]
    }

    pub fn update(&mut self, loc: LocId, clock: ClockId, bound: i64) -> bool {
        self.m[loc].update(clock, bound)
    }

    pub fn bounds_of_loc_into(&self, loc: LocId, m: &mut BoundMap) {
        m.clear();
        m.max_with(&self.m[loc]);
    }

    pub fn bounds_of_vloc_into(&self, vloc: &[LocId], m: &mut BoundMap) {
        m.clear();
        for &loc in vloc {
            m.max_with(&self.m[loc]);
        }
    }
}

/// All four clock-bound maps of a system, filled by the front-end's static
/// analysis and immutable during exploration.
#[derive(Debug, Clone)]
pub struct ClockBounds {
    global_lu: GlobalLuMap,
    global_m: GlobalMMap,
    local_lu: LocalLuMap,
    local_m: LocalMMap,
}

impl ClockBounds {
    pub fn new(loc_count: usize, clock_count: usize) -> ClockBounds {
        ClockBounds {
            global_lu: GlobalLuMap::new(clock_count),
            global_m: GlobalMMap::new(clock_count),
            local_lu: LocalLuMap::new(loc_count, clock_count),
            local_m: LocalMMap::new(loc_count, clock_count),
        }
    }

    pub fn clock_count(&self) -> usize {
        self.local_lu.clock_count()
    }

    pub fn loc_count(&self) -> usize {
        self.local_lu.loc_count()
    }

    pub fn global_lu(&self) -> &GlobalLuMap {
        &self.global_lu
    }

    pub fn global_lu_mut(&mut self) -> &mut GlobalLuMap {
        &mut self.global_lu
    }

    pub fn global_m(&self) -> &GlobalMMap {
        &self.global_m
    }

    pub fn global_m_mut(&mut self) -> &mut GlobalMMap {
        &mut self.global_m
    }

    pub fn local_lu(&self) -> &LocalLuMap {
        &self.local_lu
    }

    pub fn local_lu_mut(&mut self) -> &mut LocalLuMap {
        &mut self.local_lu
    }

    pub fn local_m(&self) -> &LocalMMap {
        &self.local_m
    }

    pub fn local_m_mut(&mut self) -> &mut LocalMMap {
        &mut self.local_m
    }

    /// L and U bounds for a scope, from the LU family.
    pub fn lu_into(&self, scope: Scope<'_>, l: &mut BoundMap, u: &mut BoundMap) {
        match scope {
            Scope::Global => self.global_lu.bounds_into(l, u),
            Scope::Loc(loc) => self.local_lu.bounds_of_loc_into(loc, l, u),
            Scope::VLoc(vloc) => self.local_lu.bounds_of_vloc_into(vloc, l, u),
        }
    }

    /// M bounds for a scope, from the M family.
    pub fn m_into(&self, scope: Scope<'_>, m: &mut BoundMap) {
        match scope {
            Scope::Global => self.global_m.bounds_into(m),
            Scope::Loc(loc) => self.local_m.bounds_of_loc_into(loc, m),
            Scope::VLoc(vloc) => self.local_m.bounds_of_vloc_into(vloc, m),
        }
    }
}

impl fmt::Display for ClockBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "global: L={} U={}", self.global_lu.l(), self.global_lu.u())?;
        writeln!(f, "global: M={}", self.global_m.m())?;
        for loc in 0..self.local_lu.loc_count() {
            writeln!(
                f,
                "{}: L={} U={} M={}",
                loc,
                self.local_lu.l(loc),
                self.local_lu.u(loc),
                self.local_m.m(loc)
            )?;
        }
        Ok(())
    }
}
