//! Canonical difference bound matrices over a set of clocks.

use crate::bound::Bound;
use crate::clockbounds::{BoundMap, NO_BOUND};
use crate::ClockId;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Outcome of an operation that can make a zone infeasible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneStatus {
    NonEmpty,
    Empty,
}

/// A concrete clock constraint `xᵢ − xⱼ ≼ bound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockConstraint {
    pub i: ClockId,
    pub j: ClockId,
    pub bound: Bound,
}

/// A concrete clock reset `x := value`, `value ≥ 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockReset {
    pub clock: ClockId,
    pub value: i64,
}

/// A difference bound matrix of dimension `dim`, row-major. Entry `(i, j)`
/// bounds `xᵢ − xⱼ`; clock 0 is the reference clock.
///
/// Every public operation preserves canonicity: for all `i, j, k`,
/// `m[i][j] ≤ m[i][k] + m[k][j]` and `m[i][i] = (0, ≤)`. Emptiness is
/// recorded by a negative diagonal entry and reported as a value, never as
/// a panic.
#[derive(Clone, PartialEq, Eq)]
pub struct Dbm {
    dim: usize,
    m: Box<[Bound]>,
}

impl Dbm {
    /// The zone where every clock may take any non-negative value.
    pub fn universal(dim: usize) -> Dbm {
        assert!(dim >= 1, "a DBM needs at least the reference clock");
        let mut m = vec![Bound::INFINITY; dim * dim].into_boxed_slice();
        for i in 0..dim {
            m[i * dim + i] = Bound::LE_ZERO;
        }
        for j in 0..dim {
            m[j] = Bound::LE_ZERO; // 0 − xⱼ ≤ 0
        }
        Dbm { dim, m }
    }

    /// The singleton zone where every clock equals zero.
    pub fn zero(dim: usize) -> Dbm {
        assert!(dim >= 1, "a DBM needs at least the reference clock");
        Dbm {
            dim,
            m: vec![Bound::LE_ZERO; dim * dim].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    fn idx(&self, i: ClockId, j: ClockId) -> usize {
        debug_assert!(i < self.dim && j < self.dim);
        i * self.dim + j
    }

    #[inline]
    pub fn get(&self, i: ClockId, j: ClockId) -> Bound {
        self.m[self.idx(i, j)]
    }

    #[inline]
    fn set(&mut self, i: ClockId, j: ClockId, b: Bound) {
        let idx = self.idx(i, j);
        self.m[idx] = b;
    }

    /// True iff the zone is empty (negative diagonal after closure).
    pub fn is_empty(&self) -> bool {
        (0..self.dim).any(|i| self.get(i, i) < Bound::LE_ZERO)
    }

    fn mark_empty(&mut self) {
        self.set(0, 0, Bound::LT_ZERO);
    }

    /// Add the constraint `xᵢ − xⱼ ≼ bound` and restore canonicity by an
    /// incremental tightening through `(i, j)`. Reports emptiness as a
    /// value; the matrix contents are unspecified afterwards in that case.
    pub fn constrain(&mut self, i: ClockId, j: ClockId, bound: Bound) -> ZoneStatus {
        if bound >= self.get(i, j) {
            return ZoneStatus::NonEmpty;
        }
        self.set(i, j, bound);
        for p in 0..self.dim {
            let pi = self.get(p, i);
            if pi.is_infinity() {
                continue;
            }
            let head = pi.add(bound);
            for q in 0..self.dim {
                let through = head.add(self.get(j, q));
                if through < self.get(p, q) {
                    self.set(p, q, through);
                }
            }
        }
        if self.is_empty() {
            self.mark_empty();
            ZoneStatus::Empty
        } else {
            ZoneStatus::NonEmpty
        }
    }

    /// Intersect with a conjunction of constraints.
    pub fn constrain_all(&mut self, constraints: &[ClockConstraint]) -> ZoneStatus {
        for c in constraints {
            if self.constrain(c.i, c.j, c.bound) == ZoneStatus::Empty {
                return ZoneStatus::Empty;
            }
        }
        ZoneStatus::NonEmpty
    }

    /// Reset `x := v` with `v ≥ 0`. Preserves canonicity.
    pub fn reset_to(&mut self, x: ClockId, v: i64) {
        debug_assert!(x > 0, "the reference clock cannot be reset");
        debug_assert!(v >= 0);
        let pos = Bound::le(v);
        let neg = Bound::le(-v);
        for k in 0..self.dim {
            let zero_k = self.get(0, k);
            let k_zero = self.get(k, 0);
            self.set(x, k, pos.add(zero_k));
            self.set(k, x, k_zero.add(neg));
        }
        self.set(x, x, Bound::LE_ZERO);
    }

    /// Remove all upper bounds `x − 0`: the zone after an arbitrary delay.
    /// Preserves canonicity.
    pub fn time_elapse(&mut self) {
        for i in 1..self.dim {
            self.set(i, 0, Bound::INFINITY);
        }
    }

    /// Pointwise inclusion: `self ⊆ other`.
    pub fn is_subset(&self, other: &Dbm) -> bool {
        debug_assert_eq!(self.dim, other.dim);
        self.m.iter().zip(other.m.iter()).all(|(a, b)| a <= b)
    }

    /// Full Floyd–Warshall closure. Needed after non-incremental edits;
    /// the incremental operators keep the matrix closed on their own.
    pub fn tighten(&mut self) -> ZoneStatus {
        for k in 0..self.dim {
            for i in 0..self.dim {
                let ik = self.get(i, k);
                if ik.is_infinity() {
                    continue;
                }
                for j in 0..self.dim {
                    let through = ik.add(self.get(k, j));
                    if through < self.get(i, j) {
                        self.set(i, j, through);
                    }
                }
            }
            if self.get(k, k) < Bound::LE_ZERO {
                self.mark_empty();
                return ZoneStatus::Empty;
            }
        }
        if self.is_empty() {
            self.mark_empty();
            ZoneStatus::Empty
        } else {
            ZoneStatus::NonEmpty
        }
    }

    /// LU extrapolation: entries above the lower-bound map go to `+∞`,
    /// entries below the upper-bound map are clamped to `(−U, <)`, then the
    /// matrix is re-tightened. `NO_BOUND` means the clock is never compared
    /// and its entries are abstracted away entirely. The reference row is
    /// kept non-positive so clocks stay non-negative.
    pub fn extrapolate_lu(&mut self, l: &BoundMap, u: &BoundMap) {
        debug_assert!(!self.is_empty());
        debug_assert_eq!(l.len(), self.dim);
        debug_assert_eq!(u.len(), self.dim);
        for i in 0..self.dim {
            let li = if i == 0 { 0 } else { l.bound(i) };
            for j in 0..self.dim {
                if i == j {
                    continue;
                }
                let d = self.get(i, j);
                if d.is_infinity() {
                    continue;
                }
                let uj = if j == 0 { 0 } else { u.bound(j) };
                if i != 0 && (li == NO_BOUND || d.value() > li) {
                    self.set(i, j, Bound::INFINITY);
                } else if uj == NO_BOUND {
                    if i != 0 {
                        self.set(i, j, Bound::INFINITY);
                    } else {
                        self.set(i, j, Bound::LE_ZERO);
                    }
                } else if d.value() < -uj {
                    self.set(i, j, Bound::lt(-uj));
                }
            }
        }
        for j in 1..self.dim {
            if self.get(0, j) > Bound::LE_ZERO {
                self.set(0, j, Bound::LE_ZERO);
            }
        }
        let status = self.tighten();
        debug_assert_eq!(status, ZoneStatus::NonEmpty);
    }

    /// Uniform M extrapolation: the special case `L = U = M`.
    pub fn extrapolate_m(&mut self, m: &BoundMap) {
        self.extrapolate_lu(m, m);
    }

    /// Abstract-LU inclusion: `self ⊆ aLU(other)` without materializing the
    /// closures.
    ///
    /// A valuation of `self` escapes the LU abstraction of `other` in one
    /// of three ways, each checked directly on the matrices:
    /// a tightened lower bound of `other` on some clock whose value in
    /// `self` can stay at or below `U`; a tightened upper bound of `other`
    /// at or below `L`; or a tightened difference bound of `other` whose
    /// two clocks admit, inside `self`, a value at or below `U` against one
    /// at or below `L` (resp. above `L`, for the clamped witness).
    pub fn alu_le(&self, other: &Dbm, l: &BoundMap, u: &BoundMap) -> bool {
        debug_assert_eq!(self.dim, other.dim);
        let dim = self.dim;

        // Lower-bound witness on x.
        for x in 1..dim {
            let ux = u.bound(x);
            if ux == NO_BOUND {
                continue;
            }
            if other.get(0, x) < self.get(0, x) && self.get(0, x) >= Bound::le(-ux) {
                return false;
            }
        }

        // Upper-bound witness on y.
        for y in 1..dim {
            let ly = l.bound(y);
            if ly == NO_BOUND {
                continue;
            }
            if other.get(y, 0) < self.get(y, 0) && other.get(y, 0) <= Bound::le(ly) {
                return false;
            }
        }

        // Difference witness on (y, x): an upper constraint taken from x
        // against a lower constraint taken from y.
        for y in 1..dim {
            let ly = l.bound(y);
            if ly == NO_BOUND {
                continue;
            }
            for x in 1..dim {
                if x == y {
                    continue;
                }
                let ux = u.bound(x);
                if ux == NO_BOUND {
                    continue;
                }
                let zp = other.get(y, x);
                if zp.is_infinity() {
                    continue;
                }
                // Witness valuation with v(y) ≤ L(y).
                if zp < self.get(y, x)
                    && zp < Bound::le(ly).add(self.get(0, x))
                    && self.get(0, x) >= Bound::le(-ux)
                    && self.get(0, y) >= Bound::le(-ly)
                {
                    return false;
                }
                // Witness valuation with v(y) > L(y): the lower constraint
                // degrades to (−L(y), <) and caps v(x) at L(y) − value. A
                // negative cap is infeasible for non-negative clocks.
                let cap = ux.min(ly.saturating_sub(zp.value()));
                let yx = self.get(y, x);
                if cap >= 0
                    && self.get(0, x) >= Bound::le(-cap)
                    && self.get(y, 0) > Bound::le(ly)
                    && (yx.is_infinity() || yx.value() > ly.saturating_sub(cap))
                {
                    return false;
                }
            }
        }

        true
    }

    /// True iff the origin (all clocks zero) satisfies the DBM.
    pub fn contains_zero(&self) -> bool {
        (0..self.dim).all(|j| self.get(0, j) >= Bound::LE_ZERO)
            && (1..self.dim).all(|i| self.get(i, 0) >= Bound::LE_ZERO)
    }

    /// Content hash, identical for structurally equal matrices.
    pub fn content_hash(&self) -> u64 {
        let mut h = ahash::AHasher::default();
        self.hash(&mut h);
        h.finish()
    }

    /// Lexicographic comparison on dimension, then entries in row-major
    /// order.
    pub fn lex_cmp(&self, other: &Dbm) -> Ordering {
        self.dim
            .cmp(&other.dim)
            .then_with(|| self.m.cmp(&other.m))
    }

    /// Render as a conjunction of constraints using the given clock names.
    /// `names[0]` is ignored (the reference clock never prints).
    pub fn display_with(&self, names: &[&str]) -> String {
        debug_assert_eq!(names.len(), self.dim);
        let mut parts: Vec<String> = Vec::new();
        for i in 1..self.dim {
            let lower = self.get(0, i);
            if !lower.is_infinity() && lower != Bound::LE_ZERO {
                let op = if lower.is_strict() { ">" } else { ">=" };
                parts.push(format!("{}{}{}", names[i], op, -lower.value()));
            }
            let upper = self.get(i, 0);
            if !upper.is_infinity() {
                let op = if upper.is_strict() { "<" } else { "<=" };
                parts.push(format!("{}{}{}", names[i], op, upper.value()));
            }
            for j in 1..self.dim {
                if i == j {
                    continue;
                }
                let d = self.get(i, j);
                if !d.is_infinity() {
                    let op = if d.is_strict() { "<" } else { "<=" };
                    parts.push(format!("{}-{}{}{}", names[i], names[j], op, d.value()));
                }
            }
        }
        if parts.is_empty() {
            "true".to_string()
        } else {
            parts.join(" & ")
        }
    }
}

impl Hash for Dbm {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.dim.hash(state);
        self.m.hash(state);
    }
}

impl fmt::Debug for Dbm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dbm(dim={})", self.dim)?;
        for i in 0..self.dim {
            let row: Vec<String> = (0..self.dim).map(|j| self.get(i, j).to_string()).collect();
            writeln!(f, "  [{}]", row.join(", "))?;
        }
        Ok(())
    }
}

impl fmt::Display for Dbm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = (0..self.dim).map(|i| format!("x{}", i)).collect();
        let refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
        write!(f, "{}", self.display_with(&refs))
    }
}
