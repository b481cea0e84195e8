//! Synchronized product: joint initial location choices and outgoing vedge
//! candidates of a location tuple.

use smallvec::SmallVec;
use zonal_model::{EdgeId, EventId, ProcessId, System, VEdge, VLoc};
use zonal_dbm::LocId;

/// Iterator over the joint initial location choices: the cartesian product
/// of per-process initial locations, enumerated in process-id order.
pub struct InitialVlocs<'a> {
    system: &'a System,
    indices: Vec<usize>,
    done: bool,
}

/// Enumerate the initial location tuples of a system.
pub fn initial_vlocs(system: &System) -> InitialVlocs<'_> {
    let count = system.process_count();
    let done = count == 0
        || (0..count).any(|pid| system.initial_locations(pid).is_empty());
    InitialVlocs {
        system,
        indices: vec![0; count],
        done,
    }
}

impl Iterator for InitialVlocs<'_> {
    type Item = VLoc;

    fn next(&mut self) -> Option<VLoc> {
        if self.done {
            return None;
        }
        let locs: Vec<LocId> = self
            .indices
            .iter()
            .enumerate()
            .map(|(pid, &i)| self.system.initial_locations(pid)[i])
            .collect();
        // Odometer step, last process fastest.
        let mut pid = self.indices.len();
        loop {
            if pid == 0 {
                self.done = true;
                break;
            }
            pid -= 1;
            self.indices[pid] += 1;
            if self.indices[pid] < self.system.initial_locations(pid).len() {
                break;
            }
            self.indices[pid] = 0;
        }
        Some(VLoc::new(locs))
    }
}

type Candidates = SmallVec<[EdgeId; 2]>;

fn candidates(system: &System, loc: LocId, event: EventId) -> Candidates {
    system
        .location(loc)
        .edges
        .iter()
        .copied()
        .filter(|&e| system.edge(e).event == event)
        .collect()
}

/// All vedge candidates leaving `vloc`: asynchronous edges first (by
/// process, then local edge order), then one vedge per combination drawn
/// from each synchronization vector, in declaration order.
///
/// A mandatory slot with no matching enabled edge kills its vector; a weak
/// slot with no matching edge is left absent; a weak slot with matching
/// edges participates. No process ever appears twice in a vedge, and the
/// emission order is stable for a fixed system.
pub fn outgoing_vedges(system: &System, vloc: &VLoc) -> Vec<VEdge> {
    let process_count = system.process_count();
    let mut out = Vec::new();

    for pid in 0..process_count {
        for &eid in &system.location(vloc.loc(pid)).edges {
            if !system.is_synchronized(pid, system.edge(eid).event) {
                let mut slots = vec![None; process_count];
                slots[pid] = Some(eid);
                out.push(VEdge::new(slots));
            }
        }
    }

    'vectors: for sync in system.sync_vectors() {
        let mut slot_cands: Vec<(ProcessId, Candidates)> = Vec::with_capacity(sync.slots.len());
        for slot in &sync.slots {
            let cands = candidates(system, vloc.loc(slot.pid), slot.event);
            if cands.is_empty() {
                if slot.weak {
                    continue;
                }
                continue 'vectors;
            }
            slot_cands.push((slot.pid, cands));
        }
        if slot_cands.is_empty() {
            continue;
        }
        let mut indices = vec![0usize; slot_cands.len()];
        loop {
            let mut slots = vec![None; process_count];
            for (k, (pid, cands)) in slot_cands.iter().enumerate() {
                slots[*pid] = Some(cands[indices[k]]);
            }
            out.push(VEdge::new(slots));
            let mut k = slot_cands.len();
            loop {
                if k == 0 {
                    continue 'vectors;
                }
                k -= 1;
                indices[k] += 1;
                if indices[k] < slot_cands[k].1.len() {
                    break;
                }
                indices[k] = 0;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use zonal_model::{LocationDecl, SystemBuilder};

    fn initial_decl() -> LocationDecl {
        LocationDecl {
            initial: true,
            ..LocationDecl::default()
        }
    }

    #[test]
    fn test_initial_vlocs_cartesian_order() {
        let mut b = SystemBuilder::new("init");
        let p0 = b.add_process("P0");
        let p1 = b.add_process("P1");
        let a0 = b.add_location(p0, "a0", initial_decl()).unwrap();
        let a1 = b.add_location(p0, "a1", initial_decl()).unwrap();
        let b0 = b.add_location(p1, "b0", initial_decl()).unwrap();
        let b1 = b.add_location(p1, "b1", initial_decl()).unwrap();
        let s = b.build().unwrap();

        let vlocs: Vec<VLoc> = initial_vlocs(&s).collect();
        assert_eq!(
            vlocs,
            vec![
                VLoc::new(vec![a0, b0]),
                VLoc::new(vec![a0, b1]),
                VLoc::new(vec![a1, b0]),
                VLoc::new(vec![a1, b1]),
            ]
        );
    }

    #[test]
    fn test_no_initial_location_means_no_vloc() {
        let mut b = SystemBuilder::new("empty");
        let p0 = b.add_process("P0");
        b.add_location(p0, "l0", LocationDecl::default()).unwrap();
        let s = b.build().unwrap();
        assert_eq!(initial_vlocs(&s).count(), 0);
    }

    #[test]
    fn test_async_edges_enumerated_per_process() {
        let mut b = SystemBuilder::new("async");
        let p0 = b.add_process("P0");
        let p1 = b.add_process("P1");
        let tau = b.add_event("tau");
        let l0 = b.add_location(p0, "l0", initial_decl()).unwrap();
        let m0 = b.add_location(p1, "m0", initial_decl()).unwrap();
        let e0 = b.add_edge(p0, l0, l0, tau, vec![], vec![]).unwrap();
        let e1 = b.add_edge(p1, m0, m0, tau, vec![], vec![]).unwrap();
        let s = b.build().unwrap();

        let vedges = outgoing_vedges(&s, &VLoc::new(vec![l0, m0]));
        assert_eq!(
            vedges,
            vec![
                VEdge::new(vec![Some(e0), None]),
                VEdge::new(vec![None, Some(e1)]),
            ]
        );
    }

    #[test]
    fn test_sync_vector_cartesian_product() {
        let mut b = SystemBuilder::new("sync");
        let p0 = b.add_process("P0");
        let p1 = b.add_process("P1");
        let a = b.add_event("a");
        let l0 = b.add_location(p0, "l0", initial_decl()).unwrap();
        let l1 = b.add_location(p0, "l1", LocationDecl::default()).unwrap();
        let m0 = b.add_location(p1, "m0", initial_decl()).unwrap();
        let m1 = b.add_location(p1, "m1", LocationDecl::default()).unwrap();
        let e0 = b.add_edge(p0, l0, l1, a, vec![], vec![]).unwrap();
        let e1 = b.add_edge(p0, l0, l0, a, vec![], vec![]).unwrap();
        let e2 = b.add_edge(p1, m0, m1, a, vec![], vec![]).unwrap();
        b.add_sync(vec![(p0, a, false), (p1, a, false)]).unwrap();
        let s = b.build().unwrap();

        let vedges = outgoing_vedges(&s, &VLoc::new(vec![l0, m0]));
        // No asynchronous candidates: (p0, a) and (p1, a) are synchronized.
        assert_eq!(
            vedges,
            vec![
                VEdge::new(vec![Some(e0), Some(e2)]),
                VEdge::new(vec![Some(e1), Some(e2)]),
            ]
        );
    }

    #[test]
    fn test_mandatory_slot_without_edge_kills_vector() {
        let mut b = SystemBuilder::new("dead");
        let p0 = b.add_process("P0");
        let p1 = b.add_process("P1");
        let a = b.add_event("a");
        let l0 = b.add_location(p0, "l0", initial_decl()).unwrap();
        let m0 = b.add_location(p1, "m0", initial_decl()).unwrap();
        b.add_edge(p0, l0, l0, a, vec![], vec![]).unwrap();
        // p1 has no a-edge.
        b.add_sync(vec![(p0, a, false), (p1, a, false)]).unwrap();
        let s = b.build().unwrap();

        assert!(outgoing_vedges(&s, &VLoc::new(vec![l0, m0])).is_empty());
    }

    #[test]
    fn test_weak_slot_left_absent() {
        let mut b = SystemBuilder::new("weak");
        let p0 = b.add_process("P0");
        let p1 = b.add_process("P1");
        let a = b.add_event("a");
        let l0 = b.add_location(p0, "l0", initial_decl()).unwrap();
        let m0 = b.add_location(p1, "m0", initial_decl()).unwrap();
        let e0 = b.add_edge(p0, l0, l0, a, vec![], vec![]).unwrap();
        b.add_sync(vec![(p0, a, false), (p1, a, true)]).unwrap();
        let s = b.build().unwrap();

        let vedges = outgoing_vedges(&s, &VLoc::new(vec![l0, m0]));
        assert_eq!(vedges, vec![VEdge::new(vec![Some(e0), None])]);
    }

    #[test]
    fn test_emission_order_is_stable() {
        let mut b = SystemBuilder::new("stable");
        let p0 = b.add_process("P0");
        let tau = b.add_event("tau");
        let l0 = b.add_location(p0, "l0", initial_decl()).unwrap();
        b.add_edge(p0, l0, l0, tau, vec![], vec![]).unwrap();
        b.add_edge(p0, l0, l0, tau, vec![], vec![]).unwrap();
        let s = b.build().unwrap();
        let vloc = VLoc::new(vec![l0]);
        assert_eq!(outgoing_vedges(&s, &vloc), outgoing_vedges(&s, &vloc));
    }
}
