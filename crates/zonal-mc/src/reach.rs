//! The reachability algorithm: generic forward exploration of a symbolic
//! transition system under a waiting-list policy.

use crate::graph::{NodeId, ReachabilityGraph, StateOrder};
use crate::stats::Stats;
use crate::waiting::{waiting_factory, Policy, Waiting};
use tracing::{debug, info};
use zonal_model::LabelSet;
use zonal_zg::{ModelError, StateStatus, Sts};

/// Build the reachability graph of `ts` from its initial states, stopping
/// at the first node whose labels cover `labels`. With empty labels the
/// full reachable graph (up to the graph's inclusion) is built.
pub fn run<TS, O>(
    ts: &TS,
    graph: &mut ReachabilityGraph<TS::State, TS::Transition, O>,
    labels: LabelSet,
    policy: Policy,
) -> Result<Stats, ModelError>
where
    TS: Sts,
    O: StateOrder<TS::State>,
{
    let mut waiting = waiting_factory::<NodeId>(policy);
    let mut stats = Stats::new();
    stats.set_start_time();
    info!(?policy, "reachability run started");

    seed(ts, graph, waiting.as_mut())?;
    run_from_waiting(ts, graph, labels, waiting.as_mut(), &mut stats)?;

    stats.set_end_time();
    info!(
        reachable = stats.reachable(),
        visited_states = stats.visited_states(),
        visited_transitions = stats.visited_transitions(),
        "reachability run finished"
    );
    Ok(stats)
}

/// Like [`run`], but explores from a caller-seeded waiting container
/// instead of the initial states.
pub fn run_with_waiting<TS, O>(
    ts: &TS,
    graph: &mut ReachabilityGraph<TS::State, TS::Transition, O>,
    labels: LabelSet,
    waiting: &mut dyn Waiting<NodeId>,
) -> Result<Stats, ModelError>
where
    TS: Sts,
    O: StateOrder<TS::State>,
{
    let mut stats = Stats::new();
    stats.set_start_time();
    run_from_waiting(ts, graph, labels, waiting, &mut stats)?;
    stats.set_end_time();
    Ok(stats)
}

/// Intern the initial states, flag them, and queue the fresh ones.
///
/// The `initial` flag is set on the returned node even when interning
/// handed back an existing (possibly subsuming) node: the node does stand
/// for an initial state of the semantics.
fn seed<TS, O>(
    ts: &TS,
    graph: &mut ReachabilityGraph<TS::State, TS::Transition, O>,
    waiting: &mut dyn Waiting<NodeId>,
) -> Result<(), ModelError>
where
    TS: Sts,
    O: StateOrder<TS::State>,
{
    for (status, state, _) in ts.initial()? {
        debug_assert_eq!(status, StateStatus::Ok);
        let (is_new, node) = graph.add_node(state);
        graph.set_initial(node);
        if is_new {
            waiting.insert(node);
        }
    }
    Ok(())
}

fn run_from_waiting<TS, O>(
    ts: &TS,
    graph: &mut ReachabilityGraph<TS::State, TS::Transition, O>,
    labels: LabelSet,
    waiting: &mut dyn Waiting<NodeId>,
    stats: &mut Stats,
) -> Result<(), ModelError>
where
    TS: Sts,
    O: StateOrder<TS::State>,
{
    while let Some(node) = waiting.pop() {
        stats.incr_visited_states();

        if accepting(ts, graph.state(node), labels) {
            graph.set_final(node);
            stats.set_reachable(true);
            debug!(node, "accepting node reached");
            break;
        }

        let successors = ts.next(graph.state(node))?;
        for (status, state, transition) in successors {
            if status != StateStatus::Ok {
                continue;
            }
            let (is_new, next) = graph.add_node(state);
            if is_new {
                waiting.insert(next);
            }
            graph.add_edge(node, next, transition);
            stats.incr_visited_transitions();
        }
    }
    waiting.clear();
    Ok(())
}

/// A state is accepting iff `labels` is non-empty, is covered by the
/// state's labels, and the state is a valid final state of the system.
fn accepting<TS: Sts>(ts: &TS, state: &TS::State, labels: LabelSet) -> bool {
    !labels.is_empty() && labels.is_subset_of(ts.labels(state)) && ts.is_valid_final(state)
}
