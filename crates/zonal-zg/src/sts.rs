//! The capability protocol a symbolic transition system offers to the
//! reachability driver.

use crate::eval::ModelError;
use crate::ta::StateStatus;
use zonal_model::LabelSet;

/// A produced (status, state, transition) triple. The semantics layers
/// emit only `Ok` triples; the status slot keeps the driver honest about
/// what it may consume.
pub type Sst<S, T> = (StateStatus, S, T);

/// Forward symbolic transition system: initial states, successors, and the
/// two inspection predicates the driver needs for acceptance.
pub trait Sts {
    type State;
    type Transition;

    /// Initial states of the system.
    fn initial(&self) -> Result<Vec<Sst<Self::State, Self::Transition>>, ModelError>;

    /// Successors of a state.
    fn next(
        &self,
        state: &Self::State,
    ) -> Result<Vec<Sst<Self::State, Self::Transition>>, ModelError>;

    /// Labels satisfied by a state.
    fn labels(&self, state: &Self::State) -> LabelSet;

    /// Whether the state is an acceptable final state.
    fn is_valid_final(&self, state: &Self::State) -> bool;
}
