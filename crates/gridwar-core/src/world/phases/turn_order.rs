use rand::seq::SliceRandom;

use super::super::World;
use crate::rng::StreamKind;

impl World {
    /// Shuffle the registered agents in place; they act in this order this turn.
    ///
    /// The order carries over between turns, so each shuffle starts from the
    /// previous turn's permutation.
    pub(in crate::world) fn step_turn_order_phase(&mut self) {
        let rng = self.streams.get(StreamKind::TurnOrder);
        self.living.shuffle(rng);
    }
}
