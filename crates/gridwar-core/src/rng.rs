use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;

use crate::constants::AGENT_STREAM_BASE;

/// World-level randomness consumers. Each one draws from its own ChaCha stream
/// so that consumption in one concern never shifts the sequence of another.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamKind {
    Placement,
    Strategy,
    ResourcePlacement,
    TurnOrder,
}

impl StreamKind {
    fn stream_id(self) -> u64 {
        match self {
            StreamKind::Placement => 0,
            StreamKind::Strategy => 1,
            StreamKind::ResourcePlacement => 2,
            StreamKind::TurnOrder => 3,
        }
    }
}

/// Create a deterministic RNG on a specific ChaCha stream of `seed`.
pub fn create_stream(seed: u64, stream: u64) -> ChaCha12Rng {
    let mut rng = ChaCha12Rng::seed_from_u64(seed);
    rng.set_stream(stream);
    rng
}

/// Derive the private tie-break stream for the agent at arena index `agent_index`.
pub fn derive_agent_rng(seed: u64, agent_index: usize) -> ChaCha12Rng {
    create_stream(seed, AGENT_STREAM_BASE + agent_index as u64)
}

/// The set of world-level streams seeded from one run seed.
#[derive(Clone, Debug)]
pub struct Streams {
    seed: u64,
    placement: ChaCha12Rng,
    strategy: ChaCha12Rng,
    resource_placement: ChaCha12Rng,
    turn_order: ChaCha12Rng,
}

impl Streams {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            placement: create_stream(seed, StreamKind::Placement.stream_id()),
            strategy: create_stream(seed, StreamKind::Strategy.stream_id()),
            resource_placement: create_stream(seed, StreamKind::ResourcePlacement.stream_id()),
            turn_order: create_stream(seed, StreamKind::TurnOrder.stream_id()),
        }
    }

    pub fn get(&mut self, kind: StreamKind) -> &mut ChaCha12Rng {
        match kind {
            StreamKind::Placement => &mut self.placement,
            StreamKind::Strategy => &mut self.strategy,
            StreamKind::ResourcePlacement => &mut self.resource_placement,
            StreamKind::TurnOrder => &mut self.turn_order,
        }
    }

    pub fn agent_rng(&self, agent_index: usize) -> ChaCha12Rng {
        derive_agent_rng(self.seed, agent_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    const KINDS: [StreamKind; 4] = [
        StreamKind::Placement,
        StreamKind::Strategy,
        StreamKind::ResourcePlacement,
        StreamKind::TurnOrder,
    ];

    fn draw(rng: &mut ChaCha12Rng, n: usize) -> Vec<u64> {
        (0..n).map(|_| rng.random::<u64>()).collect()
    }

    #[test]
    fn same_seed_reproduces_every_stream() {
        let mut a = Streams::new(99);
        let mut b = Streams::new(99);
        for kind in KINDS {
            assert_eq!(draw(a.get(kind), 16), draw(b.get(kind), 16));
        }
        assert_eq!(draw(&mut a.agent_rng(3), 16), draw(&mut b.agent_rng(3), 16));
    }

    #[test]
    fn streams_are_pairwise_distinct() {
        let mut streams = Streams::new(5);
        let mut outputs: Vec<Vec<u64>> = KINDS
            .iter()
            .map(|&kind| draw(streams.get(kind), 8))
            .collect();
        outputs.push(draw(&mut streams.agent_rng(0), 8));
        outputs.push(draw(&mut streams.agent_rng(1), 8));
        for i in 0..outputs.len() {
            for j in (i + 1)..outputs.len() {
                assert_ne!(outputs[i], outputs[j], "streams {i} and {j} collide");
            }
        }
    }

    #[test]
    fn consuming_one_stream_does_not_shift_another() {
        let mut untouched = Streams::new(11);
        let mut consumed = Streams::new(11);
        let _ = draw(consumed.get(StreamKind::Placement), 1000);
        assert_eq!(
            draw(untouched.get(StreamKind::TurnOrder), 8),
            draw(consumed.get(StreamKind::TurnOrder), 8)
        );
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = Streams::new(1);
        let mut b = Streams::new(2);
        assert_ne!(
            draw(a.get(StreamKind::Strategy), 8),
            draw(b.get(StreamKind::Strategy), 8)
        );
    }
}
