use std::fmt;

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agent::{Agent, AgentId, AgentSummary};
use crate::config::{SimConfig, SimConfigError};
use crate::constants::{STRATEGY_MAX, STRATEGY_MIN};
use crate::grid::{Cell, Grid, Offset, Position};
use crate::resource::{Resource, ResourceRegistry};
use crate::rng::{StreamKind, Streams};
use crate::stats::StatsSink;

/// How a finished run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Winner(AgentId),
    /// Every remaining agent was eliminated in the same turn.
    Draw,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorldState {
    Running,
    Finished(Outcome),
}

/// Something that happened during a turn. Recorded only with `collect_debug`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnEvent {
    Starved {
        timestep: u64,
        agent: AgentId,
        at: Position,
    },
    Moved {
        timestep: u64,
        agent: AgentId,
        from: Position,
        to: Position,
    },
    Collected {
        timestep: u64,
        agent: AgentId,
        at: Position,
        amount: i64,
    },
    Fought {
        timestep: u64,
        attacker: AgentId,
        defender: AgentId,
        winner: AgentId,
        spoils: i64,
        at: Position,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorldInitError {
    #[error(transparent)]
    Config(#[from] SimConfigError),
}

/// Fatal consistency violations and misuse of a finished world.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error("agent {agent} is recorded at {expected} but that cell holds {found:?}")]
    LocationMismatch {
        agent: AgentId,
        expected: Position,
        found: Cell,
    },
    #[error("agent {agent} has no recorded location")]
    Unplaced { agent: AgentId },
    #[error("agent {agent} has no legal move: every candidate cell is a barrier")]
    NoLegalMove { agent: AgentId },
    #[error("agent {agent} tried to move from {from} by {offset:?}, off the grid")]
    OutOfBounds {
        agent: AgentId,
        from: Position,
        offset: Offset,
    },
    #[error("agent {agent} is not registered in this world")]
    UnknownAgent { agent: AgentId },
    #[error("simulation already finished")]
    AlreadyFinished,
}

/// Running totals proving that combat and pickups only move resources around.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceBalance {
    pub initial_total: i64,
    /// Balances of every agent still registered, pending removals included.
    pub held_by_agents: i64,
    pub on_grid: i64,
    /// Net amount destroyed by metabolism.
    pub metabolized: i64,
}

impl ResourceBalance {
    pub fn is_conserved(&self) -> bool {
        self.held_by_agents + self.on_grid + self.metabolized == self.initial_total
    }
}

pub struct World {
    config: SimConfig,
    grid: Grid,
    // Arena of every agent ever created; slot = `AgentId::index`.
    agents: Vec<Agent>,
    // Registered agents in current turn order.
    living: Vec<AgentId>,
    locations: Vec<Option<Position>>,
    resources: ResourceRegistry,
    pending: Vec<AgentId>,
    pending_flags: Vec<bool>,
    streams: Streams,
    timestep: u64,
    state: WorldState,
    started: bool,
    initial_total: i64,
    metabolized: i64,
    events: Vec<TurnEvent>,
}

impl World {
    pub fn new(config: SimConfig) -> Result<Self, WorldInitError> {
        config.validate()?;
        let strategy_dist = Normal::new(0.0, config.strategy_std_dev)
            .map_err(|_| SimConfigError::InvalidStrategyStdDev)?;

        let size = config.env_size;
        let mut streams = Streams::new(config.seed);
        let mut grid = Grid::new(size);
        let mut agents = Vec::with_capacity(config.num_agents);
        let mut locations = Vec::with_capacity(config.num_agents);

        for index in 0..config.num_agents {
            let pos = loop {
                let rng = streams.get(StreamKind::Placement);
                let candidate = Position::new(rng.random_range(0..size), rng.random_range(0..size));
                if grid.is_empty_at(candidate) {
                    break candidate;
                }
            };
            let sample: f64 = strategy_dist.sample(streams.get(StreamKind::Strategy));
            let strategy = (sample.round() as i32).clamp(STRATEGY_MIN, STRATEGY_MAX);

            let id = AgentId::from_index(index);
            agents.push(Agent::new(
                id,
                config.field_of_vision,
                config.initial_agent_resources,
                config.metabolic_rate,
                strategy,
                streams.agent_rng(index),
            ));
            grid.set(pos, Cell::Agent(id));
            locations.push(Some(pos));
        }

        let mut resources = ResourceRegistry::default();
        let empty_cells: Vec<Position> = grid.positions().filter(|&p| grid.is_empty_at(p)).collect();
        for pos in empty_cells {
            let roll: f64 = streams.get(StreamKind::ResourcePlacement).random();
            if roll < config.resource_prob {
                let rid = resources.insert(Resource::new(config.resource_amount));
                grid.set(pos, Cell::Resource(rid));
            }
        }

        let living: Vec<AgentId> = agents.iter().map(Agent::id).collect();
        let initial_total = agents.iter().map(Agent::resources).sum::<i64>() + resources.total();
        let agent_count = agents.len();

        let mut world = Self {
            config,
            grid,
            agents,
            living,
            locations,
            resources,
            pending: Vec::new(),
            pending_flags: vec![false; agent_count],
            streams,
            timestep: 0,
            state: WorldState::Running,
            started: false,
            initial_total,
            metabolized: 0,
            events: Vec::new(),
        };
        tracing::info!(
            seed = world.config.seed,
            agents = world.living.len(),
            resources = world.resources.len(),
            env_size = size,
            "world initialised"
        );
        world.check_termination();
        Ok(world)
    }

    /// Positional constructor mirroring the classic parameter list.
    #[allow(clippy::too_many_arguments)]
    pub fn with_params(
        num_agents: usize,
        env_size: usize,
        resource_prob: f64,
        metabolic_rate: i64,
        field_of_vision: usize,
        seed: u64,
        collect_debug: bool,
    ) -> Result<Self, WorldInitError> {
        Self::new(SimConfig {
            num_agents,
            env_size,
            resource_prob,
            metabolic_rate,
            field_of_vision,
            seed,
            collect_debug,
            ..SimConfig::default()
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    pub fn timestep(&self) -> u64 {
        self.timestep
    }

    pub fn state(&self) -> WorldState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, WorldState::Finished(_))
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self.state {
            WorldState::Finished(outcome) => Some(outcome),
            WorldState::Running => None,
        }
    }

    pub fn winner(&self) -> Option<&Agent> {
        match self.outcome()? {
            Outcome::Winner(id) => self.agent(id),
            Outcome::Draw => None,
        }
    }

    /// Registered agents in the current turn order.
    pub fn agents(&self) -> impl Iterator<Item = &Agent> + '_ {
        self.living.iter().map(move |id| &self.agents[id.index()])
    }

    pub fn living_ids(&self) -> &[AgentId] {
        &self.living
    }

    /// Every agent ever created, dead ones included, in id order.
    pub fn all_agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id.index()).filter(|a| a.id() == id)
    }

    pub fn location(&self, id: AgentId) -> Option<Position> {
        self.locations.get(id.index()).copied().flatten()
    }

    pub fn is_pending_removal(&self, id: AgentId) -> bool {
        self.pending_flags.get(id.index()).copied().unwrap_or(false)
    }

    /// Turn events recorded so far; empty unless `collect_debug` is set.
    pub fn events(&self) -> &[TurnEvent] {
        &self.events
    }

    pub fn resource_balance(&self) -> ResourceBalance {
        ResourceBalance {
            initial_total: self.initial_total,
            held_by_agents: self.agents().map(Agent::resources).sum(),
            on_grid: self.resources.total(),
            metabolized: self.metabolized,
        }
    }

    /// Advance the simulation by one timestep, reporting to `sink`.
    ///
    /// Any error is a broken invariant; the world must not be stepped again.
    pub fn advance_turn<S: StatsSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), SimError> {
        if self.is_finished() {
            return Err(SimError::AlreadyFinished);
        }
        let result = self.run_turn(sink);
        if let Err(err) = &result {
            tracing::error!(timestep = self.timestep, %err, "aborting simulation");
        }
        result
    }

    /// Step until the run finishes or `max_turns` more turns have elapsed.
    /// Returns the number of turns executed by this call.
    pub fn run_to_completion<S: StatsSink + ?Sized>(
        &mut self,
        sink: &mut S,
        max_turns: u64,
    ) -> Result<u64, SimError> {
        let mut turns = 0;
        while !self.is_finished() && turns < max_turns {
            self.advance_turn(sink)?;
            turns += 1;
        }
        Ok(turns)
    }

    /// Verify that the location index and the grid agree in both directions.
    ///
    /// A winner spared from removal in its final turn has no cell.
    pub fn check_consistency(&self) -> Result<(), SimError> {
        for &id in &self.living {
            if self.is_pending_removal(id) || (self.is_finished() && self.location(id).is_none()) {
                continue;
            }
            let expected = self.location_of(id)?;
            let found = self.grid.get(expected).unwrap_or(Cell::Barrier);
            if found != Cell::Agent(id) {
                return Err(SimError::LocationMismatch {
                    agent: id,
                    expected,
                    found,
                });
            }
        }
        for pos in self.grid.positions() {
            if let Some(Cell::Agent(id)) = self.grid.get(pos) {
                if self.location(id) != Some(pos) {
                    return Err(SimError::LocationMismatch {
                        agent: id,
                        expected: self.location(id).unwrap_or(pos),
                        found: Cell::Agent(id),
                    });
                }
            }
        }
        Ok(())
    }

    fn run_turn<S: StatsSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), SimError> {
        if !self.started {
            self.started = true;
            let population: Vec<AgentSummary> = self.agents().map(Agent::summary).collect();
            sink.on_start(&population);
        }
        self.timestep += 1;
        self.step_turn_order_phase();

        // Iterate a copy; removals only take effect in the cleanup phase.
        let order = self.living.clone();
        for id in order {
            if self.is_pending_removal(id) {
                continue;
            }
            if !self.step_metabolism_phase(id)? {
                continue;
            }
            let offset = self.step_decision_phase(id)?;
            if offset.is_stay() {
                continue;
            }
            self.step_movement_phase(id, offset)?;
        }

        self.step_cleanup_phase(sink);
        if self.config.collect_debug {
            tracing::debug!(timestep = self.timestep, "grid after turn\n{}", self.grid);
        }
        Ok(())
    }

    fn location_of(&self, id: AgentId) -> Result<Position, SimError> {
        self.location(id).ok_or(SimError::Unplaced { agent: id })
    }

    fn agent_mut(&mut self, id: AgentId) -> Result<&mut Agent, SimError> {
        self.agents
            .get_mut(id.index())
            .filter(|a| a.id() == id)
            .ok_or(SimError::UnknownAgent { agent: id })
    }

    fn mark_pending(&mut self, id: AgentId) {
        let flag = &mut self.pending_flags[id.index()];
        if !*flag {
            *flag = true;
            self.pending.push(id);
        }
    }

    fn record_event(&mut self, event: TurnEvent) {
        if self.config.collect_debug {
            self.events.push(event);
        }
    }

    /// Enter the terminal state when at most one agent remains.
    fn check_termination(&mut self) -> Option<Outcome> {
        let outcome = match self.living.as_slice() {
            [] => Outcome::Draw,
            [winner] => Outcome::Winner(*winner),
            _ => return None,
        };
        if let Outcome::Winner(id) = outcome {
            // One extra tick for surviving into the final state.
            let final_tick = self.timestep + 1;
            self.agents[id.index()].record_time_alive(final_tick);
            tracing::info!(timestep = self.timestep, winner = %id, "simulation finished");
        } else {
            tracing::info!(timestep = self.timestep, "simulation finished in a draw");
        }
        self.state = WorldState::Finished(outcome);
        Some(outcome)
    }
}

impl fmt::Display for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "timestep {} | {} agents | {} resources",
            self.timestep,
            self.living.len(),
            self.resources.len()
        )?;
        write!(f, "{}", self.grid)
    }
}

mod phases;
