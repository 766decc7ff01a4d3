pub mod agent;
pub mod config;
pub mod constants;
pub mod grid;
pub mod resource;
pub mod rng;
pub mod stats;
pub mod sweep;
pub mod world;

pub use agent::{Agent, AgentId, AgentSummary, StrategyClass};
pub use config::{SimConfig, SimConfigError};
pub use constants::{MAX_ENV_SIZE, STRATEGY_MAX, STRATEGY_MIN};
pub use grid::{Cell, Grid, Offset, Position};
pub use stats::{NullSink, Statistics, StatsReport, StatsSink};
pub use sweep::{run_sweep, SweepParam, WinCounts};
pub use world::{Outcome, ResourceBalance, SimError, TurnEvent, World, WorldInitError, WorldState};
