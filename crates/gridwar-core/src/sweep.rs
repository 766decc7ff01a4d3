//! One-parameter sweeps: vary a single config field and histogram which
//! strategy wins across many seeded runs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SimConfig;
use crate::constants::{STRATEGY_BINS, STRATEGY_MIN};
use crate::stats::NullSink;
use crate::world::{Outcome, SimError, World, WorldInitError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepParam {
    NumAgents,
    EnvSize,
    ResourceProb,
    MetabolicRate,
    FieldOfVision,
}

impl SweepParam {
    pub const ALL: [SweepParam; 5] = [
        SweepParam::NumAgents,
        SweepParam::EnvSize,
        SweepParam::ResourceProb,
        SweepParam::MetabolicRate,
        SweepParam::FieldOfVision,
    ];

    /// Config field name; also the sweep's output file stem.
    pub fn name(self) -> &'static str {
        match self {
            SweepParam::NumAgents => "num_agents",
            SweepParam::EnvSize => "env_size",
            SweepParam::ResourceProb => "resource_prob",
            SweepParam::MetabolicRate => "metabolic_rate",
            SweepParam::FieldOfVision => "field_of_vision",
        }
    }

    /// Values swept when the caller supplies none.
    pub fn default_values(self) -> Vec<f64> {
        match self {
            // 5% to 70% occupancy of the default 30x30 grid.
            SweepParam::NumAgents => (1..=14).map(|i| (900 * i / 20) as f64).collect(),
            SweepParam::EnvSize => (2..=10).map(|i| (i * 5) as f64).collect(),
            SweepParam::ResourceProb => (1..=9).map(|i| i as f64 / 10.0).collect(),
            SweepParam::MetabolicRate => (1..=10).map(f64::from).collect(),
            SweepParam::FieldOfVision => (1..=5).map(f64::from).collect(),
        }
    }

    /// Write `value` into the matching field of `config`.
    pub fn apply(self, config: &mut SimConfig, value: f64) -> Result<(), SweepError> {
        let whole = || {
            if value.is_finite() && value >= 0.0 && value.fract() == 0.0 {
                Ok(value as u64)
            } else {
                Err(SweepError::InvalidValue { param: self, value })
            }
        };
        match self {
            SweepParam::NumAgents => config.num_agents = whole()? as usize,
            SweepParam::EnvSize => config.env_size = whole()? as usize,
            SweepParam::ResourceProb => config.resource_prob = value,
            SweepParam::MetabolicRate => config.metabolic_rate = whole()? as i64,
            SweepParam::FieldOfVision => config.field_of_vision = whole()? as usize,
        }
        Ok(())
    }
}

impl fmt::Display for SweepParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SweepParam {
    type Err = SweepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SweepParam::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| SweepError::UnknownParam(s.to_owned()))
    }
}

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("unknown sweep parameter '{0}'")]
    UnknownParam(String),
    #[error("{param} cannot take the value {value}")]
    InvalidValue { param: SweepParam, value: f64 },
    #[error(transparent)]
    Init(#[from] WorldInitError),
    #[error(transparent)]
    Sim(#[from] SimError),
}

/// Winner-strategy histogram for one swept value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinCounts {
    /// `bins[s - STRATEGY_MIN]` counts runs won by an agent with strategy `s`.
    pub bins: [u32; STRATEGY_BINS],
    pub draws: u32,
    /// Runs still going when the turn cap was reached.
    pub unfinished: u32,
}

impl Default for WinCounts {
    fn default() -> Self {
        Self {
            bins: [0; STRATEGY_BINS],
            draws: 0,
            unfinished: 0,
        }
    }
}

impl WinCounts {
    pub fn record_win(&mut self, strategy: i32) {
        let bin = (strategy - STRATEGY_MIN).clamp(0, STRATEGY_BINS as i32 - 1) as usize;
        self.bins[bin] += 1;
    }

    pub fn wins(&self) -> u32 {
        self.bins.iter().sum()
    }

    pub fn total(&self) -> u32 {
        self.wins() + self.draws + self.unfinished
    }
}

/// Space-separated bin counts, one line per swept value in the output files.
impl fmt::Display for WinCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, count) in self.bins.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{count}")?;
        }
        Ok(())
    }
}

/// Run `runs` simulations (seeds `0..runs`) for every value and histogram the winners.
///
/// Every field other than `param` keeps its value from `base`. A run that has
/// not finished after `max_turns` turns is counted as unfinished.
pub fn run_sweep(
    base: &SimConfig,
    param: SweepParam,
    values: &[f64],
    runs: u64,
    max_turns: u64,
) -> Result<Vec<WinCounts>, SweepError> {
    let mut results = Vec::with_capacity(values.len());
    for &value in values {
        let mut config = base.clone();
        param.apply(&mut config, value)?;
        config.validate().map_err(WorldInitError::from)?;
        tracing::info!(%param, value, runs, "sweeping");

        let mut counts = WinCounts::default();
        for seed in 0..runs {
            config.seed = seed;
            let mut world = World::new(config.clone())?;
            world.run_to_completion(&mut NullSink, max_turns)?;
            if !world.is_finished() {
                counts.unfinished += 1;
                continue;
            }
            match world.outcome() {
                Some(Outcome::Winner(_)) => {
                    if let Some(winner) = world.winner() {
                        counts.record_win(winner.strategy());
                    }
                }
                _ => counts.draws += 1,
            }
            tracing::trace!(seed, timestep = world.timestep(), "run finished");
        }
        results.push(counts);
    }
    Ok(results)
}
