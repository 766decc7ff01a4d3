use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agent::{AgentId, AgentSummary, StrategyClass};
use crate::world::Outcome;

/// Consumer of simulation events. Every hook defaults to a no-op.
pub trait StatsSink {
    /// Initial living population, delivered once before the first turn runs.
    fn on_start(&mut self, _population: &[AgentSummary]) {}

    /// Agents purged at the end of `timestep`, with their lifespans recorded.
    fn on_removals(&mut self, _timestep: u64, _removed: &[AgentSummary]) {}

    /// The run reached its terminal state during turn `timestep`.
    fn on_finish(&mut self, _timestep: u64, _outcome: Outcome, _survivors: &[AgentSummary]) {}
}

/// Sink that ignores every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl StatsSink for NullSink {}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatsError {
    #[error("simulation must be over before winner statistics can be reported")]
    NotFinished,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassLifespans {
    pub defensive: f64,
    pub neutral: f64,
    pub aggressive: f64,
}

impl ClassLifespans {
    pub fn get(&self, class: StrategyClass) -> f64 {
        match class {
            StrategyClass::Defensive => self.defensive,
            StrategyClass::Neutral => self.neutral,
            StrategyClass::Aggressive => self.aggressive,
        }
    }

    fn set(&mut self, class: StrategyClass, value: f64) {
        match class {
            StrategyClass::Defensive => self.defensive = value,
            StrategyClass::Neutral => self.neutral = value,
            StrategyClass::Aggressive => self.aggressive = value,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    pub outcome: Outcome,
    pub final_timestep: u64,
    /// Mean strategy across the surviving agent(s); 0 for a draw.
    pub avg_win_strategy: f64,
    /// Mean metabolic rate across the surviving agent(s); 0 for a draw.
    pub avg_win_metabolic_rate: f64,
    /// Mean `time_alive` per strategy class; classes without members report 0.
    pub avg_lifespan: ClassLifespans,
}

/// Winner and lifespan aggregates for one run.
#[derive(Clone, Debug, Default)]
pub struct Statistics {
    participants: BTreeMap<AgentId, AgentSummary>,
    living: Vec<AgentId>,
    dead: Vec<AgentId>,
    survivors: Vec<AgentSummary>,
    finish: Option<(u64, Outcome)>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_final(&self) -> bool {
        self.finish.is_some()
    }

    pub fn living(&self) -> &[AgentId] {
        &self.living
    }

    pub fn dead(&self) -> &[AgentId] {
        &self.dead
    }

    /// Members of `class` in the initial population.
    pub fn class_members(&self, class: StrategyClass) -> impl Iterator<Item = &AgentSummary> + '_ {
        self.participants.values().filter(move |s| s.class() == class)
    }

    /// Compute the end-of-run aggregates.
    pub fn report(&self) -> Result<StatsReport, StatsError> {
        let Some((final_timestep, outcome)) = self.finish else {
            tracing::warn!("statistics requested before the simulation finished");
            return Err(StatsError::NotFinished);
        };

        let (avg_win_strategy, avg_win_metabolic_rate) = if self.survivors.is_empty() {
            (0.0, 0.0)
        } else {
            let n = self.survivors.len() as f64;
            (
                self.survivors.iter().map(|s| s.strategy as f64).sum::<f64>() / n,
                self.survivors
                    .iter()
                    .map(|s| s.metabolic_rate as f64)
                    .sum::<f64>()
                    / n,
            )
        };

        let mut avg_lifespan = ClassLifespans::default();
        for class in StrategyClass::ALL {
            let lifespans: Vec<u64> = self
                .class_members(class)
                .map(|s| s.time_alive.unwrap_or(0))
                .collect();
            if lifespans.is_empty() {
                continue;
            }
            let mean = lifespans.iter().sum::<u64>() as f64 / lifespans.len() as f64;
            avg_lifespan.set(class, mean);
        }

        Ok(StatsReport {
            outcome,
            final_timestep,
            avg_win_strategy,
            avg_win_metabolic_rate,
            avg_lifespan,
        })
    }

    fn record(&mut self, summary: &AgentSummary) {
        self.participants.insert(summary.id, summary.clone());
    }
}

impl StatsSink for Statistics {
    fn on_start(&mut self, population: &[AgentSummary]) {
        self.participants.clear();
        self.dead.clear();
        self.living = population.iter().map(|s| s.id).collect();
        for summary in population {
            self.record(summary);
        }
    }

    fn on_removals(&mut self, _timestep: u64, removed: &[AgentSummary]) {
        for summary in removed {
            self.living.retain(|&id| id != summary.id);
            self.dead.push(summary.id);
            if self.participants.contains_key(&summary.id) {
                self.record(summary);
            }
        }
    }

    fn on_finish(&mut self, timestep: u64, outcome: Outcome, survivors: &[AgentSummary]) {
        for summary in survivors {
            if self.participants.contains_key(&summary.id) {
                self.record(summary);
            }
        }
        self.survivors = survivors.to_vec();
        self.finish = Some((timestep, outcome));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: u32, strategy: i32, time_alive: Option<u64>) -> AgentSummary {
        AgentSummary {
            id: AgentId(id),
            fov_radius: 1,
            resources: 10,
            metabolic_rate: 1,
            strategy,
            time_alive,
        }
    }

    #[test]
    fn report_before_finish_is_rejected() {
        let mut stats = Statistics::new();
        stats.on_start(&[summary(1, 3, None), summary(2, -3, None)]);
        assert_eq!(stats.report(), Err(StatsError::NotFinished));
    }

    #[test]
    fn removals_move_agents_from_living_to_dead() {
        let mut stats = Statistics::new();
        stats.on_start(&[summary(1, 3, None), summary(2, -3, None), summary(3, 0, None)]);
        stats.on_removals(4, &[summary(2, -3, Some(4))]);
        assert_eq!(stats.living(), &[AgentId(1), AgentId(3)]);
        assert_eq!(stats.dead(), &[AgentId(2)]);
    }

    #[test]
    fn report_averages_winner_and_class_lifespans() {
        let mut stats = Statistics::new();
        stats.on_start(&[
            summary(1, 4, None),
            summary(2, 6, None),
            summary(3, -2, None),
        ]);
        stats.on_removals(3, &[summary(2, 6, Some(3))]);
        stats.on_removals(5, &[summary(3, -2, Some(5))]);
        stats.on_finish(5, Outcome::Winner(AgentId(1)), &[summary(1, 4, Some(6))]);

        let report = stats.report().expect("finished run should report");
        assert_eq!(report.outcome, Outcome::Winner(AgentId(1)));
        assert_eq!(report.avg_win_strategy, 4.0);
        assert_eq!(report.avg_win_metabolic_rate, 1.0);
        assert_eq!(report.avg_lifespan.aggressive, 4.5);
        assert_eq!(report.avg_lifespan.defensive, 5.0);
        // No neutral agents took part; the class is skipped rather than divided by zero.
        assert_eq!(report.avg_lifespan.neutral, 0.0);
    }

    #[test]
    fn draw_reports_zero_winner_averages() {
        let mut stats = Statistics::new();
        stats.on_start(&[summary(1, 1, None), summary(2, 0, None)]);
        stats.on_removals(2, &[summary(1, 1, Some(2)), summary(2, 0, Some(2))]);
        stats.on_finish(2, Outcome::Draw, &[]);
        let report = stats.report().unwrap();
        assert_eq!(report.outcome, Outcome::Draw);
        assert_eq!(report.avg_win_strategy, 0.0);
        assert_eq!(report.avg_lifespan.neutral, 2.0);
        assert_eq!(report.avg_lifespan.aggressive, 2.0);
    }
}
