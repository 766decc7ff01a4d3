use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{MAX_ENV_SIZE, STRATEGY_MAX, STRATEGY_MIN};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    /// Deterministic seed for reproducible simulation runs.
    pub seed: u64,
    /// Number of agents placed at construction.
    pub num_agents: usize,
    /// Side length of the square grid in cells.
    pub env_size: usize,
    /// Probability that an empty cell receives a resource at construction.
    pub resource_prob: f64,
    /// Resources deducted from every agent each turn it is alive.
    pub metabolic_rate: i64,
    /// Chebyshev radius of the window each agent observes.
    pub field_of_vision: usize,
    /// Starting resource balance of every agent.
    pub initial_agent_resources: i64,
    /// Amount held by every resource placed on the grid.
    pub resource_amount: i64,
    /// Standard deviation of the normal distribution strategies are drawn from.
    pub strategy_std_dev: f64,
    /// Record a per-turn event log and trace the rendered grid after each turn.
    pub collect_debug: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 1_234_567,
            num_agents: 100,
            env_size: 30,
            resource_prob: 0.4,
            metabolic_rate: 1,
            field_of_vision: 1,
            initial_agent_resources: 10,
            resource_amount: 10,
            strategy_std_dev: 5.0,
            collect_debug: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimConfigError {
    #[error("num_agents must be greater than 0")]
    InvalidNumAgents,
    #[error("env_size must be greater than 0")]
    InvalidEnvSize,
    #[error("env_size ({actual}) exceeds supported maximum ({max})")]
    EnvSizeTooLarge { max: usize, actual: usize },
    #[error("num_agents ({agents}) exceeds the number of grid cells ({cells})")]
    TooManyAgents { agents: usize, cells: usize },
    #[error("resource_prob must be finite and within [0,1]")]
    InvalidResourceProb,
    #[error("metabolic_rate must be non-negative")]
    InvalidMetabolicRate,
    #[error("initial_agent_resources must be positive")]
    InvalidInitialAgentResources,
    #[error("resource_amount must be positive")]
    InvalidResourceAmount,
    #[error("strategy_std_dev must be finite and non-negative")]
    InvalidStrategyStdDev,
    #[error("strategy {strategy} outside expected range [{}, {}]", STRATEGY_MIN, STRATEGY_MAX)]
    StrategyOutOfRange { strategy: i32 },
}

impl SimConfig {
    pub const MAX_ENV_SIZE: usize = MAX_ENV_SIZE;

    pub fn validate(&self) -> Result<(), SimConfigError> {
        self.validate_grid()?;
        self.validate_economy()?;
        if !(self.strategy_std_dev.is_finite() && self.strategy_std_dev >= 0.0) {
            return Err(SimConfigError::InvalidStrategyStdDev);
        }
        Ok(())
    }

    fn validate_grid(&self) -> Result<(), SimConfigError> {
        if self.env_size == 0 {
            return Err(SimConfigError::InvalidEnvSize);
        }
        if self.env_size > Self::MAX_ENV_SIZE {
            return Err(SimConfigError::EnvSizeTooLarge {
                max: Self::MAX_ENV_SIZE,
                actual: self.env_size,
            });
        }
        if self.num_agents == 0 {
            return Err(SimConfigError::InvalidNumAgents);
        }
        let cells = self.env_size * self.env_size;
        if self.num_agents > cells {
            return Err(SimConfigError::TooManyAgents {
                agents: self.num_agents,
                cells,
            });
        }
        Ok(())
    }

    fn validate_economy(&self) -> Result<(), SimConfigError> {
        if !(self.resource_prob.is_finite() && (0.0..=1.0).contains(&self.resource_prob)) {
            return Err(SimConfigError::InvalidResourceProb);
        }
        if self.metabolic_rate < 0 {
            return Err(SimConfigError::InvalidMetabolicRate);
        }
        if self.initial_agent_resources <= 0 {
            return Err(SimConfigError::InvalidInitialAgentResources);
        }
        if self.resource_amount <= 0 {
            return Err(SimConfigError::InvalidResourceAmount);
        }
        Ok(())
    }
}

/// Check that a strategy lies in `[STRATEGY_MIN, STRATEGY_MAX]`.
///
/// Out-of-range strategies are still accepted by [`crate::agent::Agent::new`];
/// callers that want to reject them use this first.
pub fn check_strategy(strategy: i32) -> Result<i32, SimConfigError> {
    if (STRATEGY_MIN..=STRATEGY_MAX).contains(&strategy) {
        Ok(strategy)
    } else {
        Err(SimConfigError::StrategyOutOfRange { strategy })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_default() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_invalid_grid() {
        let config = SimConfig {
            env_size: 0,
            ..SimConfig::default()
        };
        assert_eq!(config.validate(), Err(SimConfigError::InvalidEnvSize));

        let config = SimConfig {
            env_size: SimConfig::MAX_ENV_SIZE + 1,
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimConfigError::EnvSizeTooLarge { .. })
        ));

        let config = SimConfig {
            num_agents: 26,
            env_size: 5,
            ..SimConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(SimConfigError::TooManyAgents {
                agents: 26,
                cells: 25
            })
        );
    }

    #[test]
    fn validate_accepts_full_grid_and_single_cell() {
        let config = SimConfig {
            num_agents: 25,
            env_size: 5,
            ..SimConfig::default()
        };
        assert!(config.validate().is_ok());

        let config = SimConfig {
            num_agents: 1,
            env_size: 1,
            ..SimConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_invalid_economy() {
        for prob in [-0.1, 1.5, f64::NAN] {
            let config = SimConfig {
                resource_prob: prob,
                ..SimConfig::default()
            };
            assert_eq!(config.validate(), Err(SimConfigError::InvalidResourceProb));
        }

        let config = SimConfig {
            metabolic_rate: -1,
            ..SimConfig::default()
        };
        assert_eq!(config.validate(), Err(SimConfigError::InvalidMetabolicRate));

        let config = SimConfig {
            resource_amount: 0,
            ..SimConfig::default()
        };
        assert_eq!(config.validate(), Err(SimConfigError::InvalidResourceAmount));

        let config = SimConfig {
            strategy_std_dev: f64::INFINITY,
            ..SimConfig::default()
        };
        assert_eq!(config.validate(), Err(SimConfigError::InvalidStrategyStdDev));
    }

    #[test]
    fn check_strategy_reports_out_of_range() {
        assert_eq!(check_strategy(-10), Ok(-10));
        assert_eq!(check_strategy(10), Ok(10));
        assert_eq!(
            check_strategy(11),
            Err(SimConfigError::StrategyOutOfRange { strategy: 11 })
        );
    }

    #[test]
    fn partial_config_json_deserializes_with_defaults() {
        let json = r#"{ "seed": 7, "num_agents": 2, "env_size": 5 }"#;
        let cfg: SimConfig = serde_json::from_str(json).expect("partial config should parse");
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.num_agents, 2);
        assert_eq!(cfg.resource_prob, 0.4);
        assert_eq!(cfg.metabolic_rate, 1);
        assert_eq!(cfg.field_of_vision, 1);
        assert_eq!(cfg.resource_amount, 10);
        assert!(!cfg.collect_debug);
    }

    #[test]
    fn error_display_messages_are_preserved() {
        let cases = vec![
            (
                SimConfigError::InvalidNumAgents,
                "num_agents must be greater than 0",
            ),
            (
                SimConfigError::EnvSizeTooLarge {
                    max: 4096,
                    actual: 5000,
                },
                "env_size (5000) exceeds supported maximum (4096)",
            ),
            (
                SimConfigError::TooManyAgents {
                    agents: 30,
                    cells: 25,
                },
                "num_agents (30) exceeds the number of grid cells (25)",
            ),
            (
                SimConfigError::StrategyOutOfRange { strategy: -12 },
                "strategy -12 outside expected range [-10, 10]",
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.to_string(), expected);
        }
    }
}
