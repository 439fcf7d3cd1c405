//! Simulation parameters
//!
//! The horizon is always in minutes and so is every simulated timestamp. How
//! the two rate parameters are read depends on [`RateUnits`].

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const MINUTES_PER_HOUR: f64 = 60.0;

/// How the router picks among checkouts with equal wait estimates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Lowest-numbered checkout wins.
    #[default]
    FirstIndex,
    /// Uniform choice among the tied checkouts, drawn from the run's generator.
    Random,
}

impl fmt::Display for TieBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TieBreak::FirstIndex => write!(f, "first-index"),
            TieBreak::Random => write!(f, "random"),
        }
    }
}

impl FromStr for TieBreak {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "first-index" | "first" => Ok(TieBreak::FirstIndex),
            "random" => Ok(TieBreak::Random),
            other => Err(format!("unknown tie-break policy '{other}' (expected first-index or random)")),
        }
    }
}

/// How `arrival_rate` and `service_rate` turn into minutes
///
/// | | inter-arrival mean | service mean | estimate step per customer |
/// |---|---|---|---|
/// | `Literal` | `arrival_rate` min | `service_rate` min | `1 / service_rate` min |
/// | `PerHour` | `60 / arrival_rate` min | `60 / service_rate` min | `60 / service_rate` min |
///
/// `Literal` reproduces the classic checkout report: with the default
/// parameters a customer arrives every 20 minutes on average, a service
/// lasts 5 minutes and each customer ahead adds 0.2 minutes to the wait
/// estimate, so routing is driven by the last release time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateUnits {
    #[default]
    Literal,
    /// Rates in customers per hour, converted to per-minute rates.
    PerHour,
}

impl fmt::Display for RateUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateUnits::Literal => write!(f, "literal"),
            RateUnits::PerHour => write!(f, "per-hour"),
        }
    }
}

impl FromStr for RateUnits {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "literal" => Ok(RateUnits::Literal),
            "per-hour" | "hourly" => Ok(RateUnits::PerHour),
            other => Err(format!("unknown rate units '{other}' (expected literal or per-hour)")),
        }
    }
}

/// Parameters of a single checkout-bank run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Arrival parameter for the whole bank, read according to `rate_units`.
    pub arrival_rate: f64,
    /// Service parameter of one checkout, read according to `rate_units`.
    pub service_rate: f64,
    pub num_servers: usize,
    /// Simulated duration in minutes.
    pub horizon_minutes: f64,
    pub seed: u64,
    pub tie_break: TieBreak,
    pub rate_units: RateUnits,
}

impl Default for SimulationConfig {
    /// A supermarket with five checkouts over an eight-hour day.
    fn default() -> Self {
        SimulationConfig {
            arrival_rate: 20.0,
            service_rate: 5.0,
            num_servers: 5,
            horizon_minutes: 480.0,
            seed: 42,
            tie_break: TieBreak::FirstIndex,
            rate_units: RateUnits::Literal,
        }
    }
}

impl SimulationConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.arrival_rate.is_finite() && self.arrival_rate > 0.0) {
            return Err(ConfigError::ArrivalRate(self.arrival_rate));
        }
        if !(self.service_rate.is_finite() && self.service_rate > 0.0) {
            return Err(ConfigError::ServiceRate(self.service_rate));
        }
        if self.num_servers == 0 {
            return Err(ConfigError::NoServers);
        }
        // A zero horizon is a legal, empty run.
        if !(self.horizon_minutes.is_finite() && self.horizon_minutes >= 0.0) {
            return Err(ConfigError::Horizon(self.horizon_minutes));
        }
        Ok(())
    }

    /// Rate of the exponential inter-arrival draw, per minute.
    pub fn arrival_rate_per_minute(&self) -> f64 {
        match self.rate_units {
            RateUnits::Literal => 1.0 / self.arrival_rate,
            RateUnits::PerHour => self.arrival_rate / MINUTES_PER_HOUR,
        }
    }

    /// Rate of the exponential service draw, per minute.
    pub fn service_rate_per_minute(&self) -> f64 {
        match self.rate_units {
            RateUnits::Literal => 1.0 / self.service_rate,
            RateUnits::PerHour => self.service_rate / MINUTES_PER_HOUR,
        }
    }

    /// Rate the router divides queue length by when estimating a wait.
    pub fn estimate_rate_per_minute(&self) -> f64 {
        match self.rate_units {
            RateUnits::Literal => self.service_rate,
            RateUnits::PerHour => self.service_rate / MINUTES_PER_HOUR,
        }
    }

    pub fn with_servers(&self, num_servers: usize) -> Self {
        SimulationConfig {
            num_servers,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_the_eight_hour_supermarket() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.num_servers, 5);
        assert_eq!(config.horizon_minutes, 480.0);
        assert_eq!(config.rate_units, RateUnits::Literal);
    }

    #[test]
    fn literal_units_use_parameters_as_minutes() {
        let config = SimulationConfig::default();

        // one customer every 20 minutes, 5 minute services
        assert_eq!(config.arrival_rate_per_minute(), 1.0 / 20.0);
        assert_eq!(config.service_rate_per_minute(), 1.0 / 5.0);
        // each customer ahead adds a fifth of a minute to the estimate
        assert_eq!(config.estimate_rate_per_minute(), 5.0);
    }

    #[test]
    fn per_hour_units_convert_to_minutes() {
        let config = SimulationConfig {
            rate_units: RateUnits::PerHour,
            ..SimulationConfig::default()
        };

        assert_eq!(config.arrival_rate_per_minute(), 20.0 / 60.0);
        assert_eq!(config.service_rate_per_minute(), 5.0 / 60.0);
        assert_eq!(config.estimate_rate_per_minute(), config.service_rate_per_minute());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config = SimulationConfig::from_toml_str(
            r#"
            num_servers = 3
            tie_break = "random"
            rate_units = "per_hour"
            "#,
        )
        .unwrap();

        assert_eq!(config.num_servers, 3);
        assert_eq!(config.tie_break, TieBreak::Random);
        assert_eq!(config.rate_units, RateUnits::PerHour);
        assert_eq!(config.arrival_rate, 20.0);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = SimulationConfig::from_toml_str("cashiers = 4");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn invalid_parameters_are_rejected_before_running() {
        let base = SimulationConfig::default();

        let bad_arrivals = SimulationConfig { arrival_rate: 0.0, ..base.clone() };
        assert!(matches!(bad_arrivals.validate(), Err(ConfigError::ArrivalRate(_))));

        let bad_service = SimulationConfig { service_rate: -1.0, ..base.clone() };
        assert!(matches!(bad_service.validate(), Err(ConfigError::ServiceRate(_))));

        let no_servers = base.with_servers(0);
        assert!(matches!(no_servers.validate(), Err(ConfigError::NoServers)));

        let bad_horizon = SimulationConfig { horizon_minutes: -5.0, ..base.clone() };
        assert!(matches!(bad_horizon.validate(), Err(ConfigError::Horizon(_))));

        let nan_horizon = SimulationConfig { horizon_minutes: f64::NAN, ..base.clone() };
        assert!(matches!(nan_horizon.validate(), Err(ConfigError::Horizon(_))));

        let empty_run = SimulationConfig { horizon_minutes: 0.0, ..base };
        assert!(empty_run.validate().is_ok());
    }

    #[test]
    fn tie_break_parses_from_cli_spellings() {
        assert_eq!("first-index".parse::<TieBreak>(), Ok(TieBreak::FirstIndex));
        assert_eq!("FIRST_INDEX".parse::<TieBreak>(), Ok(TieBreak::FirstIndex));
        assert_eq!("random".parse::<TieBreak>(), Ok(TieBreak::Random));
        assert!("coin-flip".parse::<TieBreak>().is_err());

        assert_eq!("per_hour".parse::<RateUnits>(), Ok(RateUnits::PerHour));
        assert_eq!("Literal".parse::<RateUnits>(), Ok(RateUnits::Literal));
        assert!("per-day".parse::<RateUnits>().is_err());
    }
}
