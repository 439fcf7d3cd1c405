//! Error types for configuring and summarising a checkout simulation

use std::path::PathBuf;

use thiserror::Error;

/// Rejected simulation parameters
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("arrival rate must be positive and finite, got {0}")]
    ArrivalRate(f64),

    #[error("service rate must be positive and finite, got {0}")]
    ServiceRate(f64),

    #[error("at least one checkout is required")]
    NoServers,

    #[error("horizon must be non-negative and finite, got {0} minutes")]
    Horizon(f64),

    #[error("server sweep range {min}..={max} is empty")]
    EmptySweep { min: usize, max: usize },

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Summary metric that has no samples to average
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MetricError {
    #[error("no customer completed service before the horizon")]
    NoCompletedCustomers,

    #[error("no customer arrived before the horizon")]
    NoArrivals,
}

/// Top-level error for running simulations
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("scenario with {servers} checkout(s) failed: {message}")]
    Scenario { servers: usize, message: String },
}
