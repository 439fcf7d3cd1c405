//! Checkout-bank queueing simulation
//!
//! Customers arrive at a bank of parallel checkouts, join the one with the
//! shortest estimated wait, queue FIFO if it is busy, are served for an
//! exponentially distributed time and leave. The run reports the mean time a
//! customer spends in the system, the mean number of customers queued at
//! arrival epochs and the utilization of each checkout.
//!
//! Agents on the `des` event loop:
//! - ArrivalProcess: exponential arrival timer, spawns one ServiceProcess per customer
//! - ServerPool: the checkouts, answers routing queries, grants and releases them
//! - ServiceProcess: one customer's acquire / serve / release lifecycle
//! - StatisticsCollector: wait records and queue-length samples

pub mod arrivals;
pub mod config;
pub mod error;
pub mod rng;
pub mod routing;
pub mod server_pool;
pub mod service;
pub mod simulation;
pub mod statistics;

pub use arrivals::{ArrivalProcess, ArrivalStats};
pub use config::{RateUnits, SimulationConfig, TieBreak};
pub use error::{ConfigError, MetricError, SimulationError};
pub use rng::{Exponential, SimRng};
pub use server_pool::{PoolStats, Server, ServerPool, ServerStats};
pub use service::{ServiceProcess, ServiceStats};
pub use simulation::{ServerReport, Simulation, SimulationReport, sweep};
pub use statistics::{CollectorStats, Metrics, RunStatistics, StatisticsCollector, WaitRecord};

/// A customer in the bank. `server` is the 0-based index of the chosen
/// checkout; checkouts are numbered from 1 when reported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Customer {
    pub id: usize,
    pub arrival_t: f64,
    pub server: usize,
}

#[derive(Debug, Clone)]
pub enum Event {
    Start,
    /// The arrival timer fired.
    ArrivalDue,
    CustomerArrived {
        customer_id: usize,
    },
    /// Routing decided; `queued` is the total number of customers waiting
    /// across all checkouts at this arrival epoch.
    CustomerRouted {
        customer: Customer,
        queued: usize,
    },
    ServerRequested {
        customer: Customer,
    },
    ServerAcquired {
        customer: Customer,
    },
    ServiceStarted {
        customer: Customer,
        duration: f64,
    },
    ServerReleased {
        customer: Customer,
    },
    CustomerDeparted {
        customer: Customer,
        departure_t: f64,
    },
}

#[derive(Debug, Clone)]
pub enum Stats {
    ArrivalStats(ArrivalStats),
    PoolStats(PoolStats),
    ServiceStats(ServiceStats),
    CollectorStats(CollectorStats),
}
