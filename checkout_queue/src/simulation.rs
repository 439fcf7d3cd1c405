//! Wiring a configuration into an event loop and summarising the result

use des::parallel::{ParallelRunner, simple_progress_reporter};
use des::{Agent, EventLoop};
use serde::Serialize;
use tracing::{info, warn};

use crate::arrivals::ArrivalProcess;
use crate::config::SimulationConfig;
use crate::error::{ConfigError, SimulationError};
use crate::rng::{Exponential, SimRng};
use crate::server_pool::{PoolStats, ServerPool};
use crate::statistics::{CollectorStats, Metrics, RunStatistics, StatisticsCollector};
use crate::{Event, Stats};

/// A validated, ready-to-run configuration
#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimulationConfig,
    inter_arrival: Exponential,
    service_time: Exponential,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Result<Simulation, SimulationError> {
        config.validate()?;
        let inter_arrival = Exponential::arrivals(config.arrival_rate_per_minute())?;
        let service_time = Exponential::service(config.service_rate_per_minute())?;
        Ok(Simulation {
            config,
            inter_arrival,
            service_time,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Fresh loop with every agent drawing from one generator seeded from
    /// the config.
    pub fn event_loop(&self) -> EventLoop<Event, Stats> {
        let rng = SimRng::seed_from_u64(self.config.seed);
        let agents: Vec<Box<dyn Agent<Event, Stats>>> = vec![
            Box::new(ArrivalProcess::new(
                self.inter_arrival.clone(),
                self.service_time.clone(),
                rng.clone(),
            )),
            Box::new(ServerPool::new(
                self.config.num_servers,
                self.config.estimate_rate_per_minute(),
                self.config.tie_break,
                rng,
            )),
            Box::new(StatisticsCollector::new()),
        ];
        EventLoop::new(vec![(0.0, Event::Start)], agents)
    }

    pub fn run(&self) -> SimulationReport {
        info!(
            checkouts = self.config.num_servers,
            arrival_rate = self.config.arrival_rate,
            service_rate = self.config.service_rate,
            units = %self.config.rate_units,
            horizon = self.config.horizon_minutes,
            seed = self.config.seed,
            "simulation starting"
        );
        let mut event_loop = self.event_loop();
        event_loop.run(self.config.horizon_minutes);

        let report = SimulationReport::from_stats(&self.config, event_loop.stats());
        if report.metrics.customers_served == 0 {
            warn!(
                arrived = report.metrics.customers_arrived,
                "no customer completed service before the horizon"
            );
        }
        info!(
            arrived = report.metrics.customers_arrived,
            served = report.metrics.customers_served,
            in_flight = report.customers_in_flight,
            "simulation finished"
        );
        report
    }
}

/// Per-checkout summary, numbered from 1
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerReport {
    pub id: usize,
    pub served: usize,
    pub busy_time: f64,
    pub utilization: f64,
    pub last_release_t: f64,
    /// Busy time booked for a service that ends after the horizon.
    pub busy_beyond_horizon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    pub config: SimulationConfig,
    pub metrics: Metrics,
    pub servers: Vec<ServerReport>,
    #[serde(skip)]
    pub statistics: RunStatistics,
    pub customers_in_flight: usize,
    pub customers_in_service: usize,
    pub customers_waiting: usize,
    /// When the last customer walked in; `None` if nobody did.
    pub last_arrival_t: Option<f64>,
}

impl SimulationReport {
    /// Assemble the report from the agents' final stats.
    pub fn from_stats(config: &SimulationConfig, stats: Vec<Stats>) -> SimulationReport {
        let mut pool = PoolStats { servers: vec![] };
        let mut collected = CollectorStats::default();
        let mut in_service = 0;
        let mut waiting = 0;
        let mut last_arrival_t = None;
        for s in stats {
            match s {
                Stats::PoolStats(p) => pool = p,
                Stats::CollectorStats(c) => collected = c,
                Stats::ServiceStats(s) if s.in_service() => in_service += 1,
                Stats::ServiceStats(_) => waiting += 1,
                Stats::ArrivalStats(a) => last_arrival_t = a.last_arrival_t,
            }
        }

        let horizon = config.horizon_minutes;
        let busy_time = pool.servers.iter().map(|s| s.busy_time).collect();
        let statistics = RunStatistics::new(horizon, collected, busy_time);
        let metrics = statistics.metrics();
        let servers = pool
            .servers
            .iter()
            .zip(&metrics.utilization)
            .map(|(s, utilization)| ServerReport {
                id: s.id,
                served: s.served,
                busy_time: s.busy_time,
                utilization: *utilization,
                last_release_t: s.last_release_t,
                busy_beyond_horizon: s.busy_beyond(horizon),
            })
            .collect();

        SimulationReport {
            config: config.clone(),
            metrics,
            servers,
            statistics,
            customers_in_flight: in_service + waiting,
            customers_in_service: in_service,
            customers_waiting: waiting,
            last_arrival_t,
        }
    }
}

/// Run `base` once for every checkout count in `min_servers..=max_servers`,
/// in parallel. Reports come back ordered by checkout count and share the
/// base seed.
pub fn sweep(
    base: &SimulationConfig,
    min_servers: usize,
    max_servers: usize,
    threads: Option<usize>,
) -> Result<Vec<SimulationReport>, SimulationError> {
    if min_servers == 0 || min_servers > max_servers {
        return Err(ConfigError::EmptySweep {
            min: min_servers,
            max: max_servers,
        }
        .into());
    }
    let simulations = (min_servers..=max_servers)
        .map(|n| Simulation::new(base.with_servers(n)))
        .collect::<Result<Vec<_>, _>>()?;

    info!(
        scenarios = simulations.len(),
        min_servers, max_servers, "starting checkout sweep"
    );
    let mut runner = ParallelRunner::new(simulations.len(), |i| simulations[i].event_loop())
        .progress(simple_progress_reporter(10));
    if let Some(n) = threads {
        runner = runner.num_threads(n);
    }
    let results = runner.run(base.horizon_minutes);

    simulations
        .iter()
        .zip(results)
        .map(|(simulation, result)| {
            let config = simulation.config();
            result
                .map(|stats| SimulationReport::from_stats(config, stats))
                .map_err(|message| SimulationError::Scenario {
                    servers: config.num_servers,
                    message,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RateUnits, TieBreak};

    fn config() -> SimulationConfig {
        SimulationConfig {
            arrival_rate: 30.0,
            service_rate: 12.0,
            num_servers: 3,
            horizon_minutes: 240.0,
            seed: 11,
            tie_break: TieBreak::FirstIndex,
            rate_units: RateUnits::PerHour,
        }
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let bad = SimulationConfig {
            num_servers: 0,
            ..config()
        };
        assert!(matches!(
            Simulation::new(bad),
            Err(SimulationError::Config(ConfigError::NoServers))
        ));
    }

    #[test]
    fn report_has_one_entry_per_checkout() {
        let report = Simulation::new(config()).unwrap().run();

        assert_eq!(report.servers.len(), 3);
        assert_eq!(
            report.servers.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(report.metrics.utilization.len(), 3);
        assert_eq!(
            report.servers.iter().map(|s| s.served).sum::<usize>(),
            report.metrics.customers_served
        );
    }

    #[test]
    fn customers_are_either_done_or_still_inside() {
        let report = Simulation::new(config()).unwrap().run();

        assert_eq!(
            report.metrics.customers_arrived,
            report.metrics.customers_served + report.customers_in_flight
        );
        assert_eq!(
            report.customers_in_flight,
            report.customers_in_service + report.customers_waiting
        );
        assert!(report.customers_in_service <= 3);
    }

    #[test]
    fn sweep_is_ordered_by_checkout_count() {
        let reports = sweep(&config(), 1, 4, Some(2)).unwrap();

        assert_eq!(
            reports.iter().map(|r| r.config.num_servers).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
        let single = Simulation::new(config().with_servers(3)).unwrap().run();
        assert_eq!(reports[2], single);
    }

    #[test]
    fn empty_sweep_is_an_error() {
        assert!(matches!(
            sweep(&config(), 3, 2, None),
            Err(SimulationError::Config(ConfigError::EmptySweep { min: 3, max: 2 }))
        ));
        assert!(matches!(
            sweep(&config(), 0, 2, None),
            Err(SimulationError::Config(ConfigError::EmptySweep { .. }))
        ));
    }
}
