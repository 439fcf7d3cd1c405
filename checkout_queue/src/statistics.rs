//! Run statistics and summary metrics
//!
//! The collector agent appends a wait record for every departure and a
//! queue-length sample for every arrival epoch. At the end of a run these are
//! merged with the checkouts' busy times into a [`RunStatistics`], which is
//! read-only from then on.

use des::{Agent, Response};
use serde::Serialize;

use crate::error::MetricError;
use crate::{Event, Stats};

/// Time one customer spent in the bank, from arrival to departure
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WaitRecord {
    pub customer_id: usize,
    /// 0-based checkout index.
    pub server: usize,
    pub arrival_t: f64,
    pub departure_t: f64,
}

impl WaitRecord {
    pub fn wait(&self) -> f64 {
        self.departure_t - self.arrival_t
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectorStats {
    pub waits: Vec<WaitRecord>,
    pub queue_samples: Vec<usize>,
}

#[derive(Default)]
pub struct StatisticsCollector {
    stats: CollectorStats,
}

impl StatisticsCollector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Agent<Event, Stats> for StatisticsCollector {
    fn act(&mut self, _current_t: f64, data: &Event) -> Response<Event, Stats> {
        match data {
            Event::CustomerRouted { queued, .. } => {
                self.stats.queue_samples.push(*queued);
            }
            Event::CustomerDeparted {
                customer,
                departure_t,
            } => {
                self.stats.waits.push(WaitRecord {
                    customer_id: customer.id,
                    server: customer.server,
                    arrival_t: customer.arrival_t,
                    departure_t: *departure_t,
                });
            }
            _ => {}
        }
        Response::new()
    }

    fn stats(&self) -> Stats {
        Stats::CollectorStats(self.stats.clone())
    }
}

/// Everything a run recorded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStatistics {
    pub horizon: f64,
    pub waits: Vec<WaitRecord>,
    pub queue_samples: Vec<usize>,
    /// Per checkout, in checkout order.
    pub busy_time: Vec<f64>,
}

impl RunStatistics {
    pub fn new(horizon: f64, collected: CollectorStats, busy_time: Vec<f64>) -> Self {
        RunStatistics {
            horizon,
            waits: collected.waits,
            queue_samples: collected.queue_samples,
            busy_time,
        }
    }

    pub fn mean_wait(&self) -> Result<f64, MetricError> {
        if self.waits.is_empty() {
            return Err(MetricError::NoCompletedCustomers);
        }
        Ok(self.waits.iter().map(WaitRecord::wait).sum::<f64>() / self.waits.len() as f64)
    }

    /// Sample variance of the waits; needs at least two of them.
    pub fn wait_variance(&self) -> Option<f64> {
        let n = self.waits.len();
        if n < 2 {
            return None;
        }
        let mean = self.mean_wait().ok()?;
        let sum_sq: f64 = self.waits.iter().map(|w| (w.wait() - mean).powi(2)).sum();
        Some(sum_sq / (n - 1) as f64)
    }

    pub fn max_wait(&self) -> Option<f64> {
        self.waits.iter().map(WaitRecord::wait).reduce(f64::max)
    }

    pub fn mean_queue_length(&self) -> Result<f64, MetricError> {
        if self.queue_samples.is_empty() {
            return Err(MetricError::NoArrivals);
        }
        let total: usize = self.queue_samples.iter().sum();
        Ok(total as f64 / self.queue_samples.len() as f64)
    }

    /// Busy time over the horizon, per checkout and not normalised across
    /// checkouts. A service still running at the horizon counts in full.
    pub fn utilization(&self) -> Vec<f64> {
        self.busy_time
            .iter()
            .map(|busy| if self.horizon > 0.0 { busy / self.horizon } else { 0.0 })
            .collect()
    }

    pub fn metrics(&self) -> Metrics {
        Metrics {
            mean_wait_minutes: self.mean_wait().ok(),
            wait_variance: self.wait_variance(),
            max_wait_minutes: self.max_wait(),
            mean_queue_length: self.mean_queue_length().ok(),
            utilization: self.utilization(),
            customers_arrived: self.queue_samples.len(),
            customers_served: self.waits.len(),
        }
    }
}

/// Summary handed to presentation code
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    /// `None` when nobody finished before the horizon.
    pub mean_wait_minutes: Option<f64>,
    pub wait_variance: Option<f64>,
    pub max_wait_minutes: Option<f64>,
    /// `None` when nobody arrived before the horizon.
    pub mean_queue_length: Option<f64>,
    pub utilization: Vec<f64>,
    pub customers_arrived: usize,
    pub customers_served: usize,
}

impl Metrics {
    pub fn mean_wait(&self) -> Result<f64, MetricError> {
        self.mean_wait_minutes.ok_or(MetricError::NoCompletedCustomers)
    }

    pub fn mean_queue(&self) -> Result<f64, MetricError> {
        self.mean_queue_length.ok_or(MetricError::NoArrivals)
    }
}
