use des::{Agent, Response};
use tracing::debug;

use crate::rng::{Exponential, SimRng};
use crate::{Customer, Event, Stats};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Waiting,
    InService,
    Departed,
}

/// One customer's stay at a checkout
///
/// Waits for the pool to grant the checkout, draws a service time, holds the
/// checkout for that long and then releases it. The process retires from the
/// event loop once the customer has departed.
pub struct ServiceProcess {
    customer: Customer,
    service_time: Exponential,
    rng: SimRng,
    phase: Phase,
    stats: ServiceStats,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceStats {
    pub customer_id: usize,
    pub server: usize,
    pub arrival_t: f64,
    pub service_start_t: Option<f64>,
    pub service_duration: Option<f64>,
}

impl ServiceStats {
    pub fn in_service(&self) -> bool {
        self.service_start_t.is_some()
    }
}

impl ServiceProcess {
    pub fn new(customer: Customer, service_time: Exponential, rng: SimRng) -> ServiceProcess {
        ServiceProcess {
            customer,
            service_time,
            rng,
            phase: Phase::Waiting,
            stats: ServiceStats {
                customer_id: customer.id,
                server: customer.server,
                arrival_t: customer.arrival_t,
                service_start_t: None,
                service_duration: None,
            },
        }
    }

    fn is_mine(&self, customer: &Customer) -> bool {
        customer.id == self.customer.id
    }
}

impl Agent<Event, Stats> for ServiceProcess {
    fn act(&mut self, current_t: f64, data: &Event) -> Response<Event, Stats> {
        match data {
            Event::ServerAcquired { customer } if self.is_mine(customer) && self.phase == Phase::Waiting => {
                let duration = self.rng.sample(&self.service_time);
                self.phase = Phase::InService;
                self.stats.service_start_t = Some(current_t);
                self.stats.service_duration = Some(duration);
                debug!(
                    t = current_t,
                    customer = self.customer.id,
                    checkout = self.customer.server + 1,
                    duration,
                    "service started"
                );
                // ServiceStarted goes out first so busy time is booked now.
                Response::events(vec![
                    (current_t, Event::ServiceStarted { customer: self.customer, duration }),
                    (current_t + duration, Event::ServerReleased { customer: self.customer }),
                ])
            }
            Event::ServerReleased { customer } if self.is_mine(customer) && self.phase == Phase::InService => {
                self.phase = Phase::Departed;
                debug!(
                    t = current_t,
                    customer = self.customer.id,
                    checkout = self.customer.server + 1,
                    minutes = current_t - self.customer.arrival_t,
                    "customer finished"
                );
                Response::event(
                    current_t,
                    Event::CustomerDeparted {
                        customer: self.customer,
                        departure_t: current_t,
                    },
                )
            }
            _ => Response::new(),
        }
    }

    fn stats(&self) -> Stats {
        Stats::ServiceStats(self.stats.clone())
    }

    fn is_done(&self) -> bool {
        self.phase == Phase::Departed
    }
}
