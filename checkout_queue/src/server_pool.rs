use std::collections::VecDeque;

use des::{Agent, Response};
use tracing::{debug, trace, warn};

use crate::config::TieBreak;
use crate::rng::SimRng;
use crate::routing::{choose_server, wait_estimate};
use crate::{Customer, Event, Stats};

/// One checkout: capacity 1 with a FIFO line behind it
#[derive(Debug, Clone)]
pub struct Server {
    index: usize,
    holder: Option<Customer>,
    queue: VecDeque<Customer>,
    busy_time: f64,
    last_release_t: f64,
    served: usize,
    service_end_t: Option<f64>,
}

impl Server {
    pub fn new(index: usize) -> Server {
        Server {
            index,
            holder: None,
            queue: VecDeque::new(),
            busy_time: 0.0,
            last_release_t: 0.0,
            served: 0,
            service_end_t: None,
        }
    }

    /// 1-based checkout number.
    pub fn id(&self) -> usize {
        self.index + 1
    }

    pub fn is_busy(&self) -> bool {
        self.holder.is_some()
    }

    /// Customers waiting behind the current holder.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn busy_time(&self) -> f64 {
        self.busy_time
    }

    pub fn last_release_t(&self) -> f64 {
        self.last_release_t
    }

    /// Grant the checkout if idle, otherwise line the customer up.
    /// Returns whether the customer holds the checkout now.
    pub fn request(&mut self, customer: Customer) -> bool {
        if self.holder.is_none() {
            self.holder = Some(customer);
            true
        } else {
            self.queue.push_back(customer);
            false
        }
    }

    /// Service time is accounted in full when service begins.
    pub fn start_service(&mut self, current_t: f64, duration: f64) {
        self.busy_time += duration;
        self.service_end_t = Some(current_t + duration);
    }

    /// Release by `customer` at `current_t`. Hands the checkout to the next
    /// customer in line and returns them.
    pub fn release(&mut self, current_t: f64, customer: &Customer) -> Option<Customer> {
        match self.holder {
            Some(holder) if holder.id == customer.id => {}
            _ => {
                warn!(
                    checkout = self.id(),
                    customer = customer.id,
                    "release by a customer that does not hold the checkout"
                );
                return None;
            }
        }
        self.last_release_t = current_t;
        self.served += 1;
        self.service_end_t = None;
        self.holder = self.queue.pop_front();
        self.holder
    }

    pub fn stats(&self) -> ServerStats {
        ServerStats {
            id: self.id(),
            busy: self.is_busy(),
            queue_length: self.queue.len(),
            busy_time: self.busy_time,
            last_release_t: self.last_release_t,
            served: self.served,
            service_end_t: self.service_end_t,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerStats {
    pub id: usize,
    pub busy: bool,
    pub queue_length: usize,
    pub busy_time: f64,
    pub last_release_t: f64,
    pub served: usize,
    /// End of the service in progress, if any.
    pub service_end_t: Option<f64>,
}

impl ServerStats {
    /// Part of `busy_time` that lies after `horizon` because the service in
    /// progress was accounted when it started.
    pub fn busy_beyond(&self, horizon: f64) -> f64 {
        self.service_end_t
            .map(|end| (end - horizon).max(0.0))
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoolStats {
    pub servers: Vec<ServerStats>,
}

impl PoolStats {
    pub fn total_queued(&self) -> usize {
        self.servers.iter().map(|s| s.queue_length).sum()
    }

    pub fn busy_count(&self) -> usize {
        self.servers.iter().filter(|s| s.busy).count()
    }
}

/// The bank of checkouts
pub struct ServerPool {
    servers: Vec<Server>,
    estimate_rate_per_minute: f64,
    tie_break: TieBreak,
    rng: SimRng,
}

impl ServerPool {
    pub fn new(
        num_servers: usize,
        estimate_rate_per_minute: f64,
        tie_break: TieBreak,
        rng: SimRng,
    ) -> ServerPool {
        ServerPool {
            servers: (0..num_servers).map(Server::new).collect(),
            estimate_rate_per_minute,
            tie_break,
            rng,
        }
    }

    pub fn total_queued(&self) -> usize {
        self.servers.iter().map(Server::queue_len).sum()
    }

    pub fn wait_estimates(&self) -> Vec<f64> {
        self.servers
            .iter()
            .map(|s| wait_estimate(s.last_release_t, s.queue_len(), self.estimate_rate_per_minute))
            .collect()
    }

    /// Checkout an arriving customer would join right now.
    pub fn route(&self) -> Option<usize> {
        choose_server(&self.wait_estimates(), self.tie_break, &self.rng)
    }
}

impl Agent<Event, Stats> for ServerPool {
    fn act(&mut self, current_t: f64, data: &Event) -> Response<Event, Stats> {
        match data {
            Event::CustomerArrived { customer_id } => {
                // sampled before the newcomer joins a line
                let queued = self.total_queued();
                let Some(server) = self.route() else {
                    return Response::new();
                };
                let customer = Customer {
                    id: *customer_id,
                    arrival_t: current_t,
                    server,
                };
                debug!(
                    t = current_t,
                    customer = customer.id,
                    checkout = server + 1,
                    "customer joined checkout line"
                );
                Response::event(current_t, Event::CustomerRouted { customer, queued })
            }
            Event::ServerRequested { customer } => {
                let Some(server) = self.servers.get_mut(customer.server) else {
                    return Response::new();
                };
                if server.request(*customer) {
                    Response::event(current_t, Event::ServerAcquired { customer: *customer })
                } else {
                    trace!(
                        t = current_t,
                        customer = customer.id,
                        checkout = server.id(),
                        ahead = server.queue_len() - 1,
                        "checkout busy, customer waits"
                    );
                    Response::new()
                }
            }
            Event::ServiceStarted { customer, duration } => {
                if let Some(server) = self.servers.get_mut(customer.server) {
                    server.start_service(current_t, *duration);
                }
                Response::new()
            }
            Event::ServerReleased { customer } => {
                let Some(server) = self.servers.get_mut(customer.server) else {
                    return Response::new();
                };
                match server.release(current_t, customer) {
                    Some(next) => Response::event(current_t, Event::ServerAcquired { customer: next }),
                    None => Response::new(),
                }
            }
            _ => Response::new(),
        }
    }

    fn stats(&self) -> Stats {
        Stats::PoolStats(PoolStats {
            servers: self.servers.iter().map(Server::stats).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(id: usize, arrival_t: f64, server: usize) -> Customer {
        Customer { id, arrival_t, server }
    }

    #[test]
    fn idle_server_grants_then_queues() {
        let mut server = Server::new(0);
        assert!(server.request(customer(1, 0.0, 0)));
        assert!(!server.request(customer(2, 1.0, 0)));
        assert!(!server.request(customer(3, 2.0, 0)));

        assert!(server.is_busy());
        assert_eq!(server.queue_len(), 2);
    }

    #[test]
    fn release_hands_over_in_fifo_order() {
        let mut server = Server::new(2);
        server.request(customer(1, 0.0, 2));
        server.request(customer(2, 1.0, 2));
        server.request(customer(3, 2.0, 2));

        let next = server.release(10.0, &customer(1, 0.0, 2));
        assert_eq!(next.map(|c| c.id), Some(2));
        assert_eq!(server.last_release_t(), 10.0);

        let next = server.release(15.0, &customer(2, 1.0, 2));
        assert_eq!(next.map(|c| c.id), Some(3));

        let next = server.release(18.0, &customer(3, 2.0, 2));
        assert_eq!(next, None);
        assert!(!server.is_busy());
        assert_eq!(server.stats().served, 3);
        assert_eq!(server.id(), 3);
    }

    #[test]
    fn release_by_non_holder_is_ignored() {
        let mut server = Server::new(0);
        server.request(customer(1, 0.0, 0));
        server.request(customer(2, 0.5, 0));

        assert_eq!(server.release(4.0, &customer(2, 0.5, 0)), None);
        assert!(server.is_busy());
        assert_eq!(server.queue_len(), 1);
        assert_eq!(server.last_release_t(), 0.0);
    }

    #[test]
    fn busy_time_is_accounted_at_service_start() {
        let mut server = Server::new(0);
        server.request(customer(1, 0.0, 0));
        server.start_service(100.0, 30.0);

        assert_eq!(server.busy_time(), 30.0);
        let stats = server.stats();
        assert_eq!(stats.service_end_t, Some(130.0));
        assert_eq!(stats.busy_beyond(120.0), 10.0);
        assert_eq!(stats.busy_beyond(200.0), 0.0);
    }

    #[test]
    fn fresh_pool_routes_to_first_checkout() {
        let pool = ServerPool::new(4, 0.5, TieBreak::FirstIndex, SimRng::seed_from_u64(1));
        assert_eq!(pool.wait_estimates(), vec![2.0; 4]);
        assert_eq!(pool.route(), Some(0));
    }
}
