use des::{Agent, Response};

use crate::rng::{Exponential, SimRng};
use crate::service::ServiceProcess;
use crate::{Event, Stats};

/// Poisson stream of customers
///
/// On each timer tick a new customer is numbered and announced; once the
/// pool has routed them, a [`ServiceProcess`] is spawned to carry the
/// customer through their checkout.
pub struct ArrivalProcess {
    rng: SimRng,
    inter_arrival: Exponential,
    service_time: Exponential,
    stats: ArrivalStats,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrivalStats {
    pub customers_arrived: usize,
    pub last_arrival_t: Option<f64>,
}

impl ArrivalProcess {
    pub fn new(inter_arrival: Exponential, service_time: Exponential, rng: SimRng) -> ArrivalProcess {
        ArrivalProcess {
            rng,
            inter_arrival,
            service_time,
            stats: ArrivalStats::default(),
        }
    }

    fn next_arrival(&self, current_t: f64) -> (f64, Event) {
        (current_t + self.rng.sample(&self.inter_arrival), Event::ArrivalDue)
    }
}

impl Agent<Event, Stats> for ArrivalProcess {
    fn act(&mut self, current_t: f64, data: &Event) -> Response<Event, Stats> {
        match data {
            Event::Start => Response::events(vec![self.next_arrival(current_t)]),
            Event::ArrivalDue => {
                self.stats.customers_arrived += 1;
                self.stats.last_arrival_t = Some(current_t);
                let customer_id = self.stats.customers_arrived;
                Response::events(vec![
                    (current_t, Event::CustomerArrived { customer_id }),
                    self.next_arrival(current_t),
                ])
            }
            Event::CustomerRouted { customer, .. } => {
                let service = ServiceProcess::new(*customer, self.service_time.clone(), self.rng.clone());
                Response {
                    events: vec![(current_t, Event::ServerRequested { customer: *customer })],
                    agents: vec![Box::new(service)],
                }
            }
            _ => Response::new(),
        }
    }

    fn stats(&self) -> Stats {
        Stats::ArrivalStats(self.stats.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Customer;

    fn process(seed: u64) -> ArrivalProcess {
        ArrivalProcess::new(
            Exponential::arrivals(1.0).unwrap(),
            Exponential::service(0.5).unwrap(),
            SimRng::seed_from_u64(seed),
        )
    }

    #[test]
    fn start_schedules_first_timer_in_the_future() {
        let mut arrivals = process(1);
        let response = arrivals.act(0.0, &Event::Start);

        assert_eq!(response.events.len(), 1);
        let (t, event) = &response.events[0];
        assert!(*t >= 0.0);
        assert!(matches!(event, Event::ArrivalDue));
    }

    #[test]
    fn timer_numbers_customers_from_one_and_rearms() {
        let mut arrivals = process(2);

        let response = arrivals.act(3.0, &Event::ArrivalDue);
        assert_eq!(response.events[0].0, 3.0);
        assert!(matches!(response.events[0].1, Event::CustomerArrived { customer_id: 1 }));
        assert!(matches!(response.events[1].1, Event::ArrivalDue));
        assert!(response.events[1].0 >= 3.0);

        let response = arrivals.act(4.0, &Event::ArrivalDue);
        assert!(matches!(response.events[0].1, Event::CustomerArrived { customer_id: 2 }));

        match arrivals.stats() {
            Stats::ArrivalStats(s) => {
                assert_eq!(s.customers_arrived, 2);
                assert_eq!(s.last_arrival_t, Some(4.0));
            }
            other => panic!("Expected ArrivalStats, got {:?}", other),
        }
    }

    #[test]
    fn routed_customer_gets_a_service_process_and_requests_the_checkout() {
        let mut arrivals = process(3);
        let customer = Customer {
            id: 7,
            arrival_t: 12.0,
            server: 2,
        };

        let response = arrivals.act(12.0, &Event::CustomerRouted { customer, queued: 0 });

        assert_eq!(response.agents.len(), 1);
        assert_eq!(response.events.len(), 1);
        match &response.events[0] {
            (t, Event::ServerRequested { customer: requested }) => {
                assert_eq!(*t, 12.0);
                assert_eq!(*requested, customer);
            }
            other => panic!("Expected ServerRequested, got {:?}", other.1),
        }
    }
}
