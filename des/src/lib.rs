//! Minimal discrete-event engine.
//!
//! Agents react to broadcast events and answer with a [`Response`]: more
//! events to schedule (absolute simulated times) and, optionally, new agents
//! to add to the loop. Time is real-valued. Events that share a timestamp are
//! delivered in the order they were scheduled.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tracing::{trace, warn};

pub mod parallel;

struct Event<T> {
    t: f64,
    seq: u64,
    data: T,
}

impl<T> PartialEq for Event<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Event<T> {}

impl<T> Ord for Event<T> {
    // BinaryHeap is a max-heap: earliest time, then lowest sequence, wins.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .t
            .total_cmp(&self.t)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T> PartialOrd for Event<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// What an agent asks of the loop after handling an event.
pub struct Response<T, S> {
    pub events: Vec<(f64, T)>,
    pub agents: Vec<Box<dyn Agent<T, S>>>,
}

impl<T, S> Response<T, S> {
    pub fn new() -> Response<T, S> {
        Response {
            events: Vec::new(),
            agents: Vec::new(),
        }
    }

    pub fn event(t: f64, data: T) -> Response<T, S> {
        Response {
            events: vec![(t, data)],
            agents: Vec::new(),
        }
    }

    pub fn events(events: Vec<(f64, T)>) -> Response<T, S> {
        Response {
            events,
            agents: Vec::new(),
        }
    }
}

impl<T, S> Default for Response<T, S> {
    fn default() -> Self {
        Response::new()
    }
}

pub trait Agent<T, S> {
    fn act(&mut self, _current_t: f64, _data: &T) -> Response<T, S> {
        Response::new()
    }

    fn stats(&self) -> S;

    /// Finished agents are dropped from the loop after the current broadcast.
    fn is_done(&self) -> bool {
        false
    }
}

pub struct EventLoop<T, S> {
    queue: BinaryHeap<Event<T>>,
    current_t: f64,
    next_seq: u64,
    agents: Vec<Box<dyn Agent<T, S>>>,
}

impl<T, S> EventLoop<T, S> {
    pub fn new(events: Vec<(f64, T)>, agents: Vec<Box<dyn Agent<T, S>>>) -> EventLoop<T, S> {
        let mut event_loop = EventLoop {
            queue: BinaryHeap::new(),
            current_t: 0.0,
            next_seq: 0,
            agents,
        };
        for (t, data) in events {
            event_loop.schedule(t, data);
        }
        event_loop
    }

    /// Queue `data` for delivery at absolute time `t`.
    ///
    /// Returns `false` (and drops the event) when `t` is not finite or lies
    /// before the current time.
    pub fn schedule(&mut self, t: f64, data: T) -> bool {
        if !t.is_finite() || t < self.current_t {
            warn!(t, current_t = self.current_t, "dropping event scheduled in the past");
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Event { t, seq, data });
        true
    }

    pub fn current_t(&self) -> f64 {
        self.current_t
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    fn broadcast(&mut self, event: Event<T>) {
        self.current_t = event.t;
        trace!(t = event.t, seq = event.seq, agents = self.agents.len(), "broadcast");

        let mut scheduled = Vec::new();
        let mut new_agents = Vec::new();
        for agent in &mut self.agents {
            let response = agent.act(self.current_t, &event.data);
            scheduled.extend(response.events);
            new_agents.extend(response.agents);
        }

        self.agents.retain(|agent| !agent.is_done());
        self.agents.extend(new_agents);
        for (t, data) in scheduled {
            self.schedule(t, data);
        }
    }

    /// Process every event strictly before `until`, then park the clock at
    /// `until`. Events at or after the horizon stay queued and are never
    /// delivered by this call.
    pub fn run(&mut self, until: f64) {
        while let Some(next) = self.queue.peek() {
            if next.t >= until {
                break;
            }
            if let Some(event) = self.queue.pop() {
                self.broadcast(event);
            }
        }
        if until.is_finite() && until > self.current_t {
            self.current_t = until;
        }
    }

    pub fn stats(&self) -> Vec<S> {
        self.agents.iter().map(|agent| agent.stats()).collect()
    }
}
