//! Shortest-estimated-wait routing
//!
//! A customer estimates when each checkout would start serving them as the
//! checkout's last release time plus one mean service time for every queued
//! customer and for themselves. The estimate ignores whether the checkout is
//! currently serving someone, so it can diverge from the real wait.

use crate::config::TieBreak;
use crate::rng::SimRng;

/// `last_release_t + (queue_len + 1) / estimate_rate`, in minutes.
pub fn wait_estimate(last_release_t: f64, queue_len: usize, estimate_rate: f64) -> f64 {
    last_release_t + (queue_len as f64 + 1.0) / estimate_rate
}

/// Index of the smallest estimate. `None` only for an empty slice.
///
/// With [`TieBreak::Random`] a draw is taken only when two or more
/// estimates are exactly equal, so runs without ties consume the same
/// random stream under both policies.
pub fn choose_server(estimates: &[f64], tie_break: TieBreak, rng: &SimRng) -> Option<usize> {
    let best = estimates.iter().copied().reduce(f64::min)?;
    match tie_break {
        TieBreak::FirstIndex => estimates.iter().position(|e| *e == best),
        TieBreak::Random => {
            let tied: Vec<usize> = estimates
                .iter()
                .enumerate()
                .filter(|(_, e)| **e == best)
                .map(|(i, _)| i)
                .collect();
            match tied.len() {
                0 => None,
                1 => Some(tied[0]),
                n => Some(tied[rng.index(n)]),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn estimate_adds_one_service_per_customer_ahead() {
        // 12 minutes mean service
        let rate = 5.0 / 60.0;
        assert_relative_eq!(wait_estimate(0.0, 0, rate), 12.0, epsilon = 1e-9);
        assert_relative_eq!(wait_estimate(30.0, 2, rate), 66.0, epsilon = 1e-9);
    }

    #[test]
    fn picks_smallest_estimate() {
        let rng = SimRng::seed_from_u64(0);
        assert_eq!(choose_server(&[9.0, 4.0, 7.0], TieBreak::FirstIndex, &rng), Some(1));
        assert_eq!(choose_server(&[9.0, 4.0, 7.0], TieBreak::Random, &rng), Some(1));
    }

    #[test]
    fn equal_estimates_go_to_the_lowest_index() {
        let rng = SimRng::seed_from_u64(0);
        assert_eq!(choose_server(&[5.0, 3.0, 3.0, 3.0], TieBreak::FirstIndex, &rng), Some(1));
        assert_eq!(choose_server(&[2.0, 2.0], TieBreak::FirstIndex, &rng), Some(0));
    }

    #[test]
    fn single_checkout_is_always_chosen() {
        let rng = SimRng::seed_from_u64(0);
        for estimate in [0.0, 12.0, 1e9] {
            assert_eq!(choose_server(&[estimate], TieBreak::FirstIndex, &rng), Some(0));
            assert_eq!(choose_server(&[estimate], TieBreak::Random, &rng), Some(0));
        }
    }

    #[test]
    fn random_tie_break_stays_among_the_tied() {
        let rng = SimRng::seed_from_u64(99);
        let estimates = [4.0, 1.0, 8.0, 1.0, 1.0];
        let mut seen = [false; 5];
        for _ in 0..200 {
            let i = choose_server(&estimates, TieBreak::Random, &rng).unwrap();
            seen[i] = true;
        }
        assert_eq!(seen, [false, true, false, true, true]);
    }

    #[test]
    fn no_checkouts_no_choice() {
        let rng = SimRng::seed_from_u64(0);
        assert_eq!(choose_server(&[], TieBreak::FirstIndex, &rng), None);
    }
}
