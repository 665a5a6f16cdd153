//! Load-balancing policies over the cluster's currently-up nodes.
use rand::seq::SliceRandom;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadBalancing {
    #[default]
    Random,
    Priority,
}

impl LoadBalancing {
    pub fn parse(name: &str) -> Result<LoadBalancing, Error> {
        match name {
            "random" => Ok(LoadBalancing::Random),
            "priority" => Ok(LoadBalancing::Priority),
            other => Err(Error::invalid_arguments(format!("unknown load-balancing policy: {other}"))),
        }
    }

    /// Picks one of `up_indices` (positions into the cluster's configured
    /// node order). `random` chooses uniformly; `priority` always takes the
    /// first, so callers get the earliest-configured node whenever it is up.
    pub(crate) fn select(&self, up_indices: &[usize]) -> Option<usize> {
        match self {
            LoadBalancing::Random => up_indices.choose(&mut rand::thread_rng()).copied(),
            LoadBalancing::Priority => up_indices.first().copied(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_always_picks_first_up() {
        let policy = LoadBalancing::Priority;
        assert_eq!(policy.select(&[2, 0, 1]), Some(2));
    }

    #[test]
    fn random_picks_among_candidates() {
        let policy = LoadBalancing::Random;
        let picked = policy.select(&[4, 7]).unwrap();
        assert!(picked == 4 || picked == 7);
    }

    #[test]
    fn empty_candidates_yields_none() {
        assert_eq!(LoadBalancing::Priority.select(&[]), None);
    }

    #[test]
    fn parse_rejects_unknown_name() {
        assert!(LoadBalancing::parse("round_robin").is_err());
    }
}
