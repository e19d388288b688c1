//! Round-robin self-play over a policy roster.
//!
//! Every ordered pair `(a, b)` in roster × roster (mirror matches included)
//! plays every seed. Matches are independent and run on the rayon pool; the
//! log list is always returned in canonical `(a, b, seed)` order.

use rayon::prelude::*;
use tracing::{debug, info};

use super::deterministic::policy_seed;
use super::policy::{PolicyKind, ScriptedPolicy};
use super::simulator::MatchRunner;
use crate::error::{CoreError, Result};
use crate::models::{GameLog, GameSpec, Team};

pub struct SelfPlayRunner {
    roster: Vec<PolicyKind>,
    /// Dedicated pool; `None` uses the global rayon pool.
    pool: Option<rayon::ThreadPool>,
}

/// One scheduled match.
#[derive(Debug, Clone, Copy)]
struct MatchJob {
    index: usize,
    policy_a: PolicyKind,
    policy_b: PolicyKind,
    seed: u64,
}

impl SelfPlayRunner {
    /// `workers` caps parallelism; `Some(1)` runs sequentially.
    pub fn new(roster: Vec<PolicyKind>, workers: Option<usize>) -> Result<Self> {
        if roster.is_empty() {
            return Err(CoreError::EmptyRoster);
        }
        let pool = match workers {
            Some(n) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n.max(1))
                    .build()
                    .map_err(|e| CoreError::WorkerPool(e.to_string()))?,
            ),
            None => None,
        };
        Ok(Self { roster, pool })
    }

    pub fn roster(&self) -> &[PolicyKind] {
        &self.roster
    }

    pub fn roster_names(&self) -> Vec<&'static str> {
        self.roster.iter().map(|k| k.name()).collect()
    }

    /// Number of matches one pass over `seed_count` seeds plays.
    pub fn match_count(&self, seed_count: usize) -> usize {
        self.roster.len() * self.roster.len() * seed_count
    }

    fn jobs(&self, seeds: &[u64]) -> Vec<MatchJob> {
        let mut jobs = Vec::with_capacity(self.match_count(seeds.len()));
        for &policy_a in &self.roster {
            for &policy_b in &self.roster {
                for &seed in seeds {
                    jobs.push(MatchJob {
                        index: jobs.len(),
                        policy_a,
                        policy_b,
                        seed,
                    });
                }
            }
        }
        jobs
    }

    /// Play one match with freshly built policies.
    pub fn play(&self, runner: &MatchRunner<'_>, spec: &GameSpec, a: PolicyKind, b: PolicyKind, seed: u64) -> GameLog {
        let grid = runner.grid();
        let mut policy_a = ScriptedPolicy::build(a, Team::A, spec, grid, policy_seed(seed, a.name(), Team::A));
        let mut policy_b = ScriptedPolicy::build(b, Team::B, spec, grid, policy_seed(seed, b.name(), Team::B));
        runner.run(seed, &mut policy_a, &mut policy_b)
    }

    /// Run the full round-robin. Empty `seeds` gives an empty log list.
    pub fn run(&self, spec: &GameSpec, seeds: &[u64]) -> Vec<GameLog> {
        let jobs = self.jobs(seeds);
        info!(
            matches = jobs.len(),
            policies = self.roster.len(),
            seeds = seeds.len(),
            "self-play started"
        );

        let runner = MatchRunner::new(spec);
        let play_all = || {
            let mut logs: Vec<(usize, GameLog)> = jobs
                .par_iter()
                .map(|job| (job.index, self.play(&runner, spec, job.policy_a, job.policy_b, job.seed)))
                .collect();
            logs.sort_by_key(|(index, _)| *index);
            logs.into_iter().map(|(_, log)| log).collect::<Vec<_>>()
        };
        let logs = match &self.pool {
            Some(pool) => pool.install(play_all),
            None => play_all(),
        };

        debug!(
            captures = logs.iter().filter(|l| l.winner.is_some()).count(),
            "self-play finished"
        );
        logs
    }

    /// Sequential run, used where scheduling must be ruled out as a cause
    /// of differences.
    pub fn run_sequential(&self, spec: &GameSpec, seeds: &[u64]) -> Vec<GameLog> {
        let runner = MatchRunner::new(spec);
        self.jobs(seeds)
            .iter()
            .map(|job| self.play(&runner, spec, job.policy_a, job.policy_b, job.seed))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec_gen::default_gamespec;

    #[test]
    fn test_empty_roster_rejected() {
        assert!(matches!(SelfPlayRunner::new(vec![], None), Err(CoreError::EmptyRoster)));
    }

    #[test]
    fn test_canonical_order_and_count() {
        let spec = default_gamespec(1337);
        let runner = SelfPlayRunner::new(PolicyKind::default_roster(), Some(2)).unwrap();
        let seeds = [5, 9];
        let logs = runner.run(&spec, &seeds);
        assert_eq!(logs.len(), 4 * 4 * 2);

        let names = runner.roster_names();
        let mut i = 0;
        for a in &names {
            for b in &names {
                for seed in seeds {
                    assert_eq!(logs[i].policy_a, *a);
                    assert_eq!(logs[i].policy_b, *b);
                    assert_eq!(logs[i].seed, seed);
                    i += 1;
                }
            }
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let spec = default_gamespec(1337);
        let runner = SelfPlayRunner::new(PolicyKind::default_roster(), Some(4)).unwrap();
        let seeds = [1337, 1354, 1371];
        assert_eq!(runner.run(&spec, &seeds), runner.run_sequential(&spec, &seeds));
    }

    #[test]
    fn test_empty_seeds_give_empty_logs() {
        let spec = default_gamespec(1337);
        let runner = SelfPlayRunner::new(vec![PolicyKind::Camper], None).unwrap();
        assert!(runner.run(&spec, &[]).is_empty());
    }

    #[test]
    fn test_single_policy_roster_plays_mirror_match() {
        let spec = default_gamespec(1337);
        let runner = SelfPlayRunner::new(vec![PolicyKind::GreedyShortestPath], Some(1)).unwrap();
        let logs = runner.run(&spec, &[1, 2, 3]);
        assert_eq!(logs.len(), 3);
        assert!(logs.iter().all(|l| l.policy_a == l.policy_b));
    }
}
