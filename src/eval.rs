//! Partial evaluation.
//!
//! Every call that passes constants to a continuation with a body is
//! redirected to a copy of the callee specialized on those constants.
//! Sweeps repeat, with straight-line merging and dead-node removal in
//! between, until one finds nothing left to specialize.

use crate::drop::Dropper;
use crate::merge::merge_lambdas;
use crate::scope::Scope;
use crate::stats::PeStats;
use crate::verify::verify;
use crate::world::World;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug)]
pub struct PeOptions {
    /// Upper bound on sweeps; `None` runs until a fixpoint.
    pub max_iterations: Option<usize>,
    /// Run the verifier after every sweep.
    pub verify: bool,
}

impl Default for PeOptions {
    fn default() -> Self {
        PeOptions {
            max_iterations: Some(128),
            verify: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Converged { iterations: usize },
    /// The sweep bound was hit while there was still work to do. The
    /// graph is valid but not fully specialized.
    GaveUp { iterations: usize },
}

impl Outcome {
    pub fn iterations(&self) -> usize {
        match *self {
            Outcome::Converged { iterations } | Outcome::GaveUp { iterations } => iterations,
        }
    }

    pub fn converged(&self) -> bool {
        matches!(self, Outcome::Converged { .. })
    }
}

#[derive(Clone, Debug)]
pub struct PeResult {
    pub outcome: Outcome,
    pub stats: PeStats,
}

pub fn partial_evaluation(
    world: &mut World,
    opts: &PeOptions,
    progress: Option<indicatif::ProgressBar>,
) -> PeResult {
    let mut stats = PeStats::new(world);
    let progress = progress.unwrap_or_else(indicatif::ProgressBar::hidden);
    if let Some(max) = opts.max_iterations {
        progress.set_length(max as u64);
    }

    let mut iterations = 0;
    let outcome = loop {
        if opts.max_iterations.map_or(false, |max| iterations >= max) {
            log::warn!(
                "partial evaluation gave up after {} sweeps; result is not fully specialized",
                iterations
            );
            break Outcome::GaveUp { iterations };
        }
        iterations += 1;

        let specialized = sweep(world, &mut stats);
        if specialized > 0 {
            stats.merges += merge_lambdas(world);
            stats.removed_nodes += world.remove_unreachable();
        }
        log::debug!(
            "sweep {}: {} calls specialized, {} continuations live",
            iterations,
            specialized,
            world.num_lambdas()
        );
        log::trace!("after sweep {}:\n{}", iterations, world.display());
        if opts.verify {
            if let Err(e) = verify(world) {
                panic!("invalid graph after sweep {}: {:#}", iterations, e);
            }
        }
        progress.inc(1);
        progress.set_message(format!("{} continuations", world.num_lambdas()));

        if specialized == 0 {
            break Outcome::Converged { iterations };
        }
    };
    progress.finish_and_clear();

    stats.finish(world, iterations);
    PeResult { outcome, stats }
}

/// Specializes every call with constant arguments once. Returns the
/// number of calls rewritten.
fn sweep(world: &mut World, stats: &mut PeStats) -> usize {
    let mut specialized = 0;
    for lambda in world.lambdas() {
        let Some(to) = world.to(lambda) else {
            continue;
        };
        if !world.is_lambda(to) || !world.has_body(to) {
            continue;
        }

        let mut indices = vec![];
        let mut with = vec![];
        let mut rest = vec![];
        for (i, &arg) in world.args(lambda).iter().enumerate() {
            if world.is_const(arg) {
                indices.push(i);
                with.push(arg);
            } else {
                rest.push(arg);
            }
        }
        if indices.is_empty() {
            continue;
        }

        log::trace!("{}: specializing call to {} on {:?}", lambda, to, indices);
        let scope = Scope::new(world, &[to]);
        let mut dropper = Dropper::new(world, &scope, &indices, &with, true);
        let new_to = dropper.run();
        stats.tail_collapses += dropper.collapsed();
        stats.add_specialization(world, to);
        world.set_jump(lambda, new_to, &rest);
        specialized += 1;
    }
    specialized
}
