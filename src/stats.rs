//! Partial-evaluation stats.

use crate::world::World;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeStats {
    pub iterations: usize,
    pub specializations: usize,
    pub tail_collapses: usize,
    pub merges: usize,
    pub removed_nodes: usize,
    pub lambdas_before: usize,
    pub defs_before: usize,
    pub lambdas_after: usize,
    pub defs_after: usize,
    /// Specializations per (debug name of the) call target.
    pub specializations_by_target: std::collections::BTreeMap<String, usize>,
}

impl PeStats {
    pub fn new(world: &World) -> Self {
        let (lambdas_before, defs_before) = count_reachable_lambdas_and_defs(world);
        Self {
            lambdas_before,
            defs_before,
            ..Default::default()
        }
    }

    pub fn add_specialization(&mut self, world: &World, target: crate::def::Def) {
        self.specializations += 1;
        *self
            .specializations_by_target
            .entry(world.name(target).to_string())
            .or_insert(0) += 1;
    }

    pub fn finish(&mut self, world: &World, iterations: usize) {
        self.iterations = iterations;
        let (lambdas, defs) = count_reachable_lambdas_and_defs(world);
        self.lambdas_after = lambdas;
        self.defs_after = defs;
    }
}

/// Counts continuations and nodes reachable from the externals.
fn count_reachable_lambdas_and_defs(world: &World) -> (usize, usize) {
    let mut queue = world.externals();
    let mut visited = queue.iter().copied().collect::<fxhash::FxHashSet<_>>();
    let mut lambdas = 0;
    while let Some(def) = queue.pop() {
        if world.is_lambda(def) {
            lambdas += 1;
        }
        let ops = world.ops(def);
        for &op in ops {
            if visited.insert(op) {
                queue.push(op);
            }
        }
    }

    (lambdas, visited.len())
}
