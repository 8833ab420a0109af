//! Scopes: the continuations nested in one or more entries.
//!
//! A continuation is nested in a scope if it is an entry, or if (through
//! structural operands) it uses a parameter of a continuation already in
//! the scope. Only nested continuations reachable from an entry along
//! successor edges are members. Everything else a member refers to is a
//! free value: referenced, never owned or cloned.
//!
//! Scopes are snapshots. Any mutation of the graph may invalidate one;
//! recompute rather than reuse.

use crate::def::{Def, NodeKind};
use crate::lambda::LambdaSet;
use crate::world::World;
use fxhash::{FxHashMap, FxHashSet};
use std::collections::{BTreeSet, VecDeque};

#[derive(Clone, Debug)]
pub struct Scope {
    entries: Vec<Def>,
    /// Members in reverse postorder, entries first.
    rpo: Vec<Def>,
    rpo_index: FxHashMap<Def, usize>,
    succs: FxHashMap<Def, Vec<Def>>,
    preds: FxHashMap<Def, Vec<Def>>,
}

/// Values a scope refers to but does not own.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FreeValues {
    pub params: BTreeSet<Def>,
    pub lambdas: BTreeSet<Def>,
}

impl Scope {
    pub fn new(world: &World, entries: &[Def]) -> Scope {
        for &entry in entries {
            assert!(world.is_lambda(entry), "scope entry {} is not a continuation", entry);
        }
        let nested = collect_nested(world, entries);
        let rpo = compute_rpo(world, entries, &nested);
        let rpo_index = rpo
            .iter()
            .enumerate()
            .map(|(i, &lambda)| (lambda, i))
            .collect::<FxHashMap<_, _>>();

        let mut succs: FxHashMap<Def, Vec<Def>> = FxHashMap::default();
        let mut preds: FxHashMap<Def, Vec<Def>> = FxHashMap::default();
        for &lambda in &rpo {
            preds.entry(lambda).or_default();
            let lambda_succs = world
                .succs(lambda)
                .into_iter()
                .filter(|succ| rpo_index.contains_key(succ))
                .collect::<Vec<_>>();
            for &succ in &lambda_succs {
                preds.entry(succ).or_default().push(lambda);
            }
            succs.insert(lambda, lambda_succs);
        }

        log::trace!("scope of {:?}: {:?}", entries, rpo);
        Scope {
            entries: entries.to_vec(),
            rpo,
            rpo_index,
            succs,
            preds,
        }
    }

    /// The scope of the whole world: one entry per top-level
    /// continuation with a body.
    pub fn for_world(world: &World) -> Scope {
        let entries = world
            .lambdas()
            .into_iter()
            .filter(|&lambda| world.has_body(lambda) && is_top_level(world, lambda))
            .collect::<Vec<_>>();
        Scope::new(world, &entries)
    }

    pub fn entries(&self) -> &[Def] {
        &self.entries[..]
    }

    pub fn entry(&self) -> Def {
        assert_eq!(self.entries.len(), 1, "scope has more than one entry");
        self.entries[0]
    }

    pub fn is_entry(&self, lambda: Def) -> bool {
        self.entries.contains(&lambda)
    }

    pub fn rpo(&self) -> &[Def] {
        &self.rpo[..]
    }

    /// Members other than the entries, in reverse postorder.
    pub fn body(&self) -> &[Def] {
        &self.rpo[self.entries.len()..]
    }

    pub fn rpo_index(&self, lambda: Def) -> Option<usize> {
        self.rpo_index.get(&lambda).copied()
    }

    pub fn contains(&self, lambda: Def) -> bool {
        self.rpo_index.contains_key(&lambda)
    }

    pub fn len(&self) -> usize {
        self.rpo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rpo.is_empty()
    }

    /// Successors of a member, restricted to members.
    pub fn succs(&self, lambda: Def) -> &[Def] {
        self.succs.get(&lambda).map(|v| &v[..]).unwrap_or(&[])
    }

    /// Predecessors of a member, restricted to members.
    pub fn preds(&self, lambda: Def) -> &[Def] {
        self.preds.get(&lambda).map(|v| &v[..]).unwrap_or(&[])
    }

    /// Parameters and continuations used by members that the scope does
    /// not own.
    pub fn free_values(&self, world: &World) -> FreeValues {
        let mut free = FreeValues::default();
        let mut visited = FxHashSet::default();
        let mut stack = vec![];
        for &lambda in &self.rpo {
            stack.extend(world.ops(lambda).iter().copied());
        }
        while let Some(def) = stack.pop() {
            if !visited.insert(def) {
                continue;
            }
            match world.kind(def) {
                NodeKind::Param { lambda, .. } => {
                    if !self.contains(lambda) {
                        free.params.insert(def);
                    }
                }
                NodeKind::Lambda => {
                    if !self.contains(def) {
                        free.lambdas.insert(def);
                    }
                }
                _ => stack.extend(world.ops(def).iter().copied()),
            }
        }
        free
    }
}

/// Entries plus every continuation using a parameter of one of them,
/// transitively.
fn collect_nested(world: &World, entries: &[Def]) -> LambdaSet {
    let mut nested = entries.iter().copied().collect::<LambdaSet>();
    let mut queue = entries
        .iter()
        .flat_map(|&entry| world.params(entry).iter().copied())
        .collect::<VecDeque<_>>();
    let mut visited = FxHashSet::default();

    while let Some(def) = queue.pop_front() {
        for u in world.uses(def) {
            if world.is_lambda(u.user) {
                if nested.insert(u.user) {
                    queue.extend(world.params(u.user).iter().copied());
                }
            } else if visited.insert(u.user) {
                queue.push_back(u.user);
            }
        }
    }
    nested
}

/// Reverse postorder over nested continuations, entries first.
fn compute_rpo(world: &World, entries: &[Def], nested: &LambdaSet) -> Vec<Def> {
    let mut visited = entries.iter().copied().collect::<FxHashSet<_>>();
    let mut postorder = vec![];

    for &entry in entries {
        let mut stack = vec![(entry, succs_in(world, entry, nested), 0usize)];
        while let Some((lambda, succs, next)) = stack.last_mut() {
            if let Some(&succ) = succs.get(*next) {
                *next += 1;
                if visited.insert(succ) {
                    let succ_succs = succs_in(world, succ, nested);
                    stack.push((succ, succ_succs, 0));
                }
            } else {
                let lambda = *lambda;
                stack.pop();
                if !entries.contains(&lambda) {
                    postorder.push(lambda);
                }
            }
        }
    }

    postorder.reverse();
    entries.iter().copied().chain(postorder).collect()
}

fn succs_in(world: &World, lambda: Def, nested: &LambdaSet) -> Vec<Def> {
    world
        .succs(lambda)
        .into_iter()
        .filter(|succ| nested.contains(succ))
        .collect()
}

/// A continuation is top-level if its jump mentions no parameter but
/// its own.
fn is_top_level(world: &World, lambda: Def) -> bool {
    let mut visited = FxHashSet::default();
    let mut stack = world.ops(lambda).to_vec();
    while let Some(def) = stack.pop() {
        if !visited.insert(def) {
            continue;
        }
        match world.kind(def) {
            NodeKind::Param { lambda: owner, .. } if owner != lambda => return false,
            NodeKind::Param { .. } | NodeKind::Lambda => {}
            _ => stack.extend(world.ops(def).iter().copied()),
        }
    }
    true
}

impl World {
    /// Is `lambda` closed, i.e. does neither it nor anything it refers
    /// to mention a parameter it does not own?
    pub fn is_closed(&self, lambda: Def) -> bool {
        let mut visited = FxHashSet::default();
        self.is_closed_rec(lambda, &mut visited)
    }

    fn is_closed_rec(&self, lambda: Def, visited: &mut FxHashSet<Def>) -> bool {
        if !visited.insert(lambda) {
            return true;
        }
        let scope = Scope::new(self, &[lambda]);
        let free = scope.free_values(self);
        free.params.is_empty()
            && free
                .lambdas
                .iter()
                .all(|&other| self.is_closed_rec(other, visited))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def::RelOpKind;

    /// `f(x, ret) = branch(x == 0, a, b); a() = ret(x); b() = g(x, ret)`
    /// with `g` a separate top-level function.
    fn diamond() -> (World, [Def; 5]) {
        let mut w = World::new();
        let u32t = w.type_u32();
        let pi0 = w.pi(&[]);
        let ret_pi = w.pi(&[u32t]);
        let fpi = w.pi(&[u32t, ret_pi]);
        let f = w.lambda(fpi, "f");
        let g = w.lambda(fpi, "g");
        let a = w.lambda(pi0, "a");
        let b = w.lambda(pi0, "b");
        let (x, ret) = (w.param(f, 0), w.param(f, 1));
        let zero = w.lit_u32(0);
        let cond = w.relop(RelOpKind::Eq, x, zero);
        w.branch(f, cond, a, b);
        w.set_jump(a, ret, &[x]);
        w.set_jump(b, g, &[x, ret]);
        let (gx, gret) = (w.param(g, 0), w.param(g, 1));
        w.set_jump(g, gret, &[gx]);
        (w, [f, g, a, b, ret])
    }

    #[test]
    fn members_are_nested_continuations() {
        let (w, [f, g, a, b, _]) = diamond();
        let scope = Scope::new(&w, &[f]);
        assert_eq!(scope.entry(), f);
        assert_eq!(scope.rpo()[0], f);
        assert_eq!(scope.len(), 3);
        assert!(scope.contains(a) && scope.contains(b));
        assert!(!scope.contains(g));
        assert_eq!(scope.succs(f).len(), 2);
        assert_eq!(scope.preds(a), &[f]);
        assert!(scope.succs(b).is_empty());

        let free = scope.free_values(&w);
        assert!(free.params.is_empty());
        assert_eq!(free.lambdas, BTreeSet::from([g]));
    }

    #[test]
    fn scope_is_closed_under_operands() {
        let (w, [f, ..]) = diamond();
        let scope = Scope::new(&w, &[f]);
        for &member in scope.rpo() {
            for &op in w.ops(member) {
                if let Some(owner) = w.param_lambda(op) {
                    assert!(scope.contains(owner));
                }
            }
        }
    }

    #[test]
    fn world_scope_has_one_entry_per_function() {
        let (w, [f, g, a, b, _]) = diamond();
        let scope = Scope::for_world(&w);
        assert_eq!(scope.entries(), &[f, g]);
        assert!(scope.contains(a) && scope.contains(b));
        assert!(!scope.is_entry(a));
    }

    #[test]
    fn closedness() {
        let (w, [f, g, a, ..]) = diamond();
        assert!(w.is_closed(f));
        assert!(w.is_closed(g));
        assert!(!w.is_closed(a));
        assert!(w.is_const(f));
        assert!(!w.is_const(a));
    }
}
