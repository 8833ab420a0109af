//! Control-flow queries on continuations.
//!
//! Nothing here is cached on the node: predecessors and successors are
//! recomputed from operands and use-edges on every call, so they are
//! never stale after a jump is rewritten.

use crate::def::{Def, Ops, Use};
use crate::world::World;
use fxhash::FxHashSet;
use std::collections::BTreeSet;

pub type LambdaSet = BTreeSet<Def>;

impl World {
    /// Collects the continuations embedded in `def`, looking through
    /// structural nodes. A continuation found is not entered.
    fn find_lambdas(&self, def: Def, result: &mut LambdaSet, visited: &mut FxHashSet<Def>) {
        if !visited.insert(def) {
            return;
        }
        if self.is_lambda(def) {
            result.insert(def);
            return;
        }
        for &op in self.ops(def) {
            self.find_lambdas(op, result, visited);
        }
    }

    fn find_preds(
        &self,
        u: Use,
        direct: bool,
        result: &mut LambdaSet,
        visited: &mut FxHashSet<Def>,
    ) {
        if self.is_lambda(u.user) {
            if !direct || u.index == 0 {
                result.insert(u.user);
            }
            return;
        }
        if !visited.insert(u.user) {
            return;
        }
        for &next in self.uses(u.user) {
            self.find_preds(next, direct, result, visited);
        }
    }

    /// Continuations that mention `lambda` anywhere in their jump.
    pub fn preds(&self, lambda: Def) -> LambdaSet {
        let mut result = LambdaSet::new();
        let mut visited = FxHashSet::default();
        for &u in self.uses(lambda) {
            self.find_preds(u, false, &mut result, &mut visited);
        }
        result
    }

    /// Continuations that may jump to `lambda`: it (or a value
    /// embedding it) is their jump target.
    pub fn direct_preds(&self, lambda: Def) -> LambdaSet {
        let mut result = LambdaSet::new();
        let mut visited = FxHashSet::default();
        for &u in self.uses(lambda) {
            self.find_preds(u, true, &mut result, &mut visited);
        }
        result
    }

    /// Continuations reachable from the jump target and arguments.
    pub fn succs(&self, lambda: Def) -> LambdaSet {
        let mut result = LambdaSet::new();
        let mut visited = FxHashSet::default();
        for &op in self.ops(lambda) {
            self.find_lambdas(op, &mut result, &mut visited);
        }
        result
    }

    /// Continuations reachable from the jump target only.
    pub fn targets(&self, lambda: Def) -> LambdaSet {
        let mut result = LambdaSet::new();
        if let Some(to) = self.to(lambda) {
            self.find_lambdas(to, &mut result, &mut FxHashSet::default());
        }
        result
    }

    /// Continuations passed as (part of) arguments.
    pub fn higher_order_args(&self, lambda: Def) -> LambdaSet {
        let mut result = LambdaSet::new();
        let mut visited = FxHashSet::default();
        for &arg in self.args(lambda) {
            self.find_lambdas(arg, &mut result, &mut visited);
        }
        result
    }

    fn is_pi_typed(&self, def: Def) -> bool {
        let ty = self.ty(def);
        self.is_pi(ty)
    }

    /// Parameters that carry plain values.
    pub fn fo_params(&self, lambda: Def) -> Ops {
        self.params(lambda)
            .iter()
            .copied()
            .filter(|&param| !self.is_pi_typed(param))
            .collect()
    }

    /// Parameters that carry continuations.
    pub fn ho_params(&self, lambda: Def) -> Ops {
        self.params(lambda)
            .iter()
            .copied()
            .filter(|&param| self.is_pi_typed(param))
            .collect()
    }

    pub fn fo_args(&self, lambda: Def) -> Ops {
        self.args(lambda)
            .iter()
            .copied()
            .filter(|&arg| !self.is_pi_typed(arg))
            .collect()
    }

    pub fn ho_args(&self, lambda: Def) -> Ops {
        self.args(lambda)
            .iter()
            .copied()
            .filter(|&arg| self.is_pi_typed(arg))
            .collect()
    }

    /// No parameter takes a continuation.
    pub fn is_fo(&self, lambda: Def) -> bool {
        let pi = self.ty(lambda);
        !self.ops(pi).iter().any(|&elem| self.is_pi(elem))
    }

    pub fn is_ho(&self, lambda: Def) -> bool {
        !self.is_fo(lambda)
    }

    /// Used exactly once, and that use passes it as an argument of a
    /// jump.
    pub fn is_cascading(&self, lambda: Def) -> bool {
        let uses = self.uses(lambda);
        if uses.len() != 1 {
            return false;
        }
        uses.iter().all(|u| self.is_lambda(u.user) && u.index > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preds_and_succs_look_through_selects() {
        let mut w = World::new();
        let u32t = w.type_u32();
        let pi0 = w.pi(&[]);
        let pi1 = w.pi(&[u32t]);
        let kpi = w.pi(&[pi0]);

        let entry = w.lambda(pi1, "entry");
        let a = w.lambda(pi0, "a");
        let b = w.lambda(pi0, "b");
        let h = w.lambda(kpi, "h");
        let x = w.param(entry, 0);
        let zero = w.lit_u32(0);
        let cond = w.relop(crate::def::RelOpKind::Eq, x, zero);
        w.branch(entry, cond, a, b);
        w.set_jump(a, h, &[b]);

        assert_eq!(w.succs(entry), LambdaSet::from([a, b]));
        assert_eq!(w.targets(entry), LambdaSet::from([a, b]));
        assert!(w.higher_order_args(entry).is_empty());
        assert_eq!(w.higher_order_args(a), LambdaSet::from([b]));

        assert_eq!(w.preds(b), LambdaSet::from([entry, a]));
        assert_eq!(w.direct_preds(b), LambdaSet::from([entry]));
        assert_eq!(w.direct_preds(h), LambdaSet::from([a]));
        assert!(w.preds(entry).is_empty());
    }

    #[test]
    fn first_and_higher_order_split() {
        let mut w = World::new();
        let u32t = w.type_u32();
        let pi1 = w.pi(&[u32t]);
        let fpi = w.pi(&[u32t, pi1, u32t]);
        let f = w.lambda(fpi, "f");
        let ret = w.lambda(pi1, "ret");
        let g = w.lambda(fpi, "g");
        let (x, k, y) = (w.param(g, 0), w.param(g, 1), w.param(g, 2));
        w.set_jump(g, f, &[y, ret, x]);
        w.set_jump(ret, k, &[x]);

        assert_eq!(&w.fo_params(g)[..], &[x, y]);
        assert_eq!(&w.ho_params(g)[..], &[k]);
        assert_eq!(&w.fo_args(g)[..], &[y, x]);
        assert_eq!(&w.ho_args(g)[..], &[ret]);
        assert!(w.is_ho(g) && !w.is_fo(g));
        assert!(w.is_fo(ret) && !w.is_ho(ret));
        assert_eq!(&w.fo_args(ret)[..], &[x]);
        assert!(w.ho_args(ret).is_empty());

        // `ret` is only ever passed along; `f` is only ever jumped to.
        assert!(w.is_cascading(ret));
        assert!(!w.is_cascading(f));
        assert!(!w.is_cascading(g));
        let h = w.lambda(pi1, "h");
        w.set_jump(h, f, &[x, ret, x]);
        assert!(!w.is_cascading(ret));
    }
}
