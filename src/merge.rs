//! Merging of straight-line continuation chains.
//!
//! If `n` always and only continues into its dominator child `c`, and
//! nothing else refers to `c`, the two are one basic block: `c`'s
//! parameters are replaced by `n`'s arguments and `n` takes over `c`'s
//! jump.

use crate::def::Def;
use crate::domtree::DomTree;
use crate::scope::Scope;
use crate::world::World;

struct Merger<'a> {
    world: &'a mut World,
    scope: Scope,
    domtree: DomTree,
    merged: usize,
}

impl<'a> Merger<'a> {
    fn new(world: &'a mut World) -> Self {
        let scope = Scope::for_world(world);
        let domtree = DomTree::new(&scope);
        Merger {
            world,
            scope,
            domtree,
            merged: 0,
        }
    }

    fn run(&mut self) {
        let roots = self.domtree.roots().to_vec();
        for root in roots {
            self.merge(root);
        }
    }

    /// The continuation `n` can absorb, if any.
    fn dom_succ(&self, n: Def) -> Option<Def> {
        let succs = self
            .world
            .succs(n)
            .into_iter()
            .filter(|&succ| self.scope.contains(succ))
            .collect::<Vec<_>>();
        let children = self.domtree.children(n);
        match (&succs[..], children) {
            (&[succ], &[child])
                if succ == child
                    && self.world.has_body(succ)
                    && self.world.num_uses(succ) == 1
                    && self.world.to(n) == Some(succ) =>
            {
                Some(succ)
            }
            _ => None,
        }
    }

    fn merge(&mut self, n: Def) {
        let mut cur = n;
        while let Some(next) = self.dom_succ(cur) {
            let args = self.world.args(cur).to_vec();
            let params = self.world.params(next).to_vec();
            assert_eq!(args.len(), params.len());
            log::trace!("merging {} into {}", next, n);
            for (param, arg) in params.into_iter().zip(args) {
                self.world.replace(param, arg);
            }
            self.world.destroy_body(cur);
            self.merged += 1;
            cur = next;
        }

        if cur != n {
            if let Some(to) = self.world.to(cur) {
                let args = self.world.args(cur).to_vec();
                self.world.set_jump(n, to, &args);
            }
        }

        let children = self.domtree.children(cur).to_vec();
        for child in children {
            self.merge(child);
        }
    }
}

/// Contracts every mergeable chain in the world. Returns the number of
/// continuations folded into a predecessor.
pub fn merge_lambdas(world: &mut World) -> usize {
    let mut merger = Merger::new(world);
    merger.run();
    log::debug!("merged {} continuations", merger.merged);
    merger.merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def::RelOpKind;

    /// `main(x, ret) = a(x + 1); a(y) = b(y * x); b(z) = ret(z)`.
    #[test]
    fn chain_collapses_into_head() {
        let mut w = World::new();
        let u32t = w.type_u32();
        let pi1 = w.pi(&[u32t]);
        let main_pi = w.pi(&[u32t, pi1]);
        let main = w.lambda(main_pi, "main");
        let a = w.lambda(pi1, "a");
        let b = w.lambda(pi1, "b");
        let (x, ret) = (w.param(main, 0), w.param(main, 1));
        let one = w.lit_u32(1);
        let x1 = w.add(x, one);
        w.set_jump(main, a, &[x1]);
        let y = w.param(a, 0);
        let y2 = w.mul(y, x);
        w.set_jump(a, b, &[y2]);
        let z = w.param(b, 0);
        w.set_jump(b, ret, &[z]);
        w.make_external(main);

        assert_eq!(merge_lambdas(&mut w), 2);
        assert_eq!(w.to(main), Some(ret));
        let expected = w.mul(x1, x);
        assert_eq!(w.args(main), &[expected]);
        assert!(!w.has_body(a));

        // Nothing reachable refers to the absorbed links any more.
        assert!(w.remove_unreachable() > 0);
        assert!(!w.is_alive(a) && !w.is_alive(b));
        assert!(w.is_alive(main));
        assert_eq!(w.args(main), &[expected]);
        assert!(w.preds(ret).contains(&main));
    }

    #[test]
    fn shared_successor_is_not_merged() {
        let mut w = World::new();
        let u32t = w.type_u32();
        let pi0 = w.pi(&[]);
        let pi1 = w.pi(&[u32t]);
        let main_pi = w.pi(&[u32t, pi1]);
        let main = w.lambda(main_pi, "main");
        let left = w.lambda(pi0, "left");
        let right = w.lambda(pi0, "right");
        let join = w.lambda(pi1, "join");
        let (x, ret) = (w.param(main, 0), w.param(main, 1));
        let zero = w.lit_u32(0);
        let c = w.relop(RelOpKind::Eq, x, zero);
        w.branch(main, c, left, right);
        let one = w.lit_u32(1);
        let x1 = w.add(x, one);
        w.set_jump(left, join, &[x1]);
        w.set_jump(right, join, &[x]);
        let y = w.param(join, 0);
        w.set_jump(join, ret, &[y]);
        w.make_external(main);

        assert_eq!(merge_lambdas(&mut w), 0);
        assert_eq!(w.to(left), Some(join));
        assert_eq!(w.to(right), Some(join));
        assert!(w.has_body(join));
    }
}
