//! Dominator tree over a scope.
//!
//! Iterative Cooper-Harvey-Kennedy on the scope's reverse postorder.
//! A virtual root sits above all entries, so a multi-entry scope yields
//! a forest: `idom` of an entry is `None`.

use crate::def::Def;
use crate::scope::Scope;
use fxhash::FxHashMap;

const UNDEF: usize = usize::MAX;
const ROOT: usize = 0;

#[derive(Clone, Debug)]
pub struct DomTree {
    /// Node `i + 1` is `rpo[i]`; node 0 is the virtual root.
    nodes: Vec<Def>,
    index: FxHashMap<Def, usize>,
    idom: Vec<usize>,
    children: Vec<Vec<Def>>,
    depth: Vec<u32>,
}

impl DomTree {
    pub fn new(scope: &Scope) -> DomTree {
        let nodes = scope.rpo().to_vec();
        let n = nodes.len() + 1;
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, &lambda)| (lambda, i + 1))
            .collect::<FxHashMap<_, _>>();

        let preds = (0..n)
            .map(|i| {
                if i == ROOT {
                    return vec![];
                }
                let lambda = nodes[i - 1];
                let mut preds = scope
                    .preds(lambda)
                    .iter()
                    .map(|pred| index[pred])
                    .collect::<Vec<_>>();
                if scope.is_entry(lambda) {
                    preds.push(ROOT);
                }
                preds
            })
            .collect::<Vec<_>>();

        let mut idom = vec![UNDEF; n];
        idom[ROOT] = ROOT;
        let mut changed = true;
        while changed {
            changed = false;
            for b in 1..n {
                let mut new_idom = UNDEF;
                for &p in &preds[b] {
                    if idom[p] == UNDEF {
                        continue;
                    }
                    new_idom = if new_idom == UNDEF {
                        p
                    } else {
                        intersect(&idom, p, new_idom)
                    };
                }
                if new_idom != UNDEF && idom[b] != new_idom {
                    idom[b] = new_idom;
                    changed = true;
                }
            }
        }

        let mut children = vec![vec![]; n];
        let mut depth = vec![0u32; n];
        // Parents precede children in reverse postorder.
        for b in 1..n {
            let parent = idom[b];
            assert!(parent != UNDEF, "{} unreachable in scope", nodes[b - 1]);
            children[parent].push(nodes[b - 1]);
            depth[b] = depth[parent] + 1;
        }

        DomTree {
            nodes,
            index,
            idom,
            children,
            depth,
        }
    }

    fn node(&self, lambda: Def) -> usize {
        match self.index.get(&lambda) {
            Some(&i) => i,
            None => panic!("{} is not in the dominator tree", lambda),
        }
    }

    /// Immediate dominator; `None` for scope entries.
    pub fn idom(&self, lambda: Def) -> Option<Def> {
        match self.idom[self.node(lambda)] {
            ROOT => None,
            i => Some(self.nodes[i - 1]),
        }
    }

    pub fn children(&self, lambda: Def) -> &[Def] {
        &self.children[self.node(lambda)][..]
    }

    /// Tops of the forest: the scope's entries.
    pub fn roots(&self) -> &[Def] {
        &self.children[ROOT][..]
    }

    pub fn depth(&self, lambda: Def) -> u32 {
        self.depth[self.node(lambda)]
    }

    pub fn contains(&self, lambda: Def) -> bool {
        self.index.contains_key(&lambda)
    }

    /// Does `a` dominate `b`? Every node dominates itself.
    pub fn dominates(&self, a: Def, b: Def) -> bool {
        let a = self.node(a);
        let mut b = self.node(b);
        while self.depth[b] > self.depth[a] {
            b = self.idom[b];
        }
        a == b
    }

    /// Nearest common dominator, if the two share a tree.
    pub fn lca(&self, a: Def, b: Def) -> Option<Def> {
        match intersect(&self.idom, self.node(a), self.node(b)) {
            ROOT => None,
            i => Some(self.nodes[i - 1]),
        }
    }
}

fn intersect(idom: &[usize], mut a: usize, mut b: usize) -> usize {
    while a != b {
        while a > b {
            a = idom[a];
        }
        while b > a {
            b = idom[b];
        }
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def::RelOpKind;
    use crate::world::World;

    /// `entry -> {left, right} -> join -> (loop back to entry | exit)`,
    /// every block mentioning a parameter of `entry`.
    fn diamond_loop() -> (World, [Def; 5]) {
        let mut w = World::new();
        let u32t = w.type_u32();
        let pi0 = w.pi(&[]);
        let pi1 = w.pi(&[u32t]);
        let ret_pi = w.pi(&[u32t]);
        let entry_pi = w.pi(&[u32t, ret_pi]);
        let entry = w.lambda(entry_pi, "entry");
        let left = w.lambda(pi0, "left");
        let right = w.lambda(pi0, "right");
        let join = w.lambda(pi1, "join");
        let exit = w.lambda(pi0, "exit");
        let next = w.lambda(pi0, "next");
        let (x, ret) = (w.param(entry, 0), w.param(entry, 1));
        let zero = w.lit_u32(0);
        let one = w.lit_u32(1);
        let c = w.relop(RelOpKind::Eq, x, zero);
        w.branch(entry, c, left, right);
        w.set_jump(left, join, &[x]);
        let xm1 = w.sub(x, one);
        w.set_jump(right, join, &[xm1]);
        let y = w.param(join, 0);
        let c2 = w.relop(RelOpKind::Lt, y, x);
        w.branch(join, c2, exit, next);
        w.set_jump(exit, ret, &[y]);
        w.set_jump(next, entry, &[y, ret]);
        (w, [entry, left, right, join, exit])
    }

    #[test]
    fn immediate_dominators() {
        let (w, [entry, left, right, join, exit]) = diamond_loop();
        let scope = Scope::new(&w, &[entry]);
        let dt = DomTree::new(&scope);
        assert_eq!(dt.idom(entry), None);
        assert_eq!(dt.idom(left), Some(entry));
        assert_eq!(dt.idom(right), Some(entry));
        assert_eq!(dt.idom(join), Some(entry));
        assert_eq!(dt.idom(exit), Some(join));
        assert_eq!(dt.roots(), &[entry]);
        assert!(dt.dominates(entry, exit));
        assert!(dt.dominates(join, join));
        assert!(!dt.dominates(left, join));
        assert_eq!(dt.lca(left, right), Some(entry));
        assert_eq!(dt.depth(exit), 3);
    }

    /// Brute force: `d` dominates `n` iff `n` is unreachable from the
    /// entry once `d` is removed.
    #[test]
    fn idom_matches_path_definition() {
        let (w, [entry, ..]) = diamond_loop();
        let scope = Scope::new(&w, &[entry]);
        let dt = DomTree::new(&scope);

        let reachable_without = |removed: Def| {
            let mut seen = vec![entry];
            let mut stack = vec![entry];
            if removed == entry {
                return vec![];
            }
            while let Some(l) = stack.pop() {
                for &s in scope.succs(l) {
                    if s != removed && !seen.contains(&s) {
                        seen.push(s);
                        stack.push(s);
                    }
                }
            }
            seen
        };

        for &n in scope.rpo() {
            for &d in scope.rpo() {
                let brute = d == n || !reachable_without(d).contains(&n);
                assert_eq!(dt.dominates(d, n), brute, "{} dom {}", d, n);
            }
        }
    }
}
