//! Dropping: specialization of a scope on known parameter values.
//!
//! The entry is cloned with some of its parameters removed; uses of a
//! removed parameter become the supplied value. Every other member of
//! the scope is cloned alongside, so the original scope is left as it
//! was. Values outside the scope are shared, not copied.

use crate::def::Def;
use crate::scope::Scope;
use crate::world::World;
use fxhash::FxHashMap;

pub struct Dropper<'a> {
    world: &'a mut World,
    scope: &'a Scope,
    indices: &'a [usize],
    with: &'a [Def],
    self_collapse: bool,
    old_entry: Def,
    new_entry: Def,
    /// Rewritten form of every node visited so far. Members and their
    /// parameters are seeded before any body is rewritten.
    old2new: FxHashMap<Def, Def>,
    collapsed: usize,
}

impl<'a> Dropper<'a> {
    pub fn new(
        world: &'a mut World,
        scope: &'a Scope,
        indices: &'a [usize],
        with: &'a [Def],
        self_collapse: bool,
    ) -> Dropper<'a> {
        let old_entry = scope.entry();
        assert!(world.has_body(old_entry), "cannot drop from {}: no body", old_entry);
        assert_eq!(
            indices.len(),
            with.len(),
            "{} indices but {} values to drop into {}",
            indices.len(),
            with.len(),
            old_entry
        );
        let num_params = world.num_params(old_entry);
        for pair in indices.windows(2) {
            assert!(pair[0] < pair[1], "drop indices {:?} not sorted and unique", indices);
        }
        for (&index, &value) in indices.iter().zip(with.iter()) {
            assert!(
                index < num_params,
                "drop index {} out of range for {} with {} params",
                index,
                old_entry,
                num_params
            );
            let param = world.param(old_entry, index);
            assert_eq!(
                world.ty(param),
                world.ty(value),
                "dropped parameter {} of {} and {} differ in type",
                index,
                old_entry,
                value
            );
        }

        Dropper {
            world,
            scope,
            indices,
            with,
            self_collapse,
            old_entry,
            new_entry: old_entry,
            old2new: FxHashMap::default(),
            collapsed: 0,
        }
    }

    /// Number of jumps redirected to the new entry by tail collapse.
    pub fn collapsed(&self) -> usize {
        self.collapsed
    }

    pub fn run(&mut self) -> Def {
        let old_entry = self.old_entry;
        let old_params = self.world.params(old_entry).to_vec();

        let retained = old_params
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.indices.contains(i))
            .map(|(_, &param)| param)
            .collect::<Vec<_>>();
        let types = retained
            .iter()
            .map(|&param| self.world.ty(param))
            .collect::<Vec<_>>();
        let pi = self.world.pi(&types);
        let name = format!("{}.dropped", self.world.name(old_entry));
        self.new_entry = self.world.lambda(pi, name);
        log::trace!(
            "dropping {:?} from {} into {}",
            self.indices,
            old_entry,
            self.new_entry
        );

        for (&old_param, &value) in self.indices.iter().map(|&i| &old_params[i]).zip(self.with) {
            self.old2new.insert(old_param, value);
        }
        for (j, &old_param) in retained.iter().enumerate() {
            let new_param = self.world.param(self.new_entry, j);
            let name = format!("{}.dropped", self.world.name(old_param));
            self.world.set_name(new_param, name);
            self.old2new.insert(old_param, new_param);
        }

        let body = self.scope.body().to_vec();
        for &old in &body {
            let new = self.world.stub(old);
            let name = format!("{}.dropped", self.world.name(old));
            self.world.set_name(new, name);
            self.old2new.insert(old, new);
            for i in 0..self.world.num_params(old) {
                let old_param = self.world.param(old, i);
                let new_param = self.world.param(new, i);
                let name = format!("{}.dropped", self.world.name(old_param));
                self.world.set_name(new_param, name);
                self.old2new.insert(old_param, new_param);
            }
        }

        self.drop_body(old_entry, self.new_entry);
        for &old in &body {
            let new = self.old2new[&old];
            self.drop_body(old, new);
        }
        self.new_entry
    }

    fn drop_body(&mut self, old: Def, new: Def) {
        let Some(old_to) = self.world.to(old) else {
            return;
        };
        let old_args = self.world.args(old).to_vec();
        let args = old_args
            .into_iter()
            .map(|arg| self.drop_def(arg))
            .collect::<Vec<_>>();
        let to = self.drop_def(old_to);

        if self.self_collapse && to == self.old_entry && self.is_recursive_call(&args) {
            let retained = args
                .iter()
                .enumerate()
                .filter(|(i, _)| !self.indices.contains(i))
                .map(|(_, &arg)| arg)
                .collect::<Vec<_>>();
            log::trace!("{}: tail call collapses onto {}", new, self.new_entry);
            self.collapsed += 1;
            self.world.set_jump(new, self.new_entry, &retained);
            return;
        }
        self.world.set_jump(new, to, &args);
    }

    /// Does a jump to the old entry pass exactly the dropped values again?
    fn is_recursive_call(&self, args: &[Def]) -> bool {
        args.len() == self.world.num_params(self.old_entry)
            && self
                .indices
                .iter()
                .zip(self.with.iter())
                .all(|(&i, &value)| args[i] == value)
    }

    fn drop_def(&mut self, old: Def) -> Def {
        if let Some(&new) = self.old2new.get(&old) {
            return new;
        }
        let kind = self.world.kind(old);
        // Nominal nodes not seeded above are free: keep them.
        if kind.is_nominal() || kind.is_type() {
            return old;
        }
        let old_ops = self.world.ops(old).to_vec();
        let mut changed = false;
        let mut ops = Vec::with_capacity(old_ops.len());
        for op in old_ops {
            let new_op = self.drop_def(op);
            changed |= new_op != op;
            ops.push(new_op);
        }
        let new = if changed {
            self.world.rebuild(old, &ops)
        } else {
            old
        };
        self.old2new.insert(old, new);
        new
    }
}

/// Specializes the single-entry `scope` with `with[i]` substituted for
/// parameter `indices[i]` of the entry. Returns the new entry.
pub fn drop(
    world: &mut World,
    scope: &Scope,
    indices: &[usize],
    with: &[Def],
    self_collapse: bool,
) -> Def {
    Dropper::new(world, scope, indices, with, self_collapse).run()
}

pub fn drop_one(world: &mut World, lambda: Def, index: usize, with: Def, self_collapse: bool) -> Def {
    let scope = Scope::new(world, &[lambda]);
    drop(world, &scope, &[index], &[with], self_collapse)
}

/// Drops the first `with.len()` parameters.
pub fn drop_prefix(world: &mut World, lambda: Def, with: &[Def], self_collapse: bool) -> Def {
    let scope = Scope::new(world, &[lambda]);
    let indices = (0..with.len()).collect::<Vec<_>>();
    drop(world, &scope, &indices, with, self_collapse)
}
