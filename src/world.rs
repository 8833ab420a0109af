//! The `World`: exclusive owner of every node.
//!
//! All construction goes through here. Structural requests are
//! canonicalized: constant operands are folded first (see `fold.rs`),
//! then the `(kind, type, ops)` key is looked up and an existing node is
//! returned if there is one. Continuations and parameters are nominal
//! and always fresh.
//!
//! Use-edges are maintained on every operand write. They are an index
//! for queries (predecessors, replacement, merging) and never an
//! ownership edge: a node lives until `remove_unreachable` finds no path
//! to it from an external continuation.

use crate::def::{
    ArithOpKind, ConvOpKind, Def, DefData, Key, NodeKind, Ops, PrimTypeKind, RelOpKind, Use,
};
use fxhash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::collections::BTreeSet;
use waffle::entity::{EntityVec, PerEntity};

#[derive(Clone, Debug, Default)]
pub struct World {
    defs: EntityVec<Def, DefData>,
    lookup: FxHashMap<Key, Def>,
    lambdas: BTreeSet<Def>,
    externals: BTreeSet<Def>,
}

impl World {
    pub fn new() -> World {
        World::default()
    }

    // ---- node access -------------------------------------------------

    pub fn data(&self, def: Def) -> &DefData {
        let data = &self.defs[def];
        assert!(data.alive, "access to removed node {}", def);
        data
    }

    pub fn is_alive(&self, def: Def) -> bool {
        self.defs.get(def).map_or(false, |data| data.alive)
    }

    pub fn kind(&self, def: Def) -> NodeKind {
        self.data(def).kind
    }

    /// Type of a value. Type nodes have none; asking for one is a bug.
    pub fn ty(&self, def: Def) -> Def {
        match self.data(def).ty {
            Some(ty) => ty,
            None => panic!("type node {} has no type", def),
        }
    }

    pub fn ops(&self, def: Def) -> &[Def] {
        &self.data(def).ops[..]
    }

    pub fn op(&self, def: Def, i: usize) -> Def {
        self.data(def).ops[i]
    }

    pub fn uses(&self, def: Def) -> &BTreeSet<Use> {
        &self.data(def).uses
    }

    pub fn num_uses(&self, def: Def) -> usize {
        self.data(def).uses.len()
    }

    pub fn name(&self, def: Def) -> &str {
        &self.data(def).name
    }

    pub fn set_name(&mut self, def: Def, name: impl Into<String>) {
        self.defs[def].name = name.into();
    }

    pub fn is_lambda(&self, def: Def) -> bool {
        self.data(def).is_lambda()
    }

    pub fn is_param(&self, def: Def) -> bool {
        self.data(def).is_param()
    }

    /// Number of nodes ever created, dead ones included.
    pub fn num_defs(&self) -> usize {
        self.defs.len()
    }

    pub fn num_live_defs(&self) -> usize {
        self.defs.values().filter(|data| data.alive).count()
    }

    pub fn defs(&self) -> impl Iterator<Item = Def> + '_ {
        self.defs
            .entries()
            .filter(|(_, data)| data.alive)
            .map(|(def, _)| def)
    }

    // ---- operand bookkeeping -------------------------------------------

    fn register_use(&mut self, user: Def, index: usize, op: Def) {
        let inserted = self.defs[op].uses.insert(Use {
            user,
            index: index as u32,
        });
        debug_assert!(inserted);
    }

    fn unregister_use(&mut self, user: Def, index: usize, op: Def) {
        self.defs[op].uses.remove(&Use {
            user,
            index: index as u32,
        });
    }

    /// Overwrites one operand of a nominal node.
    pub(crate) fn set_op(&mut self, def: Def, index: usize, op: Def) {
        assert!(
            self.data(def).kind.is_nominal(),
            "structural node {} is immutable",
            def
        );
        let old = self.defs[def].ops[index];
        self.unregister_use(def, index, old);
        self.defs[def].ops[index] = op;
        self.register_use(def, index, op);
    }

    fn set_ops(&mut self, def: Def, ops: Ops) {
        self.unset_ops(def);
        for (i, &op) in ops.iter().enumerate() {
            assert!(self.is_alive(op), "operand {} of {} was removed", op, def);
            self.register_use(def, i, op);
        }
        self.defs[def].ops = ops;
    }

    fn unset_ops(&mut self, def: Def) {
        let ops = std::mem::take(&mut self.defs[def].ops);
        for (i, op) in ops.into_iter().enumerate() {
            self.unregister_use(def, i, op);
        }
    }

    // ---- hash-consing --------------------------------------------------

    /// Returns the canonical node for `(kind, ty, ops)`, creating it if
    /// needed. No folding happens here; use the typed constructors.
    pub fn intern(&mut self, kind: NodeKind, ty: Option<Def>, ops: Ops) -> Def {
        assert!(!kind.is_nominal(), "{} nodes cannot be interned", kind.name());
        let key = (kind, ty, ops);
        if let Some(&def) = self.lookup.get(&key) {
            return def;
        }
        let (kind, ty, ops) = key;
        let def = self.defs.push(DefData::new(kind, ty, SmallVec::new()));
        self.set_ops(def, ops.clone());
        self.lookup.insert((kind, ty, ops), def);
        log::trace!("intern {}: {} {:?}", def, kind.name(), &self.defs[def].ops[..]);
        def
    }

    /// Is `def` the node the hash-cons table hands out for its key?
    pub fn is_canonical(&self, def: Def) -> bool {
        let data = self.data(def);
        data.kind.is_nominal() || self.lookup.get(&data.key()) == Some(&def)
    }

    // ---- types ---------------------------------------------------------

    pub fn type_prim(&mut self, kind: PrimTypeKind) -> Def {
        self.intern(NodeKind::PrimType(kind), None, SmallVec::new())
    }

    pub fn type_u1(&mut self) -> Def {
        self.type_prim(PrimTypeKind::U1)
    }

    pub fn type_u32(&mut self) -> Def {
        self.type_prim(PrimTypeKind::U32)
    }

    pub fn type_u64(&mut self) -> Def {
        self.type_prim(PrimTypeKind::U64)
    }

    pub fn type_i32(&mut self) -> Def {
        self.type_prim(PrimTypeKind::I32)
    }

    pub fn type_f64(&mut self) -> Def {
        self.type_prim(PrimTypeKind::F64)
    }

    pub fn sigma(&mut self, elems: &[Def]) -> Def {
        for &elem in elems {
            assert!(self.kind(elem).is_type(), "sigma element {} is not a type", elem);
        }
        self.intern(NodeKind::Sigma, None, elems.iter().copied().collect())
    }

    pub fn pi(&mut self, elems: &[Def]) -> Def {
        for &elem in elems {
            assert!(self.kind(elem).is_type(), "pi element {} is not a type", elem);
        }
        self.intern(NodeKind::Pi, None, elems.iter().copied().collect())
    }

    pub fn prim_kind(&self, ty: Def) -> Option<PrimTypeKind> {
        match self.kind(ty) {
            NodeKind::PrimType(kind) => Some(kind),
            _ => None,
        }
    }

    fn value_prim_kind(&self, def: Def) -> PrimTypeKind {
        let ty = self.ty(def);
        match self.prim_kind(ty) {
            Some(kind) => kind,
            None => panic!("{} is not of primitive type", def),
        }
    }

    pub fn is_pi(&self, ty: Def) -> bool {
        self.kind(ty) == NodeKind::Pi
    }

    // ---- literals ------------------------------------------------------

    pub fn lit(&mut self, kind: PrimTypeKind, bits: u64) -> Def {
        let ty = self.type_prim(kind);
        let bits = crate::value::normalize(kind, bits);
        self.intern(NodeKind::Lit(kind, bits), Some(ty), SmallVec::new())
    }

    pub fn lit_u1(&mut self, b: bool) -> Def {
        self.lit(PrimTypeKind::U1, b as u64)
    }

    pub fn lit_u32(&mut self, v: u32) -> Def {
        self.lit(PrimTypeKind::U32, v as u64)
    }

    pub fn lit_u64(&mut self, v: u64) -> Def {
        self.lit(PrimTypeKind::U64, v)
    }

    pub fn lit_i32(&mut self, v: i32) -> Def {
        self.lit(PrimTypeKind::I32, v as i64 as u64)
    }

    pub fn lit_f64(&mut self, v: f64) -> Def {
        self.lit(PrimTypeKind::F64, v.to_bits())
    }

    pub fn undef(&mut self, ty: Def) -> Def {
        self.intern(NodeKind::Undef, Some(ty), SmallVec::new())
    }

    pub fn lit_bits(&self, def: Def) -> Option<(PrimTypeKind, u64)> {
        match self.kind(def) {
            NodeKind::Lit(kind, bits) => Some((kind, bits)),
            _ => None,
        }
    }

    pub fn is_undef(&self, def: Def) -> bool {
        self.kind(def) == NodeKind::Undef
    }

    // ---- primops -------------------------------------------------------

    pub fn arithop(&mut self, op: ArithOpKind, lhs: Def, rhs: Def) -> Def {
        let ty = self.ty(lhs);
        assert_eq!(
            ty,
            self.ty(rhs),
            "operands of {} must have equal types",
            op.name()
        );
        let kind = self.value_prim_kind(lhs);
        assert!(
            !(kind.is_float() && op.is_bitwise()),
            "{} is not defined on {}",
            op.name(),
            kind.name()
        );
        let (lhs, rhs) = self.order_commutative(op.is_commutative(), lhs, rhs);
        if let Some(folded) = self.fold_arithop(op, kind, lhs, rhs) {
            return folded;
        }
        self.intern(NodeKind::ArithOp(op), Some(ty), [lhs, rhs].into_iter().collect())
    }

    pub fn add(&mut self, lhs: Def, rhs: Def) -> Def {
        self.arithop(ArithOpKind::Add, lhs, rhs)
    }

    pub fn sub(&mut self, lhs: Def, rhs: Def) -> Def {
        self.arithop(ArithOpKind::Sub, lhs, rhs)
    }

    pub fn mul(&mut self, lhs: Def, rhs: Def) -> Def {
        self.arithop(ArithOpKind::Mul, lhs, rhs)
    }

    pub fn relop(&mut self, op: RelOpKind, lhs: Def, rhs: Def) -> Def {
        assert_eq!(
            self.ty(lhs),
            self.ty(rhs),
            "operands of {} must have equal types",
            op.name()
        );
        let kind = self.value_prim_kind(lhs);
        let (lhs, rhs) = self.order_commutative(op.is_commutative(), lhs, rhs);
        if let Some(folded) = self.fold_relop(op, kind, lhs, rhs) {
            return folded;
        }
        let ty = self.type_u1();
        self.intern(NodeKind::RelOp(op), Some(ty), [lhs, rhs].into_iter().collect())
    }

    pub fn convop(&mut self, op: ConvOpKind, to: Def, from: Def) -> Def {
        let from_kind = self.value_prim_kind(from);
        let to_kind = match self.prim_kind(to) {
            Some(kind) => kind,
            None => panic!("{} target {} is not a primitive type", op.name(), to),
        };
        if op == ConvOpKind::Bitcast {
            assert_eq!(
                from_kind.bits(),
                to_kind.bits(),
                "bitcast from {} to {} changes width",
                from_kind.name(),
                to_kind.name()
            );
        }
        if self.ty(from) == to {
            return from;
        }
        if let Some(folded) = self.fold_convop(op, from_kind, to_kind, from) {
            return folded;
        }
        self.intern(NodeKind::ConvOp(op), Some(to), [from].into_iter().collect())
    }

    pub fn select(&mut self, cond: Def, tval: Def, fval: Def) -> Def {
        let u1 = self.type_u1();
        assert_eq!(self.ty(cond), u1, "condition must be of u1 type");
        let ty = self.ty(tval);
        assert_eq!(ty, self.ty(fval), "types of both values must be equal");
        if let Some(folded) = self.fold_select(cond, tval, fval) {
            return folded;
        }
        self.intern(
            NodeKind::Select,
            Some(ty),
            [cond, tval, fval].into_iter().collect(),
        )
    }

    pub fn tuple(&mut self, elems: &[Def]) -> Def {
        let types = elems.iter().map(|&elem| self.ty(elem)).collect::<Vec<_>>();
        let ty = self.sigma(&types);
        self.intern(NodeKind::Tuple, Some(ty), elems.iter().copied().collect())
    }

    /// Element types of a tuple-typed value.
    fn sigma_elems(&self, tuple: Def) -> &[Def] {
        let ty = self.ty(tuple);
        assert_eq!(self.kind(ty), NodeKind::Sigma, "{} is not a tuple", tuple);
        self.ops(ty)
    }

    pub fn extract(&mut self, tuple: Def, index: u32) -> Def {
        let elems = self.sigma_elems(tuple);
        assert!(
            (index as usize) < elems.len(),
            "extract index {} out of range for {}",
            index,
            tuple
        );
        let ty = elems[index as usize];
        if let Some(folded) = self.fold_extract(tuple, index, ty) {
            return folded;
        }
        self.intern(NodeKind::Extract(index), Some(ty), [tuple].into_iter().collect())
    }

    pub fn insert(&mut self, tuple: Def, index: u32, value: Def) -> Def {
        let elems = self.sigma_elems(tuple);
        assert!(
            (index as usize) < elems.len(),
            "insert index {} out of range for {}",
            index,
            tuple
        );
        assert_eq!(elems[index as usize], self.ty(value), "type error in insert");
        if let Some(folded) = self.fold_insert(tuple, index, value) {
            return folded;
        }
        let ty = self.ty(tuple);
        self.intern(
            NodeKind::Insert(index),
            Some(ty),
            [tuple, value].into_iter().collect(),
        )
    }

    /// Rebuilds a structural node with new operands through its
    /// canonicalizing constructor.
    pub fn rebuild(&mut self, old: Def, ops: &[Def]) -> Def {
        let kind = self.kind(old);
        assert_eq!(ops.len(), self.ops(old).len(), "arity change rebuilding {}", old);
        match kind {
            NodeKind::PrimType(_) | NodeKind::Lit(..) | NodeKind::Undef => old,
            NodeKind::Sigma => self.sigma(ops),
            NodeKind::Pi => self.pi(ops),
            NodeKind::ArithOp(op) => self.arithop(op, ops[0], ops[1]),
            NodeKind::RelOp(op) => self.relop(op, ops[0], ops[1]),
            NodeKind::ConvOp(op) => {
                let to = self.ty(old);
                self.convop(op, to, ops[0])
            }
            NodeKind::Select => self.select(ops[0], ops[1], ops[2]),
            NodeKind::Tuple => self.tuple(ops),
            NodeKind::Extract(index) => self.extract(ops[0], index),
            NodeKind::Insert(index) => self.insert(ops[0], index, ops[1]),
            NodeKind::Lambda | NodeKind::Param { .. } => {
                panic!("nominal node {} cannot be rebuilt", old)
            }
        }
    }

    fn order_commutative(&self, commutative: bool, lhs: Def, rhs: Def) -> (Def, Def) {
        if !commutative {
            return (lhs, rhs);
        }
        match (self.lit_bits(lhs).is_some(), self.lit_bits(rhs).is_some()) {
            (true, false) => (rhs, lhs),
            (false, true) => (lhs, rhs),
            _ if rhs < lhs => (rhs, lhs),
            _ => (lhs, rhs),
        }
    }

    // ---- continuations -------------------------------------------------

    /// A fresh continuation of type `pi`, with one parameter per element.
    pub fn lambda(&mut self, pi: Def, name: impl Into<String>) -> Def {
        assert!(self.is_pi(pi), "{} is not a continuation type", pi);
        let mut data = DefData::new(NodeKind::Lambda, Some(pi), SmallVec::new());
        data.name = name.into();
        let lambda = self.defs.push(data);
        let elems = self.ops(pi).to_vec();
        for (index, ty) in elems.into_iter().enumerate() {
            self.new_param(lambda, index, ty, String::new());
        }
        self.lambdas.insert(lambda);
        log::trace!("new lambda {} ({})", lambda, self.name(lambda));
        lambda
    }

    /// Creates a continuation with the signature and debug names of
    /// `lambda`, but no body.
    pub fn stub(&mut self, lambda: Def) -> Def {
        let pi = self.ty(lambda);
        let name = self.name(lambda).to_string();
        let result = self.lambda(pi, name);
        for i in 0..self.num_params(lambda) {
            let name = self.name(self.param(lambda, i)).to_string();
            let param = self.param(result, i);
            self.set_name(param, name);
        }
        result
    }

    fn new_param(&mut self, lambda: Def, index: usize, ty: Def, name: String) -> Def {
        let mut data = DefData::new(
            NodeKind::Param {
                lambda,
                index: index as u32,
            },
            Some(ty),
            SmallVec::new(),
        );
        data.name = name;
        let param = self.defs.push(data);
        self.defs[lambda].params.push(param);
        param
    }

    fn assert_lambda(&self, def: Def) {
        assert!(self.is_lambda(def), "{} is not a continuation", def);
    }

    pub fn params(&self, lambda: Def) -> &[Def] {
        self.assert_lambda(lambda);
        &self.data(lambda).params[..]
    }

    pub fn param(&self, lambda: Def, i: usize) -> Def {
        self.params(lambda)[i]
    }

    pub fn num_params(&self, lambda: Def) -> usize {
        self.params(lambda).len()
    }

    /// Owner of a parameter.
    pub fn param_lambda(&self, param: Def) -> Option<Def> {
        match self.kind(param) {
            NodeKind::Param { lambda, .. } => Some(lambda),
            _ => None,
        }
    }

    /// Grows the signature of `lambda` by one trailing parameter.
    pub fn append_param(&mut self, lambda: Def, ty: Def, name: impl Into<String>) -> Def {
        self.assert_lambda(lambda);
        let mut elems = self.ops(self.ty(lambda)).to_vec();
        let index = elems.len();
        elems.push(ty);
        let pi = self.pi(&elems);
        self.defs[lambda].ty = Some(pi);
        self.new_param(lambda, index, ty, name.into())
    }

    pub fn has_body(&self, lambda: Def) -> bool {
        self.assert_lambda(lambda);
        !self.data(lambda).ops.is_empty()
    }

    /// Jump target, if the continuation has a body.
    pub fn to(&self, lambda: Def) -> Option<Def> {
        self.assert_lambda(lambda);
        self.data(lambda).ops.first().copied()
    }

    pub fn args(&self, lambda: Def) -> &[Def] {
        self.assert_lambda(lambda);
        let ops = &self.data(lambda).ops;
        if ops.is_empty() {
            &[]
        } else {
            &ops[1..]
        }
    }

    pub fn arg(&self, lambda: Def, i: usize) -> Def {
        self.args(lambda)[i]
    }

    pub fn set_jump(&mut self, lambda: Def, target: Def, args: &[Def]) {
        self.assert_lambda(lambda);
        let pi = self.ty(target);
        assert!(self.is_pi(pi), "jump target {} is not a continuation", target);
        let elems = self.ops(pi);
        assert_eq!(
            elems.len(),
            args.len(),
            "{} passes {} args to {} expecting {}",
            lambda,
            args.len(),
            target,
            elems.len()
        );
        for (i, (&arg, &elem)) in args.iter().zip(elems.iter()).enumerate() {
            assert_eq!(self.ty(arg), elem, "arg {} of jump from {} has wrong type", i, lambda);
        }
        let mut ops: Ops = SmallVec::with_capacity(args.len() + 1);
        ops.push(target);
        ops.extend(args.iter().copied());
        self.set_ops(lambda, ops);
    }

    pub fn branch(&mut self, lambda: Def, cond: Def, tto: Def, fto: Def) {
        let target = self.select(cond, tto, fto);
        self.set_jump(lambda, target, &[]);
    }

    pub fn destroy_body(&mut self, lambda: Def) {
        self.assert_lambda(lambda);
        self.unset_ops(lambda);
    }

    /// Snapshot of all live continuations, in creation order.
    pub fn lambdas(&self) -> Vec<Def> {
        self.lambdas.iter().copied().collect()
    }

    pub fn num_lambdas(&self) -> usize {
        self.lambdas.len()
    }

    pub fn make_external(&mut self, lambda: Def) {
        self.assert_lambda(lambda);
        self.externals.insert(lambda);
    }

    pub fn make_internal(&mut self, lambda: Def) {
        self.externals.remove(&lambda);
    }

    pub fn is_external(&self, lambda: Def) -> bool {
        self.externals.contains(&lambda)
    }

    pub fn externals(&self) -> Vec<Def> {
        self.externals.iter().copied().collect()
    }

    // ---- graph surgery -------------------------------------------------

    /// Redirects every use of `old` to `with`.
    pub fn replace(&mut self, old: Def, with: Def) {
        if old == with {
            return;
        }
        assert_eq!(
            self.data(old).ty,
            self.data(with).ty,
            "replacing {} with {} of a different type",
            old,
            with
        );
        log::trace!("replace {} with {}", old, with);
        let uses = self.uses(old).iter().copied().collect::<Vec<_>>();
        let mut rebuilt = FxHashSet::default();
        for u in uses {
            if !self.is_alive(u.user) {
                continue;
            }
            if self.kind(u.user).is_nominal() {
                self.set_op(u.user, u.index as usize, with);
            } else if rebuilt.insert(u.user) {
                let ops = self
                    .ops(u.user)
                    .iter()
                    .map(|&op| if op == old { with } else { op })
                    .collect::<Vec<_>>();
                let new_user = self.rebuild(u.user, &ops);
                self.replace(u.user, new_user);
            }
        }
    }

    /// Deletes every node not reachable from an external continuation
    /// and returns how many were deleted.
    pub fn remove_unreachable(&mut self) -> usize {
        let mut live: PerEntity<Def, bool> = PerEntity::default();
        let mut stack = self.externals();
        for &ext in &stack {
            live[ext] = true;
        }
        while let Some(def) = stack.pop() {
            let data = &self.defs[def];
            let param_owner = match data.kind {
                NodeKind::Param { lambda, .. } => Some(lambda),
                _ => None,
            };
            let next = data
                .ty
                .iter()
                .chain(data.ops.iter())
                .chain(data.params.iter())
                .chain(param_owner.iter())
                .copied()
                .collect::<SmallVec<[Def; 8]>>();
            for succ in next {
                if !live[succ] {
                    live[succ] = true;
                    stack.push(succ);
                }
            }
        }

        let dead = self
            .defs
            .entries()
            .filter(|(def, data)| data.alive && !live[*def])
            .map(|(def, _)| def)
            .collect::<Vec<_>>();
        for &def in &dead {
            let data = &self.defs[def];
            log::trace!("removing unreachable {} ({})", def, data.kind.name());
            if !data.kind.is_nominal() {
                let key = data.key();
                if self.lookup.get(&key) == Some(&def) {
                    self.lookup.remove(&key);
                }
            }
        }
        for &def in &dead {
            self.unset_ops(def);
        }
        for &def in &dead {
            let data = &mut self.defs[def];
            data.alive = false;
            data.params.clear();
            data.uses.clear();
            self.lambdas.remove(&def);
            self.externals.remove(&def);
        }
        log::debug!("removed {} unreachable nodes", dead.len());
        dead.len()
    }

    /// Is `def` a closed constant, i.e. independent of every parameter?
    pub fn is_const(&self, def: Def) -> bool {
        let mut memo = FxHashMap::default();
        self.is_const_memo(def, &mut memo)
    }

    fn is_const_memo(&self, def: Def, memo: &mut FxHashMap<Def, bool>) -> bool {
        if let Some(&result) = memo.get(&def) {
            return result;
        }
        let result = match self.kind(def) {
            NodeKind::Param { .. } => false,
            NodeKind::Lambda => self.is_closed(def),
            _ => {
                let ops = self.ops(def);
                ops.iter().all(|&op| self.is_const_memo(op, memo))
            }
        };
        memo.insert(def, result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_requests_are_canonical() {
        let mut w = World::new();
        let u32t = w.type_u32();
        let pi = w.pi(&[u32t, u32t]);
        let f = w.lambda(pi, "f");
        let (x, y) = (w.param(f, 0), w.param(f, 1));
        let a = w.add(x, y);
        let b = w.add(x, y);
        assert_eq!(a, b);
        // Commutative operands are ordered, so the mirrored request unifies.
        assert_eq!(w.add(y, x), a);
        assert_ne!(w.sub(x, y), w.sub(y, x));
        assert_eq!(w.lit_u32(5), w.lit_u32(5));
        assert_eq!(w.pi(&[u32t, u32t]), pi);
    }

    #[test]
    fn handles_index_their_own_arena() {
        let mut w = World::new();
        let u32t = w.type_u32();
        let pi = w.pi(&[u32t]);
        let f = w.lambda(pi, "f");
        assert_eq!(format!("{}", f), format!("%{}", w.num_defs() - 2));
        assert_eq!(w.defs().last(), Some(w.param(f, 0)));
        // A handle past the end of another arena is simply not alive there.
        let other = World::new();
        assert!(!other.is_alive(f));
        assert_eq!(other.num_live_defs(), 0);
    }

    #[test]
    fn nominal_requests_are_fresh() {
        let mut w = World::new();
        let pi = w.pi(&[]);
        let a = w.lambda(pi, "k");
        let b = w.lambda(pi, "k");
        assert_ne!(a, b);
        assert_eq!(w.num_lambdas(), 2);
    }

    #[test]
    fn jumps_maintain_use_edges() {
        let mut w = World::new();
        let u32t = w.type_u32();
        let pi1 = w.pi(&[u32t]);
        let g = w.lambda(pi1, "g");
        let f = w.lambda(pi1, "f");
        let x = w.param(f, 0);
        w.set_jump(f, g, &[x]);
        assert_eq!(w.to(f), Some(g));
        assert_eq!(w.args(f), &[x]);
        assert!(w.uses(g).contains(&Use { user: f, index: 0 }));
        assert!(w.uses(x).contains(&Use { user: f, index: 1 }));

        let five = w.lit_u32(5);
        w.set_jump(f, g, &[five]);
        assert!(w.uses(x).is_empty());
        w.destroy_body(f);
        assert!(!w.has_body(f));
        assert!(w.uses(g).is_empty());
    }

    #[test]
    fn append_param_rebuilds_signature() {
        let mut w = World::new();
        let u32t = w.type_u32();
        let u1 = w.type_u1();
        let pi = w.pi(&[u32t]);
        let f = w.lambda(pi, "f");
        let p = w.append_param(f, u1, "flag");
        assert_eq!(w.num_params(f), 2);
        assert_eq!(w.param(f, 1), p);
        assert_eq!(w.ty(f), w.pi(&[u32t, u1]));
        assert_eq!(w.param_lambda(p), Some(f));
        assert_eq!(w.name(p), "flag");
    }

    #[test]
    fn replace_rebuilds_structural_users() {
        let mut w = World::new();
        let u32t = w.type_u32();
        let pi1 = w.pi(&[u32t]);
        let ret = w.lambda(pi1, "ret");
        let f = w.lambda(pi1, "f");
        let x = w.param(f, 0);
        let one = w.lit_u32(1);
        let sum = w.add(x, one);
        w.set_jump(f, ret, &[sum]);

        let three = w.lit_u32(3);
        w.replace(x, three);
        assert_eq!(w.arg(f, 0), w.lit_u32(4));
    }

    #[test]
    fn remove_unreachable_keeps_externals() {
        let mut w = World::new();
        let u32t = w.type_u32();
        let pi1 = w.pi(&[u32t]);
        let ret = w.lambda(pi1, "ret");
        let main = w.lambda(pi1, "main");
        let dead = w.lambda(pi1, "dead");
        let x = w.param(main, 0);
        w.set_jump(main, ret, &[x]);
        let y = w.param(dead, 0);
        let dead_sum = w.add(y, y);
        w.set_jump(dead, ret, &[dead_sum]);
        w.make_external(main);

        let removed = w.remove_unreachable();
        assert!(removed >= 3);
        assert!(w.is_alive(main) && w.is_alive(ret));
        assert!(!w.is_alive(dead) && !w.is_alive(dead_sum));
        assert_eq!(w.lambdas(), vec![ret, main]);
        assert_eq!(w.uses(ret).len(), 1);
        // The purged key is gone, so asking again builds a fresh node.
        let y2 = w.param(main, 0);
        assert_ne!(w.add(y2, y2), dead_sum);
    }

    #[test]
    fn constness() {
        let mut w = World::new();
        let u32t = w.type_u32();
        let pi1 = w.pi(&[u32t]);
        let f = w.lambda(pi1, "f");
        let x = w.param(f, 0);
        let five = w.lit_u32(5);
        let six = w.lit_u32(6);
        assert!(w.is_const(five));
        assert!(!w.is_const(x));
        let t = w.tuple(&[five, six]);
        assert!(w.is_const(t));
        let t2 = w.tuple(&[five, x]);
        assert!(!w.is_const(t2));
    }

    #[test]
    #[should_panic(expected = "must have equal types")]
    fn mismatched_operands_are_rejected() {
        let mut w = World::new();
        let a = w.lit_u32(1);
        let b = w.lit_u64(1);
        w.add(a, b);
    }

    #[test]
    #[should_panic(expected = "expecting")]
    fn jump_arity_is_checked() {
        let mut w = World::new();
        let u32t = w.type_u32();
        let pi1 = w.pi(&[u32t]);
        let g = w.lambda(pi1, "g");
        let f = w.lambda(pi1, "f");
        w.set_jump(f, g, &[]);
    }
}
