//! Constant folding and algebraic simplification.
//!
//! Called by the canonicalizing constructors in `world.rs` before a
//! structural node is interned. Each hook returns `Some(def)` when the
//! request reduces to an existing or simpler node.

use crate::def::{ArithOpKind, ConvOpKind, Def, NodeKind, PrimTypeKind, RelOpKind};
use crate::value;
use crate::world::World;

impl World {
    pub(crate) fn fold_arithop(
        &mut self,
        op: ArithOpKind,
        kind: PrimTypeKind,
        lhs: Def,
        rhs: Def,
    ) -> Option<Def> {
        if self.is_undef(lhs) || self.is_undef(rhs) {
            let ty = self.ty(lhs);
            return Some(self.undef(ty));
        }

        if let (Some((_, a)), Some((_, b))) = (self.lit_bits(lhs), self.lit_bits(rhs)) {
            return value::arith(op, kind, a, b).map(|bits| self.lit(kind, bits));
        }

        if kind.is_float() {
            return None;
        }

        // Commutative ops have any literal on the right by now.
        let rhs_bits = self.lit_bits(rhs).map(|(_, bits)| bits);
        match (op, rhs_bits) {
            (ArithOpKind::Add, Some(0))
            | (ArithOpKind::Sub, Some(0))
            | (ArithOpKind::Or, Some(0))
            | (ArithOpKind::Xor, Some(0))
            | (ArithOpKind::Shl, Some(0))
            | (ArithOpKind::Shr, Some(0))
            | (ArithOpKind::Mul, Some(1))
            | (ArithOpKind::Div, Some(1)) => Some(lhs),
            (ArithOpKind::Mul, Some(0)) | (ArithOpKind::And, Some(0)) => Some(rhs),
            (ArithOpKind::Sub, _) | (ArithOpKind::Xor, _) if lhs == rhs => Some(self.lit(kind, 0)),
            (ArithOpKind::And, _) | (ArithOpKind::Or, _) if lhs == rhs => Some(lhs),
            _ => None,
        }
    }

    pub(crate) fn fold_relop(
        &mut self,
        op: RelOpKind,
        kind: PrimTypeKind,
        lhs: Def,
        rhs: Def,
    ) -> Option<Def> {
        if self.is_undef(lhs) || self.is_undef(rhs) {
            let ty = self.type_u1();
            return Some(self.undef(ty));
        }

        if let (Some((_, a)), Some((_, b))) = (self.lit_bits(lhs), self.lit_bits(rhs)) {
            let result = value::relop(op, kind, a, b);
            return Some(self.lit_u1(result));
        }

        if lhs == rhs && kind.is_int() {
            let result = matches!(op, RelOpKind::Eq | RelOpKind::Le | RelOpKind::Ge);
            return Some(self.lit_u1(result));
        }

        None
    }

    pub(crate) fn fold_convop(
        &mut self,
        op: ConvOpKind,
        from: PrimTypeKind,
        to: PrimTypeKind,
        operand: Def,
    ) -> Option<Def> {
        if self.is_undef(operand) {
            let ty = self.type_prim(to);
            return Some(self.undef(ty));
        }
        let (_, bits) = self.lit_bits(operand)?;
        let bits = value::convert(op, from, to, bits);
        Some(self.lit(to, bits))
    }

    pub(crate) fn fold_select(&mut self, cond: Def, tval: Def, fval: Def) -> Option<Def> {
        if tval == fval {
            return Some(tval);
        }
        match self.lit_bits(cond) {
            Some((_, 0)) => Some(fval),
            Some(_) => Some(tval),
            None => None,
        }
    }

    pub(crate) fn fold_extract(&mut self, tuple: Def, index: u32, elem_ty: Def) -> Option<Def> {
        match self.kind(tuple) {
            NodeKind::Tuple => Some(self.op(tuple, index as usize)),
            NodeKind::Undef => Some(self.undef(elem_ty)),
            NodeKind::Insert(i) if i == index => Some(self.op(tuple, 1)),
            NodeKind::Insert(_) => {
                let inner = self.op(tuple, 0);
                Some(self.extract(inner, index))
            }
            _ => None,
        }
    }

    pub(crate) fn fold_insert(&mut self, tuple: Def, index: u32, value: Def) -> Option<Def> {
        match self.kind(tuple) {
            NodeKind::Tuple => {
                let mut elems = self.ops(tuple).to_vec();
                elems[index as usize] = value;
                Some(self.tuple(&elems))
            }
            _ => None,
        }
    }
}
