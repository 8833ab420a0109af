//! Textual rendering of a world.

use crate::def::{Def, NodeKind, PrimTypeKind};
use crate::world::World;
use std::fmt::{Display, Formatter, Result as FmtResult};

pub struct WorldDisplay<'a>(&'a World);

pub struct DefDisplay<'a>(&'a World, Def);

impl World {
    pub fn display(&self) -> WorldDisplay<'_> {
        WorldDisplay(self)
    }

    pub fn display_def(&self, def: Def) -> DefDisplay<'_> {
        DefDisplay(self, def)
    }
}

impl<'a> Display for WorldDisplay<'a> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        let world = self.0;
        for lambda in world.lambdas() {
            if world.is_external(lambda) {
                write!(f, "extern ")?;
            }
            write_name(f, world, lambda)?;
            write!(f, "(")?;
            for (i, &param) in world.params(lambda).iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_name(f, world, param)?;
                write!(f, ": ")?;
                write_def(f, world, world.ty(param))?;
            }
            write!(f, ")")?;
            match world.to(lambda) {
                Some(to) => {
                    write!(f, " = ")?;
                    write_def(f, world, to)?;
                    write_list(f, world, world.args(lambda))?;
                    writeln!(f)?;
                }
                None => writeln!(f, ";")?,
            }
        }
        Ok(())
    }
}

impl<'a> Display for DefDisplay<'a> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write_def(f, self.0, self.1)
    }
}

fn write_name(f: &mut Formatter, world: &World, def: Def) -> FmtResult {
    match world.name(def) {
        "" => write!(f, "{}", def),
        name => write!(f, "{}{}", name, def),
    }
}

fn write_list(f: &mut Formatter, world: &World, defs: &[Def]) -> FmtResult {
    write!(f, "(")?;
    for (i, &def) in defs.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write_def(f, world, def)?;
    }
    write!(f, ")")
}

fn write_lit(f: &mut Formatter, kind: PrimTypeKind, bits: u64) -> FmtResult {
    match kind {
        PrimTypeKind::F32 => write!(f, "{}", f32::from_bits(bits as u32)),
        PrimTypeKind::F64 => write!(f, "{}", f64::from_bits(bits)),
        k if k.is_signed() => {
            let shift = 64 - k.bits();
            write!(f, "{}", ((bits << shift) as i64) >> shift)
        }
        _ => write!(f, "{}", bits),
    }
}

/// Values are printed inline; continuations and parameters by name.
fn write_def(f: &mut Formatter, world: &World, def: Def) -> FmtResult {
    match world.kind(def) {
        NodeKind::PrimType(k) => write!(f, "{}", k.name()),
        NodeKind::Sigma => write_list(f, world, world.ops(def)),
        NodeKind::Pi => {
            write!(f, "fn")?;
            write_list(f, world, world.ops(def))
        }
        NodeKind::Lit(k, bits) => {
            write_lit(f, k, bits)?;
            write!(f, ":{}", k.name())
        }
        NodeKind::Undef => {
            write!(f, "undef:")?;
            write_def(f, world, world.ty(def))
        }
        NodeKind::Lambda | NodeKind::Param { .. } => write_name(f, world, def),
        NodeKind::ConvOp(op) => {
            write!(f, "{}:", op.name())?;
            write_def(f, world, world.ty(def))?;
            write_list(f, world, world.ops(def))
        }
        NodeKind::Extract(i) | NodeKind::Insert(i) => {
            write!(f, "{}.{}", world.kind(def).name(), i)?;
            write_list(f, world, world.ops(def))
        }
        kind => {
            write!(f, "{}", kind.name())?;
            write_list(f, world, world.ops(def))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_jumps_with_inline_operands() {
        let mut w = World::new();
        let u32t = w.type_u32();
        let ret_pi = w.pi(&[u32t]);
        let pi = w.pi(&[u32t, ret_pi]);
        let f = w.lambda(pi, "f");
        let (x, ret) = (w.param(f, 0), w.param(f, 1));
        w.set_name(x, "x");
        w.set_name(ret, "ret");
        let one = w.lit_u32(1);
        let sum = w.add(x, one);
        w.set_jump(f, ret, &[sum]);
        w.make_external(f);

        let text = w.display().to_string();
        let expected = format!(
            "extern f{}(x{}: u32, ret{}: fn(u32)) = ret{}(add(x{}, 1:u32))\n",
            f, x, ret, ret, x
        );
        assert_eq!(text, expected);
        let minus = w.lit_i32(-3);
        assert_eq!(w.display_def(minus).to_string(), "-3:i32");
    }
}
