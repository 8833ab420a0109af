//! Structural consistency checks over the whole world.

use crate::def::{Def, NodeKind, Use};
use crate::world::World;
use anyhow::bail;

pub fn verify(world: &World) -> anyhow::Result<()> {
    for def in world.defs() {
        verify_def(world, def)?;
    }
    log::trace!("verified {} live nodes", world.num_live_defs());
    Ok(())
}

fn verify_def(world: &World, def: Def) -> anyhow::Result<()> {
    let data = world.data(def);

    if let Some(ty) = data.ty {
        if !world.is_alive(ty) {
            bail!("type {} of {} was removed", ty, def);
        }
    }

    for (i, &op) in data.ops.iter().enumerate() {
        if !world.is_alive(op) {
            bail!("operand {} of {} is removed node {}", i, def, op);
        }
        let u = Use {
            user: def,
            index: i as u32,
        };
        if !world.uses(op).contains(&u) {
            bail!("operand {} of {} has no use-edge on {}", i, def, op);
        }
    }

    for u in &data.uses {
        if !world.is_alive(u.user) {
            bail!("{} is used by removed node {}", def, u.user);
        }
        if world.ops(u.user).get(u.index as usize) != Some(&def) {
            bail!("stale use-edge {}[{}] on {}", u.user, u.index, def);
        }
    }

    if !world.is_canonical(def) {
        bail!("structural node {} is not canonical", def);
    }

    match data.kind {
        NodeKind::Lambda => verify_lambda(world, def),
        NodeKind::Param { lambda, index } => {
            if !world.is_alive(lambda) || world.params(lambda).get(index as usize) != Some(&def) {
                bail!("param {} is not param {} of {}", def, index, lambda);
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn verify_lambda(world: &World, lambda: Def) -> anyhow::Result<()> {
    let pi = world.ty(lambda);
    let elems = world.ops(pi);
    let params = world.params(lambda);
    if elems.len() != params.len() {
        bail!(
            "{} has {} params but its type has {}",
            lambda,
            params.len(),
            elems.len()
        );
    }
    for (&param, &elem) in params.iter().zip(elems) {
        if world.ty(param) != elem {
            bail!("param {} of {} does not match its declared type", param, lambda);
        }
    }

    let Some(to) = world.to(lambda) else {
        return Ok(());
    };
    let target_ty = world.ty(to);
    if !world.is_pi(target_ty) {
        bail!("{} jumps to {}, which is not a continuation", lambda, to);
    }
    let expected = world.ops(target_ty);
    let args = world.args(lambda);
    if expected.len() != args.len() {
        bail!(
            "{} passes {} args to {} expecting {}",
            lambda,
            args.len(),
            to,
            expected.len()
        );
    }
    for (i, (&arg, &ty)) in args.iter().zip(expected).enumerate() {
        if world.ty(arg) != ty {
            bail!("arg {} of jump from {} has wrong type", i, lambda);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_world() -> (World, Def) {
        let mut w = World::new();
        let u32t = w.type_u32();
        let pi1 = w.pi(&[u32t]);
        let ret = w.lambda(pi1, "ret");
        let f = w.lambda(pi1, "f");
        let x = w.param(f, 0);
        let one = w.lit_u32(1);
        let sum = w.add(x, one);
        w.set_jump(f, ret, &[sum]);
        w.make_external(f);
        (w, f)
    }

    #[test]
    fn well_formed_graph_passes() {
        let (mut w, _) = small_world();
        verify(&w).unwrap();
        w.remove_unreachable();
        verify(&w).unwrap();
    }

    #[test]
    fn ill_typed_jump_is_reported() {
        let (mut w, f) = small_world();
        let wide = w.lit_u64(1);
        w.set_op(f, 1, wide);
        let err = verify(&w).unwrap_err();
        assert!(err.to_string().contains("wrong type"), "{}", err);
    }
}
