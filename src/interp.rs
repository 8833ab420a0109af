//! Reference interpreter.
//!
//! Runs a continuation graph on concrete values. Continuation values
//! are closures over the parameter bindings in effect where they were
//! mentioned, so nested continuations see their enclosing parameters
//! even after control has moved elsewhere.

use crate::def::{Def, NodeKind, PrimTypeKind};
use crate::value::{self, Env, Value};
use crate::world::World;
use anyhow::{anyhow, bail};
use fxhash::FxHashMap;

/// Binds `entry`'s parameters to `args` and follows jumps until one
/// reaches a continuation without a body; that jump's arguments are the
/// result. At most `fuel` jumps are taken.
pub fn run(world: &World, entry: Def, args: &[Value], fuel: usize) -> anyhow::Result<Vec<Value>> {
    if !world.is_lambda(entry) {
        bail!("entry {} is not a continuation", entry);
    }
    if !world.has_body(entry) {
        return Ok(args.to_vec());
    }
    let mut lambda = entry;
    let mut env = bind(world, lambda, Env::new(), args.to_vec())?;

    for step in 0..fuel {
        let (target, args) = {
            let mut frame = Frame {
                world,
                env: &env,
                cache: FxHashMap::default(),
            };
            let to = match world.to(lambda) {
                Some(to) => to,
                None => bail!("{} has no body", lambda),
            };
            let target = frame.eval(to)?;
            let args = world
                .args(lambda)
                .iter()
                .map(|&arg| frame.eval(arg))
                .collect::<anyhow::Result<Vec<_>>>()?;
            (target, args)
        };

        let (next, captured) = match target {
            Value::Closure(next, captured) => (next, captured),
            other => bail!("{} jumps to non-continuation {:?}", lambda, other),
        };
        log::trace!("step {}: {} -> {}", step, lambda, next);
        if !world.has_body(next) {
            return Ok(args);
        }
        env = bind(world, next, captured, args)?;
        lambda = next;
    }
    bail!("out of fuel after {} jumps", fuel)
}

fn bind(world: &World, lambda: Def, mut env: Env, args: Vec<Value>) -> anyhow::Result<Env> {
    let params = world.params(lambda);
    if params.len() != args.len() {
        bail!(
            "{} takes {} arguments, {} given",
            lambda,
            params.len(),
            args.len()
        );
    }
    for (&param, arg) in params.iter().zip(args) {
        env.insert(param, arg);
    }
    Ok(env)
}

/// Evaluation of the values of one jump. Structural nodes are shared,
/// so results are cached per jump.
struct Frame<'a> {
    world: &'a World,
    env: &'a Env,
    cache: FxHashMap<Def, Value>,
}

impl<'a> Frame<'a> {
    fn eval(&mut self, def: Def) -> anyhow::Result<Value> {
        if let Some(v) = self.cache.get(&def) {
            return Ok(v.clone());
        }
        let v = self.eval_uncached(def)?;
        self.cache.insert(def, v.clone());
        Ok(v)
    }

    fn lit_operand(&mut self, def: Def) -> anyhow::Result<Option<u64>> {
        match self.eval(def)? {
            Value::Lit(_, bits) => Ok(Some(bits)),
            Value::Undef => Ok(None),
            other => bail!("expected a literal for {}, got {:?}", def, other),
        }
    }

    fn prim_kind(&self, def: Def) -> anyhow::Result<PrimTypeKind> {
        let ty = self.world.ty(def);
        self.world
            .prim_kind(ty)
            .ok_or_else(|| anyhow!("{} is not of primitive type", def))
    }

    fn eval_uncached(&mut self, def: Def) -> anyhow::Result<Value> {
        let world = self.world;
        let ops = world.ops(def);
        Ok(match world.kind(def) {
            NodeKind::Param { .. } => match self.env.get(&def) {
                Some(v) => v.clone(),
                None => bail!("parameter {} is unbound", def),
            },
            NodeKind::Lambda => Value::Closure(def, self.env.clone()),
            NodeKind::Lit(kind, bits) => Value::Lit(kind, bits),
            NodeKind::Undef => Value::Undef,
            NodeKind::ArithOp(op) => {
                let kind = self.prim_kind(def)?;
                let (a, b) = (self.lit_operand(ops[0])?, self.lit_operand(ops[1])?);
                match (a, b) {
                    (Some(a), Some(b)) => match value::arith(op, kind, a, b) {
                        Some(bits) => Value::Lit(kind, bits),
                        None => bail!("division by zero in {}", def),
                    },
                    _ => Value::Undef,
                }
            }
            NodeKind::RelOp(op) => {
                let kind = self.prim_kind(ops[0])?;
                let (a, b) = (self.lit_operand(ops[0])?, self.lit_operand(ops[1])?);
                match (a, b) {
                    (Some(a), Some(b)) => Value::u1(value::relop(op, kind, a, b)),
                    _ => Value::Undef,
                }
            }
            NodeKind::ConvOp(op) => {
                let from = self.prim_kind(ops[0])?;
                let to = self.prim_kind(def)?;
                match self.lit_operand(ops[0])? {
                    Some(bits) => Value::Lit(to, value::convert(op, from, to, bits)),
                    None => Value::Undef,
                }
            }
            NodeKind::Select => match self.lit_operand(ops[0])? {
                Some(0) => self.eval(ops[2])?,
                Some(_) => self.eval(ops[1])?,
                None => Value::Undef,
            },
            NodeKind::Tuple => Value::Tuple(
                ops.iter()
                    .map(|&op| self.eval(op))
                    .collect::<anyhow::Result<Vec<_>>>()?,
            ),
            NodeKind::Extract(i) => match self.eval(ops[0])? {
                Value::Tuple(elems) => elems[i as usize].clone(),
                Value::Undef => Value::Undef,
                other => bail!("extract from non-tuple {:?}", other),
            },
            NodeKind::Insert(i) => match self.eval(ops[0])? {
                Value::Tuple(mut elems) => {
                    elems[i as usize] = self.eval(ops[1])?;
                    Value::Tuple(elems)
                }
                Value::Undef => Value::Undef,
                other => bail!("insert into non-tuple {:?}", other),
            },
            NodeKind::PrimType(_) | NodeKind::Sigma | NodeKind::Pi => {
                bail!("type {} has no value", def)
            }
        })
    }
}
