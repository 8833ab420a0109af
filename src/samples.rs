//! Built-in sample programs.
//!
//! Each sample is a `main` continuation taking zero or one runtime
//! `u64` input followed by a return continuation. `arg` is baked into
//! the program as a constant, which is what partial evaluation feeds on.

use crate::def::{Def, PrimTypeKind, RelOpKind};
use crate::interp;
use crate::value::{Env, Value};
use crate::world::World;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sample {
    /// `arg!`, by an accumulating loop.
    Factorial,
    /// `input ^ arg`, recursive with a return continuation per level.
    Power,
    /// `input mod arg`, by repeated subtraction.
    Countdown,
    /// `input + 2 * arg`, applying a closed function twice.
    HigherOrder,
    /// Counts from 0 up to the runtime `input`; never converges.
    Diverge,
}

impl FromStr for Sample {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Sample> {
        Ok(match s {
            "factorial" => Sample::Factorial,
            "power" => Sample::Power,
            "countdown" => Sample::Countdown,
            "higher-order" => Sample::HigherOrder,
            "diverge" => Sample::Diverge,
            _ => anyhow::bail!("unknown program {:?}", s),
        })
    }
}

impl Sample {
    pub fn build(self, arg: u64) -> Program {
        match self {
            Sample::Factorial => factorial(arg),
            Sample::Power => power(arg),
            Sample::Countdown => countdown(arg),
            Sample::HigherOrder => higher_order(arg),
            Sample::Diverge => diverge(),
        }
    }
}

/// A sample world with its entry and the continuation results are
/// returned to.
pub struct Program {
    pub world: World,
    pub main: Def,
    pub halt: Def,
    pub num_inputs: usize,
}

impl Program {
    /// Interprets `main` on `inputs`.
    pub fn run(&self, inputs: &[u64], fuel: usize) -> anyhow::Result<Vec<Value>> {
        if inputs.len() != self.num_inputs {
            anyhow::bail!(
                "program takes {} inputs, {} given",
                self.num_inputs,
                inputs.len()
            );
        }
        let mut args = inputs
            .iter()
            .map(|&input| Value::lit(PrimTypeKind::U64, input))
            .collect::<Vec<_>>();
        args.push(Value::Closure(self.halt, Env::new()));
        interp::run(&self.world, self.main, &args, fuel)
    }
}

struct Builder {
    w: World,
    u64t: Def,
    ret_pi: Def,
    pi0: Def,
}

impl Builder {
    fn new() -> Builder {
        let mut w = World::new();
        let u64t = w.type_u64();
        let ret_pi = w.pi(&[u64t]);
        let pi0 = w.pi(&[]);
        Builder {
            w,
            u64t,
            ret_pi,
            pi0,
        }
    }

    fn lambda(&mut self, elems: &[Def], name: &str, params: &[&str]) -> Def {
        let pi = self.w.pi(elems);
        let lambda = self.w.lambda(pi, name);
        for (i, &param_name) in params.iter().enumerate() {
            let param = self.w.param(lambda, i);
            self.w.set_name(param, param_name);
        }
        lambda
    }

    fn block(&mut self, name: &str) -> Def {
        let pi0 = self.pi0;
        self.w.lambda(pi0, name)
    }

    fn params<const N: usize>(&self, lambda: Def) -> [Def; N] {
        let mut result = [lambda; N];
        for (i, slot) in result.iter_mut().enumerate() {
            *slot = self.w.param(lambda, i);
        }
        result
    }

    fn finish(mut self, main: Def, num_inputs: usize) -> Program {
        let ret_pi = self.ret_pi;
        let halt = self.w.lambda(ret_pi, "halt");
        self.w.make_external(main);
        self.w.make_external(halt);
        Program {
            world: self.w,
            main,
            halt,
            num_inputs,
        }
    }
}

/// `main(ret) = loop(n, 1, ret)`
/// `loop(i, acc, ret) = branch(i > 0, body, exit)`
/// `body() = loop(i - 1, acc * i, ret)`, `exit() = ret(acc)`
pub fn factorial(n: u64) -> Program {
    let mut b = Builder::new();
    let (u64t, ret_pi) = (b.u64t, b.ret_pi);
    let main = b.lambda(&[ret_pi], "main", &["ret"]);
    let lp = b.lambda(&[u64t, u64t, ret_pi], "loop", &["i", "acc", "ret"]);
    let body = b.block("body");
    let exit = b.block("exit");

    let [ret] = b.params(main);
    let start = b.w.lit_u64(n);
    let one = b.w.lit_u64(1);
    b.w.set_jump(main, lp, &[start, one, ret]);

    let [i, acc, lret] = b.params(lp);
    let zero = b.w.lit_u64(0);
    let more = b.w.relop(RelOpKind::Gt, i, zero);
    b.w.branch(lp, more, body, exit);
    let i1 = b.w.sub(i, one);
    let acc1 = b.w.mul(acc, i);
    b.w.set_jump(body, lp, &[i1, acc1, lret]);
    b.w.set_jump(exit, lret, &[acc]);
    b.finish(main, 0)
}

/// `main(x, ret) = pow(x, n, ret)`
/// `pow(x, n, k) = branch(n == 0, done, step)`, `done() = k(1)`
/// `step() = pow(x, n - 1, mul)`, `mul(r) = k(x * r)`
pub fn power(n: u64) -> Program {
    let mut b = Builder::new();
    let (u64t, ret_pi) = (b.u64t, b.ret_pi);
    let main = b.lambda(&[u64t, ret_pi], "main", &["x", "ret"]);
    let pow = b.lambda(&[u64t, u64t, ret_pi], "pow", &["x", "n", "k"]);
    let done = b.block("done");
    let step = b.block("step");
    let mul = b.lambda(&[u64t], "mul", &["r"]);

    let [x, ret] = b.params(main);
    let exp = b.w.lit_u64(n);
    b.w.set_jump(main, pow, &[x, exp, ret]);

    let [px, pn, k] = b.params(pow);
    let zero = b.w.lit_u64(0);
    let one = b.w.lit_u64(1);
    let is_zero = b.w.relop(RelOpKind::Eq, pn, zero);
    b.w.branch(pow, is_zero, done, step);
    b.w.set_jump(done, k, &[one]);
    let n1 = b.w.sub(pn, one);
    b.w.set_jump(step, pow, &[px, n1, mul]);
    let [r] = b.params(mul);
    let prod = b.w.mul(px, r);
    b.w.set_jump(mul, k, &[prod]);
    b.finish(main, 1)
}

/// `main(n, ret) = loop(n, step, ret)`
/// `loop(i, step, ret) = branch(i < step, exit, body)`
/// `body() = loop(i - step, step, ret)`, `exit() = ret(i)`
pub fn countdown(step: u64) -> Program {
    assert!(step > 0, "countdown step must be positive");
    let mut b = Builder::new();
    let (u64t, ret_pi) = (b.u64t, b.ret_pi);
    let main = b.lambda(&[u64t, ret_pi], "main", &["n", "ret"]);
    let lp = b.lambda(&[u64t, u64t, ret_pi], "loop", &["i", "step", "ret"]);
    let body = b.block("body");
    let exit = b.block("exit");

    let [n, ret] = b.params(main);
    let step = b.w.lit_u64(step);
    b.w.set_jump(main, lp, &[n, step, ret]);

    let [i, lstep, lret] = b.params(lp);
    let below = b.w.relop(RelOpKind::Lt, i, lstep);
    b.w.branch(lp, below, exit, body);
    let next = b.w.sub(i, lstep);
    b.w.set_jump(body, lp, &[next, lstep, lret]);
    b.w.set_jump(exit, lret, &[i]);
    b.finish(main, 1)
}

/// `main(x, ret) = twice(inc, x, ret)`
/// `twice(f, x, k) = f(x, then)`, `then(y) = f(y, k)`
/// `inc(x, k) = k(x + n)`
pub fn higher_order(n: u64) -> Program {
    let mut b = Builder::new();
    let (u64t, ret_pi) = (b.u64t, b.ret_pi);
    let fn_pi = b.w.pi(&[u64t, ret_pi]);
    let main = b.lambda(&[u64t, ret_pi], "main", &["x", "ret"]);
    let twice = b.lambda(&[fn_pi, u64t, ret_pi], "twice", &["f", "x", "k"]);
    let then = b.lambda(&[u64t], "then", &["y"]);
    let inc = b.lambda(&[u64t, ret_pi], "inc", &["x", "k"]);

    let [x, ret] = b.params(main);
    b.w.set_jump(main, twice, &[inc, x, ret]);

    let [f, tx, k] = b.params(twice);
    b.w.set_jump(twice, f, &[tx, then]);
    let [y] = b.params(then);
    b.w.set_jump(then, f, &[y, k]);

    let [ix, ik] = b.params(inc);
    let amount = b.w.lit_u64(n);
    let sum = b.w.add(ix, amount);
    b.w.set_jump(inc, ik, &[sum]);
    b.finish(main, 1)
}

/// `main(n, ret) = loop(0, n, ret)`
/// `loop(i, n, ret) = branch(i == n, exit, body)`
/// `body() = loop(i + 1, n, ret)`, `exit() = ret(i)`
pub fn diverge() -> Program {
    let mut b = Builder::new();
    let (u64t, ret_pi) = (b.u64t, b.ret_pi);
    let main = b.lambda(&[u64t, ret_pi], "main", &["n", "ret"]);
    let lp = b.lambda(&[u64t, u64t, ret_pi], "loop", &["i", "n", "ret"]);
    let body = b.block("body");
    let exit = b.block("exit");

    let [n, ret] = b.params(main);
    let zero = b.w.lit_u64(0);
    b.w.set_jump(main, lp, &[zero, n, ret]);

    let [i, ln, lret] = b.params(lp);
    let done = b.w.relop(RelOpKind::Eq, i, ln);
    b.w.branch(lp, done, exit, body);
    let one = b.w.lit_u64(1);
    let i1 = b.w.add(i, one);
    b.w.set_jump(body, lp, &[i1, ln, lret]);
    b.w.set_jump(exit, lret, &[i]);
    b.finish(main, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u64_result(values: Vec<Value>) -> u64 {
        match &values[..] {
            [Value::Lit(PrimTypeKind::U64, bits)] => *bits,
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn samples_compute_what_they_claim() {
        let fuel = 10_000;
        assert_eq!(u64_result(factorial(5).run(&[], fuel).unwrap()), 120);
        assert_eq!(u64_result(power(3).run(&[2], fuel).unwrap()), 8);
        assert_eq!(u64_result(countdown(3).run(&[11], fuel).unwrap()), 2);
        assert_eq!(u64_result(higher_order(4).run(&[1], fuel).unwrap()), 9);
        assert_eq!(u64_result(diverge().run(&[6], fuel).unwrap()), 6);
    }

    #[test]
    fn names_parse() {
        assert_eq!("higher-order".parse::<Sample>().unwrap(), Sample::HigherOrder);
        assert!("fibonacci".parse::<Sample>().is_err());
    }
}
