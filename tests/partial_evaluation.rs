use cpsgraph::interp;
use cpsgraph::samples::{self, Program, Sample};
use cpsgraph::value::Env;
use cpsgraph::{
    drop, partial_evaluation, verify, DomTree, Outcome, PeOptions, PrimTypeKind, Scope, Value,
    World,
};

const FUEL: usize = 100_000;

fn u64_result(values: Vec<Value>) -> u64 {
    match &values[..] {
        [Value::Lit(PrimTypeKind::U64, bits)] => *bits,
        other => panic!("unexpected result {:?}", other),
    }
}

fn specialize(program: &mut Program, max_iterations: usize) -> Outcome {
    let opts = PeOptions {
        max_iterations: Some(max_iterations),
        verify: true,
    };
    let result = partial_evaluation(&mut program.world, &opts, None);
    verify(&program.world).unwrap();
    result.outcome
}

#[test]
fn f_to_g_drop_keeps_the_call_shape() {
    // f(x, y) = g(x, y, 1); dropping y = 5 gives f'(x) = g(x, 5, 1).
    let mut w = World::new();
    let u32t = w.type_u32();
    let gpi = w.pi(&[u32t, u32t, u32t]);
    let fpi = w.pi(&[u32t, u32t]);
    let g = w.lambda(gpi, "g");
    let f = w.lambda(fpi, "f");
    let (x, y) = (w.param(f, 0), w.param(f, 1));
    let one = w.lit_u32(1);
    w.set_jump(f, g, &[x, y, one]);
    let five = w.lit_u32(5);

    let scope = Scope::new(&w, &[f]);
    assert_eq!(scope.rpo(), &[f]);
    let f2 = drop(&mut w, &scope, &[1], &[five], true);

    let x2 = w.param(f2, 0);
    assert_eq!(w.num_params(f2), 1);
    assert_eq!(w.to(f2), Some(g));
    assert_eq!(w.args(f2), &[x2, five, one]);
    assert_eq!(w.args(f), &[x, y, one]);
    verify(&w).unwrap();
}

#[test]
fn dropped_scope_computes_the_same_function() {
    let p = samples::power(4);
    let mut w = p.world.clone();
    let pow = w.to(p.main).unwrap();
    let four = w.lit_u64(4);
    let scope = Scope::new(&w, &[pow]);
    let pow4 = drop(&mut w, &scope, &[1], &[four], true);

    let halt = Value::Closure(p.halt, Env::new());
    for x in [0u64, 1, 3, 7] {
        let xv = Value::lit(PrimTypeKind::U64, x);
        let generic = interp::run(
            &w,
            pow,
            &[xv.clone(), Value::lit(PrimTypeKind::U64, 4), halt.clone()],
            FUEL,
        )
        .unwrap();
        let specialized = interp::run(&w, pow4, &[xv, halt.clone()], FUEL).unwrap();
        assert_eq!(generic, specialized);
        assert_eq!(u64_result(specialized), x.pow(4));
    }
}

#[test]
fn converging_samples_keep_their_meaning() {
    let cases = [
        (Sample::Factorial, 6, vec![vec![]]),
        (Sample::Power, 5, vec![vec![0], vec![2], vec![3]]),
        (Sample::Countdown, 4, vec![vec![0], vec![3], vec![17], vec![400]]),
        (Sample::HigherOrder, 7, vec![vec![0], vec![35]]),
    ];
    for (sample, arg, inputs) in cases {
        let mut program = sample.build(arg);
        let expected = inputs
            .iter()
            .map(|input| u64_result(program.run(input, FUEL).unwrap()))
            .collect::<Vec<_>>();

        let outcome = specialize(&mut program, 128);
        assert!(outcome.converged(), "{:?}: {:?}", sample, outcome);

        let actual = inputs
            .iter()
            .map(|input| u64_result(program.run(input, FUEL).unwrap()))
            .collect::<Vec<_>>();
        assert_eq!(actual, expected, "{:?}", sample);
    }
}

#[test]
fn specialization_is_idempotent_once_converged() {
    let mut program = samples::power(3);
    assert!(specialize(&mut program, 128).converged());
    let lambdas = program.world.lambdas();
    assert_eq!(
        specialize(&mut program, 128),
        Outcome::Converged { iterations: 1 }
    );
    assert_eq!(program.world.lambdas(), lambdas);
}

#[test]
fn higher_order_argument_is_inlined() {
    let mut program = samples::higher_order(3);
    assert!(specialize(&mut program, 128).converged());
    // `twice` no longer takes the function it applies.
    let twice = program.world.to(program.main).unwrap();
    assert_eq!(program.world.num_params(twice), 2);
    assert_eq!(u64_result(program.run(&[1], FUEL).unwrap()), 7);
}

#[test]
fn diverging_sample_gives_up_within_the_bound() {
    let mut program = samples::diverge();
    let outcome = specialize(&mut program, 16);
    assert_eq!(outcome, Outcome::GaveUp { iterations: 16 });
    assert_eq!(u64_result(program.run(&[30], FUEL).unwrap()), 30);
}

#[test]
fn dominators_of_a_specialized_world() {
    let mut program = samples::countdown(2);
    specialize(&mut program, 128);
    let scope = Scope::for_world(&program.world);
    let domtree = DomTree::new(&scope);
    assert_eq!(domtree.roots(), scope.entries());
    for &lambda in scope.rpo() {
        for &entry in scope.entries() {
            if domtree.dominates(entry, lambda) {
                assert!(domtree.depth(lambda) >= domtree.depth(entry));
            }
        }
        match domtree.idom(lambda) {
            Some(idom) => assert!(domtree.children(idom).contains(&lambda)),
            None => assert!(scope.is_entry(lambda)),
        }
    }
}
