use cpsgraph::samples::{Program, Sample};
use cpsgraph::{partial_evaluation, Outcome, PeOptions};
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Clone, Debug, StructOpt)]
pub enum Command {
    /// Partially evaluate a built-in sample program.
    Specialize {
        /// The sample: factorial, power, countdown, higher-order or
        /// diverge.
        program: Sample,

        /// The constant baked into the sample.
        #[structopt(long = "arg", default_value = "5")]
        arg: u64,

        /// Give up after this many sweeps.
        #[structopt(long = "max-iterations", default_value = "128")]
        max_iterations: usize,

        /// Verify the graph after every sweep.
        #[structopt(long = "verify")]
        verify: bool,

        /// Interpret the program before and after and compare results.
        #[structopt(long = "check")]
        check: bool,

        /// Runtime input used by `--check`, for samples that take one.
        #[structopt(long = "input", default_value = "10")]
        input: u64,

        /// Show stats on specialization.
        #[structopt(long = "show-stats")]
        show_stats: bool,

        /// Write the stats, bincode-encoded, to this file.
        #[structopt(long = "stats-out")]
        stats_out: Option<PathBuf>,
    },

    /// Interpret a built-in sample program without specializing it.
    Run {
        program: Sample,

        #[structopt(long = "arg", default_value = "5")]
        arg: u64,

        #[structopt(long = "input", default_value = "10")]
        input: u64,

        /// Maximum number of jumps to take.
        #[structopt(long = "fuel", default_value = "1000000")]
        fuel: usize,
    },
}

const CHECK_FUEL: usize = 1_000_000;

fn main() -> anyhow::Result<()> {
    let _ = env_logger::try_init();
    let cmd = Command::from_args();

    match cmd {
        Command::Specialize {
            program,
            arg,
            max_iterations,
            verify,
            check,
            input,
            show_stats,
            stats_out,
        } => specialize(
            program,
            arg,
            PeOptions {
                max_iterations: Some(max_iterations),
                verify,
            },
            check.then_some(input),
            show_stats,
            stats_out,
        ),
        Command::Run {
            program,
            arg,
            input,
            fuel,
        } => run(program, arg, input, fuel),
    }
}

fn inputs_for(program: &Program, input: u64) -> Vec<u64> {
    vec![input; program.num_inputs]
}

fn specialize(
    sample: Sample,
    arg: u64,
    opts: PeOptions,
    check: Option<u64>,
    show_stats: bool,
    stats_out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut program = sample.build(arg);
    println!("{}", program.world.display());

    // Interpret first, so a mismatch can be reported against it.
    let expected = match check {
        Some(input) => Some(program.run(&inputs_for(&program, input), CHECK_FUEL)?),
        None => None,
    };

    let progress = indicatif::ProgressBar::new(0);
    let result = partial_evaluation(&mut program.world, &opts, Some(progress));

    println!("{}", program.world.display());
    log::debug!("Final world:\n{}", program.world.display());

    match result.outcome {
        Outcome::Converged { iterations } => eprintln!("converged after {} sweeps", iterations),
        Outcome::GaveUp { iterations } => eprintln!("gave up after {} sweeps", iterations),
    }

    if let (Some(input), Some(expected)) = (check, expected) {
        let actual = program.run(&inputs_for(&program, input), CHECK_FUEL)?;
        if actual != expected {
            anyhow::bail!(
                "specialized program returned {:?}, expected {:?}",
                actual,
                expected
            );
        }
        eprintln!("check passed: {:?}", actual);
    }

    let stats = result.stats;
    if show_stats {
        eprintln!(
            "Continuations: {} before, {} after ({} nodes before, {} after)",
            stats.lambdas_before, stats.lambdas_after, stats.defs_before, stats.defs_after,
        );
        eprintln!(
            "   {} specializations, {} tail collapses, {} merges, {} nodes removed",
            stats.specializations, stats.tail_collapses, stats.merges, stats.removed_nodes
        );
        let mut targets = stats
            .specializations_by_target
            .iter()
            .collect::<Vec<_>>();
        targets.sort_by_key(|(_target, count)| std::cmp::Reverse(**count));
        for (target, count) in targets {
            eprintln!(" * {}: {} specializations", target, count);
        }
    }

    if let Some(path) = stats_out {
        let dump = bincode::serialize(&stats)?;
        std::fs::write(&path, dump)?;
    }

    Ok(())
}

fn run(sample: Sample, arg: u64, input: u64, fuel: usize) -> anyhow::Result<()> {
    let program = sample.build(arg);
    let results = program.run(&inputs_for(&program, input), fuel)?;
    for value in results {
        println!("{:?}", value);
    }
    Ok(())
}
