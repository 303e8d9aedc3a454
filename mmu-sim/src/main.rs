mod error;
mod random_file;
mod report;
mod trace_file;

use std::{
    io::{self, BufWriter, Write},
    path::PathBuf,
    process::ExitCode,
};

use clap::Parser;
use log::info;
use vm::{
    page_replacer::{PolicyKind, DEFAULT_ROUND},
    Mmu, MmuConfig,
};

use crate::{error::Result, report::OutputOptions};

/// Replays a process trace against a simulated MMU and reports paging activity and cost.
#[derive(Parser, Debug)]
#[command(name = "mmu-sim", version)]
struct Cli {
    /// Number of physical frames (1..=128)
    #[arg(short = 'f', long = "frames")]
    frames: usize,

    /// Replacement policy: f(ifo) r(andom) c(lock) e(nru) a(ging) w(orking set)
    #[arg(short = 'a', long = "algo")]
    algo: PolicyKind,

    /// Output sections: O trace, P page tables, F frame table, S summary
    #[arg(short = 'o', long = "output")]
    output: Option<OutputOptions>,

    /// Instruction window for the NRU reset round and the working-set threshold
    #[arg(long, default_value_t = DEFAULT_ROUND)]
    round: u64,

    /// Process and instruction trace
    inputfile: PathBuf,

    /// Random number file used by the random policy
    randfile: PathBuf,
}

fn run(cli: Cli) -> Result<()> {
    let config = MmuConfig::with_round(cli.frames, cli.algo, cli.round)?;
    let options = cli.output.unwrap_or_default();

    let trace = trace_file::load(&cli.inputfile)?;
    let random = random_file::load(&cli.randfile)?;

    info!(
        "loaded {} processes and {} instructions from {}",
        trace.processes.len(),
        trace.instructions.len(),
        cli.inputfile.display()
    );

    let mut mmu = Mmu::new(config, trace.processes, random);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    for instruction in trace.instructions {
        if options.trace {
            writeln!(
                out,
                "{}",
                report::instruction_line(mmu.clock(), &instruction, mmu.current_process())
            )?;
        }

        let events = mmu.execute(instruction)?;

        if options.trace {
            for event in &events {
                writeln!(out, "{}", report::event_line(event))?;
            }
        }
    }

    report::write_final(&mut out, &mmu, &options)?;
    out.flush()?;

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("mmu-sim: {}", err);
            err.exit_code()
        }
    }
}
