//! Command-line front-end for the Y86-64 simulator.
//!
//! Grounded on the teacher's `task/src/main.rs` for the `clap::Parser`
//! derive shape and `colored`-highlighted error reporting, re-pointed at
//! an actual Y86-64 run instead of macOS app bundling.

use std::fs;
use std::process::ExitCode;

use clap::Parser;
use colored::*;
use y86_core::simulator::Simulator;
use y86_core::registers::Status;

/// Assemble and run a Y86-64 program.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to Y86-64 assembly source
    file: String,

    /// Emit one line per step to stdout (PC, status, flags)
    #[arg(long)]
    trace: bool,

    /// Memory byte count
    #[arg(long = "mem-size", default_value_t = 4096)]
    mem_size: usize,

    /// Initial %rsp (defaults to --mem-size)
    #[arg(long)]
    stack: Option<u64>,

    /// Print a hex dump of the first 256 bytes after execution
    #[arg(long = "dump-memory")]
    dump_memory: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(code) => code,
        Err(message) => {
            eprintln!("{} {message}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode, String> {
    let source = fs::read_to_string(&cli.file).map_err(|e| format!("reading {}: {e}", cli.file))?;

    let stack = cli.stack.unwrap_or(cli.mem_size as u64);
    let mut sim = Simulator::new(cli.mem_size);
    sim.load_source(&source, stack).map_err(|e| e.render(&source))?;

    log::info!("loaded {} ({} bytes of memory, stack at {stack})", cli.file, cli.mem_size);

    if cli.trace {
        print_trace_line(&sim);
        while sim.status() == Status::Aok {
            sim.step();
            print_trace_line(&sim);
        }
    } else {
        sim.run(false, 10_000);
    }

    if cli.dump_memory {
        println!("{}", sim.dump_memory(0, 256));
    }

    match sim.status() {
        Status::Aok | Status::Hlt => Ok(ExitCode::SUCCESS),
        Status::Adr | Status::Ins => {
            eprintln!(
                "{} simulation halted with {} at pc=0x{:04x}",
                "fault:".red().bold(),
                sim.status().name(),
                sim.pc()
            );
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_trace_line(sim: &Simulator) {
    let snap = sim.snapshot();
    println!(
        "pc=0x{:04x} stat={} zf={} sf={} of={}",
        sim.pc(),
        sim.status().name(),
        snap.cc.zf,
        snap.cc.sf,
        snap.cc.of
    );
}
