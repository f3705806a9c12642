//! LC-3 VM - CLI Entry Point
//!
//! `lc3-vm [IMAGE]` loads a raw big-endian image at x3000, dumps the loaded
//! memory, runs until HALT, then dumps memory and registers.

use clap::Parser;
use lc3::image::DEFAULT_IMAGE;
use lc3::{load_image, write_dump, Console, Cpu, DumpFormat, DumpStage, StdConsole};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lc3-vm")]
#[command(version = "0.1.0")]
#[command(about = "Run a program image on a 16-bit LC-3 style virtual machine")]
struct Cli {
    /// Path to the raw big-endian image to execute
    #[arg(default_value = DEFAULT_IMAGE)]
    image: PathBuf,

    /// Format of the memory/register dumps written before and after the run
    #[arg(short, long, value_enum, default_value_t = DumpFormat::Text)]
    dump: DumpFormat,

    /// Stop after this many instructions instead of running until HALT
    #[arg(short, long)]
    max_steps: Option<u64>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = run_program(&cli, &mut StdConsole::new(), &mut std::io::stdout(), &mut std::io::stderr());
    std::process::exit(code);
}

/// Load, dump, run and dump again. Returns the process exit status:
/// 0 on success, 1 if the image cannot be loaded or a dump cannot be
/// written, 2 on a console failure during execution.
fn run_program<C, W, E>(cli: &Cli, console: &mut C, out: &mut W, err: &mut E) -> i32
where
    C: Console + ?Sized,
    W: Write,
    E: Write,
{
    let mut cpu = Cpu::new();
    if let Err(e) = load_image(&mut cpu, &cli.image) {
        let _ = writeln!(err, "❌ Cannot load image: {}", e);
        return 1;
    }

    if let Err(code) = dump(&cpu, DumpStage::AfterLoad, cli.dump, out, err) {
        return code;
    }

    let result = match cli.max_steps {
        Some(max_steps) => cpu.run_limited(console, max_steps),
        None => cpu.run(console),
    };

    if let Err(e) = result {
        let _ = writeln!(err, "❌ CPU error at PC=x{:04X}: {}", cpu.regs.pc, e);
        return 2;
    }

    if cpu.is_running() {
        let _ = writeln!(
            err,
            "⚠️  Reached max steps limit ({}) without HALT.",
            cli.max_steps.unwrap_or_default()
        );
    }

    match dump(&cpu, DumpStage::after_run(&cpu), cli.dump, out, err) {
        Ok(()) => 0,
        Err(code) => code,
    }
}

fn dump<W: Write, E: Write>(cpu: &Cpu, stage: DumpStage, format: DumpFormat, out: &mut W, err: &mut E) -> Result<(), i32> {
    let written = write_dump(out, cpu, stage, format).and_then(|()| out.flush());
    written.map_err(|e| {
        let _ = writeln!(err, "❌ Failed to write dump: {}", e);
        1
    })
}
