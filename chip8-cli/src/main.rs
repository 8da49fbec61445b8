//! Entrypoint for CLI
use std::{env, fs, time::Instant};

use chip8::{prelude::*, IMPL_VERSION};
use log::{error, info};

use self::{clock::Clock, config::CliConfig, error::AppError};

mod clock;
mod config;
mod error;

static USAGE: &str = r#"
usage: chip8 CMD [OPTIONS] FILE

commands:
    run     Run the target ROM file
    dis     Disassemble the target ROM into readable assembly

options for run:
    --config FILE   YAML file with VM settings
    --frames N      Stop after N frames at 60 Hz
    --no-throttle   Don't pace frames to 60 Hz

examples:
    chip8 run breakout.rom
    chip8 run --frames 600 --config fast.yaml breakout.rom
    chip8 dis breakout.rom

Log output is controlled with RUST_LOG.
"#;

fn run_bytecode(args: RunArgs) -> Result<(), AppError> {
    let mut conf = match &args.config {
        Some(path) => CliConfig::from_file(path)?,
        None => CliConfig::default(),
    };
    if args.frames.is_some() {
        conf.frames = args.frames;
    }
    conf.no_throttle |= args.no_throttle;

    let bytecode = fs::read(&args.filepath)?;

    let mut vm = Chip8Vm::new(conf.vm.clone());
    vm.load_rom(bytecode.as_slice())?;
    info!("running {} ({} bytes)", args.filepath, bytecode.len());

    let steps_per_frame = conf.vm.instructions_per_tick.max(1) as usize;
    let mut clock = Clock::new();
    let mut frame_count: u64 = 0;
    let mut redraw_count: u64 = 0;

    let start = Instant::now();
    let result = loop {
        if conf.frames.map_or(false, |frames| frame_count >= frames) {
            break Ok(());
        }

        let mut fault = None;
        for _ in 0..steps_per_frame {
            if let Err(err) = vm.step() {
                fault = Some(err);
                break;
            }
        }

        if vm.take_beep() {
            info!("beep");
        }

        if vm.draw_flag() {
            redraw_count += 1;
            vm.ack_draw();
        }

        frame_count += 1;

        if let Some(err) = fault {
            error!("fault after {frame_count} frames: {err}");
            break Err(err);
        }

        if !conf.no_throttle {
            clock.wait();
        }
    };
    let end = Instant::now();

    println!(
        "time taken: {}ms, frames: {frame_count}, redraws: {redraw_count}",
        end.duration_since(start).as_nanos() as f64 / 1000000.0
    ); // to millis
    println!("{}", vm.dump_display()?);

    result?;

    Ok(())
}

fn run_disassembler(filepath: impl AsRef<str>) -> Result<(), AppError> {
    let bytecode = fs::read(filepath.as_ref())?;
    print!("{}", Disassembler::new(bytecode.as_slice()).to_text()?);
    Ok(())
}

fn main() {
    simple_logger::SimpleLogger::new().env().init().unwrap();

    let result = match parse_args() {
        Some(Cmd::Run(args)) => run_bytecode(args),
        Some(Cmd::Dis { filepath }) => run_disassembler(filepath),
        None => {
            print_usage();
            // FreeBSD EX_USAGE (64)
            std::process::exit(64)
        }
    };

    if let Err(err) = result {
        error!("{err}");
        std::process::exit(1)
    }
}

fn parse_args() -> Option<Cmd> {
    let mut args = env::args().skip(1);
    match args.next()?.as_str() {
        "run" => parse_run_args(args).map(Cmd::Run),
        "dis" => Some(Cmd::Dis {
            filepath: consume_arg(args)?,
        }),
        _ => None,
    }
}

fn parse_run_args(mut args: impl Iterator<Item = String>) -> Option<RunArgs> {
    let mut config = None;
    let mut frames = None;
    let mut no_throttle = false;
    let mut filepath = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config = Some(consume_arg(&mut args)?),
            "--frames" => frames = Some(consume_arg(&mut args)?.parse().ok()?),
            "--no-throttle" => no_throttle = true,
            _ if arg.starts_with("--") => return None,
            _ => filepath = Some(arg),
        }
    }

    Some(RunArgs {
        filepath: filepath?,
        config,
        frames,
        no_throttle,
    })
}

/// Consumes the next argument, or `None` so the caller prints the usage text.
fn consume_arg(mut args: impl Iterator<Item = String>) -> Option<String> {
    args.next()
}

fn print_usage() {
    println!("Chip8 v{IMPL_VERSION}");
    println!("{USAGE}");
}

enum Cmd {
    /// Run file
    Run(RunArgs),
    /// Disassemble
    Dis { filepath: String },
}

struct RunArgs {
    filepath: String,
    config: Option<String>,
    frames: Option<u64>,
    no_throttle: bool,
}
