//! Session replay driver for the order book engine.
//!
//! Reads commands line by line (file or stdin), feeds them through the
//! engine, and prints the resulting events to stdout. Rejected commands
//! become `E,` lines; the session keeps going.

mod config;

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};

use anyhow::{Context, Result};
use clap::Parser;
use lob_core::Engine;
use lob_protocol::{format_depth, format_error, format_trade, parse_line, Command};
use tracing::info;

#[derive(Parser)]
#[clap(name = "lob-replay")]
#[clap(about = "Replay a recorded command session through the matching engine")]
struct Cli {
    /// Command file; `-` reads from stdin
    input: String,

    /// Print a depth snapshot after the session
    #[clap(short, long)]
    snapshot: bool,

    /// Expiry zone override (wins over LOB_EXPIRY_ZONE)
    #[clap(long)]
    expiry_zone: Option<String>,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt::init();
    }

    let mut config = config::from_env()?;
    if let Some(zone) = cli.expiry_zone {
        config.expiry_zone = zone;
    }

    let mut engine = Engine::with_config(config);
    engine.start()?;

    let reader: Box<dyn BufRead> = if cli.input == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let file =
            File::open(&cli.input).with_context(|| format!("cannot open {:?}", cli.input))?;
        Box::new(BufReader::new(file))
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut commands = 0usize;
    for line in reader.lines() {
        let line = line.context("reading session input")?;
        let Some(command) = parse_line(&line) else {
            continue;
        };
        commands += 1;
        run_command(&engine, command, &mut out)?;
    }

    if cli.snapshot {
        for line in format_depth(&engine.snapshot()) {
            writeln!(out, "{line}")?;
        }
    }

    info!(commands, resting = engine.size(), "session complete");
    engine.shutdown();
    Ok(())
}

fn run_command(engine: &Engine, command: Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Add(order) => match engine.add_order(order) {
            Ok(trades) => {
                for trade in &trades {
                    writeln!(out, "{}", format_trade(trade))?;
                }
            }
            Err(e) => writeln!(out, "{}", format_error(&e))?,
        },
        Command::Cancel(order_id) => {
            if let Err(e) = engine.cancel_order(order_id) {
                writeln!(out, "{}", format_error(&e))?;
            }
        }
        Command::Modify(modify) => match engine.modify_order(modify) {
            Ok(trades) => {
                for trade in &trades {
                    writeln!(out, "{}", format_trade(trade))?;
                }
            }
            Err(e) => writeln!(out, "{}", format_error(&e))?,
        },
        Command::Snapshot => {
            for line in format_depth(&engine.snapshot()) {
                writeln!(out, "{line}")?;
            }
        }
    }
    Ok(())
}
