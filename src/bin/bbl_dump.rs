//! Minimal debugging CLI: decode a log file and print its statistics plus
//! the first handful of frames. Not an export pipeline, see `DESIGN.md`.

use std::fs;

use anyhow::{Context, Result};
use clap::Parser;

use blackbox_decoder::{Decoder, FrameEvent};

#[derive(Parser)]
#[command(name = "bbl-dump", about = "Dump Blackbox log frames and statistics")]
struct Args {
    /// Path to a .bbl/.bfl/.txt log file
    path: String,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Maximum number of frames to print
    #[arg(short = 'n', long, default_value_t = 20)]
    limit: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();

    let bytes =
        fs::read(&args.path).with_context(|| format!("reading {}", args.path))?;

    let mut decoder = Decoder::new(&bytes);
    let data_start = decoder
        .parse_header(0, bytes.len())
        .with_context(|| format!("parsing header of {}", args.path))?;

    let mut printed = 0usize;
    let result = decoder.parse_log_data(data_start, bytes.len(), |event| {
        if printed >= args.limit {
            return;
        }
        match event {
            FrameEvent::MainFrame {
                frame_type,
                valid,
                data,
                start,
                size,
            } => {
                println!("{frame_type} @{start} ({size}B) valid={valid} {data:?}");
                printed += 1;
            }
            FrameEvent::AuxFrame {
                frame_type,
                data,
                start,
                size,
            } => {
                println!("{frame_type} @{start} ({size}B) {data:?}");
                printed += 1;
            }
            FrameEvent::Event { event, start, size } => {
                println!("E @{start} ({size}B) {event:?}");
                printed += 1;
            }
            FrameEvent::Corrupt {
                frame_type,
                start,
                size,
            } => {
                println!("corrupt @{start} ({size}B) type={frame_type:?}");
                printed += 1;
            }
        }
    });

    result.with_context(|| format!("decoding data section of {}", args.path))?;

    let stats = decoder.stats();
    println!(
        "\n{} bytes, {} corrupt frames, {} intentionally absent iterations",
        stats.total_bytes, stats.total_corrupt_frames, stats.intentionally_absent_iterations
    );

    Ok(())
}
