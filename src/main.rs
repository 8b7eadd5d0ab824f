// src/main.rs
// Command-line front end for offline decoding of SDS800X HD dumps

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use sds_waveform::{AcquisitionConfig, AcquisitionSession, CountPolicy, DecodedWaveform, Preamble};

#[derive(Parser, Debug)]
#[command(name = "sds_waveform", about = "Decode captured SDS800X HD waveform transfers")]
struct Args {
    /// TOML configuration file
    #[arg(short = 'f', long = "config")]
    config: Option<PathBuf>,

    /// Scale blocks whose length disagrees with the preamble instead of failing
    #[arg(long)]
    reconcile: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Display preamble information
    Info { preamble: PathBuf },
    /// Print the preamble as JSON
    Dump { preamble: PathBuf },
    /// Convert a preamble and data block to CSV
    Convert {
        preamble: PathBuf,
        data: PathBuf,
        output: PathBuf,
    },
    /// Print time/voltage pairs to stdout
    Extract { preamble: PathBuf, data: PathBuf },
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> sds_waveform::Result<()> {
    let mut config = match &args.config {
        Some(path) => AcquisitionConfig::load(path)?,
        None => AcquisitionConfig::default(),
    };
    if args.reconcile {
        config.mismatch_policy = CountPolicy::Reconcile;
    }
    let mut session = AcquisitionSession::with_policy(config.mismatch_policy);

    match args.command {
        Command::Info { preamble } => {
            let bytes = std::fs::read(&preamble)?;
            print_preamble_info(&preamble, session.load_preamble(&bytes)?);
        }

        Command::Dump { preamble } => {
            let bytes = std::fs::read(&preamble)?;
            let map = session.load_preamble(&bytes)?.as_map();
            println!("{}", serde_json::to_string_pretty(&map)?);
        }

        Command::Convert {
            preamble,
            data,
            output,
        } => {
            let waveform = decode(&mut session, &preamble, &data)?;
            waveform.write_csv(&output)?;

            println!("Successfully converted {} to {}", data.display(), output.display());
            println!("Total samples written: {}", waveform.len());
            print_waveform_stats(&waveform);
        }

        Command::Extract { preamble, data } => {
            let waveform = decode(&mut session, &preamble, &data)?;
            println!("# Waveform from {}", data.display());
            println!("# Time (s), Voltage (V)");
            for (t, v) in waveform.points() {
                println!("{:.12e}, {:.6e}", t, v);
            }
        }
    }

    Ok(())
}

fn decode(
    session: &mut AcquisitionSession,
    preamble: &Path,
    data: &Path,
) -> sds_waveform::Result<DecodedWaveform> {
    let preamble_bytes = std::fs::read(preamble)?;
    let data_bytes = std::fs::read(data)?;
    session.fetch_waveform(&data_bytes, Some(&preamble_bytes[..]))
}

fn print_preamble_info(path: &Path, p: &Preamble) {
    println!("SDS Preamble Information");
    println!("========================");
    println!();
    println!("File: {}", path.display());
    println!();

    println!("Acquisition Parameters:");
    println!("  Number of points: {}", p.num_points);
    println!("  First point: {}", p.first_point);
    println!("  Data interval: {}", p.data_interval);
    println!("  Read frames: {}", p.read_frames);
    println!("  Sum frames: {}", p.sum_frames);
    println!("  Sequence frame index: {}", p.sequence_frame_idx);
    println!("  ADC bits: {}", p.adc_bit);
    println!();

    println!("Vertical:");
    println!("  Source: {} (index {})", p.source, p.source_channel);
    println!("  Gain: {} V/div", p.vertical_gain);
    println!("  Offset: {} V", p.vertical_offset);
    println!("  Codes per division: {}", p.code_per_div);
    println!("  Probe attenuation: {}X", p.probe_attenuation);
    match p.coupling() {
        Some(c) => println!("  Coupling: {:?}", c),
        None => println!("  Coupling: unknown ({})", p.vertical_coupling_idx),
    }
    match p.bandwidth_limit() {
        Some(b) => println!("  Bandwidth limit: {:?}", b),
        None => println!("  Bandwidth limit: unknown ({})", p.bw_limit),
    }
    println!();

    println!("Horizontal:");
    println!("  Timebase: {:.3e} s/div (index {})", p.timebase, p.timebase_idx);
    println!(
        "  Sample interval: {:.3e} s ({:.3} MHz sample rate)",
        p.horizontal_interval,
        1.0 / f64::from(p.horizontal_interval) / 1e6
    );
    println!("  Trigger offset: {:.6e} s", p.horizontal_offset);
}

fn print_waveform_stats(waveform: &DecodedWaveform) {
    if waveform.is_empty() {
        return;
    }
    let v = &waveform.voltage;
    let min = v.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    let max = v.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let avg = v.iter().sum::<f64>() / v.len() as f64;
    let rms = (v.iter().map(|&x| x * x).sum::<f64>() / v.len() as f64).sqrt();

    println!("  Data range: {:.3} V to {:.3} V", min, max);
    println!("  avg={:.3}V, rms={:.3}V", avg, rms);
    if let Some(m) = waveform.mismatch() {
        println!("  Note: preamble declared {} points, block held {}", m.declared, m.actual);
    }
}
