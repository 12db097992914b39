//! fastfx probe
//!
//! Renders a synthetic test signal through a rack and logs meters, peak
//! level and latency. Useful for checking a chain without a host.

use std::str::FromStr;

use anyhow::{bail, Context};
use clap::Parser;
use fastfx_core::{logging, ProcessorKind, Rack, RackConfig, RackState, StreamConfig};
use tracing::info;

#[derive(Parser)]
#[command(name = "fastfx-probe")]
#[command(about = "Run a synthetic signal through a fastfx rack", long_about = None)]
struct Cli {
    /// Comma-separated chain, e.g. "eq,compressor,limiter"
    #[arg(short, long, default_value = "eq,compressor,limiter")]
    chain: String,

    /// Sample rate in Hz
    #[arg(short, long, default_value_t = 48000)]
    sample_rate: u32,

    /// Block size in frames
    #[arg(short, long, default_value_t = 512)]
    buffer_size: u32,

    /// Seconds of audio to render
    #[arg(long, default_value_t = 2.0)]
    seconds: f32,

    /// Restore rack state from a saved blob before rendering
    #[arg(long)]
    state: Option<std::path::PathBuf>,

    /// Print the rack state as JSON when done
    #[arg(long)]
    dump_state: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// 220Hz tone alternating between -20dBFS and +3dBFS every quarter second
fn test_signal(frame: usize, sample_rate: f32) -> f32 {
    let t = frame as f32 / sample_rate;
    let amplitude = if (t * 4.0) as usize % 2 == 0 { 0.1 } else { 1.41 };
    (2.0 * std::f32::consts::PI * 220.0 * t).sin() * amplitude
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(if cli.verbose { "fastfx=debug" } else { logging::DEFAULT_FILTER });

    if cli.seconds.is_nan() || cli.seconds <= 0.0 {
        bail!("--seconds must be positive, got {}", cli.seconds);
    }

    let chain = cli
        .chain
        .split(',')
        .filter(|name| !name.trim().is_empty())
        .map(ProcessorKind::from_str)
        .collect::<Result<Vec<_>, _>>()?;

    let config = RackConfig {
        stream: StreamConfig {
            sample_rate: cli.sample_rate,
            channels: 2,
            buffer_size: cli.buffer_size,
        },
        chain,
    };
    let mut rack = Rack::new(&config)?;

    if let Some(path) = &cli.state {
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        rack.apply_state(&RackState::from_bytes(&bytes)?)?;
    }

    let sample_rate = cli.sample_rate as f32;
    let block = cli.buffer_size as usize;
    let total_frames = (cli.seconds * sample_rate) as usize;
    let meters = rack.meters();
    let kinds = rack.kinds();

    let mut left = vec![0.0_f32; block];
    let mut right = vec![0.0_f32; block];
    let mut frame = 0;
    let mut peak = 0.0_f32;
    let mut next_report = 0;

    while frame < total_frames {
        let n = block.min(total_frames - frame);
        for (i, (l, r)) in left[..n].iter_mut().zip(right[..n].iter_mut()).enumerate() {
            let sample = test_signal(frame + i, sample_rate);
            *l = sample;
            *r = sample * 0.8;
        }

        rack.process_block(&mut left[..n], &mut right[..n]);
        peak = left[..n]
            .iter()
            .chain(&right[..n])
            .fold(peak, |m, s| m.max(s.abs()));

        frame += n;
        if frame >= next_report {
            let readings = meters.snapshot();
            let line = kinds
                .iter()
                .zip(&readings)
                .map(|(kind, db)| format!("{}={:.2}dB", kind, db))
                .collect::<Vec<_>>()
                .join(" ");
            info!("t={:.2}s {}", frame as f32 / sample_rate, line);
            next_report += (sample_rate / 4.0) as usize;
        }
    }

    info!(
        "Rendered {} frames, peak {:.2}dBFS, latency {} samples",
        total_frames,
        20.0 * peak.max(1e-8).log10(),
        rack.latency_samples()
    );

    if cli.dump_state {
        let json = serde_json::to_string_pretty(&rack.snapshot())?;
        println!("{}", json);
    }

    Ok(())
}
