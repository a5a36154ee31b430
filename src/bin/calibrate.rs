//! Offline two-or-more-point calibration for one sensor channel.
//!
//! Reads `<measured> <reference>` pairs from stdin until an empty line or
//! EOF, fits `reference = a * measured + b`, and stores the model under
//! the sensor's key in the calibration registry file.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;

use bluewater::sensors::calibration::{CalibrationModel, CalibrationRegistry, parse_pair_line};

/// Fit an affine calibration from measured/reference pairs
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Sensor key to calibrate
    #[clap(long, value_parser = ["ph", "tds", "turbidity", "temp"])]
    sensor: String,

    /// Calibration registry to update
    #[clap(long, default_value = "config/calibration.yaml")]
    out: PathBuf,
}

/// Collect pairs, skipping lines that do not parse.
fn read_pairs(input: impl BufRead, mut prompt: impl Write) -> Result<(Vec<f64>, Vec<f64>)> {
    let mut measured = Vec::new();
    let mut reference = Vec::new();
    for line in input.lines() {
        let line = line.context("reading stdin")?;
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        match parse_pair_line(line) {
            Ok((m, r)) => {
                measured.push(m);
                reference.push(r);
            }
            Err(e) => writeln!(prompt, "{e}")?,
        }
    }
    Ok((measured, reference))
}

fn main() -> Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "warn"),
    );
    let args = Args::parse();

    let mut out = io::stdout();
    writeln!(
        out,
        "Calibrating {}. Enter measured (voltage) then reference (true units), one pair per line.",
        args.sensor
    )?;
    writeln!(out, "Empty line when done.")?;

    let (measured, reference) = read_pairs(io::stdin().lock(), &mut out)?;
    if measured.is_empty() {
        bail!("no points entered");
    }

    let model = CalibrationModel::fit(&measured, &reference).context("fitting calibration")?;
    writeln!(
        out,
        "Fitted: value = {:.6} * measured + {:.6}",
        model.scale, model.offset
    )?;

    let mut registry = CalibrationRegistry::load(&args.out)
        .with_context(|| format!("loading {}", args.out.display()))?;
    registry.insert(&args.sensor, model);
    registry
        .save(&args.out)
        .with_context(|| format!("saving {}", args.out.display()))?;
    writeln!(out, "Saved to {}", args.out.display())?;
    Ok(())
}
