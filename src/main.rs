//! BlueWater daemon: main entry point.
//!
//! Hexagonal layout with one sampling thread and a console on stdin.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SensorBank        RelayActuators  LogEventSink  YamlConfigFile│
//! │  (PCF8591+DS18B20) (pump, valve)   (EventSink)   (ConfigPort)  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌──────────────────────┐         ┌─────────────────────────┐  │
//! │  │ Poller (own thread)  │──pub──▶ │ StateStore              │  │
//! │  └──────────────────────┘         └───────────▲─────────────┘  │
//! │                                               │ read / record  │
//! │                                   ┌───────────┴─────────────┐  │
//! │                                   │ ControlApi ◀── console  │  │
//! │                                   └─────────────────────────┘  │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};

use bluewater::adapters::config_file::YamlConfigFile;
use bluewater::adapters::hardware::build_sensor_bank;
use bluewater::adapters::linux;
use bluewater::adapters::log_sink::LogEventSink;
use bluewater::app::api::ControlApi;
use bluewater::app::console;
use bluewater::app::poller::Poller;
use bluewater::app::ports::ConfigPort;
use bluewater::sensors::SensorKind;
use bluewater::sensors::calibration::CalibrationRegistry;
use bluewater::state::StateStore;

/// Water-quality monitor daemon
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Configuration file
    #[clap(long, default_value = "config/config.yaml")]
    config: PathBuf,

    /// Calibration registry (overrides `calibration_path` from the config)
    #[clap(long)]
    calibration: Option<PathBuf>,

    /// Run without the stdin console until the process is killed
    #[clap(long)]
    no_console: bool,
}

fn main() -> Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );
    let args = Args::parse();

    info!("BlueWater v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Configuration ──────────────────────────────────────
    let config = YamlConfigFile::new(&args.config)
        .load()
        .with_context(|| format!("loading {}", args.config.display()))?;

    // ── 2. Calibration: file entries win over inline ones ─────
    let calibration_path = args
        .calibration
        .unwrap_or_else(|| config.calibration_path.clone());
    let mut registry = CalibrationRegistry::load(&calibration_path)
        .with_context(|| format!("loading {}", calibration_path.display()))?;
    registry.fill_missing_from(&config.inline_calibration());
    info!(
        "{} calibration entries from {}",
        registry.len(),
        calibration_path.display()
    );

    // ── 3. Hardware ───────────────────────────────────────────
    let adc = linux::open_adc(&config)
        .inspect_err(|e| warn!("ADC: {}", e))
        .ok();
    let sensors = build_sensor_bank(
        adc,
        linux::discover_thermometer(&config),
        &config,
        &registry,
    );
    let relays = linux::open_relays(&config).context("cannot drive the pump and valve")?;

    // ── 4. Domain ─────────────────────────────────────────────
    let store = Arc::new(StateStore::new());
    let api = ControlApi::new(Arc::clone(&store), relays);
    let poller = Poller::from_config(
        Arc::clone(&store),
        &config,
        registry.get(SensorKind::Temperature.name()),
    );

    let stop = Arc::new(AtomicBool::new(false));
    let handle = poller
        .spawn(sensors, LogEventSink::new(), Arc::clone(&stop))
        .context("spawning poller thread")?;

    // ── 5. Console until quit / EOF ───────────────────────────
    if args.no_console {
        info!("console disabled, running until killed");
        // The poller never stops on its own; join only returns on a panic.
        if handle.join().is_err() {
            error!("poller thread panicked, releasing actuators");
            api.shutdown().context("shutdown")?;
        }
        anyhow::bail!("poller thread exited");
    }

    info!("console ready (type 'help')");
    let served = console::serve(&api, io::stdin().lock(), io::stdout());

    stop.store(true, Ordering::Release);
    if handle.join().is_err() {
        warn!("poller thread panicked");
    }
    api.shutdown().context("shutdown")?;
    served.context("console I/O")?;
    info!("bye");
    Ok(())
}
