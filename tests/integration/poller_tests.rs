//! Integration tests for the sensors → poller → state store pipeline.
//!
//! Real `SensorBank` wiring over a mock PCF8591 bus and a fake one-wire
//! sysfs tree; the poller is driven cycle by cycle or on its own thread.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use bluewater::adapters::hardware::build_sensor_bank;
use bluewater::app::poller::Poller;
use bluewater::app::ports::SensorPort;
use bluewater::config::SystemConfig;
use bluewater::error::{DeviceError, Error, Result};
use bluewater::sensors::analog::Pcf8591;
use bluewater::sensors::calibration::{CalibrationModel, CalibrationRegistry};
use bluewater::sensors::onewire::{self, Ds18b20, RetryPolicy};
use bluewater::sensors::{SensorBank, SensorKind};
use bluewater::state::StateStore;

use crate::mock_hw::{
    CountingDelay, MockAdcBus, RecordingSink, ScriptedReader, w1_payload, write_w1_slave,
};

const DEVICE_ID: &str = "28-0000075f1b2c";

fn thermometer(base: &std::path::Path, delay: CountingDelay) -> Result<Ds18b20<CountingDelay>> {
    Ds18b20::discover(
        base,
        RetryPolicy {
            max_retries: 5,
            delay: Duration::from_millis(200),
        },
        delay,
    )
}

fn adc(bus: MockAdcBus) -> Option<Pcf8591<MockAdcBus>> {
    Some(Pcf8591::new(bus, 0x48, 3.3))
}

// ── Full pipeline ─────────────────────────────────────────────

#[test]
fn calibrated_cycle_over_real_drivers() {
    let w1 = tempfile::tempdir().unwrap();
    write_w1_slave(w1.path(), DEVICE_ID, &w1_payload(true, 23187));

    let config = SystemConfig::default();
    let mut registry = CalibrationRegistry::new();
    registry.insert("ph", CalibrationModel::new(2.0, 1.0));
    registry.insert("temp", CalibrationModel::new(1.0, 0.5));

    // ph on AIN0, turbidity on AIN1, tds on AIN2
    let bus = MockAdcBus::with_levels([128, 0, 255, 0]);
    let mut bank = build_sensor_bank(
        adc(bus),
        thermometer(w1.path(), CountingDelay::default()),
        &config,
        &registry,
    );

    let store = Arc::new(StateStore::new());
    let mut sink = RecordingSink::default();
    let mut poller = Poller::from_config(Arc::clone(&store), &config, registry.get("temp"));
    let snap = poller.poll_once(&mut bank, &mut sink);

    assert_eq!(snap.ph, Some(4.313));
    assert_eq!(snap.tds, Some(3.3));
    assert_eq!(snap.turbidity, Some(0.0));
    assert_eq!(snap.temperature, Some(23.69));
    assert_eq!(snap.last_error(), None);
    assert_eq!(store.current(), snap);
    assert_eq!(sink.completed_cycles(), 1);
}

#[test]
fn analog_reading_follows_the_bus() {
    let config = SystemConfig::default();
    let bus = MockAdcBus::with_levels([0, 0, 0, 0]);
    let mut bank = build_sensor_bank(
        adc(bus.clone()),
        Err::<Ds18b20<CountingDelay>, _>(Error::DeviceNotFound("no probe")),
        &config,
        &CalibrationRegistry::new(),
    );

    assert_eq!(bank.read_channel(SensorKind::Tds).unwrap(), Some(0.0));
    bus.set_level(2, 255);
    assert_eq!(bank.read_channel(SensorKind::Tds).unwrap(), Some(3.3));
}

// ── Failure isolation ─────────────────────────────────────────

#[test]
fn temperature_failure_leaves_other_channels_populated() {
    let mut bank = SensorBank::new()
        .with_reader(SensorKind::Ph, ScriptedReader::always(Ok(Some(6.9))))
        .with_reader(SensorKind::Tds, ScriptedReader::always(Ok(Some(250.0))))
        .with_reader(SensorKind::Turbidity, ScriptedReader::always(Ok(Some(1.5))))
        .with_reader(
            SensorKind::Temperature,
            ScriptedReader::always(Err(Error::Device(DeviceError::Io(
                io::ErrorKind::NotFound,
            )))),
        );

    let store = Arc::new(StateStore::new());
    let mut sink = RecordingSink::default();
    let snap = Poller::new(Arc::clone(&store), Duration::from_secs(2)).poll_once(&mut bank, &mut sink);

    assert_eq!(snap.ph, Some(6.9));
    assert_eq!(snap.tds, Some(250.0));
    assert_eq!(snap.turbidity, Some(1.5));
    assert_eq!(snap.temperature, None);
    assert!(snap.last_error().unwrap().starts_with("temp: device error"));
    assert_eq!(sink.faults(), vec!["temp".to_owned()]);
}

#[test]
fn bus_failure_hits_analog_channels_only() {
    let w1 = tempfile::tempdir().unwrap();
    write_w1_slave(w1.path(), DEVICE_ID, &w1_payload(true, 19500));

    let bus = MockAdcBus::with_levels([100, 100, 100, 100]);
    bus.set_failing(true);
    let mut bank = build_sensor_bank(
        adc(bus.clone()),
        thermometer(w1.path(), CountingDelay::default()),
        &SystemConfig::default(),
        &CalibrationRegistry::new(),
    );

    let mut sink = RecordingSink::default();
    let mut poller = Poller::new(Arc::new(StateStore::new()), Duration::from_secs(2));
    let snap = poller.poll_once(&mut bank, &mut sink);

    assert_eq!(snap.ph, None);
    assert_eq!(snap.tds, None);
    assert_eq!(snap.turbidity, None);
    assert_eq!(snap.temperature, Some(19.5));
    let error = snap.last_error().unwrap();
    assert!(error.starts_with("ph: device error: I2C bus"));
    assert!(error.contains("; tds: "));
    assert_eq!(sink.faults(), vec!["ph", "tds", "turbidity"]);

    // Bus recovers, next cycle is clean.
    bus.set_failing(false);
    let snap = poller.poll_once(&mut bank, &mut sink);
    assert_eq!(snap.cycle, 2);
    assert!(snap.ph.is_some());
    assert_eq!(snap.last_error(), None);
}

#[test]
fn crc_exhaustion_is_absence_not_error() {
    let w1 = tempfile::tempdir().unwrap();
    write_w1_slave(w1.path(), DEVICE_ID, &w1_payload(false, 21000));
    let delay = CountingDelay::default();

    let mut bank = build_sensor_bank(
        None::<Pcf8591<MockAdcBus>>,
        thermometer(w1.path(), delay.clone()),
        &SystemConfig::default(),
        &CalibrationRegistry::new(),
    );

    let mut poller = Poller::new(Arc::new(StateStore::new()), Duration::from_secs(2));
    let snap = poller.poll_once(&mut bank, &mut RecordingSink::default());

    assert_eq!(snap.temperature, None);
    assert_eq!(snap.last_error(), None);
    assert_eq!(*delay.pauses.lock().unwrap(), 5);
}

#[test]
fn undetected_hardware_reads_as_absent() {
    let w1 = tempfile::tempdir().unwrap();
    let mut bank = build_sensor_bank(
        None::<Pcf8591<MockAdcBus>>,
        thermometer(w1.path(), CountingDelay::default()),
        &SystemConfig::default(),
        &CalibrationRegistry::new(),
    );

    for kind in SensorKind::ALL {
        assert!(bank.has_reader(kind));
        assert_eq!(bank.read_channel(kind).unwrap(), None);
    }
}

#[test]
fn unwired_channel_is_absent_without_fault() {
    let mut config = SystemConfig::default();
    config.adc.channels.remove("tds");
    let mut bank = build_sensor_bank(
        adc(MockAdcBus::with_levels([10, 20, 30, 40])),
        Err::<Ds18b20<CountingDelay>, _>(Error::DeviceNotFound("no probe")),
        &config,
        &CalibrationRegistry::new(),
    );

    assert!(!bank.has_reader(SensorKind::Tds));
    let mut sink = RecordingSink::default();
    let snap = Poller::new(Arc::new(StateStore::new()), Duration::from_secs(2))
        .poll_once(&mut bank, &mut sink);
    assert_eq!(snap.tds, None);
    assert!(snap.ph.is_some());
    assert!(sink.faults().is_empty());
}

// ── Read budget ───────────────────────────────────────────────

/// Temperature arrives only after `latency`, like a DS18B20 conversion.
struct SlowTemperature {
    latency: Duration,
}

impl SensorPort for SlowTemperature {
    fn read_channel(&mut self, kind: SensorKind) -> Result<Option<f64>> {
        if kind != SensorKind::Temperature {
            return Ok(None);
        }
        thread::sleep(self.latency);
        Ok(Some(21.5))
    }
}

#[test]
fn read_within_retry_policy_is_kept() {
    let mut config = SystemConfig::default();
    // Far below one conversion; the effective budget is raised to 750 ms.
    config.read_budget_ms = 10;
    config.onewire.max_retries = 0;
    config.onewire.retry_delay_ms = 0;

    let mut port = SlowTemperature {
        latency: Duration::from_millis(40),
    };
    let mut sink = RecordingSink::default();
    let snap = Poller::from_config(Arc::new(StateStore::new()), &config, None)
        .poll_once(&mut port, &mut sink);

    assert_eq!(snap.temperature, Some(21.5));
    assert_eq!(snap.last_error(), None);
    assert!(sink.faults().is_empty());
}

#[test]
fn default_budget_keeps_a_retried_read() {
    let config = SystemConfig::default();
    let policy = config.retry_policy();
    let second_attempt_succeeds = onewire::CONVERSION_TIME * 2 + policy.delay;
    assert!(config.read_budget().unwrap() >= second_attempt_succeeds);
    assert!(config.read_budget().unwrap() >= policy.worst_case());
}

#[test]
fn read_over_explicit_budget_is_discarded() {
    let mut port = SlowTemperature {
        latency: Duration::from_millis(40),
    };
    let mut sink = RecordingSink::default();
    let snap = Poller::new(Arc::new(StateStore::new()), Duration::from_secs(2))
        .with_read_budget(Duration::from_millis(5))
        .poll_once(&mut port, &mut sink);

    assert_eq!(snap.temperature, None);
    assert_eq!(
        snap.last_error(),
        Some("temp: device error: read exceeded its time budget")
    );
    assert_eq!(sink.faults(), vec!["temp"]);
}

// ── Concurrency ───────────────────────────────────────────────

/// Every channel reports the cycle number, so any mixed snapshot shows up
/// as channels that disagree.
struct Lockstep {
    cycle: f64,
}

impl SensorPort for Lockstep {
    fn read_channel(&mut self, kind: SensorKind) -> Result<Option<f64>> {
        if kind == SensorKind::Ph {
            self.cycle += 1.0;
        }
        thread::yield_now();
        Ok(Some(self.cycle))
    }
}

#[test]
fn readers_never_see_a_partial_snapshot() {
    let store = Arc::new(StateStore::new());
    let stop = Arc::new(AtomicBool::new(false));
    let sink = RecordingSink::default();

    let handle = Poller::new(Arc::clone(&store), Duration::from_millis(1))
        .spawn(Lockstep { cycle: 0.0 }, sink.clone(), Arc::clone(&stop))
        .unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..2_000 {
                    let snap = store.current();
                    if snap.cycle == 0 {
                        continue;
                    }
                    let ph = snap.ph.unwrap();
                    assert_eq!(snap.tds, Some(ph));
                    assert_eq!(snap.turbidity, Some(ph));
                    assert_eq!(snap.temperature, Some(ph));
                    assert_eq!(ph, snap.cycle as f64);
                }
            })
        })
        .collect();

    for reader in readers {
        reader.join().unwrap();
    }
    stop.store(true, Ordering::Release);
    handle.join().unwrap();

    assert!(sink.completed_cycles() > 0);
    assert_eq!(store.current().cycle as usize, sink.completed_cycles());
}
