//! Integration tests for configuration and calibration loading as the
//! daemon does it at startup.

use std::fs;

use bluewater::adapters::config_file::YamlConfigFile;
use bluewater::app::ports::ConfigPort;
use bluewater::sensors::SensorKind;
use bluewater::sensors::calibration::{CalibrationModel, CalibrationRegistry};

const CONFIG: &str = "\
adc:
  bus: 0
  address: 72
  vref: 5.0
  channels: { ph: 1, tds: 3 }
gpio:
  pump_pin: 5
  valve_pin: 6
  relay_active_high: true
onewire:
  max_retries: 2
  retry_delay_ms: 50
poll_interval_ms: 1000
calibration:
  temp: { a: 1.0, b: -0.4 }
  tds: { a: 300.0 }
";

#[test]
fn file_entries_win_over_inline_ones() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.yaml");
    let cal_path = dir.path().join("calibration.yaml");
    fs::write(&config_path, CONFIG).unwrap();
    fs::write(&cal_path, "tds: { a: 250.0, b: 3.0 }\nph: { b: 0.2 }\n").unwrap();

    let config = YamlConfigFile::new(&config_path).load().unwrap();
    assert_eq!(config.i2c_device().to_str(), Some("/dev/i2c-0"));
    assert_eq!(config.adc.address, 0x48);
    assert_eq!(config.channel_for(SensorKind::Ph), Some(1));
    assert_eq!(config.channel_for(SensorKind::Turbidity), None);
    assert_eq!(config.retry_policy().max_retries, 2);
    assert!(config.gpio.relay_active_high);

    let mut registry = CalibrationRegistry::load(&cal_path).unwrap();
    registry.fill_missing_from(&config.inline_calibration());

    assert_eq!(registry.get("tds"), Some(CalibrationModel::new(250.0, 3.0)));
    assert_eq!(registry.get("ph"), Some(CalibrationModel::new(1.0, 0.2)));
    assert_eq!(registry.get("temp"), Some(CalibrationModel::new(1.0, -0.4)));
    assert_eq!(registry.model_or_identity("turbidity"), CalibrationModel::IDENTITY);
}

#[test]
fn calibration_tool_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config/calibration.yaml");

    // Existing entries survive an update of another sensor.
    let mut registry = CalibrationRegistry::load(&path).unwrap();
    assert!(registry.is_empty());
    registry.insert("temp", CalibrationModel::new(1.0, 0.3));
    registry.save(&path).unwrap();

    let fitted = CalibrationModel::fit(&[1.0, 2.0, 3.0], &[4.0, 7.0, 10.0]).unwrap();
    let mut registry = CalibrationRegistry::load(&path).unwrap();
    registry.insert("ph", fitted);
    registry.save(&path).unwrap();

    let reloaded = CalibrationRegistry::load(&path).unwrap();
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.get("temp"), Some(CalibrationModel::new(1.0, 0.3)));
    let ph = reloaded.get("ph").unwrap();
    assert!((ph.scale - 3.0).abs() < 1e-9);
    assert!((ph.offset - 1.0).abs() < 1e-9);
}
