//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements   | Connects to                   |
//! |---------------|--------------|-------------------------------|
//! | `hardware`    | ActuatorPort | Relay output pins             |
//! |               | SensorPort   | PCF8591 inputs, DS18B20       |
//! | `log_sink`    | EventSink    | `log` facade                  |
//! | `config_file` | ConfigPort   | YAML file on disk             |
//! | `linux`       | (factories)  | /dev/i2c-*, /dev/gpiochip*, w1 sysfs |

pub mod config_file;
pub mod hardware;
#[cfg(feature = "linux")]
pub mod linux;
pub mod log_sink;
