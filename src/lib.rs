//! BlueWater water-quality monitor library.
//!
//! Exposes the sampling pipeline, calibration and boundary interface for
//! the binaries and for integration testing. Linux peripheral access is
//! behind the `linux` feature (`adapters::linux`); everything else builds
//! and tests on any host.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod sensors;
pub mod state;
