//! Hardware-independent core library for speleo
//!
//! This crate contains all platform-agnostic logic for the speleo handheld
//! CO₂ monitor: the SCD4x command protocol engine, button classification,
//! alert hysteresis, the measuring/menu state machine and the power-off
//! sequencer, plus the glyph display abstraction they render through.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets (ESP32-S3) and desktop hosts (for the simulator and tests).

#![no_std]

extern crate alloc;

pub mod alert;
pub mod app;
pub mod board;
pub mod clock;
pub mod config;
pub mod display;
pub mod framebuffer;
pub mod input;
pub mod power;
pub mod scd4x;
pub mod tone;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use app::{AppStateKind, Monitor, StartupError};
pub use board::Board;
pub use scd4x::{Measurement, ProtocolError, Scd4x, SensorVariant};
