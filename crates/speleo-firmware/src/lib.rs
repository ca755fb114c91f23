//! ESP32-S3 firmware-specific modules for speleo
//!
//! This crate contains the hardware glue that cannot compile on desktop
//! targets: the timer interrupt behind the millisecond clock, the buzzer,
//! battery sampling and the [`Board`](speleo_core::Board) implementation
//! that ties them to the panel and light sleep.

#![no_std]

extern crate alloc;

pub mod battery;
pub mod board;
pub mod buzzer;
pub mod ticker;
