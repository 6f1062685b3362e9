//! Drive-control core for a battery-electric go-kart.
//!
//! Pedals and switches in, motor duty cycles and lamp levels out, one
//! polling iteration every 2ms. The core only talks to hardware through
//! [`hal::DriveHal`], so the whole control path runs on the host against
//! the simulated HAL; the ATmega328P implementation and the firmware entry
//! point are target-gated.

#![cfg_attr(not(test), no_std)]

pub mod application;
pub mod config;
pub mod diagnostics;
pub mod drivers;
pub mod hal;

pub use application::Controller;
