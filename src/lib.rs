//! Volume Dial - coalescing volume engine for rotary dial controllers
//!
//! Dial ticks, presses and taps from a host application are turned into a
//! minimal, serialized stream of volume/mute commands against the system
//! mixer, while every visible dial is kept showing the same state.

pub mod backend;
pub mod cli;
pub mod config;
pub mod engine;
pub mod host;
pub mod paths;
