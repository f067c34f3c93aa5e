#![no_std]

extern crate alloc;

pub mod config;
pub mod config_presets;
