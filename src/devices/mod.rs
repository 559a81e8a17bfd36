// src/devices/mod.rs

//! Platform capability implementations that ship with the crate.

pub mod synthetic;

pub use synthetic::{
    SyntheticDetector, SyntheticDevices, SyntheticEncoder, SyntheticScene, SyntheticScreen,
    SyntheticStream,
};
