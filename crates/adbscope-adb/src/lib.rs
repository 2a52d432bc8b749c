//! Android Debug Bridge client for adbscope
//!
//! This crate wraps the `adb` executable: device enumeration, logcat
//! streaming and the device process table.

mod client;

pub use client::{
    AdbClient, AdbError, AdbProcessSource, DeviceInfo, DeviceState, Logcat, parse_devices,
};
