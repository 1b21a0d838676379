//! Logs temperature, humidity, pressure and CO2 from a BME280 (I2C) and a
//! Senseair S8 (UART) on a Raspberry Pi for a user-chosen number of minutes.
//!
//! Interfaces to enable with `raspi-config`:
//! - I2C for the BME280
//! - Serial hardware for the S8, without a login shell on it

pub mod bme280;
pub mod bus;
pub mod config;
#[cfg(test)]
mod debug_utils;
pub mod error;
pub mod senseair;
pub mod sensors;
pub mod session;
pub mod sink;
pub mod structs;
