use chrono::{DateTime, Local};

/// Factory trimming coefficients of one BME280 unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CalibParams {
    pub dig_t1: u16,
    pub dig_t2: i16,
    pub dig_t3: i16,

    pub dig_p1: u16,
    pub dig_p2: i16,
    pub dig_p3: i16,
    pub dig_p4: i16,
    pub dig_p5: i16,
    pub dig_p6: i16,
    pub dig_p7: i16,
    pub dig_p8: i16,
    pub dig_p9: i16,

    pub dig_h1: u8,
    pub dig_h2: i16,
    pub dig_h3: u8,
    // 12-bit signed
    pub dig_h4: i16,
    // 12-bit signed
    pub dig_h5: i16,
    pub dig_h6: i8,
}

/// Uncompensated ADC counts (20-bit pressure and temperature, 16-bit humidity).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvData {
    pub temperature: u32,
    pub pressure: u32,
    pub humidity: u32,
}

/// Compensated output of one BME280 read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateSample {
    pub temperature_c: f64,
    pub pressure_hpa: f64,
    pub humidity_pct: f64,
}

/// One acquisition cycle. A `None` field means that sensor failed this cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub timestamp: DateTime<Local>,
    pub co2_ppm: Option<u16>,
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub pressure_hpa: Option<f64>,
}

impl Reading {
    pub fn climate_missing(&self) -> bool {
        self.temperature_c.is_none() && self.humidity_pct.is_none() && self.pressure_hpa.is_none()
    }
}
