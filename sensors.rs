use chrono::{DateTime, Local};
use log::{debug, info, warn};

use crate::bme280::{Bme280, CHIP_ID_BME280};
use crate::bus::{RegisterBus, SerialLink};
use crate::error::SensorError;
use crate::senseair::SenseairS8;
use crate::structs::{ClimateSample, Reading};

pub trait ClimateSensor {
    fn name(&self) -> &'static str;

    fn read(&mut self) -> Result<ClimateSample, SensorError>;

    /// Diagnostic read performed once at start-up.
    fn probe(&mut self) -> Result<(), SensorError> {
        self.read().map(|_| ())
    }
}

pub trait Co2Sensor {
    fn name(&self) -> &'static str;

    fn read(&mut self) -> Result<u16, SensorError>;
}

impl<B: RegisterBus> ClimateSensor for Bme280<B> {
    fn name(&self) -> &'static str {
        "BME280"
    }

    fn read(&mut self) -> Result<ClimateSample, SensorError> {
        Bme280::read(self)
    }

    fn probe(&mut self) -> Result<(), SensorError> {
        Bme280::read(self)?;
        let (chip_id, version) = self.read_id()?;
        if chip_id == CHIP_ID_BME280 {
            debug!("BME280 chip id {:#04x}, version {:#04x}", chip_id, version);
        } else {
            warn!("unexpected chip id {:#04x} at the BME280 address", chip_id);
        }
        Ok(())
    }
}

impl<S: SerialLink> Co2Sensor for SenseairS8<S> {
    fn name(&self) -> &'static str {
        "Senseair S8"
    }

    fn read(&mut self) -> Result<u16, SensorError> {
        SenseairS8::read(self)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Owns both sensors and isolates their failures from each other.
///
/// A sensor whose handle could not be opened is `None` and yields absent
/// fields on every cycle.
pub struct Sensors<C, D> {
    climate: Option<C>,
    co2: Option<D>,
}

impl<C: ClimateSensor, D: Co2Sensor> Sensors<C, D> {
    pub fn new(mut climate: Option<C>, mut co2: Option<D>) -> Self {
        match climate.as_mut() {
            Some(sensor) => match sensor.probe() {
                Ok(()) => info!("{} initialized", sensor.name()),
                Err(err) => info!("{} not connected ({})", sensor.name(), err),
            },
            None => info!("temperature/humidity sensor not connected"),
        }

        match co2.as_mut() {
            Some(sensor) => match sensor.read() {
                Ok(ppm) => info!("{} initialized ({} ppm)", sensor.name(), ppm),
                Err(err) => info!("{} not connected ({})", sensor.name(), err),
            },
            None => info!("CO2 sensor not connected"),
        }

        Self { climate, co2 }
    }

    pub fn measure(&mut self) -> Reading {
        self.measure_at(Local::now())
    }

    pub fn measure_at(&mut self, timestamp: DateTime<Local>) -> Reading {
        let co2_ppm = self.co2.as_mut().and_then(|sensor| match sensor.read() {
            Ok(ppm) => Some(ppm),
            Err(err) => {
                warn!("CO2 read failed: {}", err);
                None
            }
        });

        let climate = self.climate.as_mut().and_then(|sensor| match sensor.read() {
            Ok(sample) => Some(sample),
            Err(err) => {
                warn!("temperature/humidity read failed: {}", err);
                None
            }
        });

        Reading {
            timestamp,
            co2_ppm,
            temperature_c: climate.map(|c| c.temperature_c),
            humidity_pct: climate.map(|c| round2(c.humidity_pct)),
            pressure_hpa: climate.map(|c| c.pressure_hpa),
        }
    }
}
