//! Bosch BME280 combined temperature / pressure / humidity sensor over I2C.
//!
//! Every [`Bme280::read`] reprograms the oversampling registers, re-reads the
//! calibration block and then samples the ADC.
//!
//! cf. BST-BME280-DS002, sections 4.2.2 (compensation), 5.4 (memory map) and
//! appendix B (measurement time).

use std::error::Error as StdError;
use std::thread;
use std::time::Duration;

use log::debug;
use rppal::i2c::I2c;

use crate::bus::RegisterBus;
use crate::error::SensorError;
use crate::structs::{CalibParams, ClimateSample, EnvData};

const SENSOR: &str = "BME280";

// BME280 I2C default slave address.
pub const ADDR_BME280: u16 = 0x76;
pub const CHIP_ID_BME280: u8 = 0x60;

// BME280 register addresses.
const REG_ID: u8 = 0xD0;
const REG_CTRL_HUM: u8 = 0xF2;
const REG_CTRL_MEAS: u8 = 0xF4;
const REG_CALIB_00: u8 = 0x88;
const REG_CALIB_25: u8 = 0xA1;
const REG_CALIB_26: u8 = 0xE1;
const REG_CALIB_00_LEN: usize = 24;
const REG_CALIB_25_LEN: usize = 1;
const REG_CALIB_26_LEN: usize = 7;
const REG_ADC_VALUE: u8 = 0xF7;
const REG_ADC_VALUE_LEN: usize = 8;

const OSRS_T: u8 = 2; // Temperature oversampling x 2
const OSRS_P: u8 = 2; // Pressure oversampling x 2
const OSRS_H: u8 = 2; // Humidity oversampling x 2
const MODE: u8 = 1; // Forced mode

/// Maximum measurement time for the fixed oversampling settings.
pub fn settle_time() -> Duration {
    let ms = 1.25
        + 2.3 * f64::from(OSRS_T)
        + (2.3 * f64::from(OSRS_P) + 0.575)
        + (2.3 * f64::from(OSRS_H) + 0.575);
    Duration::from_secs_f64(ms / 1000.0)
}

fn unavailable<E>(err: E) -> SensorError
where
    E: StdError + Send + Sync + 'static,
{
    SensorError::unavailable(SENSOR, err)
}

fn u16_le(data: &[u8], index: usize) -> u16 {
    u16::from(data[index]) | (u16::from(data[index + 1]) << 8)
}

fn i16_le(data: &[u8], index: usize) -> i16 {
    // two's complement reinterpretation of the assembled word
    u16_le(data, index) as i16
}

fn i8_at(data: &[u8], index: usize) -> i8 {
    data[index] as i8
}

impl CalibParams {
    /// Decodes the three calibration register ranges (0x88..0x9F, 0xA1, 0xE1..0xE7).
    pub fn from_registers(
        cal1: &[u8; REG_CALIB_00_LEN],
        cal2: &[u8; REG_CALIB_25_LEN],
        cal3: &[u8; REG_CALIB_26_LEN],
    ) -> Self {
        // dig_H4 = E4[11:4] E5[3:0], dig_H5 = E6[11:4] E5[7:4]
        let dig_h4 = (i32::from(i8_at(cal3, 3)) << 24) >> 20;
        let dig_h4 = dig_h4 | (i32::from(i8_at(cal3, 4)) & 0x0F);

        let dig_h5 = (i32::from(i8_at(cal3, 5)) << 24) >> 20;
        let dig_h5 = dig_h5 | ((i32::from(cal3[4]) >> 4) & 0x0F);

        CalibParams {
            dig_t1: u16_le(cal1, 0),
            dig_t2: i16_le(cal1, 2),
            dig_t3: i16_le(cal1, 4),

            dig_p1: u16_le(cal1, 6),
            dig_p2: i16_le(cal1, 8),
            dig_p3: i16_le(cal1, 10),
            dig_p4: i16_le(cal1, 12),
            dig_p5: i16_le(cal1, 14),
            dig_p6: i16_le(cal1, 16),
            dig_p7: i16_le(cal1, 18),
            dig_p8: i16_le(cal1, 20),
            dig_p9: i16_le(cal1, 22),

            dig_h1: cal2[0],
            dig_h2: i16_le(cal3, 0),
            dig_h3: cal3[2],
            // 12 significant bits, always within i16
            dig_h4: dig_h4 as i16,
            dig_h5: dig_h5 as i16,
            dig_h6: i8_at(cal3, 6),
        }
    }

    /// Runs the three compensation formulas, temperature first.
    pub fn compensate(&self, raw: &EnvData) -> ClimateSample {
        let (t_fine, temperature) = compensate_temperature(self, raw.temperature);
        let pressure = compensate_pressure(self, raw.pressure, t_fine);
        let humidity = compensate_humidity(self, raw.humidity, t_fine);

        ClimateSample {
            temperature_c: temperature / 100.0,
            pressure_hpa: pressure / 100.0,
            humidity_pct: humidity,
        }
    }
}

impl EnvData {
    /// Unpacks the 8-byte burst read from 0xF7 (press_msb .. hum_lsb).
    pub fn from_bytes(data: &[u8; REG_ADC_VALUE_LEN]) -> Self {
        let data = data.map(u32::from);
        EnvData {
            pressure: (data[0] << 12) | (data[1] << 4) | (data[2] >> 4),
            temperature: (data[3] << 12) | (data[4] << 4) | (data[5] >> 4),
            humidity: (data[6] << 8) | data[7],
        }
    }
}

/// Returns `(t_fine, temperature)` with the temperature in 0.01 °C.
pub fn compensate_temperature(calib: &CalibParams, raw_value: u32) -> (i64, f64) {
    let raw = i64::from(raw_value);
    let t1 = i64::from(calib.dig_t1);
    let t2 = i64::from(calib.dig_t2);
    let t3 = i64::from(calib.dig_t3);

    let var1 = (((raw >> 3) - (t1 << 1)) * t2) >> 11;
    let var2 = (((((raw >> 4) - t1) * ((raw >> 4) - t1)) >> 12) * t3) >> 14;
    let t_fine = var1 + var2;

    (t_fine, ((t_fine * 5 + 128) >> 8) as f64)
}

/// Pressure in Pa, or `0.0` when the scaling term vanishes.
pub fn compensate_pressure(calib: &CalibParams, raw_value: u32, t_fine: i64) -> f64 {
    let p1 = f64::from(calib.dig_p1);
    let p2 = f64::from(calib.dig_p2);
    let p3 = f64::from(calib.dig_p3);
    let p4 = f64::from(calib.dig_p4);
    let p5 = f64::from(calib.dig_p5);
    let p6 = f64::from(calib.dig_p6);
    let p7 = f64::from(calib.dig_p7);
    let p8 = f64::from(calib.dig_p8);
    let p9 = f64::from(calib.dig_p9);

    let mut v1 = t_fine as f64 / 2.0 - 64000.0;
    let mut v2 = v1 * v1 * p6 / 32768.0;
    v2 = v2 + v1 * p5 * 2.0;
    v2 = v2 / 4.0 + p4 * 65536.0;
    v1 = (p3 * v1 * v1 / 524288.0 + p2 * v1) / 524288.0;
    v1 = (1.0 + v1 / 32768.0) * p1;
    if v1 == 0.0 {
        return 0.0;
    }

    let mut pressure = 1048576.0 - f64::from(raw_value);
    pressure = ((pressure - v2 / 4096.0) * 6250.0) / v1;
    v1 = p9 * pressure * pressure / 2147483648.0;
    v2 = pressure * p8 / 32768.0;
    pressure + (v1 + v2 + p7) / 16.0
}

/// Relative humidity in %, clamped to `[0, 100]`.
pub fn compensate_humidity(calib: &CalibParams, raw_value: u32, t_fine: i64) -> f64 {
    let h1 = f64::from(calib.dig_h1);
    let h2 = f64::from(calib.dig_h2);
    let h3 = f64::from(calib.dig_h3);
    let h4 = f64::from(calib.dig_h4);
    let h5 = f64::from(calib.dig_h5);
    let h6 = f64::from(calib.dig_h6);

    let mut h = t_fine as f64 - 76800.0;
    h = (f64::from(raw_value) - (h4 * 64.0 + h5 / 16384.0 * h))
        * (h2 / 65536.0 * (1.0 + h6 / 67108864.0 * h * (1.0 + h3 / 67108864.0 * h)));
    h = h * (1.0 - h1 * h / 524288.0);

    if h > 100.0 {
        100.0
    } else if h < 0.0 {
        0.0
    } else {
        h
    }
}

pub struct Bme280<B> {
    bus: B,
}

impl Bme280<I2c> {
    /// Opens `/dev/i2c-<bus>` and selects the sensor at `address`.
    pub fn open(bus: u8, address: u16) -> Result<Self, SensorError> {
        let mut i2c = I2c::with_bus(bus).map_err(unavailable)?;
        i2c.set_slave_address(address).map_err(unavailable)?;
        Ok(Self::new(i2c))
    }
}

impl<B: RegisterBus> Bme280<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Returns `(chip_id, chip_version)` from 0xD0/0xD1.
    pub fn read_id(&mut self) -> Result<(u8, u8), SensorError> {
        let mut id = [0u8; 2];
        self.bus.read_registers(REG_ID, &mut id).map_err(unavailable)?;
        Ok((id[0], id[1]))
    }

    fn configure(&mut self) -> Result<(), SensorError> {
        self.bus
            .write_register(REG_CTRL_HUM, OSRS_H)
            .map_err(unavailable)?;
        self.bus
            .write_register(REG_CTRL_MEAS, (OSRS_T << 5) | (OSRS_P << 2) | MODE)
            .map_err(unavailable)?;
        Ok(())
    }

    pub fn read_calibration(&mut self) -> Result<CalibParams, SensorError> {
        let mut cal1 = [0u8; REG_CALIB_00_LEN];
        let mut cal2 = [0u8; REG_CALIB_25_LEN];
        let mut cal3 = [0u8; REG_CALIB_26_LEN];

        self.bus
            .read_registers(REG_CALIB_00, &mut cal1)
            .map_err(unavailable)?;
        self.bus
            .read_registers(REG_CALIB_25, &mut cal2)
            .map_err(unavailable)?;
        self.bus
            .read_registers(REG_CALIB_26, &mut cal3)
            .map_err(unavailable)?;
        debug!("calibration blocks: {:02x?} {:02x?} {:02x?}", cal1, cal2, cal3);

        Ok(CalibParams::from_registers(&cal1, &cal2, &cal3))
    }

    fn read_data(&mut self) -> Result<EnvData, SensorError> {
        let mut data = [0u8; REG_ADC_VALUE_LEN];
        self.bus
            .read_registers(REG_ADC_VALUE, &mut data)
            .map_err(unavailable)?;
        Ok(EnvData::from_bytes(&data))
    }

    /// Triggers a forced conversion and returns compensated °C / hPa / %RH.
    pub fn read(&mut self) -> Result<ClimateSample, SensorError> {
        self.configure()?;
        let calib = self.read_calibration()?;
        thread::sleep(settle_time());
        let raw = self.read_data()?;
        debug!("raw adc values: {:?}", raw);
        Ok(calib.compensate(&raw))
    }
}
