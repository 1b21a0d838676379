//! Senseair S8 NDIR CO2 sensor on the UART, using its Modbus "read input
//! register" shortcut (function 0x44, register 0x0008 = CO2 in ppm).

use std::error::Error as StdError;
use std::path::Path;
use std::time::Duration;

use log::debug;
use rppal::uart::{Parity, Uart};

use crate::bus::SerialLink;
use crate::error::SensorError;

const SENSOR: &str = "Senseair S8";

pub const BAUD_RATE: u32 = 9600;
pub const READ_TIMEOUT: Duration = Duration::from_millis(500);

const ADDR_ANY: u8 = 0xFE;
const FN_READ_CO2: u8 = 0x44;
const FRAME_LEN: usize = 7;

/// Read CO2 request, CRC included.
pub const REQUEST_CO2: [u8; FRAME_LEN] = [0xFE, 0x44, 0x00, 0x08, 0x02, 0x9F, 0x25];

fn unavailable<E>(err: E) -> SensorError
where
    E: StdError + Send + Sync + 'static,
{
    SensorError::unavailable(SENSOR, err)
}

/// Modbus RTU CRC-16 (poly 0xA001 reflected, init 0xFFFF).
pub fn modbus_crc16(data: &[u8]) -> u16 {
    let mut crc = 0xFFFF;

    for byte in data {
        crc ^= u16::from(*byte);

        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }

    crc
}

/// Extracts the concentration from a complete response frame.
pub fn decode_response(resp: &[u8]) -> Result<u16, SensorError> {
    if resp.len() != FRAME_LEN {
        return Err(SensorError::malformed(
            SENSOR,
            format!("expected {} bytes, got {}", FRAME_LEN, resp.len()),
        ));
    }
    if resp[0] != ADDR_ANY || resp[1] != FN_READ_CO2 || resp[2] != 0x02 {
        return Err(SensorError::malformed(
            SENSOR,
            format!("unexpected header {:02x?}", &resp[..3]),
        ));
    }

    let crc = u16::from_le_bytes([resp[5], resp[6]]);
    if modbus_crc16(&resp[..5]) != crc {
        return Err(SensorError::malformed(SENSOR, "CRC mismatch"));
    }

    Ok(u16::from(resp[3]) * 256 + u16::from(resp[4]))
}

pub struct SenseairS8<S> {
    serial: S,
}

impl SenseairS8<Uart> {
    /// Opens the UART at 9600 8N1 with a 0.5 s read timeout.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SensorError> {
        let mut uart = Uart::with_path(path, BAUD_RATE, Parity::None, 8, 1).map_err(unavailable)?;
        uart.set_read_mode(0, READ_TIMEOUT).map_err(unavailable)?;
        uart.set_write_mode(true).map_err(unavailable)?;
        Ok(Self::new(uart))
    }
}

impl<S: SerialLink> SenseairS8<S> {
    pub fn new(serial: S) -> Self {
        Self { serial }
    }

    /// Returns the CO2 concentration in ppm.
    pub fn read(&mut self) -> Result<u16, SensorError> {
        self.serial.clear_input().map_err(unavailable)?;
        self.serial.write_all(&REQUEST_CO2).map_err(unavailable)?;

        let mut resp = [0u8; FRAME_LEN];
        let mut received = 0;
        while received < FRAME_LEN {
            match self.serial.read(&mut resp[received..]).map_err(unavailable)? {
                0 => break,
                n => received += n,
            }
        }
        debug!("co2 response: {:02x?}", &resp[..received]);

        decode_response(&resp[..received])
    }
}
