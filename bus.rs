use std::error::Error as StdError;
use std::io;

use rppal::i2c::{self, I2c};
use rppal::uart::{self, Queue, Uart};

/// Register-addressed access to a single I2C slave.
pub trait RegisterBus {
    type Error: StdError + Send + Sync + 'static;

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), Self::Error>;

    /// Fills `buffer` with consecutive registers starting at `register`.
    fn read_registers(&mut self, register: u8, buffer: &mut [u8]) -> Result<(), Self::Error>;
}

/// Byte-oriented duplex channel with a bounded read.
pub trait SerialLink {
    type Error: StdError + Send + Sync + 'static;

    /// Discards anything received but not yet read.
    fn clear_input(&mut self) -> Result<(), Self::Error>;

    fn write_all(&mut self, frame: &[u8]) -> Result<(), Self::Error>;

    /// Returns the number of bytes read; `0` means the read timed out.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, Self::Error>;
}

impl RegisterBus for I2c {
    type Error = i2c::Error;

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), Self::Error> {
        self.smbus_write_byte(register, value)
    }

    fn read_registers(&mut self, register: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
        self.block_read(register, buffer)
    }
}

impl SerialLink for Uart {
    type Error = uart::Error;

    fn clear_input(&mut self) -> Result<(), Self::Error> {
        self.flush(Queue::Input)
    }

    fn write_all(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
        let mut written = 0;
        while written < frame.len() {
            match Uart::write(self, &frame[written..])? {
                0 => {
                    return Err(uart::Error::Io(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "serial port accepted no bytes",
                    )))
                }
                n => written += n,
            }
        }
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        Uart::read(self, buffer)
    }
}
