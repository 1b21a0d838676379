use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Local};
use envconfig::Envconfig;

#[derive(Debug, Envconfig)]
pub struct AppConfig {
    #[envconfig(from = "AIRQ_I2C_BUS", default = "1")]
    pub i2c_bus: u8,

    #[envconfig(from = "AIRQ_BME280_ADDR", default = "118")]
    pub bme280_addr: u16,

    #[envconfig(from = "AIRQ_SERIAL_PATH", default = "/dev/ttyS0")]
    pub serial_path: PathBuf,

    #[envconfig(from = "AIRQ_INTERVAL_SECS", default = "1")]
    pub interval_secs: u64,

    /// Prompted for on stdin when unset.
    #[envconfig(from = "AIRQ_DURATION_MINUTES")]
    pub duration_minutes: Option<u64>,

    #[envconfig(from = "AIRQ_OUTPUT_DIR", default = ".")]
    pub output_dir: PathBuf,

    #[envconfig(from = "AIRQ_INCLUDE_PRESSURE", default = "false")]
    pub include_pressure: bool,
}

impl AppConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    /// `<output_dir>/2024_03_01-08_30_00_Measurments.tab` for a session started at `start`.
    pub fn output_path(&self, start: DateTime<Local>) -> PathBuf {
        let stem = start.format("%Y_%m_%d-%H_%M_%S_Measurments");
        self.output_dir.join(format!("{}.tab", stem))
    }
}

/// Asks for the session length until a whole number of minutes is entered.
pub fn prompt_minutes<R: BufRead, W: Write>(mut input: R, mut output: W) -> io::Result<u64> {
    write!(
        output,
        "For how many minutes do you want to take the measurements? (in min, only int)\n>"
    )?;
    output.flush()?;

    loop {
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "no duration entered",
            ));
        }

        match line.trim().parse::<u64>() {
            Ok(minutes) => return Ok(minutes),
            Err(_) => {
                write!(
                    output,
                    "Please insert an integer!\n For how many minutes do you want to measure\n>"
                )?;
                output.flush()?;
            }
        }
    }
}
