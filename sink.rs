use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use chrono::{Local, NaiveDateTime, TimeZone};
use csv::{ReaderBuilder, Writer, WriterBuilder};
use serde::Deserialize;

use crate::error::SessionError;
use crate::structs::Reading;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Downstream consumer of readings, fed once per cycle.
pub trait ReadingSink {
    /// `index` is 1-based, `total` is the planned number of cycles.
    fn record(&mut self, index: u64, total: u64, reading: &Reading) -> Result<(), SessionError>;

    fn finish(&mut self) -> Result<(), SessionError> {
        Ok(())
    }
}

/// Tab-separated table indexed by timestamp.
pub struct TabFileSink<W: Write> {
    writer: Writer<W>,
    include_pressure: bool,
}

impl TabFileSink<File> {
    pub fn create<P: AsRef<Path>>(path: P, include_pressure: bool) -> Result<Self, SessionError> {
        let file = File::create(path)?;
        Self::new(file, include_pressure)
    }
}

impl<W: Write> TabFileSink<W> {
    pub fn new(inner: W, include_pressure: bool) -> Result<Self, SessionError> {
        let mut writer = WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_writer(inner);

        let mut header = vec!["timestamp", "temperature", "humidity", "Co2(ppm)"];
        if include_pressure {
            header.push("pressure");
        }
        writer.write_record(&header)?;

        Ok(Self {
            writer,
            include_pressure,
        })
    }

    pub fn into_inner(self) -> Result<W, SessionError> {
        self.writer
            .into_inner()
            .map_err(|err| SessionError::Io(err.into_error()))
    }
}

impl<W: Write> ReadingSink for TabFileSink<W> {
    fn record(&mut self, _index: u64, _total: u64, reading: &Reading) -> Result<(), SessionError> {
        let timestamp = reading.timestamp.format(TIMESTAMP_FORMAT).to_string();
        let row = (
            timestamp,
            reading.temperature_c,
            reading.humidity_pct,
            reading.co2_ppm,
        );

        if self.include_pressure {
            self.writer
                .serialize((row.0, row.1, row.2, row.3, reading.pressure_hpa))?;
        } else {
            self.writer.serialize(row)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SessionError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TabRow {
    timestamp: String,
    temperature: Option<f64>,
    humidity: Option<f64>,
    #[serde(rename = "Co2(ppm)")]
    co2: Option<u16>,
    #[serde(default)]
    pressure: Option<f64>,
}

/// Loads a table written by [`TabFileSink`].
pub fn read_back<R: io::Read>(inner: R) -> Result<Vec<Reading>, SessionError> {
    let mut reader = ReaderBuilder::new().delimiter(b'\t').from_reader(inner);
    let mut readings = Vec::new();

    for row in reader.deserialize() {
        let row: TabRow = row?;
        let timestamp = NaiveDateTime::parse_from_str(&row.timestamp, TIMESTAMP_FORMAT)
            .ok()
            .and_then(|naive| Local.from_local_datetime(&naive).earliest())
            .ok_or_else(|| SessionError::Timestamp(row.timestamp.clone()))?;

        readings.push(Reading {
            timestamp,
            co2_ppm: row.co2,
            temperature_c: row.temperature,
            humidity_pct: row.humidity,
            pressure_hpa: row.pressure,
        });
    }

    Ok(readings)
}

fn show<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| v.to_string())
}

/// Progress line per cycle for the operator.
pub struct ConsoleDisplay<W: Write> {
    out: W,
}

impl ConsoleDisplay<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> ConsoleDisplay<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> ReadingSink for ConsoleDisplay<W> {
    fn record(&mut self, index: u64, total: u64, reading: &Reading) -> Result<(), SessionError> {
        writeln!(
            self.out,
            "{}/{}, {}   {} ppm, {}°C, {}%",
            index,
            total,
            reading.timestamp.format(TIMESTAMP_FORMAT),
            show(reading.co2_ppm),
            show(reading.temperature_c),
            show(reading.humidity_pct),
        )?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SessionError> {
        self.out.flush()?;
        Ok(())
    }
}
