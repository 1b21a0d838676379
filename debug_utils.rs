use std::collections::VecDeque;

use thiserror::Error;

use crate::bus::{RegisterBus, SerialLink};
use crate::error::SensorError;
use crate::sensors::{ClimateSensor, Co2Sensor};
use crate::structs::ClimateSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DummyError {
    #[error("no device on the bus")]
    Disconnected,
}

/// 256-register device image; reads and writes go straight to the map.
pub struct DummyBus {
    pub registers: [u8; 256],
    pub writes: Vec<(u8, u8)>,
    pub connected: bool,
}

impl DummyBus {
    pub fn new() -> Self {
        Self {
            registers: [0; 256],
            writes: Vec::new(),
            connected: true,
        }
    }

    pub fn disconnected() -> Self {
        Self {
            connected: false,
            ..Self::new()
        }
    }

    pub fn load(&mut self, register: u8, bytes: &[u8]) {
        let start = register as usize;
        self.registers[start..start + bytes.len()].copy_from_slice(bytes);
    }
}

impl RegisterBus for DummyBus {
    type Error = DummyError;

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), Self::Error> {
        if !self.connected {
            return Err(DummyError::Disconnected);
        }
        self.writes.push((register, value));
        Ok(())
    }

    fn read_registers(&mut self, register: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
        if !self.connected {
            return Err(DummyError::Disconnected);
        }
        let start = register as usize;
        buffer.copy_from_slice(&self.registers[start..start + buffer.len()]);
        Ok(())
    }
}

/// Answers each written frame with the next queued response, `chunk` bytes per read.
pub struct DummySerial {
    pub responses: VecDeque<Vec<u8>>,
    pub written: Vec<Vec<u8>>,
    pub clears: usize,
    pub chunk: usize,
    pending: VecDeque<u8>,
}

impl DummySerial {
    pub fn new(responses: Vec<Vec<u8>>) -> Self {
        Self {
            responses: responses.into(),
            written: Vec::new(),
            clears: 0,
            chunk: usize::MAX,
            pending: VecDeque::new(),
        }
    }

    /// Leaves stale bytes in the receive queue, as if a previous answer arrived late.
    pub fn with_stale_input(mut self, stale: &[u8]) -> Self {
        self.pending.extend(stale);
        self
    }
}

impl SerialLink for DummySerial {
    type Error = DummyError;

    fn clear_input(&mut self) -> Result<(), Self::Error> {
        self.clears += 1;
        self.pending.clear();
        Ok(())
    }

    fn write_all(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
        self.written.push(frame.to_vec());
        if let Some(response) = self.responses.pop_front() {
            self.pending.extend(response);
        }
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        let n = buffer.len().min(self.chunk).min(self.pending.len());
        for slot in buffer.iter_mut().take(n) {
            // n never exceeds pending.len()
            *slot = self.pending.pop_front().unwrap_or_default();
        }
        Ok(n)
    }
}

fn scripted_failure() -> SensorError {
    SensorError::unavailable("scripted", DummyError::Disconnected)
}

/// Succeeds or fails per call as listed in `script`; succeeds once the script runs out.
pub struct ScriptedClimate {
    pub sample: ClimateSample,
    script: VecDeque<bool>,
}

impl ScriptedClimate {
    pub fn new(sample: ClimateSample, script: &[bool]) -> Self {
        Self {
            sample,
            script: script.iter().copied().collect(),
        }
    }
}

impl ClimateSensor for ScriptedClimate {
    fn name(&self) -> &'static str {
        "scripted climate"
    }

    fn read(&mut self) -> Result<ClimateSample, SensorError> {
        if self.script.pop_front().unwrap_or(true) {
            Ok(self.sample)
        } else {
            Err(scripted_failure())
        }
    }
}

pub struct ScriptedCo2 {
    pub ppm: u16,
    script: VecDeque<bool>,
}

impl ScriptedCo2 {
    pub fn new(ppm: u16, script: &[bool]) -> Self {
        Self {
            ppm,
            script: script.iter().copied().collect(),
        }
    }
}

impl Co2Sensor for ScriptedCo2 {
    fn name(&self) -> &'static str {
        "scripted co2"
    }

    fn read(&mut self) -> Result<u16, SensorError> {
        if self.script.pop_front().unwrap_or(true) {
            Ok(self.ppm)
        } else {
            Err(scripted_failure())
        }
    }
}
