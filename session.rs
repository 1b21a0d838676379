use std::thread;
use std::time::Duration;

use chrono::{DateTime, Local};
use log::info;

use crate::error::SessionError;
use crate::sensors::{ClimateSensor, Co2Sensor, Sensors};
use crate::sink::ReadingSink;
use crate::structs::Reading;

pub trait Clock {
    fn now(&mut self) -> DateTime<Local>;

    fn sleep(&mut self, duration: Duration);
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&mut self) -> DateTime<Local> {
        Local::now()
    }

    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPlan {
    pub cycles: u64,
    pub interval: Duration,
}

impl SessionPlan {
    /// One cycle per `interval` for `minutes`, rounded down.
    pub fn from_minutes(minutes: u64, interval: Duration) -> Self {
        let interval_ms = interval.as_millis().max(1);
        let cycles = u128::from(minutes) * 60_000 / interval_ms;
        SessionPlan {
            cycles: u64::try_from(cycles).unwrap_or(u64::MAX),
            interval,
        }
    }
}

/// Samples `plan.cycles` times, handing each reading to every sink in order.
///
/// Sensor failures only blank fields; a sink error ends the session.
pub fn run_session<C, D, K>(
    sensors: &mut Sensors<C, D>,
    plan: &SessionPlan,
    clock: &mut K,
    sinks: &mut [&mut dyn ReadingSink],
) -> Result<Vec<Reading>, SessionError>
where
    C: ClimateSensor,
    D: Co2Sensor,
    K: Clock,
{
    info!(
        "measuring {} cycles every {:?}",
        plan.cycles, plan.interval
    );

    let mut readings = Vec::new();
    for index in 1..=plan.cycles {
        let reading = sensors.measure_at(clock.now());
        for sink in sinks.iter_mut() {
            sink.record(index, plan.cycles, &reading)?;
        }
        readings.push(reading);
        clock.sleep(plan.interval);
    }

    for sink in sinks.iter_mut() {
        sink.finish()?;
    }
    info!("session finished with {} readings", readings.len());

    Ok(readings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug_utils::{ScriptedClimate, ScriptedCo2};
    use crate::sink::TabFileSink;
    use crate::structs::ClimateSample;
    use chrono::TimeZone;

    struct FakeClock {
        now: DateTime<Local>,
        slept: Vec<Duration>,
    }

    impl FakeClock {
        fn new() -> Self {
            Self {
                now: Local.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap(),
                slept: Vec::new(),
            }
        }
    }

    impl Clock for FakeClock {
        fn now(&mut self) -> DateTime<Local> {
            self.now
        }

        fn sleep(&mut self, duration: Duration) {
            self.slept.push(duration);
            self.now = self.now + chrono::Duration::from_std(duration).unwrap();
        }
    }

    struct Collect(Vec<(u64, u64)>, bool);

    impl ReadingSink for Collect {
        fn record(&mut self, index: u64, total: u64, _: &Reading) -> Result<(), SessionError> {
            self.0.push((index, total));
            Ok(())
        }

        fn finish(&mut self) -> Result<(), SessionError> {
            self.1 = true;
            Ok(())
        }
    }

    fn sample() -> ClimateSample {
        ClimateSample {
            temperature_c: 23.1,
            pressure_hpa: 1009.8,
            humidity_pct: 38.456,
        }
    }

    #[test]
    fn test_plan_from_minutes() {
        let plan = SessionPlan::from_minutes(2, Duration::from_secs(1));
        assert_eq!(plan.cycles, 120);
        let plan = SessionPlan::from_minutes(1, Duration::from_secs(7));
        assert_eq!(plan.cycles, 8);
        let plan = SessionPlan::from_minutes(0, Duration::from_secs(1));
        assert_eq!(plan.cycles, 0);
    }

    #[test]
    fn test_alternating_failures() {
        // first entry of each script is the start-up probe
        let mut sensors = Sensors::new(
            Some(ScriptedClimate::new(sample(), &[true, true, false, true])),
            Some(ScriptedCo2::new(700, &[true, false, true, true])),
        );
        let plan = SessionPlan {
            cycles: 3,
            interval: Duration::from_secs(1),
        };
        let mut clock = FakeClock::new();
        let mut collect = Collect(Vec::new(), false);

        let readings = {
            let mut sinks: [&mut dyn ReadingSink; 1] = [&mut collect];
            run_session(&mut sensors, &plan, &mut clock, &mut sinks).unwrap()
        };

        assert_eq!(readings.len(), 3);
        let co2: Vec<_> = readings.iter().map(|r| r.co2_ppm).collect();
        assert_eq!(co2, vec![None, Some(700), Some(700)]);
        let missing: Vec<_> = readings.iter().map(|r| r.climate_missing()).collect();
        assert_eq!(missing, vec![false, true, false]);
        assert_eq!(readings[0].humidity_pct, Some(38.46));

        assert!(readings.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(collect.0, vec![(1, 3), (2, 3), (3, 3)]);
        assert!(collect.1);
        assert_eq!(clock.slept, vec![Duration::from_secs(1); 3]);
    }

    #[test]
    fn test_session_feeds_every_sink() {
        let mut sensors = Sensors::new(
            Some(ScriptedClimate::new(sample(), &[])),
            Some(ScriptedCo2::new(450, &[])),
        );
        let plan = SessionPlan {
            cycles: 2,
            interval: Duration::from_secs(1),
        };
        let mut clock = FakeClock::new();
        let mut table = TabFileSink::new(Vec::new(), false).unwrap();
        let mut collect = Collect(Vec::new(), false);

        {
            let mut sinks: [&mut dyn ReadingSink; 2] = [&mut table, &mut collect];
            run_session(&mut sensors, &plan, &mut clock, &mut sinks).unwrap();
        }

        let text = String::from_utf8(table.into_inner().unwrap()).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert_eq!(
            text.lines().nth(2),
            Some("2024-03-01 08:30:01\t23.1\t38.46\t450")
        );
        assert_eq!(collect.0.len(), 2);
    }
}
