use std::io;
use std::process;

use chrono::Local;
use envconfig::Envconfig;
use log::{error, info, warn};

use rpairquality::bme280::Bme280;
use rpairquality::config::{prompt_minutes, AppConfig};
use rpairquality::error::AppError;
use rpairquality::senseair::SenseairS8;
use rpairquality::sensors::Sensors;
use rpairquality::session::{self, SessionPlan, SystemClock};
use rpairquality::sink::{ConsoleDisplay, ReadingSink, TabFileSink};

fn run() -> Result<(), AppError> {
    let config = AppConfig::init_from_env()?;

    let minutes = match config.duration_minutes {
        Some(minutes) => minutes,
        None => prompt_minutes(io::stdin().lock(), io::stdout()).map_err(AppError::Prompt)?,
    };
    let plan = SessionPlan::from_minutes(minutes, config.interval());
    let outfile = config.output_path(Local::now());

    let bme = Bme280::open(config.i2c_bus, config.bme280_addr)
        .map_err(|err| warn!("{}", err))
        .ok();
    let s8 = SenseairS8::open(&config.serial_path)
        .map_err(|err| warn!("{}", err))
        .ok();
    let mut sensors = Sensors::new(bme, s8);

    let mut table = TabFileSink::create(&outfile, config.include_pressure)?;
    let mut display = ConsoleDisplay::stdout();
    let mut sinks: [&mut dyn ReadingSink; 2] = [&mut table, &mut display];

    session::run_session(&mut sensors, &plan, &mut SystemClock, &mut sinks)?;
    info!("measurements written to {}", outfile.display());

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        error!("{}", err);
        process::exit(1);
    }
}
