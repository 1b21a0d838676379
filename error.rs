use std::error::Error as StdError;
use std::io;

use thiserror::Error;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum SensorError {
    /// The bus or serial handle could not be opened, or a transaction on it failed.
    #[error("{sensor} unavailable: {source}")]
    Unavailable {
        sensor: &'static str,
        #[source]
        source: BoxError,
    },
    #[error("{sensor} sent a malformed response: {reason}")]
    MalformedResponse {
        sensor: &'static str,
        reason: String,
    },
}

impl SensorError {
    pub fn unavailable<E>(sensor: &'static str, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        SensorError::Unavailable {
            sensor,
            source: source.into(),
        }
    }

    pub fn malformed(sensor: &'static str, reason: impl Into<String>) -> Self {
        SensorError::MalformedResponse {
            sensor,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to write measurements: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode measurements: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid timestamp {0:?} in measurement file")]
    Timestamp(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid configuration: {0}")]
    Config(#[from] envconfig::Error),
    #[error("could not read the session duration: {0}")]
    Prompt(io::Error),
    #[error(transparent)]
    Session(#[from] SessionError),
}
