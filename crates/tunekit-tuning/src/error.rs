//! Error types for the tuning harness.

use std::io;
use thiserror::Error;

/// Errors that can occur while driving a tuning session.
#[derive(Error, Debug)]
pub enum TuningError {
    /// I/O error on the firmware link or a data file.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// A firmware response could not be read as a temperature report.
    #[error("Temperature report not understood: '{line}'")]
    MalformedReport {
        /// The response line as received.
        line: String,
    },

    /// A reported temperature crossed the abort threshold. The heater
    /// has already been commanded off when this is returned.
    #[error("Thermal cutoff: nozzle reported {reading}\u{00b0}C, limit is {limit}\u{00b0}C")]
    ThermalCutoff {
        /// The reading that tripped the cutoff.
        reading: f64,
        /// The configured abort threshold.
        limit: f64,
    },

    /// The nozzle did not settle on the target within the sample budget.
    #[error(
        "Temperature did not settle within {samples} samples (average {average}\u{00b0}C, target {target}\u{00b0}C)"
    )]
    SettleTimeout {
        /// Samples consumed before giving up.
        samples: usize,
        /// The final moving-average temperature.
        average: f64,
        /// The requested target temperature.
        target: f64,
    },

    /// A replay source was asked for readings it does not have.
    #[error("Replay source has no readings")]
    EmptyReplay,

    /// An experiment configuration file could not be read or written.
    #[error("Config file error: {0}")]
    ConfigFile(String),
}

/// Result type alias for tuning operations.
pub type TuningResult<T> = Result<T, TuningError>;
