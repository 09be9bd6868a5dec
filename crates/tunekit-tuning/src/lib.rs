//! # TuneKit Tuning
//!
//! Hot-end tuning experiment harness. Drives a printer through a gain
//! set and a disturbance schedule while recording reported temperatures.
//! The PID loop itself runs on the firmware; this crate only issues
//! setpoint and gain commands and observes what comes back.
//!
//! Hardware access is abstracted behind two seams: `CommandSink` for the
//! outgoing firmware text commands and `TemperatureSource` for incoming
//! `M105` reports. The live serial transport implements both outside
//! this crate.

pub mod error;
pub mod experiment;
pub mod report;
pub mod session;
pub mod sink;

pub use error::{TuningError, TuningResult};
pub use experiment::{
    Disturbance, Experiment, ExperimentConfig, ExperimentLog, Gains, Phase, Sample,
};
pub use report::{ReaderSource, ReplaySource, TemperatureReport, TemperatureSource};
pub use session::{enable_fans, shutdown, wait_for_temperature, SettleSettings};
pub use sink::{CommandSink, RecordingSink, WriterSink};
