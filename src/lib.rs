//! # TuneKit
//!
//! A Rust-based laboratory toolkit for tuning 3D-printer hot-end
//! temperature controllers and for post-processing recorded
//! motion-command tables before sending them to a printer firmware.
//!
//! ## Architecture
//!
//! TuneKit is organized as a workspace with multiple crates:
//!
//! 1. **tunekit-core** - Motion commands, parameter profiles, interpolation
//! 2. **tunekit-gcodegen** - The G-code stream transformation engine
//! 3. **tunekit-tuning** - The hot-end tuning experiment harness
//! 4. **tunekit** - Main binary that integrates all crates
//!
//! ## Features
//!
//! - **Stream Transformation**: rewrite recorded prints with time-varying
//!   temperature, fan, retraction and feed-rate profiles
//! - **Safety Validation**: every profile keyframe is checked against
//!   thermal and extrusion bounds before a single byte is emitted
//! - **Experiment Harness**: gain sets and disturbance schedules in one
//!   configurable runner, with CSV logs of reported temperatures

pub use tunekit_core::{
    Interpolator, MalformedInputError, MotionCommand, ParameterProfile, ValidationError,
};

pub use tunekit_gcodegen::{
    parse_command_table, read_command_table, GcodeTransformer, TableError, TransformError,
    TransformParameters,
};

pub use tunekit_tuning::{
    enable_fans, shutdown, wait_for_temperature, CommandSink, Disturbance, Experiment,
    ExperimentConfig, ExperimentLog, Gains, Phase, ReaderSource, RecordingSink, ReplaySource,
    Sample, SettleSettings, TemperatureReport, TemperatureSource, TuningError, WriterSink,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output on stderr (data streams stay on stdout)
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
