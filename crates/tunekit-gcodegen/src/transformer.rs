//! G-code stream transformation engine
//!
//! Rewrites a table of recorded motion commands with time-varying
//! temperature, fan, retraction and feed-rate parameters and emits the
//! firmware instruction stream as a single text artifact. Parameter-change
//! directives are inserted only when a tracked parameter's interpolated
//! value changes between consecutive commands.
//!
//! The transform is a pure function over its inputs: it performs no I/O,
//! and all safety bounds are checked before the first byte of output.

use crate::error::{TransformError, TransformResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tunekit_core::{Interpolator, MalformedInputError, MotionCommand, ParameterProfile, ValidationError};

/// Safe nozzle temperature window (degrees C)
pub const NOZZLE_TEMP_MIN: f64 = 190.0;
/// Safe nozzle temperature window (degrees C)
pub const NOZZLE_TEMP_MAX: f64 = 260.0;
/// Maximum safe bed temperature (degrees C)
pub const BED_TEMP_MAX: f64 = 75.0;
/// Maximum safe extrusion factor
pub const EXTRUSION_FACTOR_MAX: f64 = 2.0;
/// Maximum safe retraction length (mm)
pub const RETRACTION_MAX: f64 = 15.0;

/// Control profiles applied across a processing run.
///
/// Every field accepts either a constant or a keyframe sequence spread
/// evenly over the command table. Missing fields in a parameter file fall
/// back to the capture pipeline's defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformParameters {
    /// Proportional gain
    pub kp: ParameterProfile,
    /// Integral gain
    pub ki: ParameterProfile,
    /// Derivative gain
    pub kd: ParameterProfile,
    /// Nozzle temperature (degrees C)
    pub nozzle_temp: ParameterProfile,
    /// Bed temperature (degrees C)
    pub bed_temp: ParameterProfile,
    /// Multiplier applied to the recorded feed column
    pub speed_factor: ParameterProfile,
    /// Multiplier applied to recorded extrusion amounts
    pub extrusion_factor: ParameterProfile,
    /// Retraction length (mm), paired with an equal-magnitude restore
    pub retraction: ParameterProfile,
    /// Part cooling fan speed (0-255)
    pub fan_speed: ParameterProfile,
}

impl Default for TransformParameters {
    fn default() -> Self {
        Self {
            kp: ParameterProfile::Constant(15.5),
            ki: ParameterProfile::Constant(0.13),
            kd: ParameterProfile::Constant(6.0),
            nozzle_temp: ParameterProfile::Constant(210.0),
            bed_temp: ParameterProfile::Constant(55.0),
            speed_factor: ParameterProfile::Constant(1.0),
            extrusion_factor: ParameterProfile::Constant(1.0),
            retraction: ParameterProfile::Constant(2.5),
            fan_speed: ParameterProfile::Constant(255.0),
        }
    }
}

impl TransformParameters {
    /// Create parameters with the capture pipeline's defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load parameters from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> TransformResult<Self> {
        let content = std::fs::read_to_string(path)?;

        let params: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)
                .map_err(|e| TransformError::ParameterFile(format!("Invalid JSON: {}", e)))?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content)
                .map_err(|e| TransformError::ParameterFile(format!("Invalid TOML: {}", e)))?
        } else {
            return Err(TransformError::ParameterFile(
                "Parameter file must be .json or .toml".to_string(),
            ));
        };

        params.validate()?;
        Ok(params)
    }

    /// Save parameters to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> TransformResult<()> {
        self.validate()?;

        let content = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::to_string_pretty(self)
                .map_err(|e| TransformError::ParameterFile(format!("Serialize failed: {}", e)))?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::to_string_pretty(self)
                .map_err(|e| TransformError::ParameterFile(format!("Serialize failed: {}", e)))?
        } else {
            return Err(TransformError::ParameterFile(
                "Parameter file must be .json or .toml".to_string(),
            ));
        };

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check every profile keyframe against the safety bounds.
    ///
    /// The bounds keep the firmware out of physically unsafe states;
    /// a violation aborts the whole transform with no partial output.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for &value in self.nozzle_temp.keyframes() {
            if !(NOZZLE_TEMP_MIN..=NOZZLE_TEMP_MAX).contains(&value) {
                return Err(ValidationError::NozzleTempOutOfRange {
                    value,
                    min: NOZZLE_TEMP_MIN,
                    max: NOZZLE_TEMP_MAX,
                });
            }
        }
        for &value in self.bed_temp.keyframes() {
            if value > BED_TEMP_MAX {
                return Err(ValidationError::BedTempTooHigh {
                    value,
                    max: BED_TEMP_MAX,
                });
            }
        }
        for &value in self.extrusion_factor.keyframes() {
            if value > EXTRUSION_FACTOR_MAX {
                return Err(ValidationError::ExtrusionFactorTooHigh {
                    value,
                    max: EXTRUSION_FACTOR_MAX,
                });
            }
        }
        for &value in self.retraction.keyframes() {
            if value > RETRACTION_MAX {
                return Err(ValidationError::RetractionTooLong {
                    value,
                    max: RETRACTION_MAX,
                });
            }
        }
        Ok(())
    }
}

/// Interpolators for every tracked parameter, built once per run.
struct ProfileFunctions {
    kp: Interpolator,
    ki: Interpolator,
    kd: Interpolator,
    nozzle_temp: Interpolator,
    bed_temp: Interpolator,
    speed_factor: Interpolator,
    extrusion_factor: Interpolator,
    retraction: Interpolator,
    fan_speed: Interpolator,
}

impl ProfileFunctions {
    fn build(params: &TransformParameters, len: usize) -> Result<Self, MalformedInputError> {
        Ok(Self {
            kp: params.kp.interpolator("kp", len)?,
            ki: params.ki.interpolator("ki", len)?,
            kd: params.kd.interpolator("kd", len)?,
            nozzle_temp: params.nozzle_temp.interpolator("nozzle_temp", len)?,
            bed_temp: params.bed_temp.interpolator("bed_temp", len)?,
            speed_factor: params.speed_factor.interpolator("speed_factor", len)?,
            extrusion_factor: params
                .extrusion_factor
                .interpolator("extrusion_factor", len)?,
            retraction: params.retraction.interpolator("retraction", len)?,
            fan_speed: params.fan_speed.interpolator("fan_speed", len)?,
        })
    }

    fn sample(&self, index: f64) -> ProfileSample {
        ProfileSample {
            kp: self.kp.value_at(index),
            ki: self.ki.value_at(index),
            kd: self.kd.value_at(index),
            nozzle_temp: self.nozzle_temp.value_at(index),
            bed_temp: self.bed_temp.value_at(index),
            speed_factor: self.speed_factor.value_at(index),
            extrusion_factor: self.extrusion_factor.value_at(index),
            retraction: self.retraction.value_at(index),
            fan_speed: self.fan_speed.value_at(index),
        }
    }
}

/// All tracked parameter values at one command index.
#[derive(Debug, Clone, Copy)]
struct ProfileSample {
    kp: f64,
    ki: f64,
    kd: f64,
    nozzle_temp: f64,
    bed_temp: f64,
    speed_factor: f64,
    extrusion_factor: f64,
    retraction: f64,
    fan_speed: f64,
}

/// Generator for the firmware instruction stream.
pub struct GcodeTransformer {
    params: TransformParameters,
}

impl GcodeTransformer {
    /// Create a new transformer with the given parameter profiles
    pub fn new(params: TransformParameters) -> Self {
        Self { params }
    }

    /// Transform a recorded command table into a firmware instruction
    /// stream.
    ///
    /// Fails with no output if any safety bound is violated or the table
    /// has fewer than two rows. Identical inputs yield byte-identical
    /// output.
    pub fn transform(&self, commands: &[MotionCommand]) -> TransformResult<String> {
        self.params.validate()?;
        if commands.len() < 2 {
            return Err(MalformedInputError::TooFewCommands {
                count: commands.len(),
            }
            .into());
        }

        let f = ProfileFunctions::build(&self.params, commands.len())?;
        let mut gcode = String::new();

        self.emit_preamble(&mut gcode, &f, &commands[0]);

        // Rows 0 and 1 are consumed by the preamble and priming sequence
        let mut prev = f.sample(1.0);
        for i in 2..commands.len() {
            if i % 1000 == 0 {
                tracing::debug!("Processed {}/{} commands", i, commands.len());
            }
            let cur = f.sample(i as f64);

            let resolved = MotionCommand {
                // The capture's feed column is scaled but never replayed
                feed: commands[i].feed.map(|feed| feed * cur.speed_factor),
                e: resolve_extrusion(&commands[i], &commands[i - 1], &cur),
                ..commands[i]
            };

            // Change PID gains when necessary (the three gains travel together)
            if cur.kp != prev.kp || cur.ki != prev.ki || cur.kd != prev.kd {
                gcode.push_str(&format!(
                    "M301 P{} I{} D{}\n",
                    render(cur.kp),
                    render(cur.ki),
                    render(cur.kd)
                ));
            }
            // Change nozzle temperature when necessary
            if cur.nozzle_temp != prev.nozzle_temp {
                gcode.push_str(&format!("M104 S{}\n", render(cur.nozzle_temp)));
            }
            // Change bed temperature when necessary
            if cur.bed_temp != prev.bed_temp {
                gcode.push_str(&format!("M140 S{}\n", render(cur.bed_temp)));
            }
            // Change fan speed when necessary
            if cur.fan_speed != prev.fan_speed {
                gcode.push_str(&format!("M106 S{}\n", render(cur.fan_speed)));
            }

            gcode.push_str(&format!("G{}", resolved.code));
            push_axis(&mut gcode, 'X', resolved.x);
            push_axis(&mut gcode, 'Y', resolved.y);
            push_axis(&mut gcode, 'Z', resolved.z);
            push_axis(&mut gcode, 'E', resolved.e);
            gcode.push('\n');

            prev = cur;
        }

        // Closing block: stop fan, park, wait for bed to cool, final
        // retraction, heaters off, dwell, fan off, disable motors
        gcode.push_str("M107\nG0 X0 Y120\nM190 S0\nG1 E-3 F200\nM104 S0\nG4 S300\nM107\nM84");

        tracing::debug!(
            "Generated {} bytes from {} commands",
            gcode.len(),
            commands.len()
        );
        Ok(gcode)
    }

    fn emit_preamble(&self, gcode: &mut String, f: &ProfileFunctions, first: &MotionCommand) {
        // Initial PID gains and set-and-wait temperatures
        gcode.push_str(&format!(
            "M301 P{} I{} D{}\n",
            render(f.kp.value_at(0.0)),
            render(f.ki.value_at(0.0)),
            render(f.kd.value_at(0.0))
        ));
        let bed = render(f.bed_temp.value_at(0.0));
        gcode.push_str(&format!("M140 S{}\nM190 S{}\n", bed, bed));
        let nozzle = render(f.nozzle_temp.value_at(0.0));
        gcode.push_str(&format!("M104 S{}\nM109 S{}\n", nozzle, nozzle));

        // Firmware initialisation: relative extrusion, millimetres,
        // absolute positioning, home, wipe and prime the nozzle
        gcode.push_str("M83\nG21\nG90\nM107\nG28\nG0 Z5 E5 F500\nG0 X-1 Z0\nG1 Y60 E3 F500\nG1 Y10 E8 F500\nG1 E-1 F250\n");

        // Retract, move to the first recorded position, restore
        gcode.push_str("G1 F2400 E-2.5\nG0");
        push_axis(gcode, 'X', first.x);
        push_axis(gcode, 'Y', first.y);
        push_axis(gcode, 'Z', first.z);
        push_axis(gcode, 'E', first.e);
        gcode.push_str("\nG1 F2400 E2.5\n");

        gcode.push_str(&format!("M106 S{}\n", render(f.fan_speed.value_at(0.0))));
    }
}

/// Resolve the emitted extrusion for one command.
///
/// A retraction row is replaced by the interpolated retraction length;
/// the row after a retraction restores the same length (even when the
/// capture recorded no extrusion for it); any other extrusion is scaled
/// by the extrusion factor.
fn resolve_extrusion(
    command: &MotionCommand,
    previous: &MotionCommand,
    sample: &ProfileSample,
) -> Option<f64> {
    if command.is_retraction() {
        Some(-sample.retraction)
    } else if previous.is_retraction() {
        Some(sample.retraction)
    } else {
        command.e.map(|e| e * sample.extrusion_factor)
    }
}

fn push_axis(gcode: &mut String, letter: char, value: Option<f64>) {
    if let Some(value) = value {
        gcode.push_str(&format!(" {}{}", letter, render(value)));
    }
}

/// Render a numeric value for the instruction stream: integral values
/// keep one decimal place (`S200.0`), everything else uses the shortest
/// round-trip form (`E-2.5`).
fn render(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}
