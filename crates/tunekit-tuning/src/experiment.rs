//! Configurable tuning experiment harness
//!
//! One harness replaces the family of near-identical one-off tuning
//! scripts: a run is parameterized by its gain set and a disturbance
//! schedule instead of being copy-pasted per variation. The harness
//! issues setpoint and gain commands and observes reported temperature;
//! the control loop itself runs on the firmware.

use crate::error::{TuningError, TuningResult};
use crate::report::TemperatureSource;
use crate::session::{enable_fans, shutdown};
use crate::sink::CommandSink;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

/// One PID gain set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gains {
    /// Proportional gain
    pub kp: f64,
    /// Integral gain
    pub ki: f64,
    /// Derivative gain
    pub kd: f64,
}

impl Gains {
    /// Create a gain set
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd }
    }

    /// The firmware directive applying this gain set
    pub fn directive(&self) -> String {
        format!("M301 P{} I{} D{}", self.kp, self.ki, self.kd)
    }
}

/// A scheduled intervention during an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Disturbance {
    /// Start extruding at the given feed rate (mm/min), one short move
    /// per sample, until stopped
    StartExtrusion {
        /// Feed rate in mm/min
        feed_rate: f64,
    },
    /// Stop extruding
    StopExtrusion,
    /// Move the temperature setpoint
    SetTarget {
        /// New target temperature in degrees C
        temp: f64,
    },
    /// Apply a new gain set mid-run
    SetGains {
        /// Proportional gain
        kp: f64,
        /// Integral gain
        ki: f64,
        /// Derivative gain
        kd: f64,
    },
}

/// A disturbance anchored at a sample index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    /// Sample index at which the disturbance fires
    pub at_sample: usize,
    /// What happens
    #[serde(flatten)]
    pub disturbance: Disturbance,
}

/// Experiment configuration: setpoint, gain set, schedule, and safety.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Target nozzle temperature (degrees C)
    pub target_temp: f64,
    /// Initial PID gain set
    pub gains: Gains,
    /// Milliseconds between temperature samples
    pub sample_interval_ms: u64,
    /// Number of samples to record
    pub max_samples: usize,
    /// Abort threshold for reported nozzle temperature (degrees C)
    pub cutoff_temp: f64,
    /// Scheduled disturbances
    pub phases: Vec<Phase>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            target_temp: 200.0,
            gains: Gains::new(15.5, 0.13, 6.0),
            sample_interval_ms: 500,
            max_samples: 420,
            cutoff_temp: 300.0,
            phases: Vec::new(),
        }
    }
}

impl ExperimentConfig {
    /// Create a config with the default run shape
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target temperature
    pub fn with_target(mut self, temp: f64) -> Self {
        self.target_temp = temp;
        self
    }

    /// Set the initial gain set
    pub fn with_gains(mut self, gains: Gains) -> Self {
        self.gains = gains;
        self
    }

    /// Set the sample interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.sample_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the number of samples to record
    pub fn with_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples;
        self
    }

    /// Append a scheduled disturbance
    pub fn with_phase(mut self, at_sample: usize, disturbance: Disturbance) -> Self {
        self.phases.push(Phase {
            at_sample,
            disturbance,
        });
        self
    }

    /// Load a configuration from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> TuningResult<Self> {
        let content = std::fs::read_to_string(path)?;

        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)
                .map_err(|e| TuningError::ConfigFile(format!("Invalid JSON: {}", e)))
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content)
                .map_err(|e| TuningError::ConfigFile(format!("Invalid TOML: {}", e)))
        } else {
            Err(TuningError::ConfigFile(
                "Config file must be .json or .toml".to_string(),
            ))
        }
    }

    /// Save the configuration to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> TuningResult<()> {
        let content = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::to_string_pretty(self)
                .map_err(|e| TuningError::ConfigFile(format!("Serialize failed: {}", e)))?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::to_string_pretty(self)
                .map_err(|e| TuningError::ConfigFile(format!("Serialize failed: {}", e)))?
        } else {
            return Err(TuningError::ConfigFile(
                "Config file must be .json or .toml".to_string(),
            ));
        };
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// One recorded observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    /// Seconds since the first sample
    pub elapsed_s: f64,
    /// Reported nozzle temperature
    pub nozzle: f64,
    /// Target temperature at the time of the sample
    pub target: f64,
}

/// Recorded experiment data.
#[derive(Debug, Clone, Default)]
pub struct ExperimentLog {
    samples: Vec<Sample>,
}

impl ExperimentLog {
    /// Recorded samples, in order
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Write the log as CSV (`time_s,nozzle_c,target_c`)
    pub fn write_csv<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "time_s,nozzle_c,target_c")?;
        for sample in &self.samples {
            writeln!(
                writer,
                "{},{},{}",
                sample.elapsed_s, sample.nozzle, sample.target
            )?;
        }
        Ok(())
    }

    /// Save the log as a CSV file
    pub fn save_csv(&self, path: &Path) -> std::io::Result<()> {
        let mut file = std::fs::File::create(path)?;
        self.write_csv(&mut file)
    }
}

/// A tuning experiment, ready to run against a firmware link.
pub struct Experiment {
    config: ExperimentConfig,
}

impl Experiment {
    /// Create an experiment from its configuration
    pub fn new(config: ExperimentConfig) -> Self {
        Self { config }
    }

    /// Run the schedule.
    ///
    /// Sets up fans, gains, relative extrusion and the setpoint, then
    /// records one temperature sample per interval, firing scheduled
    /// disturbances as their sample index comes up. A reading above the
    /// cutoff aborts the run with the heater already commanded off.
    /// A completed run ends with the heater off and the fans cooling
    /// the nozzle for the next test.
    pub fn run(
        &self,
        sink: &mut dyn CommandSink,
        source: &mut dyn TemperatureSource,
    ) -> TuningResult<ExperimentLog> {
        let cfg = &self.config;
        let interval = Duration::from_millis(cfg.sample_interval_ms);
        let timestep = interval.as_secs_f64();

        tracing::info!(
            "Starting experiment: target {}\u{00b0}C, {} samples at {}ms",
            cfg.target_temp,
            cfg.max_samples,
            cfg.sample_interval_ms
        );

        enable_fans(sink)?;
        sink.send(&cfg.gains.directive())?;
        // Disturbance moves use relative extrusion
        sink.send("M83")?;
        sink.send(&format!("M104 S{}", cfg.target_temp))?;

        let mut target = cfg.target_temp;
        let mut extruding: Option<f64> = None;
        let mut log = ExperimentLog::default();

        for n in 0..cfg.max_samples {
            sink.send("M105")?;
            if !interval.is_zero() {
                std::thread::sleep(interval);
            }
            let report = source.sample()?;

            if report.nozzle > cfg.cutoff_temp {
                tracing::warn!(
                    "Cutoff tripped at sample {}: {}\u{00b0}C",
                    n,
                    report.nozzle
                );
                shutdown(sink, false)?;
                return Err(TuningError::ThermalCutoff {
                    reading: report.nozzle,
                    limit: cfg.cutoff_temp,
                });
            }

            for phase in cfg.phases.iter().filter(|p| p.at_sample == n) {
                match phase.disturbance {
                    Disturbance::StartExtrusion { feed_rate } => {
                        extruding = Some(feed_rate);
                    }
                    Disturbance::StopExtrusion => {
                        extruding = None;
                        sink.send("G1 F350 E0")?;
                    }
                    Disturbance::SetTarget { temp } => {
                        target = temp;
                        sink.send(&format!("M104 S{}", temp))?;
                    }
                    Disturbance::SetGains { kp, ki, kd } => {
                        sink.send(&Gains::new(kp, ki, kd).directive())?;
                    }
                }
            }

            if let Some(feed_rate) = extruding {
                // One short move per sample keeps the step disturbance
                // running at the requested feed rate
                let amount = feed_rate * timestep / 60.0;
                sink.send(&format!("G1 F{} E{}", feed_rate, amount))?;
            }

            log.samples.push(Sample {
                elapsed_s: n as f64 * timestep,
                nozzle: report.nozzle,
                target,
            });
        }

        shutdown(sink, true)?;
        tracing::info!("Experiment complete: {} samples", log.samples.len());
        Ok(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReplaySource;
    use crate::sink::RecordingSink;

    fn fast_config(samples: usize) -> ExperimentConfig {
        ExperimentConfig::new()
            .with_interval(Duration::ZERO)
            .with_samples(samples)
    }

    #[test]
    fn test_run_records_samples_and_shuts_down() {
        let mut sink = RecordingSink::new();
        let mut source = ReplaySource::new(vec![25.0, 80.0, 150.0, 199.0]);
        let log = Experiment::new(fast_config(4))
            .run(&mut sink, &mut source)
            .unwrap();

        assert_eq!(log.samples().len(), 4);
        assert_eq!(log.samples()[2].nozzle, 150.0);
        assert_eq!(log.samples()[3].target, 200.0);

        let commands = sink.commands();
        assert!(commands.contains(&"M301 P15.5 I0.13 D6".to_string()));
        assert!(commands.contains(&"M104 S200".to_string()));
        // Completed runs park the heater off with the fans cooling
        assert_eq!(
            &commands[commands.len() - 2..],
            ["M104 S0", "M106 S255"]
        );
    }

    #[test]
    fn test_cutoff_aborts_with_heater_off() {
        let mut sink = RecordingSink::new();
        let mut source = ReplaySource::new(vec![250.0, 310.0, 320.0]);
        let err = Experiment::new(fast_config(10))
            .run(&mut sink, &mut source)
            .unwrap_err();

        assert!(matches!(
            err,
            TuningError::ThermalCutoff { reading, limit }
                if reading == 310.0 && limit == 300.0
        ));
        assert_eq!(sink.last(), Some("M104 S0"));
    }

    #[test]
    fn test_extrusion_phase_fires_and_stops() {
        let config = fast_config(6)
            .with_phase(2, Disturbance::StartExtrusion { feed_rate: 360.0 })
            .with_phase(4, Disturbance::StopExtrusion);
        let mut sink = RecordingSink::new();
        let mut source = ReplaySource::new(vec![200.0]);
        Experiment::new(config).run(&mut sink, &mut source).unwrap();

        // Interval is zero, so each extrusion move carries zero length
        let moves: Vec<&String> = sink
            .commands()
            .iter()
            .filter(|c| c.starts_with("G1 F360"))
            .collect();
        assert_eq!(moves.len(), 2); // samples 2 and 3
        assert!(sink.commands().contains(&"G1 F350 E0".to_string()));
    }

    #[test]
    fn test_target_step_is_recorded() {
        let config = fast_config(4).with_phase(2, Disturbance::SetTarget { temp: 220.0 });
        let mut sink = RecordingSink::new();
        let mut source = ReplaySource::new(vec![200.0]);
        let log = Experiment::new(config).run(&mut sink, &mut source).unwrap();

        assert_eq!(log.samples()[1].target, 200.0);
        assert_eq!(log.samples()[2].target, 220.0);
        assert_eq!(log.samples()[3].target, 220.0);
        assert!(sink.commands().contains(&"M104 S220".to_string()));
    }

    #[test]
    fn test_gain_step_reissues_directive() {
        let config = fast_config(3).with_phase(
            1,
            Disturbance::SetGains {
                kp: 19.28,
                ki: 0.01,
                kd: 97.7,
            },
        );
        let mut sink = RecordingSink::new();
        let mut source = ReplaySource::new(vec![200.0]);
        Experiment::new(config).run(&mut sink, &mut source).unwrap();

        assert!(sink
            .commands()
            .contains(&"M301 P19.28 I0.01 D97.7".to_string()));
    }

    #[test]
    fn test_csv_log_shape() {
        let mut sink = RecordingSink::new();
        let mut source = ReplaySource::new(vec![25.0, 30.0]);
        let log = Experiment::new(fast_config(2))
            .run(&mut sink, &mut source)
            .unwrap();

        let mut buffer = Vec::new();
        log.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "time_s,nozzle_c,target_c");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "0,25,200");
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExperimentConfig::new()
            .with_target(210.0)
            .with_gains(Gains::new(19.28, 0.01, 97.7))
            .with_phase(120, Disturbance::StartExtrusion { feed_rate: 360.0 })
            .with_phase(240, Disturbance::StopExtrusion);

        for name in ["experiment.json", "experiment.toml"] {
            let path = dir.path().join(name);
            config.save_to_file(&path).unwrap();
            let loaded = ExperimentConfig::load_from_file(&path).unwrap();
            assert_eq!(loaded, config, "{}", name);
        }
    }
}
