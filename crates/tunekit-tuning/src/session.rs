//! Printer session helpers
//!
//! Small fixed routines shared by tuning runs: powering the fan banks,
//! settling the nozzle on a starting temperature, and shutting the
//! heater down afterwards.

use crate::error::{TuningError, TuningResult};
use crate::report::TemperatureSource;
use crate::sink::CommandSink;
use std::collections::VecDeque;
use std::time::Duration;

/// Power up the auxiliary fan banks and the part fan.
pub fn enable_fans(sink: &mut dyn CommandSink) -> TuningResult<()> {
    sink.send("M42 P9 S255")?;
    sink.send("M42 P4 S255")?;
    sink.send("M106 S200")
}

/// Turn the nozzle heater off; with `cool`, spin the part fan up so the
/// next run starts from a low temperature sooner.
pub fn shutdown(sink: &mut dyn CommandSink, cool: bool) -> TuningResult<()> {
    sink.send("M104 S0")?;
    if cool {
        sink.send("M106 S255")?;
    }
    Ok(())
}

/// Settings for the moving-average settle loop.
#[derive(Debug, Clone)]
pub struct SettleSettings {
    /// Accept the target once the moving average is within this band
    pub tolerance: f64,
    /// Number of samples in the moving average
    pub window: usize,
    /// Give up after this many samples past the initial window
    pub max_samples: usize,
    /// Pause between samples
    pub interval: Duration,
}

impl Default for SettleSettings {
    fn default() -> Self {
        Self {
            tolerance: 0.5,
            window: 3,
            max_samples: 420,
            interval: Duration::from_millis(500),
        }
    }
}

/// Drive the nozzle toward `target` and wait until the moving average of
/// reported temperatures sits within tolerance of it.
///
/// Heating is requested from the firmware; cooling relies on the fans,
/// re-asserted every sample while above target. Returns the settled
/// average, or `SettleTimeout` once the sample budget is spent.
pub fn wait_for_temperature(
    sink: &mut dyn CommandSink,
    source: &mut dyn TemperatureSource,
    target: f64,
    settings: &SettleSettings,
) -> TuningResult<f64> {
    let window = settings.window.max(1);
    let mut recent: VecDeque<f64> = VecDeque::with_capacity(window);

    // Seed the moving average
    for _ in 0..window {
        sink.send("M105")?;
        pause(settings.interval);
        recent.push_back(source.sample()?.nozzle);
    }
    let mut average = mean(&recent);
    if (average - target).abs() <= settings.tolerance {
        tracing::info!("Already at {:.1}\u{00b0}C", average);
        return Ok(average);
    }

    let cooling = average > target;
    if cooling {
        enable_fans(sink)?;
    } else {
        sink.send(&format!("M104 S{}", target))?;
    }

    for sample in 0..settings.max_samples {
        sink.send("M105")?;
        pause(settings.interval);
        recent.push_back(source.sample()?.nozzle);
        if recent.len() > window {
            recent.pop_front();
        }
        average = mean(&recent);
        tracing::debug!("Moving average temperature: {:.1}\u{00b0}C", average);

        if (average - target).abs() <= settings.tolerance {
            tracing::info!(
                "Settled at {:.1}\u{00b0}C after {} samples",
                average,
                sample + 1
            );
            return Ok(average);
        }
        if cooling {
            // Keep the fans asserted while shedding heat
            enable_fans(sink)?;
        }
    }

    Err(TuningError::SettleTimeout {
        samples: settings.max_samples,
        average,
        target,
    })
}

fn mean(values: &VecDeque<f64>) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn pause(interval: Duration) {
    if !interval.is_zero() {
        std::thread::sleep(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ReplaySource, TemperatureReport};
    use crate::sink::RecordingSink;

    fn instant() -> SettleSettings {
        SettleSettings {
            interval: Duration::ZERO,
            ..SettleSettings::default()
        }
    }

    #[test]
    fn test_enable_fans_order() {
        let mut sink = RecordingSink::new();
        enable_fans(&mut sink).unwrap();
        assert_eq!(sink.commands(), ["M42 P9 S255", "M42 P4 S255", "M106 S200"]);
    }

    #[test]
    fn test_shutdown() {
        let mut sink = RecordingSink::new();
        shutdown(&mut sink, false).unwrap();
        assert_eq!(sink.commands(), ["M104 S0"]);

        let mut sink = RecordingSink::new();
        shutdown(&mut sink, true).unwrap();
        assert_eq!(sink.commands(), ["M104 S0", "M106 S255"]);
    }

    #[test]
    fn test_already_at_temperature() {
        let mut sink = RecordingSink::new();
        let mut source = ReplaySource::new(vec![200.1, 199.9, 200.0]);
        let settled =
            wait_for_temperature(&mut sink, &mut source, 200.0, &instant()).unwrap();
        assert!((settled - 200.0).abs() <= 0.5);
        // Only the seed requests went out, no heat command
        assert_eq!(sink.commands(), ["M105", "M105", "M105"]);
    }

    #[test]
    fn test_heats_then_settles() {
        let mut sink = RecordingSink::new();
        // Seed window reads cold, then the nozzle climbs onto target
        let mut source = ReplaySource::new(vec![
            25.0, 25.0, 25.0, 150.0, 199.0, 200.0, 200.0, 200.0, 200.0,
        ]);
        let settled =
            wait_for_temperature(&mut sink, &mut source, 200.0, &instant()).unwrap();
        assert!((settled - 200.0).abs() <= 0.5);
        assert!(sink.commands().contains(&"M104 S200".to_string()));
    }

    #[test]
    fn test_settle_timeout() {
        let mut sink = RecordingSink::new();
        let mut source = ReplaySource::new(vec![25.0]);
        let settings = SettleSettings {
            max_samples: 5,
            ..instant()
        };
        let err = wait_for_temperature(&mut sink, &mut source, 200.0, &settings).unwrap_err();
        assert!(matches!(
            err,
            TuningError::SettleTimeout { samples: 5, .. }
        ));
    }

    #[test]
    fn test_cooling_keeps_fans_on() {
        let mut sink = RecordingSink::new();
        let mut source = ReplaySource::new(vec![120.0, 118.0, 115.0, 60.0, 30.0, 25.0, 25.0]);
        let settings = SettleSettings {
            tolerance: 5.0,
            ..instant()
        };
        wait_for_temperature(&mut sink, &mut source, 25.0, &settings).unwrap();
        assert!(sink.commands().contains(&"M106 S200".to_string()));
        assert!(!sink.commands().iter().any(|c| c.starts_with("M104 S25")));
    }
}
