//! Firmware temperature report parsing
//!
//! Marlin-family firmwares answer `M105` with a line such as
//! `ok T:203.5 /210.0 B:60.1 /60.0 @:127`. Only the nozzle reading is
//! mandatory; bed readings and targets appear when the printer has them.

use crate::error::{TuningError, TuningResult};
use std::io::BufRead;
use std::path::Path;

/// Parsed `M105` temperature report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureReport {
    /// Reported nozzle temperature
    pub nozzle: f64,
    /// Nozzle target, when reported
    pub nozzle_target: Option<f64>,
    /// Reported bed temperature, when present
    pub bed: Option<f64>,
    /// Bed target, when reported
    pub bed_target: Option<f64>,
}

impl TemperatureReport {
    /// Build a report carrying only a nozzle reading
    pub fn nozzle_only(nozzle: f64) -> Self {
        Self {
            nozzle,
            nozzle_target: None,
            bed: None,
            bed_target: None,
        }
    }

    /// Parse a firmware response line.
    ///
    /// Returns `None` for lines that carry no nozzle reading (command
    /// echoes, `ok` without payload, busy notices).
    pub fn parse(line: &str) -> Option<Self> {
        let mut nozzle = None;
        let mut nozzle_target = None;
        let mut bed = None;
        let mut bed_target = None;
        let mut last_sensor = ' ';

        for token in line.split_whitespace() {
            if let Some(value) = token.strip_prefix("T:") {
                nozzle = value.parse::<f64>().ok();
                last_sensor = 'T';
            } else if let Some(value) = token.strip_prefix("B:") {
                bed = value.parse::<f64>().ok();
                last_sensor = 'B';
            } else if let Some(value) = token.strip_prefix('/') {
                match last_sensor {
                    'T' => nozzle_target = value.parse::<f64>().ok(),
                    'B' => bed_target = value.parse::<f64>().ok(),
                    _ => {}
                }
                last_sensor = ' ';
            }
        }

        Some(Self {
            nozzle: nozzle?,
            nozzle_target,
            bed,
            bed_target,
        })
    }
}

/// Where temperature reports come from.
///
/// The live implementation wraps the serial link (request already sent,
/// response pending); tests and rehearsals use scripted data.
pub trait TemperatureSource {
    /// Obtain the next temperature report. Pacing (waiting for the
    /// firmware to answer) belongs to the implementation.
    fn sample(&mut self) -> TuningResult<TemperatureReport>;
}

/// Temperature source reading response lines from the firmware link.
///
/// Command echoes and busy notices are skipped; a bounded number of
/// non-report lines is tolerated before the read is declared malformed.
pub struct ReaderSource<R: BufRead> {
    reader: R,
    max_skipped_lines: usize,
}

impl<R: BufRead> ReaderSource<R> {
    /// Read reports from the given line-oriented reader
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            max_skipped_lines: 32,
        }
    }
}

impl<R: BufRead> TemperatureSource for ReaderSource<R> {
    fn sample(&mut self) -> TuningResult<TemperatureReport> {
        let mut last_line = String::new();
        for _ in 0..=self.max_skipped_lines {
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "temperature stream ended",
                )
                .into());
            }
            if let Some(report) = TemperatureReport::parse(line.trim()) {
                return Ok(report);
            }
            last_line = line.trim().to_string();
        }
        Err(TuningError::MalformedReport { line: last_line })
    }
}

/// Temperature source that replays recorded nozzle readings.
///
/// Lets a schedule be rehearsed against data saved from an earlier run.
/// Once the recording is exhausted the last reading repeats.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    readings: Vec<f64>,
    cursor: usize,
}

impl ReplaySource {
    /// Replay the given readings in order
    pub fn new(readings: Vec<f64>) -> Self {
        Self {
            readings,
            cursor: 0,
        }
    }

    /// Load readings from a CSV file.
    ///
    /// Accepts one value per line, or rows in the experiment log format
    /// (`time_s,nozzle_c,target_c`), in which case the second column is
    /// taken. Header and comment lines are skipped.
    pub fn from_csv_file(path: &Path) -> TuningResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut readings = Vec::new();
        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let cells: Vec<&str> = line.split(',').map(str::trim).collect();
            let cell = if cells.len() >= 2 { cells[1] } else { cells[0] };
            if let Ok(value) = cell.parse::<f64>() {
                readings.push(value);
            }
        }
        if readings.is_empty() {
            return Err(TuningError::EmptyReplay);
        }
        Ok(Self::new(readings))
    }

    /// Number of readings in the recording
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// True when the recording holds no readings
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

impl TemperatureSource for ReplaySource {
    fn sample(&mut self) -> TuningResult<TemperatureReport> {
        if self.readings.is_empty() {
            return Err(TuningError::EmptyReplay);
        }
        let reading = self.readings[self.cursor.min(self.readings.len() - 1)];
        if self.cursor < self.readings.len() {
            self.cursor += 1;
        }
        Ok(TemperatureReport::nozzle_only(reading))
    }
}
