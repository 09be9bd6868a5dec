//! Parameter profiles and interpolation
//!
//! A `ParameterProfile` describes one control value over the course of a
//! processing run: either a single constant, or a sequence of keyframes
//! spread evenly across the command table's index range. Profiles are
//! built once at the start of a run and queried once per command index
//! through an `Interpolator`.

use crate::error::MalformedInputError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A named control value, constant or time-varying.
///
/// Serializes untagged so configuration files may write either a bare
/// number or an array of keyframes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterProfile {
    /// The value holds for the entire run
    Constant(f64),
    /// Keyframe values anchored evenly across the command index range
    Keyframes(Vec<f64>),
}

impl ParameterProfile {
    /// All keyframe values of this profile. A constant profile exposes
    /// its single value.
    pub fn keyframes(&self) -> &[f64] {
        match self {
            Self::Constant(v) => std::slice::from_ref(v),
            Self::Keyframes(k) => k,
        }
    }

    /// Build the interpolation function mapping a command index in
    /// `[0, len-1]` to this profile's value at that index.
    ///
    /// `name` identifies the profile in error reports. `len` is the
    /// command table length and must be at least 2.
    pub fn interpolator(
        &self,
        name: &str,
        len: usize,
    ) -> Result<Interpolator, MalformedInputError> {
        if len < 2 {
            return Err(MalformedInputError::TooFewCommands { count: len });
        }
        match self {
            Self::Constant(v) => Ok(Interpolator::constant(*v)),
            Self::Keyframes(k) if k.is_empty() => Err(MalformedInputError::EmptyProfile {
                name: name.to_string(),
            }),
            Self::Keyframes(k) if k.len() == 1 => Ok(Interpolator::constant(k[0])),
            Self::Keyframes(k) => Ok(Interpolator::piecewise(k, len)),
        }
    }
}

impl From<f64> for ParameterProfile {
    fn from(value: f64) -> Self {
        Self::Constant(value)
    }
}

impl From<Vec<f64>> for ParameterProfile {
    fn from(keyframes: Vec<f64>) -> Self {
        Self::Keyframes(keyframes)
    }
}

impl FromStr for ParameterProfile {
    type Err = String;

    /// Parse `"210"` as a constant or `"200,220,200"` as keyframes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values: Vec<f64> = s
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<f64>()
                    .map_err(|_| format!("Invalid profile value: {}", part.trim()))
            })
            .collect::<Result<_, _>>()?;
        match values.as_slice() {
            [] => Err("Empty profile".to_string()),
            [v] => Ok(Self::Constant(*v)),
            _ => Ok(Self::Keyframes(values)),
        }
    }
}

/// Interpolation function derived from a `ParameterProfile`.
///
/// Evaluating at index 0 and at index `len-1` returns the profile's
/// first and last keyframe exactly.
#[derive(Debug, Clone)]
pub struct Interpolator {
    kind: InterpolatorKind,
}

#[derive(Debug, Clone)]
enum InterpolatorKind {
    Constant(f64),
    Piecewise {
        /// Keyframe anchor indices, strictly increasing over `[0, len-1]`
        positions: Vec<f64>,
        values: Vec<f64>,
    },
}

impl Interpolator {
    fn constant(value: f64) -> Self {
        Self {
            kind: InterpolatorKind::Constant(value),
        }
    }

    fn piecewise(keyframes: &[f64], len: usize) -> Self {
        let n = keyframes.len();
        let span = (len - 1) as f64;
        let step = span / (n - 1) as f64;
        let mut positions: Vec<f64> = (0..n).map(|j| j as f64 * step).collect();
        // Anchor the final keyframe on the last index exactly
        positions[n - 1] = span;
        Self {
            kind: InterpolatorKind::Piecewise {
                positions,
                values: keyframes.to_vec(),
            },
        }
    }

    /// Interpolated value at the given (continuous) command index.
    /// Indices outside the keyframe range clamp to the end values.
    pub fn value_at(&self, index: f64) -> f64 {
        match &self.kind {
            InterpolatorKind::Constant(v) => *v,
            InterpolatorKind::Piecewise { positions, values } => {
                let last = positions.len() - 1;
                if index <= positions[0] {
                    return values[0];
                }
                if index >= positions[last] {
                    return values[last];
                }
                // First anchor strictly beyond the query index
                let hi = positions.partition_point(|&p| p <= index);
                let lo = hi - 1;
                if positions[lo] == index || values[lo] == values[hi] {
                    return values[lo];
                }
                let t = (index - positions[lo]) / (positions[hi] - positions[lo]);
                values[lo] + t * (values[hi] - values[lo])
            }
        }
    }
}
