//! Motion command representation
//!
//! One `MotionCommand` corresponds to one row of a recorded command table.
//! Spatial axes and extrusion are optional: an absent axis is omitted from
//! the emitted instruction, never written as zero.

use serde::{Deserialize, Serialize};

/// One recorded motion command.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MotionCommand {
    /// Motion directive kind, emitted as `G{code}` (0 = rapid, 1 = linear)
    pub code: u8,
    /// Feed rate column of the source capture; scaled during processing
    /// but never emitted
    pub feed: Option<f64>,
    /// X-axis target (if Some, include this axis)
    pub x: Option<f64>,
    /// Y-axis target (if Some, include this axis)
    pub y: Option<f64>,
    /// Z-axis target (if Some, include this axis)
    pub z: Option<f64>,
    /// Extrusion amount; negative values mark a retraction
    pub e: Option<f64>,
}

impl MotionCommand {
    /// Create a new command with the given directive code and no axes
    pub fn new(code: u8) -> Self {
        Self {
            code,
            ..Default::default()
        }
    }

    /// Create a rapid move (`G0`) with no axes
    pub fn rapid() -> Self {
        Self::new(0)
    }

    /// Create a linear move (`G1`) with no axes
    pub fn linear() -> Self {
        Self::new(1)
    }

    /// Set the feed rate column
    pub fn with_feed(mut self, feed: f64) -> Self {
        self.feed = Some(feed);
        self
    }

    /// Set the X axis
    pub fn with_x(mut self, x: f64) -> Self {
        self.x = Some(x);
        self
    }

    /// Set the Y axis
    pub fn with_y(mut self, y: f64) -> Self {
        self.y = Some(y);
        self
    }

    /// Set the Z axis
    pub fn with_z(mut self, z: f64) -> Self {
        self.z = Some(z);
        self
    }

    /// Set the extrusion amount
    pub fn with_e(mut self, e: f64) -> Self {
        self.e = Some(e);
        self
    }

    /// True if this command marks a retraction (negative extrusion)
    pub fn is_retraction(&self) -> bool {
        self.e.is_some_and(|e| e < 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let cmd = MotionCommand::linear().with_x(10.0).with_y(20.0).with_e(5.0);
        assert_eq!(cmd.code, 1);
        assert_eq!(cmd.x, Some(10.0));
        assert_eq!(cmd.y, Some(20.0));
        assert_eq!(cmd.z, None);
        assert_eq!(cmd.e, Some(5.0));
        assert_eq!(cmd.feed, None);
    }

    #[test]
    fn test_is_retraction() {
        assert!(MotionCommand::linear().with_e(-2.0).is_retraction());
        assert!(!MotionCommand::linear().with_e(2.0).is_retraction());
        assert!(!MotionCommand::linear().is_retraction());
        // Zero extrusion is not a retraction
        assert!(!MotionCommand::linear().with_e(0.0).is_retraction());
    }
}
