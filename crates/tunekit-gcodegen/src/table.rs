//! Command table text I/O
//!
//! Reads recorded motion-command tables in the capture column contract:
//! seven numeric columns per row, in fixed order
//! `code, feed, reserved, X, Y, Z, E`. An absent axis is written as NaN
//! and becomes `None` at this boundary. Blank lines and `#` comments are
//! skipped.

use crate::error::{TableError, TransformError, TransformResult};
use std::path::Path;
use tunekit_core::MotionCommand;

/// Number of columns in the capture format.
pub const TABLE_COLUMNS: usize = 7;

/// Parse a command table from text.
pub fn parse_command_table(text: &str) -> Result<Vec<MotionCommand>, TableError> {
    let mut commands = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let cells: Vec<&str> = trimmed
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|cell| !cell.is_empty())
            .collect();
        if cells.len() != TABLE_COLUMNS {
            return Err(TableError::ColumnCount {
                line,
                expected: TABLE_COLUMNS,
                found: cells.len(),
            });
        }
        let columns = cells
            .iter()
            .map(|cell| {
                cell.parse::<f64>().map_err(|_| TableError::InvalidNumber {
                    line,
                    token: cell.to_string(),
                })
            })
            .collect::<Result<Vec<f64>, TableError>>()?;

        let code = columns[0];
        if !code.is_finite() || code.fract() != 0.0 || !(0.0..=255.0).contains(&code) {
            return Err(TableError::InvalidCode {
                line,
                token: cells[0].to_string(),
            });
        }

        // Column 2 is reserved in the capture format and carries no data
        commands.push(MotionCommand {
            code: code as u8,
            feed: present(columns[1]),
            x: present(columns[3]),
            y: present(columns[4]),
            z: present(columns[5]),
            e: present(columns[6]),
        });
    }
    Ok(commands)
}

/// Read a command table from a file.
pub fn read_command_table(path: &Path) -> TransformResult<Vec<MotionCommand>> {
    let text = std::fs::read_to_string(path).map_err(TransformError::IoError)?;
    Ok(parse_command_table(&text)?)
}

fn present(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_rows() {
        let text = "\
# captured from HollowCube
0 0 0 nan nan nan nan
1 1500 0 10.0 10.0 nan 5.0
";
        let commands = parse_command_table(text).unwrap();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0], MotionCommand::rapid().with_feed(0.0));
        assert_eq!(
            commands[1],
            MotionCommand::linear()
                .with_feed(1500.0)
                .with_x(10.0)
                .with_y(10.0)
                .with_e(5.0)
        );
    }

    #[test]
    fn test_parse_comma_separated() {
        let text = "1,0,0,1.5,-2.0,0.3,nan";
        let commands = parse_command_table(text).unwrap();
        assert_eq!(commands[0].x, Some(1.5));
        assert_eq!(commands[0].y, Some(-2.0));
        assert_eq!(commands[0].z, Some(0.3));
        assert_eq!(commands[0].e, None);
    }

    #[test]
    fn test_nan_axis_is_absent_not_zero() {
        let commands = parse_command_table("1 0 0 nan 0 nan -2.5").unwrap();
        assert_eq!(commands[0].x, None);
        assert_eq!(commands[0].y, Some(0.0));
        assert!(commands[0].is_retraction());
    }

    #[test]
    fn test_column_count_error_carries_line() {
        let text = "0 0 0 nan nan nan nan\n1 0 0 1.0";
        let err = parse_command_table(text).unwrap_err();
        assert_eq!(
            err,
            TableError::ColumnCount {
                line: 2,
                expected: TABLE_COLUMNS,
                found: 4
            }
        );
    }

    #[test]
    fn test_invalid_number_rejected() {
        let err = parse_command_table("1 0 0 ten nan nan nan").unwrap_err();
        assert!(matches!(err, TableError::InvalidNumber { line: 1, .. }));
    }

    #[test]
    fn test_invalid_code_rejected() {
        let err = parse_command_table("1.5 0 0 nan nan nan nan").unwrap_err();
        assert!(matches!(err, TableError::InvalidCode { line: 1, .. }));

        let err = parse_command_table("nan 0 0 nan nan nan nan").unwrap_err();
        assert!(matches!(err, TableError::InvalidCode { line: 1, .. }));
    }
}
