//! # TuneKit G-code Generation
//!
//! The G-code stream transformation engine. Consumes a table of recorded
//! motion commands plus per-parameter target profiles, validates them
//! against safety bounds, and produces the firmware instruction stream.
//!
//! ## Components
//!
//! - **Transformer**: profile interpolation, parameter-change detection,
//!   and instruction emission
//! - **Table I/O**: reading recorded command tables in the capture
//!   column contract
//! - **Parameter files**: JSON/TOML persistence for profile sets

pub mod error;
pub mod table;
pub mod transformer;

pub use error::{TableError, TransformError, TransformResult};
pub use table::{parse_command_table, read_command_table, TABLE_COLUMNS};
pub use transformer::{GcodeTransformer, TransformParameters};
